use crate::brush::Brush;
use crate::rectangle::Rectangle;
use crate::render::{QuadInstance, QuadShader};
use glam::{Vec2, Vec3, Vec4};

/// Splatted velocities are clamped to this many texels per second.
pub const MAX_SPLAT_VELOCITY: f32 = 1.0e4;

/// What a brush leaves behind in one splat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatParameters {
    /// Bristle points higher than this above the canvas deposit nothing.
    pub z_threshold: f32,
    /// Where the simulated field sits in world space.
    pub painting_rectangle: Rectangle,
    pub color: [f32; 4],
    /// Splat radius in world units.
    pub radius: f32,
    pub velocity_scale: f32,
}

/// Splat quads for a brush, spaced evenly along every bristle segment in
/// texel space with the first half a step from the segment start.
pub struct SplatGeometry {
    pub instances: Vec<QuadInstance>,
    pub velocities: Vec<Vec2>,
}

impl SplatGeometry {
    pub fn from_brush(
        brush: &Brush,
        parameters: &SplatParameters,
        field_size: Vec2,
        splats_per_segment: u32,
    ) -> Self {
        let rectangle = &parameters.painting_rectangle;
        let origin = Vec2::new(rectangle.left, rectangle.bottom);
        let to_texels = field_size / Vec2::new(rectangle.width, rectangle.height);
        let radius = parameters.radius * to_texels.x;

        let positions = brush.positions();
        let velocities = brush.velocities();
        let previous_velocities = brush.previous_velocities();

        let mut geometry = SplatGeometry {
            instances: Vec::new(),
            velocities: Vec::new(),
        };

        for bristle in 0..brush.bristle_count() as i32 {
            for vertex in 0..brush.vertices_per_bristle() as i32 - 1 {
                let start = positions.texel(bristle, vertex).truncate();
                let end = positions.texel(bristle, vertex + 1).truncate();
                let velocity = velocities
                    .texel(bristle, vertex)
                    .lerp(previous_velocities.texel(bristle, vertex), 0.5);
                let next_velocity = velocities
                    .texel(bristle, vertex + 1)
                    .lerp(previous_velocities.texel(bristle, vertex + 1), 0.5);

                for splat in 0..splats_per_segment {
                    let t = (splat as f32 + 0.5) / splats_per_segment as f32;
                    let point: Vec3 = start.lerp(end, t);
                    if !(point.z <= parameters.z_threshold) {
                        continue;
                    }

                    let world_velocity = velocity.lerp(next_velocity, t);
                    let texel_velocity = (Vec2::new(world_velocity.x, world_velocity.y)
                        * parameters.velocity_scale)
                        .clamp_length_max(MAX_SPLAT_VELOCITY);

                    geometry.instances.push(QuadInstance {
                        center: (Vec2::new(point.x, point.y) - origin) * to_texels,
                        radius,
                        index: geometry.velocities.len(),
                    });
                    geometry.velocities.push(if texel_velocity.is_finite() {
                        texel_velocity
                    } else {
                        Vec2::ZERO
                    });
                }
            }
        }

        geometry
    }
}

fn falloff(local: Vec2) -> Option<f32> {
    let distance = local.length();
    (distance < 1.0).then(|| 1.0 - distance)
}

pub struct PaintSplat {
    pub color: Vec4,
}

impl QuadShader for PaintSplat {
    fn shade(&self, _instance: &QuadInstance, local: Vec2) -> Option<Vec4> {
        falloff(local).map(|weight| {
            let mut color = self.color;
            color.w *= weight;
            color
        })
    }
}

pub struct VelocitySplat<'a> {
    pub velocities: &'a [Vec2],
}

impl<'a> QuadShader for VelocitySplat<'a> {
    fn shade(&self, instance: &QuadInstance, local: Vec2) -> Option<Vec4> {
        let velocity = self.velocities.get(instance.index)?;
        falloff(local).map(|weight| Vec4::new(velocity.x * weight, velocity.y * weight, 0.0, 0.0))
    }
}
