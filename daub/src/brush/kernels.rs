// Kernels over the bristle grid: x is the bristle, y is the vertex along it.
// Vertex 0 is the root, attached to the brush.

use crate::render::{Kernel, Texture};
use glam::{Vec3, Vec4, Vec4Swizzles};
use std::f32::consts::TAU;

/// Bristles move no faster than this, in world units per second.
pub const MAX_BRISTLE_SPEED: f32 = 1.0e5;

/// Rest shape of every bristle: rooted on a disc under the anchor and hanging
/// straight down, with the randoms texture jittering each vertex sideways.
pub struct SetBristles<'a> {
    pub randoms: &'a Texture,
    pub anchor: Vec3,
    pub scale: f32,
    pub bristle_length: f32,
    pub jitter: f32,
    pub vertices_per_bristle: u32,
}

impl<'a> SetBristles<'a> {
    pub fn segment_length(&self) -> f32 {
        self.scale * self.bristle_length / (self.vertices_per_bristle - 1) as f32
    }

    pub fn root_position(&self, bristle: u32) -> Vec3 {
        let random = self.randoms.texel(bristle as i32, 0);
        let angle = random.x * TAU;
        let radius = random.y.sqrt() * self.scale;

        self.anchor + Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
    }
}

impl<'a> Kernel for SetBristles<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let root = self.root_position(x);
        if y == 0 {
            return root.extend(0.0);
        }

        let segment_length = self.segment_length();
        let random = self.randoms.texel(x as i32, y as i32);
        let offset = (random.zw() - 0.5) * self.jitter * segment_length;

        (root + Vec3::new(offset.x, offset.y, -(y as f32) * segment_length)).extend(0.0)
    }
}

/// Predict positions from the current velocities.
pub struct Project<'a> {
    pub positions: &'a Texture,
    pub velocities: &'a Texture,
    pub damping: f32,
    pub gravity: f32,
    pub timestep: f32,
}

impl<'a> Kernel for Project<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let position = self.positions.texel(x as i32, y as i32).truncate();
        if y == 0 {
            return position.extend(0.0);
        }

        let mut velocity = self.velocities.texel(x as i32, y as i32).truncate() * self.damping;
        velocity.z -= self.gravity * self.timestep;
        let velocity = velocity.clamp_length_max(MAX_BRISTLE_SPEED);

        (position + velocity * self.timestep).extend(0.0)
    }
}

/// Solve the distance constraints of every other segment. Pass 0 handles the
/// segments that start on an even vertex, pass 1 the odd ones, so each vertex
/// belongs to at most one segment per pass and both ends agree on the result.
pub struct DistanceConstraint<'a> {
    pub positions: &'a Texture,
    pub pass: u32,
    pub target_distance: f32,
    pub vertices_per_bristle: u32,
}

impl<'a> Kernel for DistanceConstraint<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let position = self.positions.texel(x as i32, y as i32).truncate();

        let partner = if (y + self.pass) % 2 == 0 {
            y + 1
        } else if y > 0 {
            y - 1
        } else {
            return position.extend(0.0);
        };
        if partner >= self.vertices_per_bristle {
            return position.extend(0.0);
        }

        let delta = self.positions.texel(x as i32, partner as i32).truncate() - position;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return position.extend(0.0);
        }

        // The root doesn't move, so its partner takes the whole correction.
        let weight = match (y, partner) {
            (0, _) => 0.0,
            (_, 0) => 1.0,
            _ => 0.5,
        };

        (position + delta / distance * (distance - self.target_distance) * weight).extend(0.0)
    }
}

/// Pull every third vertex towards the midpoint of its neighbours. Stiffness
/// varies per bristle.
pub struct BendingConstraint<'a> {
    pub positions: &'a Texture,
    pub randoms: &'a Texture,
    pub pass: u32,
    pub stiffness: f32,
    pub stiffness_variation: f32,
    pub vertices_per_bristle: u32,
}

impl<'a> Kernel for BendingConstraint<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let position = self.positions.texel(x as i32, y as i32).truncate();
        if y == 0 || y + 1 >= self.vertices_per_bristle || y % 3 != self.pass {
            return position.extend(0.0);
        }

        let previous = self.positions.texel(x as i32, y as i32 - 1).truncate();
        let next = self.positions.texel(x as i32, y as i32 + 1).truncate();
        let variation = self.randoms.texel(x as i32, 0).z;
        let stiffness = self.stiffness * (1.0 - self.stiffness_variation * variation);

        position
            .lerp((previous + next) * 0.5, stiffness)
            .extend(0.0)
    }
}

/// Keep bristles on or above the canvas.
pub struct PlaneConstraint<'a> {
    pub positions: &'a Texture,
}

impl<'a> Kernel for PlaneConstraint<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let mut position = self.positions.texel(x as i32, y as i32).truncate();
        position.z = position.z.max(0.0);
        position.extend(0.0)
    }
}

pub struct UpdateVelocity<'a> {
    pub positions: &'a Texture,
    pub projected: &'a Texture,
    pub timestep: f32,
}

impl<'a> Kernel for UpdateVelocity<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let position = self.positions.texel(x as i32, y as i32).truncate();
        let projected = self.projected.texel(x as i32, y as i32).truncate();

        ((projected - position) / self.timestep)
            .clamp_length_max(MAX_BRISTLE_SPEED)
            .extend(0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::{Context, Pass, Region};
    use approx::assert_relative_eq;

    fn chain(context: &Context, points: &[Vec3]) -> Texture {
        let data: Vec<f32> = points.iter().flat_map(|p| p.extend(0.0).to_array()).collect();
        context
            .create_texture("positions", 1, points.len() as u32)
            .unwrap()
            .with_f32_data(&data)
            .unwrap()
    }

    #[test]
    fn distance_pass_fixes_root_segment() {
        let context = Context::default();
        let positions = chain(
            &context,
            &[Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 4.0)],
        );
        let mut output = context.create_texture("projected", 1, 2).unwrap();

        let kernel = DistanceConstraint {
            positions: &positions,
            pass: 0,
            target_distance: 2.0,
            vertices_per_bristle: 2,
        };
        context.run(&Pass::new("distance", &kernel), &mut output);

        assert_relative_eq!(output.texel(0, 0).z, 10.0);
        assert_relative_eq!(output.texel(0, 1).z, 8.0);
    }

    #[test]
    fn distance_pass_splits_free_segments() {
        let context = Context::default();
        let positions = chain(
            &context,
            &[
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(5.0, 0.0, 0.0),
            ],
        );
        let mut output = context.create_texture("projected", 1, 3).unwrap();

        let kernel = DistanceConstraint {
            positions: &positions,
            pass: 1,
            target_distance: 2.0,
            vertices_per_bristle: 3,
        };
        context.run(&Pass::new("distance", &kernel), &mut output);

        assert_relative_eq!(output.texel(0, 0).x, 0.0);
        assert_relative_eq!(output.texel(0, 1).x, 2.0);
        assert_relative_eq!(output.texel(0, 2).x, 4.0);
    }

    #[test]
    fn bending_straightens_the_middle_vertex() {
        let context = Context::default();
        let positions = chain(
            &context,
            &[
                Vec3::ZERO,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
        );
        let randoms = context.create_texture("randoms", 1, 3).unwrap();
        let mut output = context.create_texture("projected", 1, 3).unwrap();

        let kernel = BendingConstraint {
            positions: &positions,
            randoms: &randoms,
            pass: 1,
            stiffness: 0.5,
            stiffness_variation: 0.3,
            vertices_per_bristle: 3,
        };
        context.run(
            &Pass::new("bending", &kernel).viewport(Region::new(0, 0, 1, 3)),
            &mut output,
        );

        assert_relative_eq!(output.texel(0, 1).y, 0.5);
        assert_relative_eq!(output.texel(0, 2).x, 2.0);
    }

    #[test]
    fn plane_lifts_vertices_to_the_canvas() {
        let context = Context::default();
        let positions = chain(&context, &[Vec3::new(3.0, 4.0, -2.0)]);
        let mut output = context.create_texture("projected", 1, 1).unwrap();

        context.run(
            &Pass::new("plane", &PlaneConstraint { positions: &positions }),
            &mut output,
        );

        assert_eq!(output.texel(0, 0), Vec4::new(3.0, 4.0, 0.0, 0.0));
    }
}
