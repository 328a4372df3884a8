mod kernels;

pub use kernels::MAX_BRISTLE_SPEED;

use crate::render::{Context, DoubleTexture, Pass, Problem, Region, Texture};
use crate::rng;
use crate::settings::BrushSettings;
use kernels::*;

use glam::Vec3;
use std::collections::VecDeque;

/// Anchor coordinates are clamped to this many world units.
pub const MAX_COORDINATE: f32 = 1.0e6;

/// A brush of hanging bristles, simulated with position-based dynamics.
///
/// Bristle state lives in textures of `max_bristle_count` columns and
/// `vertices_per_bristle` rows. Only the first `bristle_count` columns are
/// simulated.
pub struct Brush {
    settings: BrushSettings,
    max_bristle_count: u32,
    bristle_count: u32,
    vertices_per_bristle: u32,

    position: Vec3,
    scale: f32,
    speeds: VecDeque<f32>,

    randoms: Texture,
    // Current and previous states.
    positions: DoubleTexture,
    velocities: DoubleTexture,
    // Scratch space for the constraint solver.
    projected: DoubleTexture,
}

impl Brush {
    pub fn new(
        context: &Context,
        settings: &BrushSettings,
        seed: &Option<String>,
    ) -> Result<Self, Problem> {
        let width = settings.max_bristle_count;
        let height = settings.vertices_per_bristle;

        let mut rng = rng::from_seed(seed);
        let randoms = context
            .create_texture("bristle randoms", width, height)?
            .with_f32_data(&rng::texel_randoms(
                &mut rng,
                width as usize * height as usize,
            ))?;

        log::debug!("🖌 Brush with {} bristles of {} vertices", width, height);

        Ok(Self {
            settings: settings.clone(),
            max_bristle_count: width,
            bristle_count: width,
            vertices_per_bristle: height,

            position: Vec3::ZERO,
            scale: 1.0,
            speeds: VecDeque::from(vec![0.0; settings.speed_history.max(1)]),

            randoms,
            positions: context.create_double_texture("bristle positions", width, height)?,
            velocities: context.create_double_texture("bristle velocities", width, height)?,
            projected: context.create_double_texture("projected bristle positions", width, height)?,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bristle_count(&self) -> u32 {
        self.bristle_count
    }

    pub fn max_bristle_count(&self) -> u32 {
        self.max_bristle_count
    }

    pub fn vertices_per_bristle(&self) -> u32 {
        self.vertices_per_bristle
    }

    pub fn positions(&self) -> &Texture {
        self.positions.current()
    }

    pub fn previous_positions(&self) -> &Texture {
        self.positions.next()
    }

    pub fn velocities(&self) -> &Texture {
        self.velocities.current()
    }

    pub fn previous_velocities(&self) -> &Texture {
        self.velocities.next()
    }

    pub fn vertex_position(&self, bristle: u32, vertex: u32) -> Vec3 {
        self.positions
            .current()
            .texel(bristle as i32, vertex as i32)
            .truncate()
    }

    /// Rest distance between neighbouring vertices.
    pub fn segment_length(&self) -> f32 {
        self.rest_shape().segment_length()
    }

    /// Where the root of `bristle` is pinned for the current anchor.
    pub fn root_position(&self, bristle: u32) -> Vec3 {
        self.rest_shape().root_position(bristle)
    }

    /// The largest recent anchor speed, in world units per tick.
    pub fn filtered_speed(&self) -> f32 {
        self.speeds.iter().copied().fold(0.0, f32::max)
    }

    fn rest_shape(&self) -> SetBristles<'_> {
        SetBristles {
            randoms: &self.randoms,
            anchor: self.position,
            scale: self.scale,
            bristle_length: self.settings.bristle_length,
            jitter: self.settings.bristle_jitter,
            vertices_per_bristle: self.vertices_per_bristle,
        }
    }

    fn bristles(&self, first: u32, last: u32) -> Region {
        Region::new(
            first,
            0,
            last.saturating_sub(first),
            self.vertices_per_bristle,
        )
    }

    /// Put every bristle at rest under `position`, forgetting all motion.
    pub fn initialize(&mut self, context: &Context, position: Vec3, scale: f32) {
        self.position = sanitize_position(position, self.position);
        self.scale = sanitize_scale(scale, self.scale);
        self.speeds.iter_mut().for_each(|speed| *speed = 0.0);

        self.reset_bristles(context, 0, self.bristle_count);

        log::debug!(
            "Brush initialised at {:?} with scale {}",
            self.position,
            self.scale
        );
    }

    fn reset_bristles(&mut self, context: &Context, first: u32, last: u32) {
        let region = self.bristles(first, last);

        {
            let rest_shape = SetBristles {
                randoms: &self.randoms,
                anchor: self.position,
                scale: self.scale,
                bristle_length: self.settings.bristle_length,
                jitter: self.settings.bristle_jitter,
                vertices_per_bristle: self.vertices_per_bristle,
            };
            context.run(
                &Pass::new("brush::set_bristles", &rest_shape).viewport(region),
                self.positions.current_mut(),
            );
        }

        self.positions.sync(region);
        self.velocities.zero_region(region);
    }

    /// Change how many bristles are simulated. New bristles start at rest;
    /// existing ones keep their state.
    pub fn set_bristle_count(&mut self, context: &Context, count: u32) {
        let count = if count > self.max_bristle_count {
            log::warn!(
                "Clamping bristle count {} to {}",
                count,
                self.max_bristle_count
            );
            self.max_bristle_count
        } else {
            count
        };

        if count > self.bristle_count {
            self.reset_bristles(context, self.bristle_count, count);
        }

        self.bristle_count = count;
    }

    /// Advance the bristles one tick towards the new anchor.
    pub fn update(&mut self, context: &Context, position: Vec3, scale: f32) {
        let position = sanitize_position(position, self.position);
        let speed = (position - self.position).length();
        self.speeds.pop_front();
        self.speeds.push_back(speed);

        self.position = position;
        self.scale = sanitize_scale(scale, self.scale);

        let settings = &self.settings;
        let timestep = settings.timestep;
        let vertices_per_bristle = self.vertices_per_bristle;
        let active = self.bristles(0, self.bristle_count);
        let roots = Region::new(0, 0, self.bristle_count, 1);

        if active.is_empty() {
            return;
        }

        let rest_shape = SetBristles {
            randoms: &self.randoms,
            anchor: self.position,
            scale: self.scale,
            bristle_length: settings.bristle_length,
            jitter: settings.bristle_jitter,
            vertices_per_bristle,
        };
        let target_distance = rest_shape.segment_length();

        {
            let project = Project {
                positions: self.positions.current(),
                velocities: self.velocities.current(),
                damping: settings.damping,
                gravity: settings.gravity,
                timestep,
            };
            context.run(
                &Pass::new("brush::project", &project).viewport(active),
                self.projected.current_mut(),
            );
        }

        let pin_roots = Pass::new("brush::set_bases", &rest_shape).viewport(roots);
        context.run(&pin_roots, self.projected.current_mut());

        for _ in 0..settings.iterations {
            context.run(&pin_roots, self.projected.current_mut());

            for pass in 0..2 {
                let (positions, next) = self.projected.split();
                let distance = DistanceConstraint {
                    positions,
                    pass,
                    target_distance,
                    vertices_per_bristle,
                };
                context.run(
                    &Pass::new("brush::distance_constraint", &distance).viewport(active),
                    next,
                );
                self.projected.swap();
            }

            for pass in 0..3 {
                let (positions, next) = self.projected.split();
                let bending = BendingConstraint {
                    positions,
                    randoms: &self.randoms,
                    pass,
                    stiffness: settings.bending_stiffness,
                    stiffness_variation: settings.stiffness_variation,
                    vertices_per_bristle,
                };
                context.run(
                    &Pass::new("brush::bending_constraint", &bending).viewport(active),
                    next,
                );
                self.projected.swap();
            }

            {
                let (positions, next) = self.projected.split();
                let plane = PlaneConstraint { positions };
                context.run(
                    &Pass::new("brush::plane_constraint", &plane).viewport(active),
                    next,
                );
                self.projected.swap();
            }
        }

        {
            let update_velocity = UpdateVelocity {
                positions: self.positions.current(),
                projected: self.projected.current(),
                timestep,
            };
            context.run(
                &Pass::new("brush::update_velocity", &update_velocity).viewport(active),
                self.velocities.next_mut(),
            );
        }
        self.velocities.swap();

        self.positions.rotate_in(self.projected.current_mut());
    }
}

fn sanitize_position(position: Vec3, fallback: Vec3) -> Vec3 {
    if !position.is_finite() {
        log::warn!("Ignoring non-finite brush position {:?}", position);
        return fallback;
    }

    position.clamp(Vec3::splat(-MAX_COORDINATE), Vec3::splat(MAX_COORDINATE))
}

fn sanitize_scale(scale: f32, fallback: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale.min(MAX_COORDINATE)
    } else {
        log::warn!("Ignoring brush scale {}", scale);
        fallback
    }
}
