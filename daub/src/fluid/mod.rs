mod area;
mod kernels;
mod splat;

pub use area::{SplatArea, SplatAreas};
pub use splat::{SplatParameters, MAX_SPLAT_VELOCITY};

use crate::brush::Brush;
use crate::rectangle::Rectangle;
use crate::render::{Blend, Context, DoubleTexture, Pass, Problem, Region, Texture};
use crate::settings::Settings;
use kernels::*;
use splat::{PaintSplat, SplatGeometry, VelocitySplat};

use glam::{Vec2, Vec4};

/// Wet paint on a grid of texels, pushed around by the brush.
///
/// Paint is premultiplied colour with coverage in alpha. Only the texels
/// touched by recent splats are simulated; everything else stays put.
pub struct Simulator {
    width: u32,
    height: u32,

    fluidity: f32,
    timestep: f32,
    pressure_iterations: u32,
    splat_padding: f32,
    speed_padding: f32,
    splats_per_segment: u32,

    frame_number: u64,
    splat_areas: SplatAreas,

    paint: DoubleTexture,
    velocity: DoubleTexture,
    divergence: Texture,
    pressure: DoubleTexture,
}

struct Fields {
    paint: DoubleTexture,
    velocity: DoubleTexture,
    divergence: Texture,
    pressure: DoubleTexture,
}

impl Fields {
    fn new(context: &Context, width: u32, height: u32) -> Result<Self, Problem> {
        Ok(Self {
            paint: context.create_double_texture("paint", width, height)?,
            velocity: context.create_double_texture("velocity", width, height)?,
            divergence: context.create_texture("divergence", width, height)?,
            pressure: context.create_double_texture("pressure", width, height)?,
        })
    }
}

impl Simulator {
    pub fn new(
        context: &Context,
        width: u32,
        height: u32,
        settings: &Settings,
    ) -> Result<Self, Problem> {
        let Fields {
            paint,
            velocity,
            divergence,
            pressure,
        } = Fields::new(context, width, height)?;

        log::debug!("💧 Fluid simulation at {}x{}", width, height);

        Ok(Self {
            width,
            height,

            fluidity: settings.fluidity.clamp(0.0, 1.0),
            timestep: settings.fluid_timestep,
            pressure_iterations: settings.pressure_iterations,
            splat_padding: settings.splat_padding,
            speed_padding: settings.speed_padding,
            splats_per_segment: settings.brush.splats_per_segment,

            frame_number: 0,
            splat_areas: SplatAreas::new(settings.frames_to_simulate),

            paint,
            velocity,
            divergence,
            pressure,
        })
    }

    pub fn update(&mut self, settings: &Settings) {
        self.set_fluidity(settings.fluidity);
        self.timestep = settings.fluid_timestep;
        self.pressure_iterations = settings.pressure_iterations;
        self.splat_padding = settings.splat_padding;
        self.speed_padding = settings.speed_padding;
        self.splats_per_segment = settings.brush.splats_per_segment;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    pub fn fluidity(&self) -> f32 {
        self.fluidity
    }

    /// How much velocity survives each step, between 0 and 1.
    pub fn set_fluidity(&mut self, fluidity: f32) {
        self.fluidity = if fluidity.is_finite() {
            fluidity.clamp(0.0, 1.0)
        } else {
            self.fluidity
        };
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn splat_areas(&self) -> &SplatAreas {
        &self.splat_areas
    }

    /// The texels the next simulation step will touch.
    pub fn simulation_area(&self) -> Region {
        self.splat_areas.active_region(self.bounds())
    }

    pub fn paint_texture(&self) -> &Texture {
        self.paint.current()
    }

    pub fn velocity_texture(&self) -> &Texture {
        self.velocity.current()
    }

    pub fn divergence_texture(&self) -> &Texture {
        &self.divergence
    }

    pub fn pressure_texture(&self) -> &Texture {
        self.pressure.current()
    }

    pub fn clear(&mut self) {
        self.paint.zero_out();
    }

    /// Copy the paint out, resizing `destination` to match.
    pub fn copy_paint_texture(&self, destination: &mut Texture) {
        destination.copy_from(self.paint.current());
    }

    /// Replace the paint with `source` and bring the fluid to rest.
    pub fn apply_paint_texture(&mut self, source: &Texture) -> Result<(), Problem> {
        let actual = (source.width(), source.height());
        if actual != (self.width, self.height) {
            return Err(Problem::SizeMismatch {
                expected: (self.width, self.height),
                actual,
            });
        }

        self.paint.current_mut().copy_from(source);
        self.paint.sync_all();
        self.velocity.zero_out();
        self.splat_areas.clear();
        Ok(())
    }

    /// Deposit paint and velocity from the bristles touching the canvas.
    pub fn splat(&mut self, context: &Context, brush: &Brush, parameters: &SplatParameters) {
        let painting = &parameters.painting_rectangle;
        if painting.is_empty() {
            log::warn!("Skipping splat onto an empty painting {:?}", painting);
            return;
        }

        let position = brush.position();
        let padding = (brush.scale() * self.splat_padding).ceil()
            + (brush.filtered_speed() * self.speed_padding).ceil();
        let area = Rectangle::new(
            position.x - padding,
            position.y - padding,
            2.0 * padding,
            2.0 * padding,
        )
        .translate(-painting.left, -painting.bottom)
        .scale(
            self.width as f32 / painting.width,
            self.height as f32 / painting.height,
        )
        .to_region(self.bounds());

        self.splat_areas.push(area, self.frame_number);

        let scissor = self.simulation_area();
        if scissor.is_empty() {
            return;
        }

        let geometry = SplatGeometry::from_brush(
            brush,
            parameters,
            Vec2::new(self.width as f32, self.height as f32),
            self.splats_per_segment,
        );

        context.draw_quads(
            "fluid::splat_paint",
            &geometry.instances,
            &PaintSplat {
                color: Vec4::from_array(parameters.color),
            },
            scissor,
            Blend::Over,
            self.paint.current_mut(),
        );

        context.draw_quads(
            "fluid::splat_velocity",
            &geometry.instances,
            &VelocitySplat {
                velocities: &geometry.velocities,
            },
            scissor,
            Blend::Add,
            self.velocity.current_mut(),
        );
    }

    /// Run one step over the active region. Returns `false`, doing nothing,
    /// once every splat has expired.
    pub fn simulate(&mut self, context: &Context) -> bool {
        if self.splat_areas.is_empty() {
            return false;
        }

        let area = self.simulation_area();
        if !area.is_empty() {
            self.step(context, area);
        }

        self.frame_number += 1;
        self.splat_areas.expire(self.frame_number);

        if self.splat_areas.is_empty() {
            log::debug!("Fluid at rest after frame {}", self.frame_number);
            self.velocity.zero_out();
        }

        true
    }

    fn step(&mut self, context: &Context, area: Region) {
        {
            let divergence = Divergence {
                velocity: self.velocity.current(),
            };
            context.run(
                &Pass::new("fluid::divergence", &divergence).viewport(area),
                &mut self.divergence,
            );
        }

        let cleared = area.expand(1).intersect(&self.bounds());
        self.pressure.zero_region(cleared);
        for _ in 0..self.pressure_iterations {
            let (pressure, next) = self.pressure.split();
            let jacobi = Jacobi {
                pressure,
                divergence: &self.divergence,
            };
            context.run(&Pass::new("fluid::jacobi", &jacobi).viewport(area), next);
            self.pressure.swap();
        }

        {
            let (velocity, next) = self.velocity.split();
            let subtract_gradient = SubtractGradient {
                velocity,
                pressure: self.pressure.current(),
            };
            context.run(
                &Pass::new("fluid::subtract_gradient", &subtract_gradient).viewport(area),
                next,
            );
        }
        self.velocity.swap();
        self.velocity.sync(area);

        {
            let (paint, next) = self.paint.split();
            let advect_paint = Advect {
                velocity: self.velocity.current(),
                input: paint,
                timestep: self.timestep,
                dissipation: 1.0,
                bounds: area,
            };
            context.run(
                &Pass::new("fluid::advect_paint", &advect_paint).viewport(area),
                next,
            );
        }
        self.paint.swap();
        self.paint.sync(area);

        {
            let (velocity, next) = self.velocity.split();
            let advect_velocity = Advect {
                velocity,
                input: velocity,
                timestep: self.timestep,
                dissipation: self.fluidity,
                bounds: area,
            };
            context.run(
                &Pass::new("fluid::advect_velocity", &advect_velocity).viewport(area),
                next,
            );
        }
        self.velocity.swap();
        self.velocity.sync(area);
    }

    /// Change the canvas size, keeping paint at the same texels shifted by
    /// `offset`. Paint bordering new canvas fades out over `feather` texels.
    pub fn resize(
        &mut self,
        context: &Context,
        width: u32,
        height: u32,
        offset_x: f32,
        offset_y: f32,
        feather: f32,
    ) -> Result<(), Problem> {
        let mut fields = Fields::new(context, width, height)?;

        {
            let resize = Resize {
                paint: self.paint.current(),
                offset: Vec2::new(offset_x, offset_y),
                feather,
                new_size: Vec2::new(width as f32, height as f32),
            };
            context.run(
                &Pass::new("fluid::resize", &resize),
                fields.paint.current_mut(),
            );
        }
        fields.paint.sync_all();

        log::debug!(
            "Resized fluid from {}x{} to {}x{} with offset ({}, {})",
            self.width,
            self.height,
            width,
            height,
            offset_x,
            offset_y
        );

        self.replace_fields(fields, width, height);
        Ok(())
    }

    /// Resample the paint to a new resolution of the same canvas.
    pub fn change_resolution(
        &mut self,
        context: &Context,
        width: u32,
        height: u32,
    ) -> Result<(), Problem> {
        let mut fields = Fields::new(context, width, height)?;

        {
            let stretch = Stretch {
                source: self.paint.current(),
                target_size: Vec2::new(width as f32, height as f32),
            };
            context.run(
                &Pass::new("fluid::change_resolution", &stretch),
                fields.paint.current_mut(),
            );
        }
        fields.paint.sync_all();

        log::debug!(
            "Changed fluid resolution from {}x{} to {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        self.replace_fields(fields, width, height);
        Ok(())
    }

    fn replace_fields(&mut self, fields: Fields, width: u32, height: u32) {
        self.paint = fields.paint;
        self.velocity = fields.velocity;
        self.divergence = fields.divergence;
        self.pressure = fields.pressure;
        self.width = width;
        self.height = height;
        self.splat_areas.clear();
    }
}
