// Fluid kernels. Positions are in texel space and velocities in texels per
// second; neighbours are read with clamp-to-edge addressing.

use crate::render::{Kernel, Region, Texture};
use glam::{Vec2, Vec4};

fn texel_center(x: u32, y: u32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

fn velocity_at(velocity: &Texture, x: i32, y: i32) -> Vec2 {
    let texel = velocity.texel(x, y);
    Vec2::new(texel.x, texel.y)
}

/// Semi-Lagrangian advection: trace each texel back along the velocity and
/// sample the input there. Samples never leave `bounds`.
pub struct Advect<'a> {
    pub velocity: &'a Texture,
    pub input: &'a Texture,
    pub timestep: f32,
    pub dissipation: f32,
    pub bounds: Region,
}

impl<'a> Kernel for Advect<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let min = Vec2::new(self.bounds.x as f32, self.bounds.y as f32) + 0.5;
        let max = Vec2::new(self.bounds.right() as f32, self.bounds.top() as f32) - 0.5;

        let velocity = velocity_at(self.velocity, x as i32, y as i32);
        let origin = texel_center(x, y) - velocity * self.timestep;
        let origin = if origin.is_finite() {
            origin.max(min).min(max)
        } else {
            texel_center(x, y)
        };

        self.input.sample(origin) * self.dissipation
    }
}

pub struct Divergence<'a> {
    pub velocity: &'a Texture,
}

impl<'a> Kernel for Divergence<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let (x, y) = (x as i32, y as i32);
        let left = velocity_at(self.velocity, x - 1, y).x;
        let right = velocity_at(self.velocity, x + 1, y).x;
        let bottom = velocity_at(self.velocity, x, y - 1).y;
        let top = velocity_at(self.velocity, x, y + 1).y;

        Vec4::new(0.5 * ((right - left) + (top - bottom)), 0.0, 0.0, 0.0)
    }
}

/// One Jacobi iteration of the pressure Poisson equation.
pub struct Jacobi<'a> {
    pub pressure: &'a Texture,
    pub divergence: &'a Texture,
}

impl<'a> Kernel for Jacobi<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let (x, y) = (x as i32, y as i32);
        let neighbours = self.pressure.texel(x - 1, y).x
            + self.pressure.texel(x + 1, y).x
            + self.pressure.texel(x, y - 1).x
            + self.pressure.texel(x, y + 1).x;
        let divergence = self.divergence.texel(x, y).x;

        Vec4::new(0.25 * (neighbours - divergence), 0.0, 0.0, 0.0)
    }
}

pub struct SubtractGradient<'a> {
    pub velocity: &'a Texture,
    pub pressure: &'a Texture,
}

impl<'a> Kernel for SubtractGradient<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let (x, y) = (x as i32, y as i32);
        let gradient = 0.5
            * Vec2::new(
                self.pressure.texel(x + 1, y).x - self.pressure.texel(x - 1, y).x,
                self.pressure.texel(x, y + 1).x - self.pressure.texel(x, y - 1).x,
            );
        let velocity = self.velocity.texel(x, y);

        Vec4::new(
            velocity.x - gradient.x,
            velocity.y - gradient.y,
            velocity.z,
            velocity.w,
        )
    }
}

/// Bilinear stretch of `source` over the whole target.
pub struct Stretch<'a> {
    pub source: &'a Texture,
    pub target_size: Vec2,
}

impl<'a> Kernel for Stretch<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let source_size = Vec2::new(self.source.width() as f32, self.source.height() as f32);
        self.source
            .sample(texel_center(x, y) * source_size / self.target_size)
    }
}

/// Move the old paint by `offset` texels into a differently sized texture.
/// Where old paint borders newly exposed canvas it fades out over `feather`
/// texels.
pub struct Resize<'a> {
    pub paint: &'a Texture,
    pub offset: Vec2,
    pub feather: f32,
    pub new_size: Vec2,
}

impl<'a> Kernel for Resize<'a> {
    fn shade(&self, x: u32, y: u32) -> Vec4 {
        let old_size = Vec2::new(self.paint.width() as f32, self.paint.height() as f32);
        let position = texel_center(x, y) - self.offset;

        if position.x < 0.0
            || position.y < 0.0
            || position.x > old_size.x
            || position.y > old_size.y
        {
            return Vec4::ZERO;
        }

        let mut factor: f32 = 1.0;
        if self.feather > 0.0 {
            let far_corner = self.offset + old_size;
            if self.offset.x > 0.0 {
                factor = factor.min(position.x / self.feather);
            }
            if self.offset.y > 0.0 {
                factor = factor.min(position.y / self.feather);
            }
            if far_corner.x < self.new_size.x {
                factor = factor.min((old_size.x - position.x) / self.feather);
            }
            if far_corner.y < self.new_size.y {
                factor = factor.min((old_size.y - position.y) / self.feather);
            }
        }

        self.paint.sample(position) * factor.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::{Context, Pass};
    use approx::assert_relative_eq;

    fn uniform_velocity(context: &Context, size: u32, velocity: Vec2) -> Texture {
        let data: Vec<f32> = (0..size * size)
            .flat_map(|_| [velocity.x, velocity.y, 0.0, 0.0])
            .collect();
        context
            .create_texture("velocity", size, size)
            .unwrap()
            .with_f32_data(&data)
            .unwrap()
    }

    #[test]
    fn uniform_flow_has_no_divergence() {
        let context = Context::default();
        let velocity = uniform_velocity(&context, 8, Vec2::new(3.0, -1.0));
        let mut divergence = context.create_texture("divergence", 8, 8).unwrap();

        context.run(
            &Pass::new("divergence", &Divergence { velocity: &velocity }),
            &mut divergence,
        );

        assert_relative_eq!(divergence.total(divergence.bounds()).x, 0.0);
    }

    #[test]
    fn advection_without_velocity_is_identity() {
        let context = Context::default();
        let velocity = uniform_velocity(&context, 6, Vec2::ZERO);
        let mut paint = context.create_texture("paint", 6, 6).unwrap();
        paint.set_texel(2, 3, Vec4::new(0.2, 0.4, 0.1, 0.5));
        let mut output = context.create_texture("paint", 6, 6).unwrap();

        let advect = Advect {
            velocity: &velocity,
            input: &paint,
            timestep: 1.0 / 60.0,
            dissipation: 1.0,
            bounds: paint.bounds(),
        };
        context.run(&Pass::new("advect", &advect), &mut output);

        assert_eq!(output, paint);
    }

    #[test]
    fn advection_moves_paint_along_the_flow() {
        let context = Context::default();
        let velocity = uniform_velocity(&context, 8, Vec2::new(60.0, 0.0));
        let mut paint = context.create_texture("paint", 8, 8).unwrap();
        paint.set_texel(3, 4, Vec4::ONE);
        let mut output = context.create_texture("paint", 8, 8).unwrap();

        let advect = Advect {
            velocity: &velocity,
            input: &paint,
            timestep: 1.0 / 60.0,
            dissipation: 1.0,
            bounds: paint.bounds(),
        };
        context.run(&Pass::new("advect", &advect), &mut output);

        assert_relative_eq!(output.texel(4, 4).w, 1.0, epsilon = 1e-5);
        assert_relative_eq!(output.texel(3, 4).w, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn jacobi_averages_neighbours() {
        let context = Context::default();
        let mut pressure = context.create_texture("pressure", 3, 3).unwrap();
        pressure.set_texel(0, 1, Vec4::new(4.0, 0.0, 0.0, 0.0));
        pressure.set_texel(2, 1, Vec4::new(8.0, 0.0, 0.0, 0.0));
        let mut divergence = context.create_texture("divergence", 3, 3).unwrap();
        divergence.set_texel(1, 1, Vec4::new(2.0, 0.0, 0.0, 0.0));
        let mut output = context.create_texture("pressure", 3, 3).unwrap();

        let jacobi = Jacobi {
            pressure: &pressure,
            divergence: &divergence,
        };
        context.run(
            &Pass::new("jacobi", &jacobi).viewport(Region::new(1, 1, 1, 1)),
            &mut output,
        );

        assert_relative_eq!(output.texel(1, 1).x, 2.5);
    }

    #[test]
    fn stretch_preserves_flat_colour() {
        let context = Context::default();
        let data: Vec<f32> = (0..16).flat_map(|_| [0.3, 0.2, 0.1, 0.6]).collect();
        let source = context
            .create_texture("paint", 4, 4)
            .unwrap()
            .with_f32_data(&data)
            .unwrap();
        let mut target = context.create_texture("paint", 7, 5).unwrap();

        let stretch = Stretch {
            source: &source,
            target_size: Vec2::new(7.0, 5.0),
        };
        context.run(&Pass::new("stretch", &stretch), &mut target);

        for (x, y) in target.bounds().texels() {
            assert_relative_eq!(target.texel(x as i32, y as i32).w, 0.6, epsilon = 1e-6);
        }
    }
}
