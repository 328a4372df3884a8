//! The compute-pass executor the brush and fluid solvers are built on.
//!
//! Every simulation step is a [`Pass`]: a kernel shaded over a viewport of a
//! target texture. Kernels are plain values that hold the textures and
//! parameters they read, so a pass carries all of its state with it. Splats
//! are drawn as instanced quads blended onto their target.

mod raster;
mod region;
mod texture;

pub use raster::{QuadInstance, QuadShader};
pub use region::Region;
pub use texture::{DoubleTexture, Texel, Texture};

use glam::{Vec2, Vec4};
use std::cell::RefCell;
use thiserror::Error;

type Result<T> = std::result::Result<T, Problem>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Problem {
    #[error("Cannot allocate {label} at {width}x{height}: the maximum texture size is {max}")]
    TextureTooLarge {
        label: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("Cannot allocate {label} with an empty size of {width}x{height}")]
    EmptyTexture {
        label: &'static str,
        width: u32,
        height: u32,
    },

    #[error("Unexpected texture size. Expected: {expected:?}. Actual: {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Unexpected data size. Expected: {expected:?}. Actual: {actual:?}")]
    WrongDataLength { expected: usize, actual: usize },
}

/// Produces one texel of a pass.
pub trait Kernel {
    fn shade(&self, x: u32, y: u32) -> Vec4;
}

/// How quads are composited onto their target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// Colour is composited over the destination; coverage accumulates.
    Over,

    /// Colour channels are summed. Alpha is cleared.
    Add,
}

impl Blend {
    pub fn apply(self, source: Vec4, destination: Vec4) -> Vec4 {
        match self {
            Blend::Over => {
                let alpha = source.w;
                let color = source.truncate() * alpha + destination.truncate() * (1.0 - alpha);
                color.extend(source.w + destination.w)
            }
            Blend::Add => (source.truncate() + destination.truncate()).extend(0.0),
        }
    }
}

pub struct Pass<'a> {
    label: &'static str,
    kernel: &'a dyn Kernel,
    viewport: Option<Region>,
}

impl<'a> Pass<'a> {
    pub fn new(label: &'static str, kernel: &'a dyn Kernel) -> Self {
        Self {
            label,
            kernel,
            viewport: None,
        }
    }

    /// Restrict the pass to `region`. Without one, the whole target is shaded.
    pub fn viewport(mut self, region: Region) -> Self {
        self.viewport = Some(region);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_texture_size: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_texture_size: 8192,
        }
    }
}

#[derive(Debug, Default)]
pub struct Context {
    limits: Limits,
    recording: Option<RefCell<Vec<&'static str>>>,
}

impl Context {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            recording: None,
        }
    }

    /// A context that remembers the label of every pass it runs.
    pub fn recording(limits: Limits) -> Self {
        Self {
            limits,
            recording: Some(RefCell::new(Vec::new())),
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Labels of the passes run so far, oldest first.
    pub fn recorded_passes(&self) -> Vec<&'static str> {
        self.recording
            .as_ref()
            .map(|passes| passes.borrow().clone())
            .unwrap_or_default()
    }

    fn record(&self, label: &'static str) {
        if let Some(passes) = &self.recording {
            passes.borrow_mut().push(label);
        }
    }

    fn check_size(&self, label: &'static str, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Problem::EmptyTexture {
                label,
                width,
                height,
            });
        }

        let max = self.limits.max_texture_size;
        if width > max || height > max {
            return Err(Problem::TextureTooLarge {
                label,
                width,
                height,
                max,
            });
        }

        Ok(())
    }

    pub fn create_texture(&self, label: &'static str, width: u32, height: u32) -> Result<Texture> {
        self.check_size(label, width, height)?;
        Ok(Texture::new(width, height))
    }

    pub fn create_double_texture(
        &self,
        label: &'static str,
        width: u32,
        height: u32,
    ) -> Result<DoubleTexture> {
        self.check_size(label, width, height)?;
        Ok(DoubleTexture::new(width, height))
    }

    /// Shade every texel of the pass viewport into `target`, replacing what
    /// was there. Texels outside the viewport are left untouched; an empty
    /// viewport does nothing.
    pub fn run(&self, pass: &Pass<'_>, target: &mut Texture) {
        let region = match pass.viewport {
            Some(viewport) => viewport.intersect(&target.bounds()),
            None => target.bounds(),
        };

        if region.is_empty() {
            return;
        }

        log::trace!("Running {} over {:?}", pass.label, region);
        self.record(pass.label);

        for (x, y) in region.texels() {
            target.set_texel(x, y, pass.kernel.shade(x, y));
        }
    }

    /// Rasterize a batch of quads into `target`, clipped to `scissor`. A texel
    /// is covered when its centre falls inside a quad.
    pub fn draw_quads(
        &self,
        label: &'static str,
        instances: &[QuadInstance],
        shader: &dyn QuadShader,
        scissor: Region,
        blend: Blend,
        target: &mut Texture,
    ) {
        let scissor = scissor.intersect(&target.bounds());
        if scissor.is_empty() || instances.is_empty() {
            return;
        }

        log::trace!("Drawing {} {} quads in {:?}", instances.len(), label, scissor);
        self.record(label);

        let min = Vec2::new(scissor.x as f32, scissor.y as f32);
        let max = Vec2::new(scissor.right() as f32, scissor.top() as f32);

        for instance in instances {
            if !(instance.radius > 0.0) || !instance.center.is_finite() {
                continue;
            }

            let low = (instance.center - instance.radius - 0.5).ceil().max(min);
            let high = (instance.center + instance.radius - 0.5).floor().min(max - 1.0);
            if low.x > high.x || low.y > high.y {
                continue;
            }

            for y in low.y as u32..=high.y as u32 {
                for x in low.x as u32..=high.x as u32 {
                    let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let local = (center - instance.center) / instance.radius;
                    if let Some(source) = shader.shade(instance, local) {
                        let destination = target.texel(x as i32, y as i32);
                        target.set_texel(x, y, blend.apply(source, destination));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    struct Constant(Vec4);

    impl Kernel for Constant {
        fn shade(&self, _x: u32, _y: u32) -> Vec4 {
            self.0
        }
    }

    struct Disc;

    impl QuadShader for Disc {
        fn shade(&self, _instance: &QuadInstance, local: Vec2) -> Option<Vec4> {
            (local.length() < 1.0).then_some(Vec4::new(1.0, 0.0, 0.0, 0.5))
        }
    }

    #[test]
    fn pass_only_touches_its_viewport() {
        let context = Context::default();
        let mut target = context.create_texture("target", 4, 4).unwrap();
        let kernel = Constant(Vec4::ONE);

        context.run(
            &Pass::new("fill", &kernel).viewport(Region::new(1, 1, 2, 1)),
            &mut target,
        );

        assert_eq!(target.texel(1, 1), Vec4::ONE);
        assert_eq!(target.texel(2, 1), Vec4::ONE);
        assert_eq!(target.texel(3, 1), Vec4::ZERO);
        assert_eq!(target.texel(1, 2), Vec4::ZERO);
        assert_eq!(target.total(target.bounds()), Vec4::splat(2.0));
    }

    #[test]
    fn empty_viewport_is_a_no_op() {
        let context = Context::recording(Limits::default());
        let mut target = context.create_texture("target", 4, 4).unwrap();
        let kernel = Constant(Vec4::ONE);

        context.run(
            &Pass::new("nothing", &kernel).viewport(Region::new(2, 2, 0, 5)),
            &mut target,
        );
        context.run(
            &Pass::new("outside", &kernel).viewport(Region::new(10, 10, 5, 5)),
            &mut target,
        );

        assert_eq!(target.total(target.bounds()), Vec4::ZERO);
        assert!(context.recorded_passes().is_empty());
    }

    #[test]
    fn over_blend_composites_colour_and_sums_coverage() {
        let result = Blend::Over.apply(
            Vec4::new(1.0, 0.0, 0.0, 0.25),
            Vec4::new(0.0, 1.0, 0.0, 0.5),
        );
        assert_relative_eq!(result.x, 0.25);
        assert_relative_eq!(result.y, 0.75);
        assert_relative_eq!(result.w, 0.75);
    }

    #[test]
    fn quads_are_clipped_by_the_scissor() {
        let context = Context::default();
        let mut target = context.create_texture("target", 8, 8).unwrap();
        let quad = QuadInstance {
            center: Vec2::new(4.0, 4.0),
            radius: 2.0,
            index: 0,
        };

        context.draw_quads(
            "disc",
            &[quad],
            &Disc,
            Region::new(0, 0, 4, 8),
            Blend::Over,
            &mut target,
        );

        assert!(target.texel(3, 3).w > 0.0);
        assert!(target.texel(3, 4).w > 0.0);
        assert_eq!(target.texel(4, 4), Vec4::ZERO);
        assert_eq!(target.texel(0, 0), Vec4::ZERO);
    }

    #[test]
    fn refuses_textures_over_the_limit() {
        let context = Context::new(Limits {
            max_texture_size: 64,
        });
        assert!(matches!(
            context.create_texture("paint", 65, 10),
            Err(Problem::TextureTooLarge { max: 64, .. })
        ));
        assert!(matches!(
            context.create_double_texture("paint", 0, 10),
            Err(Problem::EmptyTexture { .. })
        ));
        assert!(context.create_texture("paint", 64, 64).is_ok());
    }
}
