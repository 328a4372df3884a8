use crate::brush::Brush;
use crate::fluid::{SplatParameters, Simulator};
use crate::history::{Dimensions, History, Snapshot};
use crate::rectangle::Rectangle;
use crate::render::{self, Context, Texture};
use crate::settings::Settings;

use glam::Vec3;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("No quality level {0}")]
    UnknownQuality(usize),

    #[error(transparent)]
    Render(#[from] render::Problem),
}

/// Everything the host tells the painting about the brush for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushInput {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub scale: f32,
    pub is_contacting: bool,
    /// Straight RGB colour, with the opacity control in alpha.
    pub color: [f32; 4],
    pub bristle_count: u32,
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn resolution(rectangle: &Rectangle, resolution_scale: f32) -> (u32, u32) {
    (
        (rectangle.width * resolution_scale).ceil().max(1.0) as u32,
        (rectangle.height * resolution_scale).ceil().max(1.0) as u32,
    )
}

/// A canvas of wet paint and the brush working it.
pub struct Painting {
    settings: Arc<Settings>,
    context: Context,

    painting_rectangle: Rectangle,
    quality: usize,
    resolution_scale: f32,

    brush: Brush,
    brush_initialized: bool,
    was_contacting: bool,

    simulator: Simulator,
    history: History,
    needs_redraw: bool,
}

impl Painting {
    pub fn new(
        context: Context,
        width: f32,
        height: f32,
        settings: &Arc<Settings>,
    ) -> Result<Painting, Problem> {
        log::info!("🎨 Initialising painting");

        settings.validate().map_err(Problem::InvalidSettings)?;

        let painting_rectangle = Rectangle::new(0.0, 0.0, width, height);
        let quality = settings.initial_quality;
        let resolution_scale = settings.qualities[quality].resolution_scale;
        let (resolution_width, resolution_height) =
            resolution(&painting_rectangle, resolution_scale);

        log::info!("📐 Painting size: {}x{}", width, height);
        log::info!(
            "📏 Simulation size: {}x{} ({})",
            resolution_width,
            resolution_height,
            settings.qualities[quality].name
        );

        let brush = Brush::new(&context, &settings.brush, &settings.seed)?;
        let simulator = Simulator::new(&context, resolution_width, resolution_height, settings)?;

        Ok(Painting {
            settings: Arc::clone(settings),
            context,

            painting_rectangle,
            quality,
            resolution_scale,

            brush,
            brush_initialized: false,
            was_contacting: false,

            simulator,
            history: History::new(settings.history_size),
            needs_redraw: true,
        })
    }

    /// The largest painting extent the device can simulate at every quality.
    pub fn max_painting_size(context: &Context, settings: &Settings) -> f32 {
        let device_limit =
            context.limits().max_texture_size as f32 / settings.highest_resolution_scale();
        settings.max_painting_size.min(device_limit.floor())
    }

    pub fn update(&mut self, settings: &Arc<Settings>) -> Result<(), Problem> {
        settings.validate().map_err(Problem::InvalidSettings)?;
        self.settings = Arc::clone(settings);
        self.simulator.update(&self.settings);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn paint_texture(&self) -> &Texture {
        self.simulator.paint_texture()
    }

    pub fn painting_rectangle(&self) -> Rectangle {
        self.painting_rectangle
    }

    pub fn resolution_scale(&self) -> f32 {
        self.resolution_scale
    }

    pub fn quality(&self) -> usize {
        self.quality
    }

    /// How high above the canvas the brush anchor hovers at `scale`.
    pub fn brush_height(&self, scale: f32) -> f32 {
        self.settings.brush.height * scale
    }

    /// Whether the paint changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            painting_width: self.painting_rectangle.width,
            painting_height: self.painting_rectangle.height,
            resolution_scale: self.resolution_scale,
        }
    }

    fn splat_parameters(&self, input: &BrushInput) -> SplatParameters {
        let brush = &self.settings.brush;
        let splat = &self.settings.splat;

        let bristle_range = brush.max_bristle_count.saturating_sub(brush.min_bristle_count);
        let thickness = if bristle_range == 0 {
            0.0
        } else {
            self.brush.bristle_count().saturating_sub(brush.min_bristle_count) as f32
                / bristle_range as f32
        };

        let min_alpha = mix(splat.thin_alpha.min, splat.thick_alpha.min, thickness);
        let max_alpha = mix(splat.thin_alpha.max, splat.thick_alpha.max, thickness);
        let alpha = mix(min_alpha, max_alpha, input.color[3].clamp(0.0, 1.0));

        let scale = self.brush.scale();

        SplatParameters {
            z_threshold: splat.z_threshold * scale,
            painting_rectangle: self.painting_rectangle,
            color: [input.color[0], input.color[1], input.color[2], alpha],
            radius: splat.radius * scale,
            velocity_scale: splat.velocity_scale * alpha * self.resolution_scale,
        }
    }

    /// Map a position along a bristle count control, in `[0, 1]`, to a count.
    /// The mapping is quadratic so small brushes get finer control.
    pub fn bristle_count_for(&self, t: f32) -> u32 {
        let brush = &self.settings.brush;
        let t = t.clamp(0.0, 1.0);
        let range = brush.max_bristle_count.saturating_sub(brush.min_bristle_count) as f32;
        brush.min_bristle_count + (t * t * range).floor() as u32
    }

    /// Put the brush down at rest, hovering over `(x, y)`.
    pub fn place_brush(&mut self, x: f32, y: f32, scale: f32) {
        let scale = self.clamp_scale(scale);
        let height = self.brush_height(scale);
        self.brush
            .initialize(&self.context, Vec3::new(x, y, height), scale);
        self.brush_initialized = true;
    }

    /// Keep a brush scale within the configured range. Non-finite scales pass
    /// through for the brush to reject.
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        let brush = &self.settings.brush;
        if scale.is_finite() {
            scale.clamp(brush.min_scale, brush.max_scale)
        } else {
            scale
        }
    }

    /// Keep a new canvas within the size limits. The edges that moved give
    /// way, so a canvas dragged from its left or bottom keeps its right or
    /// top edge in place.
    pub fn clamp_rectangle(&self, rectangle: Rectangle) -> Rectangle {
        let max = Painting::max_painting_size(&self.context, &self.settings);
        let min = self.settings.min_painting_size.min(max);
        let width = rectangle.width.max(min).min(max);
        let height = rectangle.height.max(min).min(max);

        let left = if rectangle.left != self.painting_rectangle.left {
            rectangle.right() - width
        } else {
            rectangle.left
        };
        let bottom = if rectangle.bottom != self.painting_rectangle.bottom {
            rectangle.top() - height
        } else {
            rectangle.bottom
        };

        Rectangle::new(left, bottom, width, height)
    }

    /// Advance the brush and the paint by one frame. Returns whether the
    /// fluid was simulated.
    pub fn tick(&mut self, input: &BrushInput) -> bool {
        let settings = &self.settings.brush;
        let bristle_count = input
            .bristle_count
            .clamp(settings.min_bristle_count, settings.max_bristle_count);
        if bristle_count != self.brush.bristle_count() {
            self.brush.set_bristle_count(&self.context, bristle_count);
        }

        let anchor = Vec3::new(input.x, input.y, input.z);
        let scale = self.clamp_scale(input.scale);
        if self.brush_initialized {
            self.brush.update(&self.context, anchor, scale);
        } else {
            self.brush.initialize(&self.context, anchor, scale);
            self.brush_initialized = true;
        }

        if input.is_contacting {
            if !self.was_contacting {
                self.save_snapshot();
            }

            let parameters = self.splat_parameters(input);
            self.simulator
                .splat(&self.context, &self.brush, &parameters);
        }
        self.was_contacting = input.is_contacting;

        let simulated = self.simulator.simulate(&self.context);
        self.needs_redraw |= simulated;
        simulated
    }

    pub fn save_snapshot(&mut self) {
        let dimensions = self.dimensions();
        self.history.save(&self.simulator, dimensions);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<bool, Problem> {
        let dimensions = self.dimensions();
        match self.history.undo(&self.simulator, dimensions) {
            Some(snapshot) => {
                restore(
                    &self.context,
                    &mut self.simulator,
                    &mut self.painting_rectangle,
                    &mut self.resolution_scale,
                    snapshot,
                )?;
                self.restore_quality();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool, Problem> {
        match self.history.redo() {
            Some(snapshot) => {
                restore(
                    &self.context,
                    &mut self.simulator,
                    &mut self.painting_rectangle,
                    &mut self.resolution_scale,
                    snapshot,
                )?;
                self.restore_quality();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore_quality(&mut self) {
        if let Some(quality) = self
            .settings
            .qualities
            .iter()
            .position(|quality| quality.resolution_scale == self.resolution_scale)
        {
            self.quality = quality;
        }
        self.needs_redraw = true;
    }

    pub fn clear(&mut self) {
        self.save_snapshot();
        self.simulator.clear();
        self.needs_redraw = true;
    }

    /// Switch to another quality level, resampling the paint.
    pub fn set_quality(&mut self, quality: usize) -> Result<(), Problem> {
        let resolution_scale = self
            .settings
            .qualities
            .get(quality)
            .map(|quality| quality.resolution_scale)
            .ok_or(Problem::UnknownQuality(quality))?;

        let previous = self.simulator.paint_texture().clone();
        let dimensions = self.dimensions();

        let (width, height) = resolution(&self.painting_rectangle, resolution_scale);
        self.simulator
            .change_resolution(&self.context, width, height)?;
        self.history.save_texture(&previous, dimensions);

        log::info!(
            "📏 Simulation size: {}x{} ({})",
            width,
            height,
            self.settings.qualities[quality].name
        );

        self.quality = quality;
        self.resolution_scale = resolution_scale;
        self.needs_redraw = true;
        Ok(())
    }

    /// Move and resize the canvas in world space, within the size limits.
    /// Paint stays where it is in the world; uncovered canvas starts empty.
    pub fn resize(&mut self, rectangle: Rectangle) -> Result<(), Problem> {
        if !(rectangle.left.is_finite()
            && rectangle.bottom.is_finite()
            && rectangle.width.is_finite()
            && rectangle.height.is_finite())
        {
            log::warn!("Ignoring resize to {:?}", rectangle);
            return Ok(());
        }

        let rectangle = self.clamp_rectangle(rectangle);
        let previous = self.simulator.paint_texture().clone();
        let dimensions = self.dimensions();

        let (width, height) = resolution(&rectangle, self.resolution_scale);
        let offset_x = (self.painting_rectangle.left - rectangle.left) * self.resolution_scale;
        let offset_y =
            (self.painting_rectangle.bottom - rectangle.bottom) * self.resolution_scale;

        self.simulator.resize(
            &self.context,
            width,
            height,
            offset_x.round(),
            offset_y.round(),
            self.settings.resizing_feather_size,
        )?;
        self.history.save_texture(&previous, dimensions);

        log::debug!("📐 Painting size: {}x{}", rectangle.width, rectangle.height);

        self.painting_rectangle = rectangle;
        self.needs_redraw = true;
        Ok(())
    }

    /// Move the canvas in world space without touching the paint.
    pub fn move_to(&mut self, left: f32, bottom: f32) {
        self.painting_rectangle.left = left;
        self.painting_rectangle.bottom = bottom;
        self.needs_redraw = true;
    }
}

fn restore(
    context: &Context,
    simulator: &mut Simulator,
    painting_rectangle: &mut Rectangle,
    resolution_scale: &mut f32,
    snapshot: &Snapshot,
) -> Result<(), render::Problem> {
    let texture = snapshot.texture();
    if (texture.width(), texture.height()) != (simulator.width(), simulator.height()) {
        simulator.change_resolution(context, texture.width(), texture.height())?;
    }
    simulator.apply_paint_texture(texture)?;

    painting_rectangle.width = snapshot.painting_width();
    painting_rectangle.height = snapshot.painting_height();
    *resolution_scale = snapshot.resolution_scale();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::Limits;
    use approx::assert_relative_eq;

    fn painting(width: f32, height: f32) -> Painting {
        let settings = Arc::new(Settings {
            seed: Some("painting".to_string()),
            initial_quality: 0,
            ..Default::default()
        });
        Painting::new(Context::default(), width, height, &settings).unwrap()
    }

    fn stroke_input(x: f32, is_contacting: bool) -> BrushInput {
        BrushInput {
            x,
            y: 100.0,
            z: 2.0 * 20.0,
            scale: 20.0,
            is_contacting,
            color: [0.9, 0.3, 0.1, 1.0],
            bristle_count: 60,
        }
    }

    #[test]
    fn idle_ticks_do_nothing() {
        let mut painting = painting(300.0, 200.0);
        assert!(painting.take_redraw());

        assert!(!painting.tick(&stroke_input(100.0, false)));
        assert!(!painting.take_redraw());
    }

    #[test]
    fn strokes_can_be_undone() {
        let mut painting = painting(300.0, 200.0);
        assert!(!painting.can_undo());

        for step in 0..20 {
            assert!(painting.tick(&stroke_input(100.0 + step as f32 * 3.0, true)));
        }
        painting.tick(&stroke_input(160.0, false));
        let painted = painting.paint_texture().total(painting.simulator().bounds()).w;
        assert!(painted > 0.0);
        assert!(painting.can_undo());

        assert!(painting.undo().unwrap());
        let undone = painting.paint_texture().total(painting.simulator().bounds()).w;
        assert_relative_eq!(undone, 0.0);

        assert!(painting.can_redo());
        assert!(painting.redo().unwrap());
        let redone = painting.paint_texture().total(painting.simulator().bounds()).w;
        assert_relative_eq!(redone, painted, max_relative = 1e-5);
    }

    #[test]
    fn quality_changes_resample_and_can_be_undone() {
        let mut painting = painting(300.0, 200.0);
        assert_eq!(painting.simulator().width(), 300);

        painting.set_quality(2).unwrap();
        assert_eq!(
            (painting.simulator().width(), painting.simulator().height()),
            (600, 400)
        );
        assert_relative_eq!(painting.resolution_scale(), 2.0);

        painting.undo().unwrap();
        assert_eq!(painting.simulator().width(), 300);
        assert_relative_eq!(painting.resolution_scale(), 1.0);
        assert_eq!(painting.quality(), 0);

        assert!(matches!(
            painting.set_quality(7),
            Err(Problem::UnknownQuality(7))
        ));
    }

    #[test]
    fn resizing_from_the_left_shifts_the_paint() {
        let mut painting = painting(300.0, 200.0);
        for step in 0..5 {
            painting.tick(&stroke_input(150.0 + step as f32, true));
        }
        let before = painting.paint_texture().clone();

        painting
            .resize(Rectangle::new(-100.0, 0.0, 400.0, 200.0))
            .unwrap();

        assert_eq!(painting.simulator().width(), 400);
        assert_eq!(
            painting.paint_texture().texel(250, 100),
            before.texel(150, 100)
        );
    }

    #[test]
    fn brush_scale_stays_in_range() {
        let mut painting = painting(300.0, 200.0);

        painting.tick(&BrushInput {
            scale: 500.0,
            ..stroke_input(100.0, false)
        });
        assert_relative_eq!(painting.brush().scale(), 75.0);

        painting.tick(&BrushInput {
            scale: 1.0,
            ..stroke_input(100.0, false)
        });
        assert_relative_eq!(painting.brush().scale(), 5.0);

        painting.place_brush(50.0, 50.0, 200.0);
        assert_relative_eq!(painting.brush().scale(), 75.0);
        assert_relative_eq!(painting.brush().position().z, 150.0);
    }

    #[test]
    fn resizing_respects_the_size_limits() {
        let settings = Arc::new(Settings {
            seed: Some("painting".to_string()),
            initial_quality: 0,
            ..Default::default()
        });
        let context = Context::new(Limits {
            max_texture_size: 1024,
        });
        let mut painting = Painting::new(context, 300.0, 300.0, &settings).unwrap();

        painting
            .resize(Rectangle::new(0.0, 0.0, 50.0, 40.0))
            .unwrap();
        assert_eq!(
            painting.painting_rectangle(),
            Rectangle::new(0.0, 0.0, 300.0, 300.0)
        );

        painting
            .resize(Rectangle::new(-1000.0, 0.0, 1300.0, 300.0))
            .unwrap();
        assert_eq!(
            painting.painting_rectangle(),
            Rectangle::new(-212.0, 0.0, 512.0, 300.0)
        );
        assert_eq!(
            (painting.simulator().width(), painting.simulator().height()),
            (512, 300)
        );
    }

    #[test]
    fn failed_quality_change_leaves_no_history() {
        let settings = Arc::new(Settings {
            seed: Some("painting".to_string()),
            initial_quality: 0,
            ..Default::default()
        });
        let context = Context::new(Limits {
            max_texture_size: 500,
        });
        let mut painting = Painting::new(context, 300.0, 200.0, &settings).unwrap();

        assert!(matches!(
            painting.set_quality(2),
            Err(Problem::Render(render::Problem::TextureTooLarge { .. }))
        ));
        assert!(!painting.can_undo());
        assert_eq!(painting.quality(), 0);
        assert_eq!(painting.simulator().width(), 300);
    }

    #[test]
    fn thicker_brushes_lay_down_thinner_paint() {
        let mut painting = painting(300.0, 200.0);
        let input = stroke_input(100.0, true);

        painting.brush.set_bristle_count(&painting.context, 10);
        let thin = painting.splat_parameters(&input).color[3];
        painting.brush.set_bristle_count(&painting.context, 100);
        let thick = painting.splat_parameters(&input).color[3];

        assert_relative_eq!(thin, 0.08, max_relative = 1e-5);
        assert_relative_eq!(thick, 0.025, max_relative = 1e-5);
    }

    #[test]
    fn bristle_control_is_quadratic() {
        let painting = painting(300.0, 200.0);
        assert_eq!(painting.bristle_count_for(0.0), 10);
        assert_eq!(painting.bristle_count_for(0.5), 32);
        assert_eq!(painting.bristle_count_for(1.0), 100);
    }

    #[test]
    fn device_limits_cap_the_painting_size() {
        let context = Context::new(Limits {
            max_texture_size: 4096,
        });
        assert_relative_eq!(
            Painting::max_painting_size(&context, &Settings::default()),
            2048.0
        );

        let settings = Arc::new(Settings::default());
        assert!(matches!(
            Painting::new(context, 3000.0, 1000.0, &settings),
            Err(Problem::Render(render::Problem::TextureTooLarge { .. }))
        ));
    }
}
