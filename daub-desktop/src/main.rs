use daub::render::{Context, Limits, Texture};
use daub::{BrushInput, Painting, Settings};
use std::sync::Arc;

const PAINTING_WIDTH: f32 = 800.0;
const PAINTING_HEIGHT: f32 = 500.0;
const STROKE_FRAMES: u32 = 240;
const DRYING_FRAMES: u32 = 120;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(problem) = run() {
        log::error!("{}", problem);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "painting.png".to_string());
    let settings = match args.next() {
        Some(path) => {
            log::info!("Reading settings from {}", path);
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        }
        None => Settings::default(),
    };
    let settings = Arc::new(settings);

    let context = Context::new(Limits::default());
    let max_size = Painting::max_painting_size(&context, &settings);
    let mut painting = Painting::new(
        context,
        PAINTING_WIDTH.min(max_size),
        PAINTING_HEIGHT.min(max_size),
        &settings,
    )?;

    let scale = 25.0;
    let bristle_count = painting.bristle_count_for(0.8);
    let start = std::time::Instant::now();

    for frame in 0..STROKE_FRAMES + DRYING_FRAMES {
        let t = frame.min(STROKE_FRAMES) as f32 / STROKE_FRAMES as f32;
        let is_contacting = frame > 10 && frame < STROKE_FRAMES;
        let input = BrushInput {
            x: 100.0 + t * (PAINTING_WIDTH - 200.0),
            y: PAINTING_HEIGHT * 0.5 + (t * std::f32::consts::TAU * 1.5).sin() * 120.0,
            z: painting.brush_height(scale) * if is_contacting { 1.0 } else { 3.0 },
            scale,
            is_contacting,
            color: [0.12, 0.25, 0.65, 0.9],
            bristle_count,
        };

        painting.tick(&input);
    }

    log::info!(
        "🖌 Painted {} frames in {:.2?}",
        STROKE_FRAMES + DRYING_FRAMES,
        start.elapsed()
    );

    to_image(painting.paint_texture()).save(&output)?;
    log::info!("💾 Saved {}", output);

    Ok(())
}

/// Composite the paint over white paper.
fn to_image(paint: &Texture) -> image::RgbaImage {
    let height = paint.height();
    image::RgbaImage::from_fn(paint.width(), height, |x, y| {
        let texel = paint.texel(x as i32, (height - 1 - y) as i32);
        let coverage = texel.w.clamp(0.0, 1.0);
        let channel = |premultiplied: f32| {
            let value = premultiplied + (1.0 - coverage);
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        image::Rgba([channel(texel.x), channel(texel.y), channel(texel.z), 255])
    })
}
