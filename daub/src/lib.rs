pub mod brush;
pub mod fluid;
pub mod history;
pub mod painting;
pub mod rectangle;
pub mod render;
pub mod rng;
pub mod settings;

pub use painting::{BrushInput, Painting, Problem};
pub use rectangle::Rectangle;
pub use settings::Settings;
