use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub seed: Option<String>,

    // Fluid
    pub fluidity: f32,
    pub fluid_timestep: f32,
    pub pressure_iterations: u32,
    pub frames_to_simulate: u64,
    pub splat_padding: f32,
    pub speed_padding: f32,

    pub brush: BrushSettings,
    pub splat: SplatSettings,

    // Painting
    pub qualities: Vec<Quality>,
    pub initial_quality: usize,
    pub history_size: usize,
    pub resizing_feather_size: f32,
    pub min_painting_size: f32,
    pub max_painting_size: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushSettings {
    pub max_bristle_count: u32,
    pub min_bristle_count: u32,
    pub vertices_per_bristle: u32,
    pub bristle_length: f32,
    pub bristle_jitter: f32,
    pub iterations: u32,
    pub gravity: f32,
    pub damping: f32,
    pub bending_stiffness: f32,
    pub stiffness_variation: f32,
    pub timestep: f32,
    pub speed_history: usize,
    pub splats_per_segment: u32,

    /// Height of the brush anchor above the canvas, relative to the scale.
    pub height: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SplatSettings {
    pub velocity_scale: f32,
    pub radius: f32,
    /// Bristle height, relative to the scale, below which paint is deposited.
    pub z_threshold: f32,
    pub thin_alpha: AlphaRange,
    pub thick_alpha: AlphaRange,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlphaRange {
    pub min: f32,
    pub max: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub name: String,
    pub resolution_scale: f32,
}

impl Settings {
    pub fn highest_resolution_scale(&self) -> f32 {
        self.qualities
            .iter()
            .map(|quality| quality.resolution_scale)
            .fold(1.0, f32::max)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.qualities.is_empty() {
            return Err("at least one quality level is required".into());
        }
        if self.initial_quality >= self.qualities.len() {
            return Err(format!(
                "initial quality {} is out of range for {} qualities",
                self.initial_quality,
                self.qualities.len()
            ));
        }
        if let Some(quality) = self
            .qualities
            .iter()
            .find(|quality| !(quality.resolution_scale > 0.0))
        {
            return Err(format!(
                "quality {:?} has a non-positive resolution scale",
                quality.name
            ));
        }
        if self.brush.vertices_per_bristle < 2 {
            return Err("bristles need at least two vertices".into());
        }
        if self.brush.min_bristle_count > self.brush.max_bristle_count {
            return Err("the minimum bristle count exceeds the maximum".into());
        }
        if self.brush.max_bristle_count == 0 {
            return Err("the brush needs at least one bristle".into());
        }
        if !(self.brush.min_scale > 0.0 && self.brush.min_scale <= self.brush.max_scale) {
            return Err("brush scales must be positive with the minimum below the maximum".into());
        }
        if !(self.min_painting_size > 0.0 && self.min_painting_size <= self.max_painting_size) {
            return Err(
                "painting sizes must be positive with the minimum below the maximum".into(),
            );
        }
        if self.history_size < 2 {
            return Err("the history must hold at least two snapshots".into());
        }
        if !(self.fluid_timestep > 0.0) || !(self.brush.timestep > 0.0) {
            return Err("timesteps must be positive".into());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            seed: None,
            fluidity: 0.8,
            fluid_timestep: 1.0 / 60.0,
            pressure_iterations: 2,
            frames_to_simulate: 60,
            splat_padding: 4.5,
            speed_padding: 1.1,
            brush: BrushSettings::default(),
            splat: SplatSettings::default(),
            qualities: vec![
                Quality {
                    name: "Low".into(),
                    resolution_scale: 1.0,
                },
                Quality {
                    name: "Medium".into(),
                    resolution_scale: 1.5,
                },
                Quality {
                    name: "High".into(),
                    resolution_scale: 2.0,
                },
            ],
            initial_quality: 1,
            history_size: 15,
            resizing_feather_size: 8.0,
            min_painting_size: 300.0,
            max_painting_size: 4096.0,
        }
    }
}

impl Default for BrushSettings {
    fn default() -> Self {
        BrushSettings {
            max_bristle_count: 100,
            min_bristle_count: 10,
            vertices_per_bristle: 10,
            bristle_length: 4.5,
            bristle_jitter: 0.5,
            iterations: 20,
            gravity: 10.0,
            damping: 0.75,
            bending_stiffness: 0.5,
            stiffness_variation: 0.3,
            timestep: 1.0 / 60.0,
            speed_history: 15,
            splats_per_segment: 8,
            height: 2.0,
            min_scale: 5.0,
            max_scale: 75.0,
        }
    }
}

impl Default for SplatSettings {
    fn default() -> Self {
        SplatSettings {
            velocity_scale: 0.14,
            radius: 0.05,
            z_threshold: 0.13333,
            thin_alpha: AlphaRange {
                min: 0.002,
                max: 0.08,
            },
            thick_alpha: AlphaRange {
                min: 0.002,
                max: 0.025,
            },
        }
    }
}
