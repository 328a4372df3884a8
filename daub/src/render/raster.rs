use glam::{Vec2, Vec4};

/// One screen-aligned square, `2 * radius` on each side, in texel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadInstance {
    pub center: Vec2,
    pub radius: f32,
    /// Lets the shader look up per-instance data.
    pub index: usize,
}

pub trait QuadShader {
    /// Shade a texel of `instance`. `local` spans `[-1, 1]` across the quad.
    /// Returning `None` discards the fragment.
    fn shade(&self, instance: &QuadInstance, local: Vec2) -> Option<Vec4>;
}
