use crate::render::Region;

/// An axis-aligned rectangle in painting space. Rectangles without a positive
/// extent are empty.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rectangle {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn translate(&self, x: f32, y: f32) -> Rectangle {
        Rectangle::new(self.left + x, self.bottom + y, self.width, self.height)
    }

    pub fn scale(&self, x: f32, y: f32) -> Rectangle {
        Rectangle::new(
            self.left * x,
            self.bottom * y,
            self.width * x,
            self.height * y,
        )
    }

    pub fn round(&self) -> Rectangle {
        Rectangle::new(
            self.left.round(),
            self.bottom.round(),
            self.width.round(),
            self.height.round(),
        )
    }

    /// Round to whole texels and clip to `bounds`. Anything non-finite or
    /// outside the bounds becomes an empty region.
    pub fn to_region(&self, bounds: Region) -> Region {
        let rounded = self.round();
        if !(rounded.left.is_finite()
            && rounded.bottom.is_finite()
            && rounded.width.is_finite()
            && rounded.height.is_finite())
        {
            return Region::default();
        }

        let left = rounded.left.max(bounds.x as f32);
        let bottom = rounded.bottom.max(bounds.y as f32);
        let right = rounded.right().min(bounds.right() as f32);
        let top = rounded.top().min(bounds.top() as f32);

        if !(right > left && top > bottom) {
            return Region::default();
        }

        Region::new(
            left as u32,
            bottom as u32,
            (right - left) as u32,
            (top - bottom) as u32,
        )
    }
}
