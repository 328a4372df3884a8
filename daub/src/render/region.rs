/// An axis-aligned block of texels. `(x, y)` is the bottom-left texel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn top(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.top()
    }

    pub fn intersect(&self, other: &Region) -> Region {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());

        Region::new(x, y, right.saturating_sub(x), top.saturating_sub(y))
    }

    /// The bounding box of both regions. Empty regions contribute nothing.
    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());

        Region::new(x, y, right - x, top - y)
    }

    /// Grow by `texels` on every side, stopping at zero.
    pub fn expand(&self, texels: u32) -> Region {
        if self.is_empty() {
            return *self;
        }

        let x = self.x.saturating_sub(texels);
        let y = self.y.saturating_sub(texels);

        Region::new(
            x,
            y,
            self.right() + texels - x,
            self.top() + texels - y,
        )
    }

    /// Every texel in the region, row by row from the bottom.
    pub fn texels(&self) -> impl Iterator<Item = (u32, u32)> {
        let Region {
            x,
            y,
            width,
            height,
        } = *self;
        (y..y + height).flat_map(move |row| (x..x + width).map(move |column| (column, row)))
    }
}
