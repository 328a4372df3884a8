use super::{Problem, Region, Result};
use glam::{Vec2, Vec4};

pub type Texel = [f32; 4];

/// A 2D array of RGBA `f32` texels. Row 0 is the bottom row.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl Texture {
    pub(super) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    pub fn with_f32_data(mut self, data: &[f32]) -> Result<Self> {
        let expected = self.texels.len() * 4;
        if data.len() != expected {
            return Err(Problem::WrongDataLength {
                expected,
                actual: data.len(),
            });
        }

        self.texels.copy_from_slice(bytemuck::cast_slice(data));
        Ok(self)
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

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Point read with clamp-to-edge addressing.
    pub fn texel(&self, x: i32, y: i32) -> Vec4 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        Vec4::from_array(self.texels[self.index(x, y)])
    }

    pub fn set_texel(&mut self, x: u32, y: u32, value: Vec4) {
        let index = self.index(x, y);
        self.texels[index] = value.to_array();
    }

    /// Bilinear sample at a position in texel space, where texel `(i, j)` is
    /// centred on `(i + 0.5, j + 0.5)`. Addressing is clamp-to-edge.
    pub fn sample(&self, position: Vec2) -> Vec4 {
        if !position.is_finite() {
            return Vec4::ZERO;
        }

        let position = position - 0.5;
        let base = position.floor();
        let fraction = position - base;
        let (x, y) = (base.x as i32, base.y as i32);

        let bottom = self.texel(x, y).lerp(self.texel(x + 1, y), fraction.x);
        let top = self
            .texel(x, y + 1)
            .lerp(self.texel(x + 1, y + 1), fraction.x);

        bottom.lerp(top, fraction.y)
    }

    pub fn zero_out(&mut self) {
        self.texels.fill([0.0; 4]);
    }

    pub fn zero_region(&mut self, region: Region) {
        let region = region.intersect(&self.bounds());
        for y in region.y..region.top() {
            let start = self.index(region.x, y);
            self.texels[start..start + region.width as usize].fill([0.0; 4]);
        }
    }

    /// Copy the texels of `region` from a texture of the same size.
    pub fn copy_region_from(&mut self, source: &Texture, region: Region) {
        debug_assert_eq!((self.width, self.height), (source.width, source.height));

        let region = region.intersect(&self.bounds()).intersect(&source.bounds());
        for y in region.y..region.top() {
            let start = self.index(region.x, y);
            let end = start + region.width as usize;
            self.texels[start..end].copy_from_slice(&source.texels[start..end]);
        }
    }

    /// Overwrite this texture with the contents of `source`, reallocating if
    /// the sizes differ.
    pub fn copy_from(&mut self, source: &Texture) {
        self.width = source.width;
        self.height = source.height;
        self.texels.clone_from(&source.texels);
    }

    pub fn is_finite(&self) -> bool {
        self.texels.iter().flatten().all(|value| value.is_finite())
    }

    /// Sum of every texel in `region`.
    pub fn total(&self, region: Region) -> Vec4 {
        region
            .intersect(&self.bounds())
            .texels()
            .map(|(x, y)| Vec4::from_array(self.texels[self.index(x, y)]))
            .sum()
    }
}

/// A pair of same-sized textures for passes that read one state and write
/// the next.
#[derive(Clone, Debug)]
pub struct DoubleTexture {
    front: Texture,
    back: Texture,
}

impl DoubleTexture {
    pub(super) fn new(width: u32, height: u32) -> Self {
        Self {
            front: Texture::new(width, height),
            back: Texture::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.front.width
    }

    pub fn height(&self) -> u32 {
        self.front.height
    }

    pub fn bounds(&self) -> Region {
        self.front.bounds()
    }

    pub fn current(&self) -> &Texture {
        &self.front
    }

    pub fn current_mut(&mut self) -> &mut Texture {
        &mut self.front
    }

    pub fn next(&self) -> &Texture {
        &self.back
    }

    pub fn next_mut(&mut self) -> &mut Texture {
        &mut self.back
    }

    /// Read from the current texture while writing the next one.
    pub fn split(&mut self) -> (&Texture, &mut Texture) {
        (&self.front, &mut self.back)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Mirror the current texture into the next one within `region`.
    pub fn sync(&mut self, region: Region) {
        self.back.copy_region_from(&self.front, region);
    }

    /// Mirror the whole current texture into the next one.
    pub fn sync_all(&mut self) {
        self.back.copy_from(&self.front);
    }

    pub fn zero_out(&mut self) {
        self.front.zero_out();
        self.back.zero_out();
    }

    pub fn zero_region(&mut self, region: Region) {
        self.front.zero_region(region);
        self.back.zero_region(region);
    }

    /// Shift a new state in: the current texture becomes the next one, and
    /// `incoming` becomes current. `incoming` receives the oldest texture.
    pub fn rotate_in(&mut self, incoming: &mut Texture) {
        debug_assert_eq!(
            (incoming.width, incoming.height),
            (self.front.width, self.front.height)
        );

        std::mem::swap(&mut self.front, &mut self.back);
        std::mem::swap(&mut self.front, incoming);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn gradient(width: u32, height: u32) -> Texture {
        let data: Vec<f32> = (0..height)
            .flat_map(|y| (0..width).flat_map(move |x| [x as f32, y as f32, 0.0, 1.0]))
            .collect();
        Texture::new(width, height)
            .with_f32_data(&data)
            .unwrap()
    }

    #[test]
    fn sampling_at_texel_centres_returns_texels() {
        let texture = gradient(4, 3);
        let sample = texture.sample(Vec2::new(2.5, 1.5));
        assert_relative_eq!(sample.x, 2.0);
        assert_relative_eq!(sample.y, 1.0);
    }

    #[test]
    fn sampling_between_texels_interpolates() {
        let texture = gradient(4, 3);
        let sample = texture.sample(Vec2::new(1.75, 2.0));
        assert_relative_eq!(sample.x, 1.25);
        assert_relative_eq!(sample.y, 1.5);
    }

    #[test]
    fn sampling_clamps_to_the_edge() {
        let texture = gradient(4, 3);
        let sample = texture.sample(Vec2::new(-10.0, 40.0));
        assert_relative_eq!(sample.x, 0.0);
        assert_relative_eq!(sample.y, 2.0);
        assert_eq!(texture.texel(7, -1), Vec4::new(3.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn rejects_data_of_the_wrong_length() {
        let result = Texture::new(2, 2).with_f32_data(&[0.0; 12]);
        assert_eq!(
            result,
            Err(Problem::WrongDataLength {
                expected: 16,
                actual: 12
            })
        );
    }

    #[test]
    fn zero_region_leaves_the_rest() {
        let mut texture = gradient(4, 4);
        texture.zero_region(Region::new(1, 1, 2, 2));
        assert_eq!(texture.texel(1, 2), Vec4::ZERO);
        assert_eq!(texture.texel(3, 2), Vec4::new(3.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn rotate_in_shifts_states() {
        let mut states = DoubleTexture::new(1, 1);
        states.current_mut().set_texel(0, 0, Vec4::splat(1.0));
        states.next_mut().set_texel(0, 0, Vec4::splat(2.0));
        let mut incoming = Texture::new(1, 1);
        incoming.set_texel(0, 0, Vec4::splat(3.0));

        states.rotate_in(&mut incoming);

        assert_eq!(states.current().texel(0, 0), Vec4::splat(3.0));
        assert_eq!(states.next().texel(0, 0), Vec4::splat(1.0));
        assert_eq!(incoming.texel(0, 0), Vec4::splat(2.0));
    }

    #[test]
    fn sync_mirrors_only_the_region() {
        let mut pair = DoubleTexture::new(3, 1);
        for x in 0..3 {
            pair.current_mut().set_texel(x, 0, Vec4::ONE);
        }
        pair.sync(Region::new(1, 0, 1, 1));
        assert_eq!(pair.next().texel(0, 0), Vec4::ZERO);
        assert_eq!(pair.next().texel(1, 0), Vec4::ONE);
        assert_eq!(pair.next().texel(2, 0), Vec4::ZERO);
    }
}
