use crate::render::Region;
use std::collections::VecDeque;

/// Texels touched by one splat, and the frame it happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplatArea {
    pub region: Region,
    pub frame_number: u64,
}

/// Recent splat areas, newest first. The fluid only needs simulating where
/// paint was splatted in the last `frames_to_simulate` frames.
#[derive(Clone, Debug)]
pub struct SplatAreas {
    areas: VecDeque<SplatArea>,
    frames_to_simulate: u64,
}

impl SplatAreas {
    pub fn new(frames_to_simulate: u64) -> Self {
        Self {
            areas: VecDeque::new(),
            frames_to_simulate,
        }
    }

    pub fn push(&mut self, region: Region, frame_number: u64) {
        self.areas.push_front(SplatArea {
            region,
            frame_number,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SplatArea> {
        self.areas.iter()
    }

    pub fn clear(&mut self) {
        self.areas.clear();
    }

    /// Bounding box of every area, clipped to `bounds`.
    pub fn active_region(&self, bounds: Region) -> Region {
        self.areas
            .iter()
            .fold(Region::default(), |active, area| active.union(&area.region))
            .intersect(&bounds)
    }

    /// Forget areas that have been simulated long enough.
    pub fn expire(&mut self, frame_number: u64) {
        let frames_to_simulate = self.frames_to_simulate;
        self.areas
            .retain(|area| frame_number.saturating_sub(area.frame_number) <= frames_to_simulate);
    }
}
