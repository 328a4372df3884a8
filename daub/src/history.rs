use crate::fluid::Simulator;
use crate::render::Texture;

/// The paint and canvas geometry at one point in time.
#[derive(Clone, Debug)]
pub struct Snapshot {
    texture: Texture,
    painting_width: f32,
    painting_height: f32,
    resolution_scale: f32,
}

impl Snapshot {
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn painting_width(&self) -> f32 {
        self.painting_width
    }

    pub fn painting_height(&self) -> f32 {
        self.painting_height
    }

    pub fn resolution_scale(&self) -> f32 {
        self.resolution_scale
    }
}

/// Canvas geometry recorded alongside the paint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub painting_width: f32,
    pub painting_height: f32,
    pub resolution_scale: f32,
}

/// Undo and redo over a fixed number of snapshots.
///
/// `index` is the slot the next snapshot goes into. While undoing, every slot
/// up to `max_redo_index` holds a state that can be redone.
#[derive(Debug)]
pub struct History {
    snapshots: Vec<Snapshot>,
    capacity: usize,
    index: usize,
    undoing: bool,
    max_redo_index: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(capacity),
            capacity: capacity.max(2),
            index: 0,
            undoing: false,
            max_redo_index: 0,
        }
    }

    /// Snapshots before the current position.
    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Record the current paint. Any states that could be redone are lost.
    pub fn save(&mut self, simulator: &Simulator, dimensions: Dimensions) {
        self.save_texture(simulator.paint_texture(), dimensions);
    }

    /// Record `paint` as the latest state, for callers that copied the paint
    /// before changing it.
    pub fn save_texture(&mut self, paint: &Texture, dimensions: Dimensions) {
        if self.index == self.capacity {
            // Drop the oldest, reusing its slot for the newest.
            self.snapshots.rotate_left(1);
            self.index -= 1;
        }

        self.undoing = false;

        if let Some(snapshot) = self.snapshots.get_mut(self.index) {
            snapshot.texture.copy_from(paint);
            snapshot.painting_width = dimensions.painting_width;
            snapshot.painting_height = dimensions.painting_height;
            snapshot.resolution_scale = dimensions.resolution_scale;
        } else {
            self.snapshots.push(Snapshot {
                texture: paint.clone(),
                painting_width: dimensions.painting_width,
                painting_height: dimensions.painting_height,
                resolution_scale: dimensions.resolution_scale,
            });
        }

        self.index += 1;
        log::trace!("Saved snapshot {}", self.index);
    }

    pub fn can_undo(&self) -> bool {
        self.index >= 1
    }

    pub fn can_redo(&self) -> bool {
        self.undoing && self.index < self.max_redo_index
    }

    /// Step back one snapshot. The first undo in a row records the current
    /// paint so it can be redone.
    pub fn undo(&mut self, simulator: &Simulator, dimensions: Dimensions) -> Option<&Snapshot> {
        if !self.undoing {
            self.save(simulator, dimensions);
            self.undoing = true;
            self.index -= 1;
            self.max_redo_index = self.index;
        }

        if !self.can_undo() {
            return None;
        }

        self.index -= 1;
        self.snapshots.get(self.index)
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }

        self.index += 1;
        self.snapshots.get(self.index)
    }
}
