//! Bounded sets of dirty rectangles.
use cggeom::{prelude::*, Box2};

/// Accumulates dirty rectangles of a tier between repaints.
///
/// The set holds at most `capacity` rectangles. A rectangle overlapping or
/// extending a stored one is merged into it. When a rectangle doesn't fit,
/// the whole set collapses into its bounding box and stays that way
/// (*overflowed*) until [`reset`](UpdateSet::reset). The stored rectangles
/// always cover every rectangle ever added.
#[derive(Debug, Clone)]
pub struct UpdateSet {
    rects: Vec<Box2<i32>>,
    capacity: usize,
    bounding: Option<Box2<i32>>,
    overflowed: bool,
}

impl UpdateSet {
    /// Construct an empty `UpdateSet`. `capacity` is clamped to at least `1`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rects: Vec::with_capacity(capacity),
            capacity,
            bounding: None,
            overflowed: false,
        }
    }

    pub fn add(&mut self, rect: Box2<i32>) {
        if rect.is_empty() {
            return;
        }

        let bounding = match self.bounding {
            Some(x) => x.union(&rect),
            None => rect,
        };
        self.bounding = Some(bounding);

        if self.overflowed {
            self.rects[0] = bounding;
            return;
        }

        if let Some(existing) = self
            .rects
            .iter_mut()
            .find(|r| r.intersection(&rect).is_some() || r.extends(&rect))
        {
            existing.union_assign(&rect);
            return;
        }

        if self.rects.len() >= self.capacity {
            log::debug!(
                "add: {} rects exceed the capacity; collapsing to {:?}",
                self.rects.len() + 1,
                bounding
            );
            self.rects.clear();
            self.rects.push(bounding);
            self.overflowed = true;
            return;
        }

        self.rects.push(rect);
    }

    /// Remove all rectangles and clear the overflow state.
    pub fn reset(&mut self) {
        self.rects.clear();
        self.bounding = None;
        self.overflowed = false;
    }

    pub fn rects(&self) -> &[Box2<i32>] {
        &self.rects
    }

    /// Get the bounding box of every rectangle added since the last reset.
    pub fn bounding(&self) -> Option<Box2<i32>> {
        self.bounding
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Get `(total_area, bounding_area)`. `total_area` is the sum of the areas
    /// of the stored rectangles, counting overlaps more than once.
    pub fn stat(&self) -> (u64, u64) {
        let total = self.rects.iter().map(|r| r.area()).sum();
        (total, self.bounding.map_or(0, |b| b.area()))
    }
}
