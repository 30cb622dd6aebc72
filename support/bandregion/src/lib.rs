//! Banded rectangle sets.
//!
//! A [`Region`] represents an arbitrary set of pixels as a list of disjoint
//! boxes, sorted by their top edges and then by their left edges. Boxes
//! sharing the same top edge form a *band*; every box in a band has the same
//! bottom edge.
//!
//! ```text
//!   ┌────┐  ┌───────┐        band 0
//!   ├────┴──┴───────┤        band 1
//!   │               │
//!   └──┬─────┬──────┘
//!      └─────┘               band 2
//! ```
//!
//! The representation is kept canonical:
//!
//!  - Boxes in a band never touch each other. Touching boxes are merged.
//!  - Vertically adjacent bands never have identical sets of horizontal spans.
//!    Such bands are *coalesced* into one.
//!  - `extents` is the exact bounding box.
//!
//! Consequently, two `Region`s covering the same set of pixels compare equal.
//!
//! Every operation that may allocate memory returns `Result`. Failure to
//! allocate produces [`RegionError::AllocationFailed`] instead of a partially
//! built region.
use cggeom::{box2, prelude::*, Box2};
use quick_error::quick_error;
use std::{cmp::Ordering, fmt, slice};

mod op;

/// The smallest coordinate a translated region can have.
pub const COORD_MIN: i32 = <i16>::min_value() as i32;

/// The largest coordinate a translated region can have.
pub const COORD_MAX: i32 = <i16>::max_value() as i32;

quick_error! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RegionError {
        /// Memory allocation failed while growing a region.
        AllocationFailed {
            display("failed to allocate memory for a region")
        }
        /// The input box has a negative extent.
        InvalidBox(bx: Box2<i32>) {
            display("invalid box: {:?}", bx)
        }
    }
}

/// The shape of the storage of a [`Region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionState {
    /// The region contains no pixels.
    Empty,
    /// The region is a single box, stored in `extents`. No box list is
    /// allocated.
    Single,
    /// The region consists of two or more boxes stored in a banded list.
    Multi,
}

/// The result of [`Region::contains_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlap {
    /// The box is entirely inside the region.
    In,
    /// The box doesn't intersect with the region.
    Out,
    /// The box is partially inside the region.
    Part,
}

/// A set of pixels represented by disjoint boxes. See the [crate-level
/// documentation](crate) for the representation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Region {
    extents: Box2<i32>,
    /// The banded box list. Empty unless `self` is `RegionState::Multi`.
    rects: Vec<Box2<i32>>,
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Box2<i32>> for Region {
    fn from(x: Box2<i32>) -> Self {
        Self::from_box(x)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Region")
            .field("extents", &self.extents)
            .field("boxes", &self.boxes())
            .finish()
    }
}

impl Region {
    /// Construct an empty `Region`.
    pub fn new() -> Self {
        Self {
            extents: Box2::zero(),
            rects: Vec::new(),
        }
    }

    /// Construct a `Region` consisting of a single box. An empty `bx` produces
    /// an empty region.
    pub fn from_box(bx: Box2<i32>) -> Self {
        if bx.is_empty() {
            Self::new()
        } else {
            Self {
                extents: bx,
                rects: Vec::new(),
            }
        }
    }

    /// Construct a `Region` equal to the union of the given boxes.
    ///
    /// The boxes may be given in any order and may overlap each other. Empty
    /// boxes are ignored. Returns `RegionError::InvalidBox` if any box has a
    /// negative extent.
    pub fn from_boxes(boxes: &[Box2<i32>]) -> Result<Self, RegionError> {
        let mut rects = Vec::new();
        try_reserve(&mut rects, boxes.len())?;

        for bx in boxes.iter() {
            if !bx.is_valid() {
                return Err(RegionError::InvalidBox(*bx));
            }
            if !bx.is_empty() {
                rects.push(*bx);
            }
        }

        rects.sort_unstable_by(|a, b| cmp_y_x(a, b));

        if is_banded(&rects) {
            // The input is already in the canonical form. This is the case
            // when reconstructing a region from `Region::boxes`.
            return Ok(Self::from_canonical(rects));
        }

        log::trace!("from_boxes: merging {} unsorted boxes", rects.len());

        // Merge the boxes pairwise. Each level halves the number of regions.
        let mut regions = Vec::new();
        try_reserve(&mut regions, rects.len())?;
        regions.extend(rects.into_iter().map(Self::from_box));

        while regions.len() > 1 {
            let mut next = Vec::new();
            try_reserve(&mut next, (regions.len() + 1) / 2)?;
            for pair in regions.chunks(2) {
                next.push(match pair {
                    [a, b] => a.union(b)?,
                    [a] => a.try_clone()?,
                    _ => unreachable!(),
                });
            }
            regions = next;
        }

        Ok(regions.pop().unwrap_or_default())
    }

    /// Construct a `Region` from a banded box list that is already in the
    /// canonical form.
    pub(crate) fn from_canonical(mut rects: Vec<Box2<i32>>) -> Self {
        let this = match rects.len() {
            0 => Self::new(),
            1 => Self::from_box(rects.pop().unwrap()),
            _ => Self {
                extents: bounding_box(&rects),
                rects,
            },
        };
        debug_assert!(this.selfcheck(), "{:?}", this);
        this
    }

    /// Clone `self`, reporting allocation failure as an error.
    pub fn try_clone(&self) -> Result<Self, RegionError> {
        let mut rects = Vec::new();
        try_reserve(&mut rects, self.rects.len())?;
        rects.extend_from_slice(&self.rects);
        Ok(Self {
            extents: self.extents,
            rects,
        })
    }

    /// Remove all boxes, releasing the box list.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> RegionState {
        if !self.rects.is_empty() {
            RegionState::Multi
        } else if self.extents.is_empty() {
            RegionState::Empty
        } else {
            RegionState::Single
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state() == RegionState::Empty
    }

    /// Get the bounding box. Returns a zero-sized box if `self` is empty.
    pub fn extents(&self) -> Box2<i32> {
        self.extents
    }

    /// Get the boxes constituting the region, sorted by `(min.y, min.x)`.
    pub fn boxes(&self) -> &[Box2<i32>] {
        match self.state() {
            RegionState::Empty => &[],
            RegionState::Single => slice::from_ref(&self.extents),
            RegionState::Multi => &self.rects,
        }
    }

    pub fn n_rects(&self) -> usize {
        self.boxes().len()
    }

    /// Iterate through the bands of the region from top to bottom.
    pub fn bands(&self) -> Bands<'_> {
        Bands { rest: self.boxes() }
    }

    /// Get the number of pixels in the region.
    pub fn area(&self) -> u64 {
        self.boxes().iter().map(|bx| bx.area()).sum()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        if !self.extents.contains_point(&[x, y].into()) {
            return false;
        }
        if self.rects.is_empty() {
            return true;
        }

        for bx in self.rects.iter() {
            if y >= bx.max.y {
                // Not in this band
                continue;
            }
            if y < bx.min.y || x < bx.min.x {
                // Went past the point
                return false;
            }
            if x < bx.max.x {
                return true;
            }
        }

        false
    }

    /// Classify `bx` by how much of it is covered by the region.
    ///
    /// An empty `bx` is never inside.
    pub fn contains_box(&self, bx: &Box2<i32>) -> Overlap {
        if bx.is_empty() || self.extents.intersection(bx).is_none() {
            return Overlap::Out;
        }
        if self.rects.is_empty() {
            return if self.extents.contains_box(bx) {
                Overlap::In
            } else {
                Overlap::Part
            };
        }

        let mut part_in = false;
        let mut part_out = false;

        // The top-left corner of the part of `bx` yet to be examined
        let mut x = bx.min.x;
        let mut y = bx.min.y;

        for r in self.rects.iter() {
            if r.max.y <= y {
                // Above the remaining part, or the rest of a finished band
                continue;
            }

            if r.min.y > y {
                // Missed the rows above `r`
                part_out = true;
                if part_in || r.min.y >= bx.max.y {
                    break;
                }
                y = r.min.y;
            }

            if r.max.x <= x {
                // Left of the remaining part
                continue;
            }

            if r.min.x > x {
                // Missed the columns left of `r`
                part_out = true;
                if part_in {
                    break;
                }
            }

            if r.min.x < bx.max.x {
                part_in = true;
                if part_out {
                    break;
                }
            }

            if r.max.x >= bx.max.x {
                // This band covers the rest of the row
                y = r.max.y;
                if y >= bx.max.y {
                    break;
                }
                x = bx.min.x;
            } else {
                // Boxes in a band don't touch, so there is a gap after `r`
                part_out = true;
                break;
            }
        }

        if !part_in {
            Overlap::Out
        } else if part_out || y < bx.max.y {
            Overlap::Part
        } else {
            Overlap::In
        }
    }

    /// Translate the region by `(dx, dy)`.
    ///
    /// The result is clipped to `COORD_MIN..=COORD_MAX` on both axes. Boxes
    /// moved entirely outside this range are removed. On error, `self` is left
    /// unchanged.
    pub fn translate(&mut self, dx: i32, dy: i32) -> Result<(), RegionError> {
        if self.is_empty() {
            return Ok(());
        }

        let in_range = |v: i64| v >= COORD_MIN as i64 && v <= COORD_MAX as i64;
        let ext = self.extents;
        let (x1, y1) = (ext.min.x as i64 + dx as i64, ext.min.y as i64 + dy as i64);
        let (x2, y2) = (ext.max.x as i64 + dx as i64, ext.max.y as i64 + dy as i64);

        if in_range(x1) && in_range(y1) && in_range(x2) && in_range(y2) {
            // The fast path: nothing is clipped
            let d = [dx, dy].into();
            self.extents = self.extents.translate(d);
            for bx in self.rects.iter_mut() {
                *bx = bx.translate(d);
            }
            return Ok(());
        }

        if x2 <= COORD_MIN as i64
            || y2 <= COORD_MIN as i64
            || x1 >= COORD_MAX as i64
            || y1 >= COORD_MAX as i64
        {
            log::trace!("translate: the region moved out of the domain");
            self.clear();
            return Ok(());
        }

        let clamp = |v: i32, d: i32| {
            (v as i64 + d as i64)
                .max(COORD_MIN as i64)
                .min(COORD_MAX as i64) as i32
        };

        let mut clipped = Vec::new();
        try_reserve(&mut clipped, self.n_rects())?;
        clipped.extend(
            self.boxes()
                .iter()
                .map(|bx| {
                    box2! {
                        min: [clamp(bx.min.x, dx), clamp(bx.min.y, dy)],
                        max: [clamp(bx.max.x, dx), clamp(bx.max.y, dy)],
                    }
                })
                .filter(|bx| !bx.is_empty()),
        );

        // Clipping can make neighboring bands identical, so rebuild
        *self = Self::from_boxes(&clipped)?;
        Ok(())
    }

    /// Check the internal consistency of the region.
    ///
    /// This is intended for tests. A `Region` produced by this crate always
    /// passes this check.
    pub fn selfcheck(&self) -> bool {
        match self.rects.len() {
            0 => self.extents == Box2::zero() || !self.extents.is_empty(),
            // A single box must be stored in `extents`
            1 => false,
            _ => is_banded(&self.rects) && self.extents == bounding_box(&self.rects),
        }
    }
}

/// An iterator over the bands of a [`Region`]. Created by [`Region::bands`].
#[derive(Debug, Clone)]
pub struct Bands<'a> {
    rest: &'a [Box2<i32>],
}

impl<'a> Iterator for Bands<'a> {
    type Item = &'a [Box2<i32>];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.first()?;
        let len = band_len(self.rest, first.min.y);
        let (band, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(band)
    }
}

/// Get the length of the band at the start of `rects`.
fn band_len(rects: &[Box2<i32>], y1: i32) -> usize {
    rects
        .iter()
        .position(|bx| bx.min.y != y1)
        .unwrap_or(rects.len())
}

fn cmp_y_x(a: &Box2<i32>, b: &Box2<i32>) -> Ordering {
    (a.min.y, a.min.x).cmp(&(b.min.y, b.min.x))
}

pub(crate) fn try_reserve<T>(v: &mut Vec<T>, additional: usize) -> Result<(), RegionError> {
    v.try_reserve(additional)
        .map_err(|_| RegionError::AllocationFailed)
}

/// Compute the bounding box of a non-empty banded box list.
fn bounding_box(rects: &[Box2<i32>]) -> Box2<i32> {
    let (first, last) = (rects[0], rects[rects.len() - 1]);
    let (x1, x2) = rects
        .iter()
        .fold((first.min.x, first.max.x), |(x1, x2), bx| {
            (x1.min(bx.min.x), x2.max(bx.max.x))
        });
    box2! { min: [x1, first.min.y], max: [x2, last.max.y] }
}

/// Check whether a box list is in the canonical banded form.
fn is_banded(rects: &[Box2<i32>]) -> bool {
    let mut prev_band: Option<&[Box2<i32>]> = None;

    for band in (Bands { rest: rects }) {
        let first = band[0];
        if band
            .iter()
            .any(|bx| bx.is_empty() || bx.min.y != first.min.y || bx.max.y != first.max.y)
        {
            return false;
        }

        // Sorted and non-touching within the band
        if band.windows(2).any(|w| w[0].max.x >= w[1].min.x) {
            return false;
        }

        if let Some(prev) = prev_band {
            let prev_bottom = prev[0].max.y;
            if prev_bottom > first.min.y {
                return false;
            }
            if prev_bottom == first.min.y && same_spans(prev, band) {
                // Should have been coalesced
                return false;
            }
        }

        prev_band = Some(band);
    }

    true
}

fn same_spans(a: &[Box2<i32>], b: &[Box2<i32>]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|(a, b)| a.min.x == b.min.x && a.max.x == b.max.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};
    use quickcheck_macros::quickcheck;

    /// Convert boxes generated by `quickcheck` to `Box2<i32>`.
    pub(crate) fn widen(boxes: &[Box2<i8>]) -> Vec<Box2<i32>> {
        boxes.iter().map(|bx| bx.cast().unwrap()).collect()
    }

    fn membership(boxes: &[Box2<i32>], x: i32, y: i32) -> bool {
        boxes.iter().any(|bx| bx.contains_point(&[x, y].into()))
    }

    #[test]
    fn empty_region() {
        let r = Region::new();
        assert_eq!(r.state(), RegionState::Empty);
        assert!(r.is_empty());
        assert_eq!(r.n_rects(), 0);
        assert_eq!(r.extents(), Box2::zero());
        assert!(r.selfcheck());
        assert_eq!(Region::from_box(box2! { min: [3, 3], max: [3, 9] }), r);
    }

    #[test]
    fn single_region() {
        let bx = box2! { min: [1, 2], max: [5, 6] };
        let r = Region::from_box(bx);
        assert_eq!(r.state(), RegionState::Single);
        assert_eq!(r.boxes(), &[bx]);
        assert_eq!(r.area(), 16);
        assert!(r.selfcheck());
    }

    #[test]
    fn from_boxes_rejects_inverted_box() {
        let bad = box2! { min: [10, 0], max: [0, 10] };
        assert_eq!(
            Region::from_boxes(&[box2! { min: [0, 0], max: [1, 1] }, bad]),
            Err(RegionError::InvalidBox(bad))
        );
    }

    #[test]
    fn from_boxes_merges_touching_boxes() {
        let r = Region::from_boxes(&[
            box2! { min: [5, 0], max: [10, 10] },
            box2! { min: [0, 0], max: [5, 10] },
            box2! { min: [0, 10], max: [10, 20] },
        ])
        .unwrap();
        assert_eq!(r.state(), RegionState::Single);
        assert_eq!(r.extents(), box2! { min: [0, 0], max: [10, 20] });
    }

    #[test]
    fn bands_iterates_rows() {
        let r = Region::from_boxes(&[
            box2! { min: [0, 0], max: [10, 10] },
            box2! { min: [5, 5], max: [15, 15] },
        ])
        .unwrap();
        let bands: Vec<_> = r.bands().collect();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[1], &[box2! { min: [0, 5], max: [15, 10] }]);
    }

    #[test]
    fn contains_point_in_hole() {
        let r = Region::from_box(box2! { min: [0, 0], max: [30, 30] })
            .subtract_box(box2! { min: [10, 10], max: [20, 20] })
            .unwrap();
        assert!(r.contains_point(0, 0));
        assert!(r.contains_point(25, 15));
        assert!(!r.contains_point(15, 15));
        assert!(!r.contains_point(30, 15));
        assert!(!r.contains_point(-1, 15));
    }

    #[test]
    fn contains_box_classification() {
        let r = Region::from_boxes(&[
            box2! { min: [0, 0], max: [10, 10] },
            box2! { min: [20, 0], max: [30, 10] },
        ])
        .unwrap();
        assert_eq!(r.contains_box(&box2! { min: [1, 1], max: [9, 9] }), Overlap::In);
        assert_eq!(r.contains_box(&box2! { min: [11, 1], max: [19, 9] }), Overlap::Out);
        assert_eq!(r.contains_box(&box2! { min: [5, 1], max: [25, 9] }), Overlap::Part);
        assert_eq!(r.contains_box(&box2! { min: [5, 5], max: [9, 15] }), Overlap::Part);
        assert_eq!(r.contains_box(&box2! { min: [5, 5], max: [5, 9] }), Overlap::Out);
    }

    #[test]
    fn translate_clips_to_domain() {
        let mut r = Region::from_boxes(&[
            box2! { min: [0, 0], max: [100, 10] },
            box2! { min: [200, 0], max: [300, 10] },
        ])
        .unwrap();
        r.translate(COORD_MAX - 150, 5).unwrap();
        assert!(r.selfcheck());
        // The second box moved past `COORD_MAX` and was removed
        assert_eq!(
            r.boxes(),
            &[box2! { min: [COORD_MAX - 150, 5], max: [COORD_MAX - 50, 15] }]
        );
    }

    #[test]
    fn translate_out_of_domain() {
        let mut r = Region::from_box(box2! { min: [0, 0], max: [10, 10] });
        r.translate(0, COORD_MAX).unwrap();
        assert!(r.is_empty());
        assert!(r.selfcheck());
    }

    #[test]
    fn translate_coalesces_clipped_bands() {
        // After clipping at `COORD_MAX`, both bands have the span
        // `[COORD_MAX - 10, COORD_MAX)` and must be merged
        let mut r = Region::from_boxes(&[
            box2! { min: [0, 0], max: [20, 10] },
            box2! { min: [0, 10], max: [30, 20] },
        ])
        .unwrap();
        assert_eq!(r.n_rects(), 2);
        r.translate(COORD_MAX - 10, 0).unwrap();
        assert!(r.selfcheck());
        assert_eq!(
            r.boxes(),
            &[box2! { min: [COORD_MAX - 10, 0], max: [COORD_MAX, 20] }]
        );
    }

    #[quickcheck]
    fn from_boxes_matches_membership(boxes: Vec<Box2<i8>>) -> TestResult {
        let boxes = widen(&boxes);
        let r = Region::from_boxes(&boxes).unwrap();
        if !r.selfcheck() {
            return TestResult::error(format!("selfcheck failed: {:?}", r));
        }

        let xs = boxes.iter().flat_map(|bx| vec![bx.min.x, bx.max.x]);
        let ys: Vec<_> = boxes.iter().flat_map(|bx| vec![bx.min.y, bx.max.y]).collect();
        for x in xs {
            for &y in ys.iter() {
                if r.contains_point(x, y) != membership(&boxes, x, y) {
                    return TestResult::error(format!("mismatch at {:?} in {:?}", (x, y), r));
                }
            }
        }
        TestResult::passed()
    }

    #[quickcheck]
    fn round_trip_through_boxes(boxes: Vec<Box2<i8>>) -> bool {
        let r = Region::from_boxes(&widen(&boxes)).unwrap();
        Region::from_boxes(r.boxes()).unwrap() == r
    }

    #[test]
    fn contains_point_random_pairs() {
        fn prop(boxes: Vec<Box2<i8>>, x: i8, y: i8) -> bool {
            let boxes = widen(&boxes);
            let r = Region::from_boxes(&boxes).unwrap();
            let (x, y) = (x as i32, y as i32);
            r.contains_point(x, y) == r.boxes().iter().any(|bx| bx.contains_point(&[x, y].into()))
                && r.contains_point(x, y) == membership(&boxes, x, y)
        }
        QuickCheck::new()
            .tests(10_000)
            .quickcheck(prop as fn(Vec<Box2<i8>>, i8, i8) -> bool);
    }

    #[quickcheck]
    fn contains_box_agrees_with_intersection(boxes: Vec<Box2<i8>>, probe: Box2<i8>) -> TestResult {
        let r = Region::from_boxes(&widen(&boxes)).unwrap();
        let probe = probe.cast::<i32>().unwrap();
        let covered = r.intersect_box(probe).unwrap().area();

        let expected = if covered == 0 {
            Overlap::Out
        } else if covered == probe.area() {
            Overlap::In
        } else {
            Overlap::Part
        };

        let actual = r.contains_box(&probe);
        if actual != expected {
            return TestResult::error(format!(
                "expected = {:?}, got = {:?} for {:?} in {:?}",
                expected, actual, probe, r
            ));
        }
        TestResult::passed()
    }

    #[quickcheck]
    fn translate_matches_translated_boxes(boxes: Vec<Box2<i8>>, dx: i8, dy: i8) -> bool {
        let boxes = widen(&boxes);
        let mut r = Region::from_boxes(&boxes).unwrap();
        r.translate(dx as i32, dy as i32).unwrap();

        let moved: Vec<_> = boxes
            .iter()
            .map(|bx| bx.translate([dx as i32, dy as i32].into()))
            .collect();
        r.selfcheck() && r == Region::from_boxes(&moved).unwrap()
    }
}
