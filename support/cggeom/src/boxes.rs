use cgmath::prelude::*;
use cgmath::{num_traits::NumCast, BaseNum, Point2, Vector2};
use std::ops::Add;

use super::{BoolArray, ElementWiseOp, ElementWisePartialOrd};

pub trait AxisAlignedBox<T>: Sized {
    type Point: EuclideanSpace
        + ElementWiseOp
        + ElementWisePartialOrd
        + Add<Self::Vector, Output = Self::Point>;
    type Vector: Clone;

    fn new(min: Self::Point, max: Self::Point) -> Self;

    fn min(&self) -> Self::Point;
    fn max(&self) -> Self::Point;

    fn zero() -> Self;

    #[inline]
    fn contains_point(&self, point: &Self::Point) -> bool
    where
        T: PartialOrd,
    {
        point.element_wise_ge(&self.min()).all() && point.element_wise_lt(&self.max()).all()
    }

    /// Check if `other` is entirely inside `self`. An empty `other` is
    /// contained by any box.
    #[inline]
    fn contains_box(&self, other: &Self) -> bool
    where
        T: PartialOrd,
    {
        other.is_empty()
            || (other.min().element_wise_ge(&self.min()).all()
                && other.max().element_wise_le(&self.max()).all())
    }

    fn is_valid(&self) -> bool;

    /// Check if the box has no area, i.e., either of its extents is not
    /// positive.
    fn is_empty(&self) -> bool;

    #[inline]
    fn size(&self) -> <Self::Point as EuclideanSpace>::Diff
    where
        T: BaseNum,
    {
        self.max() - self.min()
    }

    #[inline]
    fn union(&self, other: &Self) -> Self
    where
        T: BaseNum,
    {
        Self::new(
            self.min().element_wise_min(&other.min()),
            self.max().element_wise_max(&other.max()),
        )
    }

    #[inline]
    fn union_assign(&mut self, other: &Self)
    where
        T: BaseNum,
    {
        *self = self.union(other);
    }

    /// Get the intersection of two boxes. Returns `None` if they don't
    /// overlap (touching boxes don't overlap).
    #[inline]
    fn intersection(&self, other: &Self) -> Option<Self>
    where
        T: BaseNum,
    {
        let s = Self::new(
            self.min().element_wise_max(&other.min()),
            self.max().element_wise_min(&other.max()),
        );
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    #[inline]
    fn translate(&self, displacement: Self::Vector) -> Self {
        Self::new(
            self.min() + displacement.clone(),
            self.max() + displacement,
        )
    }
}

/// Represents an axis-aligned 2D box.
#[repr(C)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Box2<T> {
    /// The minimum coordinate (inclusive).
    pub min: Point2<T>,

    /// The maximum coordinate (exclusive).
    pub max: Point2<T>,
}

impl<T: BaseNum> AxisAlignedBox<T> for Box2<T> {
    type Point = Point2<T>;
    type Vector = Vector2<T>;

    #[inline]
    fn new(min: Self::Point, max: Self::Point) -> Self {
        Self { min, max }
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }
    #[inline]
    fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    #[inline]
    fn zero() -> Self {
        Self::new(
            Point2::new(T::zero(), T::zero()),
            Point2::new(T::zero(), T::zero()),
        )
    }

    #[inline]
    fn min(&self) -> Self::Point {
        self.min
    }
    #[inline]
    fn max(&self) -> Self::Point {
        self.max
    }
}

impl<S: NumCast + Copy> Box2<S> {
    /// Component-wise casting to another type
    #[inline]
    pub fn cast<T: NumCast>(&self) -> Option<Box2<T>> {
        let min = self.min.cast()?;
        let max = self.max.cast()?;
        Some(Box2 { min, max })
    }
}

/// The pieces of a box remaining after punching a hole in it.
///
/// Produced by [`Box2::split_around`]. The pieces are pairwise disjoint and,
/// together with the hole, exactly cover the original box.
///
/// ```text
///  ┌──────────────────────┐
///  │        above         │
///  ├──────┬───────┬───────┤
///  │ left │ hole  │ right │
///  ├──────┴───────┴───────┤
///  │        below         │
///  └──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Split {
    pub above: Option<Box2<i32>>,
    pub left: Option<Box2<i32>>,
    pub right: Option<Box2<i32>>,
    pub below: Option<Box2<i32>>,
}

impl Split {
    /// Iterate through the non-empty pieces in the order left, above, right,
    /// below.
    pub fn iter(&self) -> impl Iterator<Item = Box2<i32>> {
        use std::iter::once;
        once(self.left)
            .chain(once(self.above))
            .chain(once(self.right))
            .chain(once(self.below))
            .flatten()
    }

    pub fn len(&self) -> usize {
        [self.left, self.above, self.right, self.below]
            .iter()
            .filter(|x| x.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn non_empty(bx: Box2<i32>) -> Option<Box2<i32>> {
    if bx.is_empty() {
        None
    } else {
        Some(bx)
    }
}

impl Box2<i32> {
    /// The horizontal extent, saturated to the range of `i32`.
    #[inline]
    pub fn width(&self) -> i32 {
        self.max.x.saturating_sub(self.min.x)
    }

    /// The vertical extent, saturated to the range of `i32`.
    #[inline]
    pub fn height(&self) -> i32 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// The number of pixels covered by the box. Zero for an empty (or
    /// inverted) box.
    #[inline]
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            let w = <i64 as From<i32>>::from(self.max.x) - <i64 as From<i32>>::from(self.min.x);
            let h = <i64 as From<i32>>::from(self.max.y) - <i64 as From<i32>>::from(self.min.y);
            w as u64 * h as u64
        }
    }

    /// Translate the box, saturating each coordinate to the range of `i32`.
    ///
    /// A box translated this way and then clipped to a box inside the
    /// range is the same as the exact translation clipped to it.
    #[inline]
    pub fn saturating_translate(&self, d: Vector2<i32>) -> Self {
        Box2 {
            min: Point2::new(self.min.x.saturating_add(d.x), self.min.y.saturating_add(d.y)),
            max: Point2::new(self.max.x.saturating_add(d.x), self.max.y.saturating_add(d.y)),
        }
    }

    /// Check if `other` shares a full edge with `self`, so that their union
    /// is a box with no extra area.
    pub fn extends(&self, other: &Self) -> bool {
        let same_rows = self.min.y == other.min.y && self.max.y == other.max.y;
        let same_cols = self.min.x == other.min.x && self.max.x == other.max.x;
        (same_rows && (self.max.x == other.min.x || other.max.x == self.min.x))
            || (same_cols && (self.max.y == other.min.y || other.max.y == self.min.y))
    }

    /// Split `self` around `hole`, returning the parts of `self` not covered
    /// by `hole`.
    ///
    /// The pieces above and below span the full width of `self`; the pieces on
    /// the left and the right span the rows shared with `hole`. If `hole`
    /// doesn't intersect `self`, `above` is `self` and the other pieces are
    /// `None`.
    pub fn split_around(&self, hole: &Self) -> Split {
        let hole = match self.intersection(hole) {
            Some(x) => x,
            None => {
                return Split {
                    above: non_empty(*self),
                    ..Split::default()
                }
            }
        };

        Split {
            above: non_empty(Box2 {
                min: self.min,
                max: Point2::new(self.max.x, hole.min.y),
            }),
            left: non_empty(Box2 {
                min: Point2::new(self.min.x, hole.min.y),
                max: Point2::new(hole.min.x, hole.max.y),
            }),
            right: non_empty(Box2 {
                min: Point2::new(hole.max.x, hole.min.y),
                max: Point2::new(self.max.x, hole.max.y),
            }),
            below: non_empty(Box2 {
                min: Point2::new(self.min.x, hole.max.y),
                max: self.max,
            }),
        }
    }
}
