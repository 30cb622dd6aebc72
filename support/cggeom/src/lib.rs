//! A helper library for `cgmath`.
//!
//! Provides the axis-aligned box type shared by the region algebra and the
//! compositor, along with a handful of integer-box operations used for
//! damage tracking.
pub extern crate cgmath;

mod boxes;
mod elementwise;

#[cfg(any(test, feature = "quickcheck"))]
mod arbitrary;

pub use self::boxes::*;
pub use self::elementwise::*;

/// Construct a [`Box2`].
///
/// ```
/// use cggeom::{box2, Box2};
/// let bx: Box2<i32> = box2! { min: [1, 2], max: [3, 4] };
/// assert_eq!(bx.min.y, 2);
/// let unit: Box2<f32> = box2! { min: [0.0; 2], max: [1.0; 2] };
/// assert_eq!(unit.max.x, 1.0);
/// ```
#[macro_export]
macro_rules! box2 {
    {min: $min:expr, max: $max:expr $(,)?} => {
        $crate::Box2 {
            min: $crate::cgmath::Point2::from($min),
            max: $crate::cgmath::Point2::from($max),
        }
    };
}

/// The prelude.
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{AxisAlignedBox, BoolArray, ElementWiseOp, ElementWisePartialOrd};
}
