use cgmath::Point2;
use quickcheck::{Arbitrary, Gen};

use super::Box2;

/// Generates well-formed boxes (`min <= max` on both axes). The generated
/// boxes may be empty.
impl<T: Arbitrary + PartialOrd + Copy> Arbitrary for Box2<T> {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let (x1, x2) = sorted(T::arbitrary(g), T::arbitrary(g));
        let (y1, y2) = sorted(T::arbitrary(g), T::arbitrary(g));
        Box2 {
            min: Point2::new(x1, y1),
            max: Point2::new(x2, y2),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let this = *self;
        Box::new(
            (this.min.x, this.min.y, this.max.x, this.max.y)
                .shrink()
                .filter_map(|(x1, y1, x2, y2)| {
                    if x1 <= x2 && y1 <= y2 {
                        Some(Box2 {
                            min: Point2::new(x1, y1),
                            max: Point2::new(x2, y2),
                        })
                    } else {
                        None
                    }
                }),
        )
    }
}

fn sorted<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
