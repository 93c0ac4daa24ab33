//! Narrow-phase seam.
//!
//! The dispatcher only decides *which* pairs to test; the exact shape test
//! lives behind [`NarrowPhase`].

use sift_broadphase::Bounded;

/// Exact intersection test run on broad-phase candidate pairs.
pub trait NarrowPhase<E: ?Sized> {
    fn test(&self, a: &E, b: &E) -> bool;
}

/// Treats the bounding rectangles as the exact shapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundsIntersect;

impl<E: Bounded + ?Sized> NarrowPhase<E> for BoundsIntersect {
    fn test(&self, a: &E, b: &E) -> bool {
        a.bounds().intersects(&b.bounds())
    }
}
