use std::fmt::Debug;
use std::hash::Hash;

use sift_broadphase::Bounded;

/// An entity taking part in scene collision checks.
///
/// The kind selects which pair rules apply, e.g. a player kind tested against
/// a wall kind.
///
/// Only [`Bounded::bounds`] is consulted. The collider indexes entities by
/// their position in the frame slice, so [`Bounded::handle`] is never called
/// and may return anything.
pub trait SceneEntity: Bounded {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}
