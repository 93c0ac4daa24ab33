//! The entity-facing side of the resolver contract.
//!
//! Resolvers never own entities. They copy out an opaque [`Bounded::Handle`]
//! at insertion time and read [`Bounded::bounds`] whenever an operation needs
//! the current rectangle.

use std::fmt::Debug;
use std::hash::Hash;

use sift_geom::Rect;

/// Anything that can be indexed by a broad-phase resolver.
pub trait Bounded {
    /// Opaque identifier stored inside the index.
    type Handle: Copy + Eq + Hash + Debug;

    /// The handle resolvers store and hand back from queries.
    fn handle(&self) -> Self::Handle;

    /// Current world-space bounding rectangle.
    ///
    /// Must be finite with non-negative extent; resolvers do not check.
    fn bounds(&self) -> Rect;
}

/// A handle paired with explicitly tracked bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proxy<H> {
    pub handle: H,
    pub bounds: Rect,
}

impl<H> Proxy<H> {
    #[must_use]
    pub const fn new(handle: H, bounds: Rect) -> Self {
        Self { handle, bounds }
    }
}

impl<H: Copy + Eq + Hash + Debug> Bounded for Proxy<H> {
    type Handle = H;

    fn handle(&self) -> H {
        self.handle
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }
}
