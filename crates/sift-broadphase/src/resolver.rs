//! The broad-phase contract and construction-time strategy selection.

use std::fmt::Debug;
use std::hash::Hash;

use sift_geom::Rect;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::entity::Bounded;
use crate::error::ConfigResult;
use crate::grid::UniformGrid;
use crate::tree::DynamicTree;

/// Broad-phase resolver: indexes entity handles by bounds and answers
/// rectangle queries with a candidate set.
///
/// Results are candidates only. False positives are expected; a false
/// negative (an entity whose bounds intersect the query but is missing from
/// the result) is a bug in the implementation.
///
/// Insertion never deduplicates. Inserting the same entity twice registers it
/// twice, and it takes two removals to clear it.
pub trait BroadPhase<H: Copy + Eq + Hash + Debug> {
    /// Remove every indexed entity.
    fn clear(&mut self);

    /// Index one entity under its current bounds.
    fn insert<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E);

    /// Insert each entity in iteration order.
    fn insert_all<'a, E, I>(&mut self, entities: I)
    where
        E: Bounded<Handle = H> + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        for entity in entities {
            self.insert(entity);
        }
    }

    /// Remove one registration of `entity`. Removing an entity that is not
    /// indexed is a no-op.
    fn remove<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E);

    /// Move an indexed entity that was inserted under `previous` bounds to its
    /// current bounds.
    fn relocate<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E, previous: Rect);

    /// Overwrite `out` with the candidates for `query`.
    fn retrieve_into(&self, query: Rect, out: &mut Vec<H>);

    /// Candidates for `query`, freshly allocated.
    fn retrieve(&self, query: Rect) -> Vec<H> {
        let mut out = Vec::new();
        self.retrieve_into(query, &mut out);
        out
    }

    /// Number of live index entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A broad-phase resolver whose strategy is picked at construction.
#[derive(Debug)]
pub enum Resolver<H> {
    Grid(UniformGrid<H>),
    Tree(DynamicTree<H>),
}

impl<H: Copy + Eq + Hash + Debug> Resolver<H> {
    /// Build the strategy described by `config`.
    pub fn from_config(config: impl Into<ResolverConfig>) -> ConfigResult<Self> {
        let config = config.into();
        let resolver = match config {
            ResolverConfig::Grid(grid) => Self::Grid(UniformGrid::new(grid)?),
            ResolverConfig::Tree(tree) => Self::Tree(DynamicTree::new(tree)?),
        };
        debug!(strategy = resolver.strategy(), "resolver constructed");
        Ok(resolver)
    }

    /// Short strategy name, as used in configuration.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Grid(_) => "grid",
            Self::Tree(_) => "tree",
        }
    }
}

impl<H: Copy + Eq + Hash + Debug> BroadPhase<H> for Resolver<H> {
    fn clear(&mut self) {
        match self {
            Self::Grid(grid) => grid.clear(),
            Self::Tree(tree) => tree.clear(),
        }
    }

    fn insert<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        match self {
            Self::Grid(grid) => grid.insert(entity),
            Self::Tree(tree) => tree.insert(entity),
        }
    }

    fn remove<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        match self {
            Self::Grid(grid) => grid.remove(entity),
            Self::Tree(tree) => tree.remove(entity),
        }
    }

    fn relocate<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E, previous: Rect) {
        match self {
            Self::Grid(grid) => grid.relocate(entity, previous),
            Self::Tree(tree) => tree.relocate(entity, previous),
        }
    }

    fn retrieve_into(&self, query: Rect, out: &mut Vec<H>) {
        match self {
            Self::Grid(grid) => grid.retrieve_into(query, out),
            Self::Tree(tree) => tree.retrieve_into(query, out),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Grid(grid) => grid.len(),
            Self::Tree(tree) => tree.len(),
        }
    }
}
