//! Per-frame collision dispatch.
//!
//! Each frame the collider rebuilds its resolver from the live entity slice,
//! asks it for the candidates of every entity that has pair rules, narrows
//! those down with the [`NarrowPhase`], and reports the survivors.
//!
//! ```text
//! clear ─▶ insert all ─▶ query per rule-bearing entity ─▶ dedupe/filter ─▶ narrow ─▶ callback
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use sift_broadphase::{BroadPhase, ConfigResult, Proxy, Resolver, ResolverConfig};
use smallvec::SmallVec;
use tracing::debug;

use crate::entity::SceneEntity;
use crate::narrow::{BoundsIntersect, NarrowPhase};

/// Counters for one `check_collisions` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entities indexed this frame.
    pub entities: usize,
    /// Broad-phase queries issued.
    pub queries: usize,
    /// Raw candidates returned, duplicates included.
    pub candidates: usize,
    /// Pairs handed to the narrow phase.
    pub narrow_tests: usize,
    /// Pairs the narrow phase confirmed.
    pub collisions: usize,
}

/// Scene collision dispatcher over a broad-phase [`Resolver`].
///
/// Entities are indexed by their position in the slice passed to
/// [`Self::check_collisions`], so the resolver never outlives the frame's
/// view of them.
pub struct SceneCollider<K, N = BoundsIntersect> {
    resolver: Resolver<usize>,
    /// Source kind -> kinds it is tested against.
    rules: HashMap<K, SmallVec<[K; 4]>>,
    narrow: N,
    candidates: Vec<usize>,
    seen: HashSet<usize>,
}

impl<K: Debug, N> Debug for SceneCollider<K, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneCollider")
            .field("resolver", &self.resolver)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + Hash + Debug> SceneCollider<K> {
    /// Collider using bounds intersection as the narrow phase.
    #[must_use]
    pub fn new(resolver: Resolver<usize>) -> Self {
        Self {
            resolver,
            rules: HashMap::new(),
            narrow: BoundsIntersect,
            candidates: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn from_config(config: impl Into<ResolverConfig>) -> ConfigResult<Self> {
        Ok(Self::new(Resolver::from_config(config)?))
    }
}

impl<K: Copy + Eq + Hash + Debug, N> SceneCollider<K, N> {
    /// Swap in a different narrow phase, keeping rules and resolver.
    pub fn with_narrow_phase<M>(self, narrow: M) -> SceneCollider<K, M> {
        SceneCollider {
            resolver: self.resolver,
            rules: self.rules,
            narrow,
            candidates: self.candidates,
            seen: self.seen,
        }
    }

    /// Test entities of kind `source` against entities of kind `target`.
    ///
    /// Callbacks receive the `source` entity first. Registering the same pair
    /// twice has no extra effect.
    pub fn register(&mut self, source: K, target: K) {
        let targets = self.rules.entry(source).or_default();
        if !targets.contains(&target) {
            targets.push(target);
            debug!(?source, ?target, "registered collision pair");
        }
    }

    #[must_use]
    pub fn is_registered(&self, source: K, target: K) -> bool {
        self.rules
            .get(&source)
            .is_some_and(|targets| targets.contains(&target))
    }

    #[must_use]
    pub const fn resolver(&self) -> &Resolver<usize> {
        &self.resolver
    }

    /// Run one frame: rebuild, query, narrow, and call `on_collision(source,
    /// target)` for every confirmed pair.
    pub fn check_collisions<E, F>(&mut self, entities: &[E], mut on_collision: F) -> FrameStats
    where
        E: SceneEntity<Kind = K>,
        N: NarrowPhase<E>,
        F: FnMut(&E, &E),
    {
        let (pairs, mut stats) = self.candidate_pairs(entities);

        for &(a, b) in &pairs {
            let (a, b) = (&entities[a], &entities[b]);
            if self.narrow.test(a, b) {
                stats.collisions += 1;
                on_collision(a, b);
            }
        }

        log_frame(&stats);
        stats
    }

    /// Like [`Self::check_collisions`], but runs the narrow phase on the rayon
    /// pool.
    ///
    /// The broad phase still runs on the calling thread and finishes before
    /// the fan-out starts; workers only read the frame's candidate list.
    /// Callbacks run afterwards on the calling thread, in the same order the
    /// sequential path would use.
    pub fn check_collisions_parallel<E, F>(
        &mut self,
        entities: &[E],
        mut on_collision: F,
    ) -> FrameStats
    where
        E: SceneEntity<Kind = K> + Sync,
        N: NarrowPhase<E> + Sync,
        F: FnMut(&E, &E),
    {
        let (pairs, mut stats) = self.candidate_pairs(entities);

        let narrow = &self.narrow;
        let hits: Vec<bool> = pairs
            .par_iter()
            .map(|&(a, b)| narrow.test(&entities[a], &entities[b]))
            .collect();

        for (&(a, b), hit) in pairs.iter().zip(hits) {
            if hit {
                stats.collisions += 1;
                on_collision(&entities[a], &entities[b]);
            }
        }

        log_frame(&stats);
        stats
    }

    /// Rebuild the index and collect deduplicated `(source, target)` index
    /// pairs that pass the kind rules.
    fn candidate_pairs<E>(&mut self, entities: &[E]) -> (Vec<(usize, usize)>, FrameStats)
    where
        E: SceneEntity<Kind = K>,
    {
        let mut stats = FrameStats {
            entities: entities.len(),
            ..FrameStats::default()
        };

        self.resolver.clear();
        for (index, entity) in entities.iter().enumerate() {
            self.resolver.insert(&Proxy::new(index, entity.bounds()));
        }

        let mut pairs = Vec::new();
        for (index, entity) in entities.iter().enumerate() {
            let Some(targets) = self.rules.get(&entity.kind()) else {
                continue;
            };

            self.resolver
                .retrieve_into(entity.bounds(), &mut self.candidates);
            stats.queries += 1;
            stats.candidates += self.candidates.len();

            // Grid results repeat an entity once per shared cell.
            self.seen.clear();
            for &other in &self.candidates {
                if other == index || !self.seen.insert(other) {
                    continue;
                }
                if targets.contains(&entities[other].kind()) {
                    pairs.push((index, other));
                }
            }
        }

        stats.narrow_tests = pairs.len();
        (pairs, stats)
    }
}

fn log_frame(stats: &FrameStats) {
    debug!(
        entities = stats.entities,
        queries = stats.queries,
        candidates = stats.candidates,
        narrow_tests = stats.narrow_tests,
        collisions = stats.collisions,
        "collision frame"
    );
}

#[cfg(test)]
mod tests {
    use sift_broadphase::{Bounded, GridConfig, TreeConfig};
    use sift_geom::Rect;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Kind {
        Player,
        Wall,
    }

    #[derive(Clone, Copy, Debug)]
    struct Body {
        id: u32,
        kind: Kind,
        bounds: Rect,
    }

    impl Bounded for Body {
        type Handle = u32;

        fn handle(&self) -> u32 {
            self.id
        }

        fn bounds(&self) -> Rect {
            self.bounds
        }
    }

    impl SceneEntity for Body {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.kind
        }
    }

    fn body(id: u32, kind: Kind, x: f32, y: f32) -> Body {
        Body {
            id,
            kind,
            bounds: Rect::new(x, y, 48.0, 48.0),
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut collider = SceneCollider::from_config(TreeConfig::default()).unwrap();
        collider.register(Kind::Player, Kind::Wall);
        collider.register(Kind::Player, Kind::Wall);

        assert!(collider.is_registered(Kind::Player, Kind::Wall));
        assert!(!collider.is_registered(Kind::Wall, Kind::Player));
        assert_eq!(collider.rules[&Kind::Player].len(), 1);
    }

    #[test]
    fn test_unregistered_kinds_are_not_queried() {
        let mut collider = SceneCollider::from_config(GridConfig::square(480, 480, 48)).unwrap();
        collider.register(Kind::Player, Kind::Wall);
        let walls = [body(1, Kind::Wall, 0.0, 0.0), body(2, Kind::Wall, 24.0, 0.0)];

        let stats = collider.check_collisions(&walls, |_, _| panic!("walls never collide"));
        assert_eq!(stats.entities, 2);
        assert_eq!(stats.queries, 0);
        assert_eq!(stats.collisions, 0);
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let mut collider = SceneCollider::from_config(GridConfig::square(480, 480, 48)).unwrap();
        collider.register(Kind::Player, Kind::Wall);
        // Both span four cells each and share all four.
        let bodies = [body(1, Kind::Player, 24.0, 24.0), body(2, Kind::Wall, 30.0, 30.0)];

        let mut hits = Vec::new();
        let stats = collider.check_collisions(&bodies, |a, b| hits.push((a.id, b.id)));

        assert_eq!(hits, vec![(1, 2)]);
        assert_eq!(stats.candidates, 8);
        assert_eq!(stats.narrow_tests, 1);
        assert_eq!(stats.collisions, 1);
    }

    #[test]
    fn test_custom_narrow_phase() {
        struct Never;
        impl NarrowPhase<Body> for Never {
            fn test(&self, _: &Body, _: &Body) -> bool {
                false
            }
        }

        let mut collider = SceneCollider::from_config(GridConfig::square(480, 480, 48))
            .unwrap()
            .with_narrow_phase(Never);
        collider.register(Kind::Player, Kind::Wall);
        let bodies = [body(1, Kind::Player, 0.0, 0.0), body(2, Kind::Wall, 10.0, 0.0)];

        let stats = collider.check_collisions(&bodies, |_, _| panic!("narrow phase rejects all"));
        assert_eq!(stats.narrow_tests, 1);
        assert_eq!(stats.collisions, 0);
    }
}
