//! Broad-phase collision resolvers.
//!
//! Given a frame's moving bounded entities, a resolver answers "which
//! entities could possibly touch this rectangle?" cheaply enough that the
//! exact narrow-phase test only runs on a handful of candidates.
//!
//! # Strategies
//!
//! - [`UniformGrid`]: fixed world split into equal cells; an entity is stored
//!   in every cell its bounds cover. Out-of-world bounds clamp to the edge.
//! - [`DynamicTree`]: bounding-volume tree over fat boxes, no world limits.
//!
//! Both implement [`BroadPhase`]; [`Resolver`] picks one at construction from
//! a [`ResolverConfig`].
//!
//! # Usage
//!
//! ```
//! use sift_broadphase::{BroadPhase, GridConfig, Proxy, Resolver};
//! use sift_geom::Rect;
//!
//! let mut resolver = Resolver::from_config(GridConfig::square(480, 480, 48))?;
//!
//! // Rebuild every frame, then query.
//! resolver.clear();
//! resolver.insert(&Proxy::new(1_u32, Rect::new(40.0, 40.0, 48.0, 48.0)));
//! assert_eq!(resolver.retrieve(Rect::new(95.0, 95.0, 1.0, 1.0)), vec![1]);
//! # Ok::<(), sift_broadphase::ConfigError>(())
//! ```
//!
//! Results may repeat a handle (once per grid cell it shares with the query)
//! and may include entities that don't actually touch the query. They never
//! omit one that does.

mod config;
mod entity;
mod error;
mod grid;
mod resolver;
mod tree;

pub use config::{GridConfig, ResolverConfig, TreeConfig};
pub use entity::{Bounded, Proxy};
pub use error::{ConfigError, ConfigResult};
pub use grid::{GridOccupancy, UniformGrid};
pub use resolver::{BroadPhase, Resolver};
pub use tree::DynamicTree;
