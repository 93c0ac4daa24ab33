//! Scene-level collision dispatch on top of `sift-broadphase`.
//!
//! A [`SceneCollider`] owns a broad-phase [`Resolver`](sift_broadphase::Resolver)
//! and a table of kind pair rules. Every frame it rebuilds the index from the
//! caller's entities and fires a callback for each registered pair that
//! passes the narrow phase.
//!
//! ```
//! use sift_broadphase::{Bounded, GridConfig};
//! use sift_geom::Rect;
//! use sift_scene::{SceneCollider, SceneEntity};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Kind { Player, Crate }
//!
//! struct Body(u32, Kind, Rect);
//!
//! impl Bounded for Body {
//!     type Handle = u32;
//!     fn handle(&self) -> u32 { self.0 }
//!     fn bounds(&self) -> Rect { self.2 }
//! }
//!
//! impl SceneEntity for Body {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { self.1 }
//! }
//!
//! let mut collider = SceneCollider::from_config(GridConfig::square(480, 480, 48))?;
//! collider.register(Kind::Player, Kind::Crate);
//!
//! let bodies = [
//!     Body(0, Kind::Player, Rect::new(10.0, 10.0, 48.0, 48.0)),
//!     Body(1, Kind::Crate, Rect::new(40.0, 40.0, 48.0, 48.0)),
//! ];
//! let mut hits = Vec::new();
//! collider.check_collisions(&bodies, |a, b| hits.push((a.0, b.0)));
//! assert_eq!(hits, vec![(0, 1)]);
//! # Ok::<(), sift_broadphase::ConfigError>(())
//! ```

mod collider;
mod entity;
mod narrow;

pub use collider::{FrameStats, SceneCollider};
pub use entity::SceneEntity;
pub use narrow::{BoundsIntersect, NarrowPhase};
