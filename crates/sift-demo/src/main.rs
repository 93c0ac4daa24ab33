//! Headless arena driver.
//!
//! Builds a ring of crates around the world edge, lets a handful of players
//! bounce around inside it, and logs per-frame collision stats.
//!
//! Configure with `SIFT_CONFIG` (path to a JSON resolver config) or with
//! `SIFT_RESOLVER`, `SIFT_MAP_WIDTH`, `SIFT_MAP_HEIGHT`, `SIFT_CELL_SIZE` and
//! `SIFT_TREE_MARGIN`. `SIFT_FRAMES` sets the frame count.

use std::path::PathBuf;

use sift_broadphase::{Bounded, GridConfig, Resolver, ResolverConfig, TreeConfig};
use sift_geom::Rect;
use sift_scene::{FrameStats, SceneCollider, SceneEntity};
use tracing::{info, warn};

const TILE: f32 = 48.0;
const PLAYERS: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Kind {
    Player,
    Crate,
}

#[derive(Clone, Copy, Debug)]
struct Actor {
    id: u32,
    kind: Kind,
    bounds: Rect,
    velocity: (f32, f32),
}

impl Bounded for Actor {
    type Handle = u32;

    fn handle(&self) -> u32 {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }
}

impl SceneEntity for Actor {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        self.kind
    }
}

impl Actor {
    /// Advance one frame, bouncing off the arena edges.
    fn step(&mut self, arena: Rect) {
        let b = &mut self.bounds;
        b.x += self.velocity.0;
        b.y += self.velocity.1;

        if b.min_x() < arena.min_x() || b.max_x() > arena.max_x() {
            self.velocity.0 = -self.velocity.0;
            b.x = b.x.min(arena.max_x() - b.width).max(arena.min_x());
        }
        if b.min_y() < arena.min_y() || b.max_y() > arena.max_y() {
            self.velocity.1 = -self.velocity.1;
            b.y = b.y.min(arena.max_y() - b.height).max(arena.min_y());
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_config(width: u32, height: u32) -> eyre::Result<ResolverConfig> {
    if let Some(path) = std::env::var_os("SIFT_CONFIG").map(PathBuf::from) {
        info!("Loading resolver config from {}", path.display());
        let json = std::fs::read_to_string(&path)?;
        return Ok(ResolverConfig::from_json(&json)?);
    }

    let strategy = std::env::var("SIFT_RESOLVER").unwrap_or_else(|_| "grid".to_owned());
    let config: ResolverConfig = match strategy.as_str() {
        "tree" => {
            TreeConfig::with_margin(env_or("SIFT_TREE_MARGIN", TreeConfig::DEFAULT_MARGIN)).into()
        }
        other => {
            if other != "grid" {
                warn!("Unknown SIFT_RESOLVER '{}', using grid", other);
            }
            GridConfig::square(width, height, env_or("SIFT_CELL_SIZE", 48)).into()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Crates along every edge of the arena, plus players spread across the floor.
fn arena(arena: Rect) -> Vec<Actor> {
    let mut actors = Vec::new();
    let cols = (arena.width / TILE) as u32;
    let rows = (arena.height / TILE) as u32;
    let far_x = TILE * cols.saturating_sub(1) as f32;
    let far_y = TILE * rows.saturating_sub(1) as f32;

    let mut push = |kind, x, y, velocity| {
        actors.push(Actor {
            id: 0,
            kind,
            bounds: Rect::new(x, y, TILE, TILE),
            velocity,
        });
    };

    for i in 0..cols {
        let x = TILE * i as f32;
        push(Kind::Crate, x, 0.0, (0.0, 0.0));
        push(Kind::Crate, x, far_y, (0.0, 0.0));
    }
    for i in 1..rows.saturating_sub(1) {
        let y = TILE * i as f32;
        push(Kind::Crate, 0.0, y, (0.0, 0.0));
        push(Kind::Crate, far_x, y, (0.0, 0.0));
    }
    for i in 0..PLAYERS {
        let t = (i + 1) as f32 / (PLAYERS + 1) as f32;
        let velocity = (3.5 + i as f32, 2.25 * (i % 3) as f32 - 2.0);
        push(
            Kind::Player,
            arena.width * t,
            arena.height * (1.0 - t),
            velocity,
        );
    }

    for (id, actor) in actors.iter_mut().enumerate() {
        actor.id = id as u32;
    }
    actors
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sift_demo=info".parse()?),
        )
        .init();

    let width: u32 = env_or("SIFT_MAP_WIDTH", 960);
    let height: u32 = env_or("SIFT_MAP_HEIGHT", 960);
    let frames: u32 = env_or("SIFT_FRAMES", 120);

    let config = load_config(width, height)?;
    let world = match config {
        ResolverConfig::Grid(grid) => {
            Rect::new(0.0, 0.0, grid.map_width as f32, grid.map_height as f32)
        }
        ResolverConfig::Tree(_) => Rect::new(0.0, 0.0, width as f32, height as f32),
    };

    let mut collider = SceneCollider::from_config(config)?;
    collider.register(Kind::Player, Kind::Crate);
    collider.register(Kind::Player, Kind::Player);

    let mut actors = arena(world);
    info!(
        "Running {} frames: {} actors, {} strategy, world {}x{}",
        frames,
        actors.len(),
        collider.resolver().strategy(),
        world.width,
        world.height
    );

    let mut totals = FrameStats::default();
    let mut wall_hits = 0_usize;
    let mut player_hits = 0_usize;

    for frame in 0..frames {
        for actor in actors.iter_mut().filter(|a| a.kind == Kind::Player) {
            actor.step(world);
        }

        let stats = collider.check_collisions_parallel(&actors, |_, other| match other.kind {
            Kind::Crate => wall_hits += 1,
            Kind::Player => player_hits += 1,
        });

        info!(
            frame,
            queries = stats.queries,
            candidates = stats.candidates,
            narrow_tests = stats.narrow_tests,
            collisions = stats.collisions,
            "frame"
        );

        totals.queries += stats.queries;
        totals.candidates += stats.candidates;
        totals.narrow_tests += stats.narrow_tests;
        totals.collisions += stats.collisions;
    }

    info!(
        "Done: {} queries, {} candidates, {} narrow tests, {} collisions ({} crate, {} player)",
        totals.queries,
        totals.candidates,
        totals.narrow_tests,
        totals.collisions,
        wall_hits,
        player_hits
    );

    if let Resolver::Grid(grid) = collider.resolver() {
        let occupancy = grid.occupancy();
        info!(
            "Grid {}x{} cells: {} registrations in {} occupied cells, {} clamped inserts",
            grid.cols(),
            grid.rows(),
            occupancy.registrations,
            occupancy.occupied_cells,
            occupancy.clamped_inserts
        );
    }

    Ok(())
}
