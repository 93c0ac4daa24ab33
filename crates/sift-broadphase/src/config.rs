//! Construction-time resolver configuration.
//!
//! ```json
//! { "strategy": "grid", "map_width": 480, "map_height": 480, "cell_width": 48, "cell_height": 48 }
//! { "strategy": "tree", "margin": 2.0 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Dimensions of a uniform grid world.
///
/// Smaller cells mean fewer false-positive candidates per query but more
/// cells per entity on insertion; larger cells trade the other way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// World width, same units as entity bounds.
    pub map_width: u32,
    /// World height, same units as entity bounds.
    pub map_height: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridConfig {
    #[must_use]
    pub const fn new(map_width: u32, map_height: u32, cell_width: u32, cell_height: u32) -> Self {
        Self {
            map_width,
            map_height,
            cell_width,
            cell_height,
        }
    }

    /// Grid with square cells of `cell_size`.
    #[must_use]
    pub const fn square(map_width: u32, map_height: u32, cell_size: u32) -> Self {
        Self::new(map_width, map_height, cell_size, cell_size)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(ConfigError::ZeroCellSize {
                width: self.cell_width,
                height: self.cell_height,
            });
        }
        if self.map_width == 0 || self.map_height == 0 {
            return Err(ConfigError::ZeroMapSize {
                width: self.map_width,
                height: self.map_height,
            });
        }
        Ok(())
    }

    /// `ceil(map_width / cell_width)`. Only meaningful once validated.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.map_width.div_ceil(self.cell_width)
    }

    /// `ceil(map_height / cell_height)`. Only meaningful once validated.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.map_height.div_ceil(self.cell_height)
    }
}

/// Dynamic tree tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Amount each leaf's box is inflated by, so small moves don't force a
    /// reinsert.
    pub margin: f32,
}

impl TreeConfig {
    pub const DEFAULT_MARGIN: f32 = 2.0;

    #[must_use]
    pub const fn with_margin(margin: f32) -> Self {
        Self { margin }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::InvalidMargin(self.margin));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::with_margin(Self::DEFAULT_MARGIN)
    }
}

/// Which strategy to build, and with what parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResolverConfig {
    Grid(GridConfig),
    Tree(TreeConfig),
}

impl ResolverConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::Grid(grid) => grid.validate(),
            Self::Tree(tree) => tree.validate(),
        }
    }
}

impl From<GridConfig> for ResolverConfig {
    fn from(config: GridConfig) -> Self {
        Self::Grid(config)
    }
}

impl From<TreeConfig> for ResolverConfig {
    fn from(config: TreeConfig) -> Self {
        Self::Tree(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cols_rows_round_up() {
        let config = GridConfig::square(480, 480, 48);
        assert_eq!((config.cols(), config.rows()), (10, 10));

        let config = GridConfig::new(500, 100, 48, 30);
        assert_eq!((config.cols(), config.rows()), (11, 4));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            GridConfig::new(480, 480, 0, 48).validate(),
            Err(ConfigError::ZeroCellSize { width: 0, height: 48 })
        ));
        assert!(matches!(
            GridConfig::new(0, 480, 48, 48).validate(),
            Err(ConfigError::ZeroMapSize { .. })
        ));
        assert!(matches!(
            TreeConfig::with_margin(-1.0).validate(),
            Err(ConfigError::InvalidMargin(_))
        ));
        assert!(TreeConfig::with_margin(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let grid = ResolverConfig::from_json(
            r#"{"strategy":"grid","map_width":480,"map_height":320,"cell_width":48,"cell_height":32}"#,
        )
        .unwrap();
        assert_eq!(grid, ResolverConfig::Grid(GridConfig::new(480, 320, 48, 32)));

        let tree = ResolverConfig::from_json(r#"{"strategy":"tree"}"#).unwrap();
        assert_eq!(tree, ResolverConfig::Tree(TreeConfig::default()));

        let tree = ResolverConfig::from_json(r#"{"strategy":"tree","margin":0.5}"#).unwrap();
        assert_eq!(tree, ResolverConfig::Tree(TreeConfig::with_margin(0.5)));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            ResolverConfig::from_json(r#"{"strategy":"quadtree"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ResolverConfig::from_json(
                r#"{"strategy":"grid","map_width":480,"map_height":480,"cell_width":0,"cell_height":48}"#
            ),
            Err(ConfigError::ZeroCellSize { .. })
        ));
    }
}
