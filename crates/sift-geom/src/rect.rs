//! Axis-aligned rectangles in world space.

/// Axis-aligned bounding rectangle.
///
/// `x`/`y` are the top-left corner; `width`/`height` extend towards +x/+y and
/// are expected to be non-negative. Values are `f32` in the same units as the
/// world the rectangle lives in.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and extent.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from opposite corners.
    #[must_use]
    pub fn from_min_max(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y, "invalid rect: min > max");
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[must_use]
    pub const fn min_x(&self) -> f32 {
        self.x
    }

    #[must_use]
    pub const fn min_y(&self) -> f32 {
        self.y
    }

    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Returns `true` if the two rectangles share a region of positive area.
    ///
    /// Touching edges do not count; this is the predicate the grid's cell
    /// mapping is exact against.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// Returns `true` if the closed rectangles overlap (touching counts).
    ///
    /// Zero-area rectangles overlap anything they lie on.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max_x() < other.x
            || other.max_x() < self.x
            || self.max_y() < other.y
            || other.max_y() < self.y)
    }

    /// Returns `true` if `other` lies entirely inside `self` (edges inclusive).
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Smallest rectangle enclosing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_min_max(
            self.x.min(other.x),
            self.y.min(other.y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            margin.mul_add(2.0, self.width),
            margin.mul_add(2.0, self.height),
        )
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Perimeter, used as the insertion cost metric by the dynamic tree.
    #[must_use]
    pub fn perimeter(&self) -> f32 {
        2.0 * (self.width + self.height)
    }

    /// A rectangle with zero width or zero height.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
