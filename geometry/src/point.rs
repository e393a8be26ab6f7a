use std::ops::Add;

use serde_tuple::{Deserialize_tuple, Serialize_tuple};

use crate::Size;

/// A position in y-up pixel space.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn with_x(self, x: f64) -> Self {
        Self { x, ..self }
    }

    pub fn with_y(self, y: f64) -> Self {
        Self { y, ..self }
    }

    /// Component-wise division, used for normalizing pixel coordinates into texture space.
    pub fn normalized_by(self, size: Size) -> Self {
        Self::new(self.x / size.width, self.y / size.height)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl From<Point> for [f32; 2] {
    fn from(value: Point) -> Self {
        [value.x as f32, value.y as f32]
    }
}
