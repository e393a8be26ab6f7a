use std::ops;

use crate::{Point, SizePx};

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<SizePx> for Size {
    fn from(size: SizePx) -> Self {
        Size::new(size.width as f64, size.height as f64)
    }
}

impl ops::Add<Size> for Point {
    type Output = Point;

    fn add(self, rhs: Size) -> Self::Output {
        Point::new(self.x + rhs.width, self.y + rhs.height)
    }
}
