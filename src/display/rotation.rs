//! Mapping between the logical (rotated) drawing surface and panel RAM.

use embedded_graphics::prelude::{Point, Size};

/// Rotation angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl From<u16> for Rotation {
    fn from(degrees: u16) -> Self {
        match degrees {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }
}

impl Rotation {
    /// Size of the drawing surface for a panel of `native` size
    pub fn logical_size(self, native: Size) -> Size {
        match self {
            Rotation::None | Rotation::Rotate180 => native,
            Rotation::Rotate90 | Rotation::Rotate270 => Size::new(native.height, native.width),
        }
    }

    /// Panel RAM coordinate for a logical point, `None` when off-surface
    pub fn to_physical(self, point: Point, native: Size) -> Option<Point> {
        let logical = self.logical_size(native);
        if point.x < 0
            || point.y < 0
            || point.x >= logical.width as i32
            || point.y >= logical.height as i32
        {
            return None;
        }

        let w = native.width as i32;
        let h = native.height as i32;
        let physical = match self {
            Rotation::None => point,
            Rotation::Rotate90 => Point::new(w - 1 - point.y, point.x),
            Rotation::Rotate180 => Point::new(w - 1 - point.x, h - 1 - point.y),
            Rotation::Rotate270 => Point::new(point.y, h - 1 - point.x),
        };
        Some(physical)
    }
}
