//! In-memory frame buffers for the two rendering backends.
//!
//! Both accept drawing in logical (rotated) coordinates and store pixels in
//! panel RAM order, so the packed bytes can be streamed to the controller
//! as-is.

use super::panel::row_bytes;
use super::rotation::Rotation;
use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::{BinaryColor, Gray2};
use embedded_graphics::prelude::*;
use std::convert::Infallible;
use std::ops::Range;

/// Gray level of a white pixel
const WHITE_LEVEL: u8 = 3;

/// Full-frame 4-level gray buffer
#[derive(Debug, Clone)]
pub struct GrayFrame {
    native: Size,
    rotation: Rotation,
    /// One luma value (0 black ..= 3 white) per physical pixel
    levels: Vec<u8>,
}

impl GrayFrame {
    pub fn new(native: Size, rotation: Rotation) -> Self {
        Self {
            native,
            rotation,
            levels: vec![WHITE_LEVEL; (native.width * native.height) as usize],
        }
    }

    /// Pack into one RAM plane; levels 2 and 3 show white, 0 and 1 black
    pub fn mono(&self) -> Vec<u8> {
        let width = self.native.width as usize;
        let stride = row_bytes(self.native.width);
        let mut bits = vec![0u8; stride * self.native.height as usize];

        for (i, &level) in self.levels.iter().enumerate() {
            if level & 0b10 != 0 {
                let (x, y) = (i % width, i / width);
                bits[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }

        bits
    }
}

impl OriginDimensions for GrayFrame {
    fn size(&self) -> Size {
        self.rotation.logical_size(self.native)
    }
}

impl DrawTarget for GrayFrame {
    type Color = Gray2;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.native.width as usize;
        for Pixel(point, color) in pixels {
            if let Some(p) = self.rotation.to_physical(point, self.native) {
                self.levels[p.y as usize * width + p.x as usize] = color.luma();
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.levels.fill(color.luma());
        Ok(())
    }
}

/// Monochrome buffer covering one band of physical rows
#[derive(Debug, Clone)]
pub struct PageBuffer {
    native: Size,
    rotation: Rotation,
    page_height: u32,
    first_row: u32,
    /// Packed rows, bit set = white
    bits: Vec<u8>,
}

impl PageBuffer {
    pub fn new(native: Size, rotation: Rotation, page_height: u32) -> Self {
        let page_height = page_height.clamp(1, native.height);
        Self {
            native,
            rotation,
            page_height,
            first_row: 0,
            bits: vec![0xff; row_bytes(native.width) * page_height as usize],
        }
    }

    pub fn native_size(&self) -> Size {
        self.native
    }

    /// Physical rows held by the current page
    pub fn window(&self) -> Range<u32> {
        self.first_row..(self.first_row + self.page_height).min(self.native.height)
    }

    /// Move to the band starting at `first_row` and blank it
    pub fn start_page(&mut self, first_row: u32) {
        self.first_row = first_row;
        self.bits.fill(0xff);
    }

    /// Packed bytes of the current page
    pub fn bytes(&self) -> &[u8] {
        let rows = self.window().len();
        &self.bits[..rows * row_bytes(self.native.width)]
    }
}

impl OriginDimensions for PageBuffer {
    fn size(&self) -> Size {
        self.rotation.logical_size(self.native)
    }
}

impl DrawTarget for PageBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let stride = row_bytes(self.native.width);
        let window = self.window();
        for Pixel(point, color) in pixels {
            let Some(p) = self.rotation.to_physical(point, self.native) else {
                continue;
            };
            if !window.contains(&(p.y as u32)) {
                continue;
            }
            let byte = (p.y as u32 - self.first_row) as usize * stride + p.x as usize / 8;
            let bit = 0x80 >> (p.x % 8);
            match color {
                BinaryColor::On => self.bits[byte] &= !bit,
                BinaryColor::Off => self.bits[byte] |= bit,
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = match color {
            BinaryColor::On => 0x00,
            BinaryColor::Off => 0xff,
        };
        self.bits.fill(fill);
        Ok(())
    }
}
