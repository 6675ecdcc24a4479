//! Panel hardware seam shared by the rendering backends.

use super::RenderError;
use embedded_graphics::prelude::Size;

/// Controller RAM plane
///
/// Pixel bits are 1 for white, most significant bit leftmost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamPlane {
    /// Black/white RAM holding the image to show
    Primary,
    /// Second RAM; the previous image a partial refresh is diffed against
    Secondary,
}

/// Waveform used to commit RAM to the glass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Full-frame flashing refresh
    Full,
    /// Fast refresh that only drives pixels differing from the secondary plane
    Partial,
}

/// E-paper panel controller
pub trait EpdPanel {
    /// Physical resolution, width a multiple of 8
    fn native_size(&self) -> Size;

    fn init(&mut self) -> Result<(), RenderError>;

    /// Write whole rows starting at `first_row`; `data` holds an integral number of rows
    fn write_plane(&mut self, plane: RamPlane, first_row: u32, data: &[u8])
    -> Result<(), RenderError>;

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), RenderError>;

    fn sleep(&mut self) -> Result<(), RenderError>;
}

/// Bytes per packed 1-bit row
pub fn row_bytes(width: u32) -> usize {
    width.div_ceil(8) as usize
}

/// Check that `data` is whole rows that fit below `first_row`, returning the row count
pub fn rows_in(native: Size, first_row: u32, data: &[u8]) -> Result<u32, RenderError> {
    let stride = row_bytes(native.width);
    if data.is_empty() || data.len() % stride != 0 {
        return Err(RenderError::InvalidBufferSize {
            expected: stride,
            actual: data.len(),
        });
    }

    let rows = (data.len() / stride) as u32;
    if first_row + rows > native.height {
        return Err(RenderError::WindowOutOfRange {
            first_row,
            rows,
            height: native.height,
        });
    }
    Ok(rows)
}
