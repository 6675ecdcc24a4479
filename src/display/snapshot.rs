//! Panel that writes each refresh to a PNG instead of glass.

use super::RenderError;
use super::panel::{EpdPanel, RamPlane, RefreshMode, row_bytes, rows_in};
use embedded_graphics::prelude::Size;
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};

pub struct SnapshotPanel {
    native: Size,
    path: PathBuf,
    /// New-image RAM; the previous-image RAM only steers the waveform
    primary: Vec<u8>,
}

impl SnapshotPanel {
    pub fn new(native: Size, path: impl AsRef<Path>) -> Self {
        let len = row_bytes(native.width) * native.height as usize;
        Self {
            native,
            path: path.as_ref().to_path_buf(),
            primary: vec![0xff; len],
        }
    }

    /// Decode RAM the way the glass ends up after either refresh
    fn image(&self) -> GrayImage {
        let stride = row_bytes(self.native.width);
        GrayImage::from_fn(self.native.width, self.native.height, |x, y| {
            let byte = self.primary[y as usize * stride + x as usize / 8];
            Luma([((byte >> (7 - x % 8)) & 1) * 255])
        })
    }
}

impl EpdPanel for SnapshotPanel {
    fn native_size(&self) -> Size {
        self.native
    }

    fn init(&mut self) -> Result<(), RenderError> {
        tracing::info!("Snapshot panel writing to {}", self.path.display());
        Ok(())
    }

    fn write_plane(
        &mut self,
        plane: RamPlane,
        first_row: u32,
        data: &[u8],
    ) -> Result<(), RenderError> {
        rows_in(self.native, first_row, data)?;
        if plane == RamPlane::Primary {
            let offset = first_row as usize * row_bytes(self.native.width);
            self.primary[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), RenderError> {
        self.image().save(&self.path)?;
        tracing::debug!("Snapshot ({:?}) saved to {}", mode, self.path.display());
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}
