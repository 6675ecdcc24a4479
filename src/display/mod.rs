//! Display module for e-paper status rendering.
//!
//! A [`DisplayAdapter`] turns a [`StatusModel`] into a physical image. Two
//! backends share one frame composer:
//! - [`PartialRefreshDisplay`]: full-frame buffer committed with a fast
//!   partial refresh against the previous image
//! - [`PagedDisplay`]: monochrome page buffer streamed band by band, followed
//!   by one full refresh
//!
//! Both drive an [`EpdPanel`](panel::EpdPanel), either the SSD1680 controller over SPI or a
//! PNG snapshot for running without hardware.

pub mod canvas;
pub mod frame;
pub mod framebuffer;
pub mod gpio;
pub mod layout;
pub mod paged;
pub mod panel;
pub mod partial;
pub mod rotation;
pub mod snapshot;
pub mod spi;
pub mod ssd1680;

#[cfg(test)]
pub(crate) mod testing;

pub use gpio::GpioError;
pub use paged::PagedDisplay;
pub use partial::PartialRefreshDisplay;
pub use rotation::Rotation;
pub use snapshot::SnapshotPanel;
pub use spi::SpiError;
pub use ssd1680::Ssd1680;

use crate::config::{BackendKind, DisplayConfig};
use crate::status::StatusModel;
use embedded_graphics::prelude::Size;
use thiserror::Error;
use tokio::time::Instant;

/// Display driver errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    #[error("SPI error: {0}")]
    Spi(#[from] SpiError),

    #[error("Display not initialized")]
    NotInitialized,

    #[error("Invalid buffer size: expected a multiple of {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("Rows {first_row}..+{rows} exceed panel height {height}")]
    WindowOutOfRange { first_row: u32, rows: u32, height: u32 },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] image::ImageError),
}

/// Per-render inputs that are not part of the model
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub now: Instant,
    /// Live connectivity summary, used by the footer fallback
    pub link_summary: &'a str,
}

/// Rendering backend
pub trait DisplayAdapter {
    /// Logical drawing size after rotation
    fn geometry(&self) -> Size;

    fn render_frame(
        &mut self,
        model: &StatusModel,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError>;

    /// Blank the panel to white
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Put the panel into its lowest-power state
    fn sleep(&mut self) -> Result<(), RenderError>;
}

impl<T: DisplayAdapter + ?Sized> DisplayAdapter for Box<T> {
    fn geometry(&self) -> Size {
        (**self).geometry()
    }

    fn render_frame(
        &mut self,
        model: &StatusModel,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        (**self).render_frame(model, ctx)
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        (**self).clear()
    }

    fn sleep(&mut self) -> Result<(), RenderError> {
        (**self).sleep()
    }
}

/// Build the configured backend
pub fn open(config: &DisplayConfig) -> Result<Box<dyn DisplayAdapter>, RenderError> {
    let native = Size::new(config.width, config.height);
    let rotation = Rotation::from(config.rotation);

    let adapter: Box<dyn DisplayAdapter> = match config.backend {
        BackendKind::Partial => {
            let panel = Ssd1680::new(native, &config.pins, config.spi_speed_hz)?;
            Box::new(PartialRefreshDisplay::new(panel, rotation))
        }
        BackendKind::Paged => {
            let panel = Ssd1680::new(native, &config.pins, config.spi_speed_hz)?;
            Box::new(PagedDisplay::new(panel, rotation, config.page_height))
        }
        BackendKind::Snapshot => {
            let panel = SnapshotPanel::new(native, &config.snapshot_path);
            Box::new(PagedDisplay::new(panel, rotation, config.page_height))
        }
    };

    tracing::info!(
        "Display backend {:?}: {}x{} native, {:?}, logical {:?}",
        config.backend,
        native.width,
        native.height,
        rotation,
        adapter.geometry()
    );

    Ok(adapter)
}
