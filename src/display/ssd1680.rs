//! SSD1680 e-paper controller driver (2.13" 122/128 x 250 panels).
//!
//! RAM is addressed in rows of `width / 8` bytes, x increasing then y
//! (data entry mode 0x03). The black/white RAM (0x24) holds the primary plane
//! and the second RAM (0x26) the secondary one. Both refreshes show the
//! primary plane; the partial waveform treats the secondary plane as the
//! image currently on the glass.

use super::RenderError;
use super::gpio::GpioController;
use super::panel::{EpdPanel, RamPlane, RefreshMode, row_bytes, rows_in};
use super::spi::SpiDisplay;
use crate::config::PinConfig;
use embedded_graphics::prelude::Size;

/// Controller commands
mod cmd {
    pub const DRIVER_OUTPUT: u8 = 0x01;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const TEMPERATURE_SENSOR: u8 = 0x18;
    pub const MASTER_ACTIVATION: u8 = 0x20;
    pub const UPDATE_CONTROL_2: u8 = 0x22;
    pub const WRITE_RAM_BW: u8 = 0x24;
    pub const WRITE_RAM_RED: u8 = 0x26;
    pub const BORDER_WAVEFORM: u8 = 0x3C;
    pub const RAM_X_RANGE: u8 = 0x44;
    pub const RAM_Y_RANGE: u8 = 0x45;
    pub const RAM_X_COUNTER: u8 = 0x4E;
    pub const RAM_Y_COUNTER: u8 = 0x4F;
}

/// Update sequences for UPDATE_CONTROL_2
const SEQUENCE_FULL: u8 = 0xF7;
const SEQUENCE_PARTIAL: u8 = 0xFF;

/// SSD1680 driver
pub struct Ssd1680 {
    gpio: GpioController,
    spi: SpiDisplay,
    native: Size,
    initialized: bool,
    /// A full refresh has established the base image since init
    base_written: bool,
}

impl Ssd1680 {
    pub fn new(native: Size, pins: &PinConfig, spi_speed_hz: u32) -> Result<Self, RenderError> {
        let gpio = GpioController::new(pins)?;
        let spi = SpiDisplay::new(spi_speed_hz)?;

        Ok(Self {
            gpio,
            spi,
            native,
            initialized: false,
            base_written: false,
        })
    }

    fn send_command(&mut self, cmd: u8) -> Result<(), RenderError> {
        self.spi.write_command(&mut self.gpio, cmd)?;
        Ok(())
    }

    fn send_command_data(&mut self, cmd: u8, data: &[u8]) -> Result<(), RenderError> {
        self.spi.write_command_data(&mut self.gpio, cmd, data)?;
        Ok(())
    }

    /// Restrict RAM writes to rows `first..=last` and park the counters at `first`
    fn set_row_window(&mut self, first: u32, last: u32) -> Result<(), RenderError> {
        let last_column = (row_bytes(self.native.width) - 1) as u8;
        let [f_lo, f_hi] = (first as u16).to_le_bytes();
        let [l_lo, l_hi] = (last as u16).to_le_bytes();

        self.send_command_data(cmd::RAM_X_RANGE, &[0x00, last_column])?;
        self.send_command_data(cmd::RAM_Y_RANGE, &[f_lo, f_hi, l_lo, l_hi])?;
        self.send_command_data(cmd::RAM_X_COUNTER, &[0x00])?;
        self.send_command_data(cmd::RAM_Y_COUNTER, &[f_lo, f_hi])?;
        Ok(())
    }

    fn activate(&mut self, sequence: u8) -> Result<(), RenderError> {
        self.send_command_data(cmd::UPDATE_CONTROL_2, &[sequence])?;
        self.send_command(cmd::MASTER_ACTIVATION)?;
        self.gpio.wait_busy()?;
        Ok(())
    }
}

impl EpdPanel for Ssd1680 {
    fn native_size(&self) -> Size {
        self.native
    }

    fn init(&mut self) -> Result<(), RenderError> {
        tracing::info!(
            "Initializing SSD1680 display ({}x{})",
            self.native.width,
            self.native.height
        );

        self.gpio.power_on();
        self.gpio.reset();
        self.gpio.wait_busy()?;

        self.send_command(cmd::SW_RESET)?;
        self.gpio.wait_busy()?;

        let [g_lo, g_hi] = ((self.native.height - 1) as u16).to_le_bytes();
        self.send_command_data(cmd::DRIVER_OUTPUT, &[g_lo, g_hi, 0x00])?;
        self.send_command_data(cmd::DATA_ENTRY_MODE, &[0x03])?;
        self.set_row_window(0, self.native.height - 1)?;
        self.send_command_data(cmd::BORDER_WAVEFORM, &[0x05])?;
        // internal temperature sensor
        self.send_command_data(cmd::TEMPERATURE_SENSOR, &[0x80])?;
        self.gpio.wait_busy()?;

        self.initialized = true;
        self.base_written = false;
        tracing::info!("Display initialized successfully");

        Ok(())
    }

    fn write_plane(
        &mut self,
        plane: RamPlane,
        first_row: u32,
        data: &[u8],
    ) -> Result<(), RenderError> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }
        let rows = rows_in(self.native, first_row, data)?;

        self.set_row_window(first_row, first_row + rows - 1)?;
        let ram = match plane {
            RamPlane::Primary => cmd::WRITE_RAM_BW,
            RamPlane::Secondary => cmd::WRITE_RAM_RED,
        };
        self.send_command_data(ram, data)?;

        tracing::debug!("Wrote {} rows at {} to {:?}", rows, first_row, plane);
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), RenderError> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }

        let sequence = match mode {
            RefreshMode::Partial if self.base_written => SEQUENCE_PARTIAL,
            _ => SEQUENCE_FULL,
        };
        tracing::debug!("Refreshing ({:?}, sequence {:#04x})", mode, sequence);

        self.activate(sequence)?;
        self.base_written = true;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), RenderError> {
        tracing::info!("Putting display to sleep");

        self.send_command_data(cmd::DEEP_SLEEP, &[0x01])?;
        self.gpio.power_off();
        self.initialized = false;

        Ok(())
    }
}

impl Drop for Ssd1680 {
    fn drop(&mut self) {
        if self.initialized {
            let _ = self.sleep();
        }
    }
}
