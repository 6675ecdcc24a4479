//! SPI link to the panel controller.
//!
//! SPI0 with CE0, mode 0, clock taken from the display configuration.

use super::gpio::GpioController;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use thiserror::Error;

/// Largest single transfer accepted by the spidev default buffer
const CHUNK_SIZE: usize = 4096;

/// SPI-related errors
#[derive(Error, Debug)]
pub enum SpiError {
    #[error("SPI initialization failed: {0}")]
    InitError(#[from] rppal::spi::Error),

    #[error("SPI write failed: {0}")]
    WriteError(String),
}

/// SPI display interface
pub struct SpiDisplay {
    spi: Spi,
}

impl SpiDisplay {
    pub fn new(clock_speed: u32) -> Result<Self, SpiError> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_speed, Mode::Mode0)?;

        tracing::debug!(
            "SPI initialized: Bus=SPI0, SS=CE0, Speed={}Hz, Mode=0",
            clock_speed
        );

        Ok(Self { spi })
    }

    /// Send a command byte with DC low
    pub fn write_command(&mut self, gpio: &mut GpioController, cmd: u8) -> Result<(), SpiError> {
        gpio.dc_low();
        self.spi
            .write(&[cmd])
            .map_err(|e| SpiError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Send data bytes with DC high
    pub fn write_data(&mut self, gpio: &mut GpioController, data: &[u8]) -> Result<(), SpiError> {
        gpio.dc_high();

        for chunk in data.chunks(CHUNK_SIZE) {
            self.spi
                .write(chunk)
                .map_err(|e| SpiError::WriteError(e.to_string()))?;
        }

        Ok(())
    }

    /// Send command followed by data bytes
    pub fn write_command_data(
        &mut self,
        gpio: &mut GpioController,
        cmd: u8,
        data: &[u8],
    ) -> Result<(), SpiError> {
        self.write_command(gpio, cmd)?;
        if !data.is_empty() {
            self.write_data(gpio, data)?;
        }
        Ok(())
    }
}
