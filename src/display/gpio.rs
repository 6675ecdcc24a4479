//! GPIO controller for the e-paper panel.
//!
//! Manages the control lines of an SSD1680 HAT (BCM numbering, configurable):
//! - RST (Reset): GPIO 17
//! - DC (Data/Command): GPIO 25
//! - BUSY: GPIO 24
//! - PWR (Power): GPIO 18

use crate::config::PinConfig;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest refresh the controller is allowed before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// GPIO-related errors
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("GPIO initialization failed: {0}")]
    InitError(#[from] rppal::gpio::Error),

    #[error("Busy timeout: panel did not respond within {0:?}")]
    BusyTimeout(Duration),
}

/// GPIO controller for the panel
pub struct GpioController {
    rst: OutputPin,
    dc: OutputPin,
    pwr: OutputPin,
    busy: InputPin,
}

impl GpioController {
    /// Claim the configured pins
    pub fn new(pins: &PinConfig) -> Result<Self, GpioError> {
        let gpio = Gpio::new()?;

        let mut rst = gpio.get(pins.rst)?.into_output();
        let mut dc = gpio.get(pins.dc)?.into_output();
        let mut pwr = gpio.get(pins.pwr)?.into_output();
        let busy = gpio.get(pins.busy)?.into_input();

        rst.set_high();
        dc.set_low();
        pwr.set_low();

        tracing::debug!(
            "GPIO initialized: RST={}, DC={}, BUSY={}, PWR={}",
            pins.rst,
            pins.dc,
            pins.busy,
            pins.pwr
        );

        Ok(Self { rst, dc, pwr, busy })
    }

    /// Perform hardware reset sequence
    pub fn reset(&mut self) {
        tracing::debug!("Performing hardware reset");

        self.rst.set_high();
        thread::sleep(Duration::from_millis(20));

        self.rst.set_low();
        thread::sleep(Duration::from_millis(2));

        self.rst.set_high();
        thread::sleep(Duration::from_millis(20));
    }

    /// Wait for the controller to finish (BUSY pin goes low)
    ///
    /// The SSD1680 holds BUSY HIGH while it is working.
    pub fn wait_busy(&self) -> Result<(), GpioError> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        while self.busy.read() == Level::High {
            if start.elapsed() > BUSY_TIMEOUT {
                return Err(GpioError::BusyTimeout(BUSY_TIMEOUT));
            }
            thread::sleep(poll_interval);
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::debug!("BUSY wait completed after {:?}", elapsed);
        }

        Ok(())
    }

    /// Set DC pin low (command mode)
    #[inline]
    pub fn dc_low(&mut self) {
        self.dc.set_low();
    }

    /// Set DC pin high (data mode)
    #[inline]
    pub fn dc_high(&mut self) {
        self.dc.set_high();
    }

    /// Enable panel power
    pub fn power_on(&mut self) {
        tracing::debug!("Display power ON");
        self.pwr.set_high();
        thread::sleep(Duration::from_millis(10));
    }

    /// Disable panel power
    pub fn power_off(&mut self) {
        tracing::debug!("Display power OFF");
        self.pwr.set_low();
    }
}

impl Drop for GpioController {
    fn drop(&mut self) {
        self.pwr.set_low();
        tracing::debug!("GPIO controller dropped, power disabled");
    }
}
