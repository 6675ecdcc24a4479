//! Network link watcher backed by the kernel's interface state.
//!
//! Association and DHCP are handled by the system network manager; attaching
//! here means waiting, bounded, for the interface to report `up`.

use super::{ConnectivityError, NetworkLink};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Interval between interface state reads while attaching
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Link state read from `/sys/class/net/<iface>/operstate`
#[derive(Debug, Clone)]
pub struct InterfaceLink {
    interface: String,
    state_path: PathBuf,
}

impl InterfaceLink {
    pub fn new(interface: &str) -> Self {
        let state_path = Path::new("/sys/class/net")
            .join(interface)
            .join("operstate");
        Self::with_state_path(interface, state_path)
    }

    /// Read link state from an arbitrary file
    pub fn with_state_path(interface: &str, state_path: impl Into<PathBuf>) -> Self {
        Self {
            interface: interface.to_string(),
            state_path: state_path.into(),
        }
    }
}

impl NetworkLink for InterfaceLink {
    fn is_up(&self) -> bool {
        std::fs::read_to_string(&self.state_path)
            .map(|state| state.trim() == "up")
            .unwrap_or(false)
    }

    async fn attach(&mut self, timeout: Duration) -> Result<(), ConnectivityError> {
        tracing::debug!("Waiting up to {:?} for {} to come up", timeout, self.interface);
        let start = Instant::now();

        while !self.is_up() {
            if start.elapsed() >= timeout {
                return Err(ConnectivityError::LinkTimeout {
                    interface: self.interface.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let elapsed = start.elapsed();
        if elapsed > POLL_INTERVAL {
            tracing::debug!("{} up after {:?}", self.interface, elapsed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reports_operstate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operstate");

        let link = InterfaceLink::with_state_path("wlan0", &path);
        assert!(!link.is_up());

        std::fs::write(&path, "down\n").unwrap();
        assert!(!link.is_up());

        std::fs::write(&path, "up\n").unwrap();
        assert!(link.is_up());
    }

    #[tokio::test(start_paused = true)]
    async fn attach_gives_up_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operstate");
        std::fs::write(&path, "dormant\n").unwrap();

        let mut link = InterfaceLink::with_state_path("wlan0", &path);
        let start = Instant::now();
        let result = link.attach(Duration::from_secs(15)).await;

        assert!(matches!(
            result,
            Err(ConnectivityError::LinkTimeout { ref interface, .. }) if interface == "wlan0"
        ));
        assert!(start.elapsed() >= Duration::from_secs(15));
        assert!(start.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn attach_returns_immediately_when_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operstate");
        std::fs::write(&path, "up\n").unwrap();

        let mut link = InterfaceLink::with_state_path("eth0", &path);
        let start = Instant::now();
        link.attach(Duration::from_secs(15)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
