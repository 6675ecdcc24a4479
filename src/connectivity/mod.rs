//! Network and broker connectivity.
//!
//! Two layers are kept up independently: the network link (interface
//! attachment) and the broker session on top of it. Every control-loop tick
//! retries whichever layer is down; failures are logged and never fatal.
//! Retries run at the tick cadence without backoff, each one bounded by its
//! attach or connect timeout.

pub mod link;
pub mod mqtt;

#[cfg(test)]
pub(crate) mod fakes;

pub use link::InterfaceLink;
pub use mqtt::MqttBroker;

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Connectivity errors (always transient)
#[derive(Error, Debug)]
pub enum ConnectivityError {
    #[error("network link {interface} not up after {timeout:?}")]
    LinkTimeout { interface: String, timeout: Duration },

    #[error("broker did not acknowledge session within {0:?}")]
    SessionTimeout(Duration),

    #[error("broker session failed: {0}")]
    Session(String),

    #[error("no open broker session")]
    NotConnected,

    #[error("incoming packet of {len} bytes exceeds {limit} byte limit")]
    PacketTooLarge { len: usize, limit: usize },
}

/// Delivery on the status topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Body(Bytes),
    /// Packet the transport refused to buffer; the session was reset
    Oversized { len: usize, limit: usize },
}

/// Composed state of both layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    /// Network link is down
    Disconnected,
    /// Network link up, no broker session
    LinkUp,
    /// Broker session open
    SessionUp,
}

impl ConnectivityState {
    /// Placeholder line shown on the panel before any message arrives
    pub fn summary(&self) -> &'static str {
        match self {
            ConnectivityState::Disconnected => "WiFi: connecting",
            ConnectivityState::LinkUp => "MQTT: reconnecting",
            ConnectivityState::SessionUp => "MQTT: online",
        }
    }
}

/// Network attachment beneath the broker session
#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    /// Live link state
    fn is_up(&self) -> bool;

    /// Wait for the link to come up, giving up after `timeout`
    async fn attach(&mut self, timeout: Duration) -> Result<(), ConnectivityError>;
}

/// Last-will registered with the broker (QoS 1, retained)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillMessage {
    pub topic: String,
    pub payload: String,
}

/// Parameters for opening a broker session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub will: Option<WillMessage>,
}

/// Publish/subscribe transport
#[allow(async_fn_in_trait)]
pub trait Broker {
    /// Live session state
    fn is_connected(&self) -> bool;

    /// Open a session, bounded by `timeout`
    async fn open(
        &mut self,
        request: &SessionRequest,
        timeout: Duration,
    ) -> Result<(), ConnectivityError>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectivityError>;

    /// Publish with at-least-once delivery and the retain flag set
    async fn publish_retained(&mut self, topic: &str, payload: &[u8])
    -> Result<(), ConnectivityError>;

    /// Service the session for `window`, appending received bodies to `inbox`
    ///
    /// An error means the session dropped; bodies received before the drop
    /// are still in `inbox`. A packet over the transport limit drops the
    /// session with [`ConnectivityError::PacketTooLarge`].
    async fn poll_messages(
        &mut self,
        window: Duration,
        inbox: &mut Vec<Bytes>,
    ) -> Result<(), ConnectivityError>;
}

/// Presence announcement channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub topic: String,
    pub online: String,
    pub offline: String,
}

/// Static settings for the connectivity manager
#[derive(Debug, Clone)]
pub struct ConnectivitySettings {
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub topic: String,
    pub presence: Option<Presence>,
    pub attach_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Keeps the network link and broker session up
pub struct ConnectivityManager<L, B> {
    link: L,
    broker: B,
    settings: ConnectivitySettings,
}

impl<L: NetworkLink, B: Broker> ConnectivityManager<L, B> {
    pub fn new(link: L, broker: B, settings: ConnectivitySettings) -> Self {
        Self {
            link,
            broker,
            settings,
        }
    }

    /// Probe both layers, network first
    pub fn state(&self) -> ConnectivityState {
        if !self.link.is_up() {
            ConnectivityState::Disconnected
        } else if !self.broker.is_connected() {
            ConnectivityState::LinkUp
        } else {
            ConnectivityState::SessionUp
        }
    }

    pub fn summary(&self) -> &'static str {
        self.state().summary()
    }

    /// Bring up whichever layer is down, at most one attempt each
    pub async fn maintain(&mut self) -> ConnectivityState {
        if !self.link.is_up() {
            match self.link.attach(self.settings.attach_timeout).await {
                Ok(()) => tracing::info!("Network link up"),
                Err(e) => {
                    tracing::warn!("Network attach failed: {}", e);
                    return ConnectivityState::Disconnected;
                }
            }
        }

        if !self.broker.is_connected() {
            if let Err(e) = self.open_session().await {
                tracing::warn!("MQTT connect failed: {}", e);
                return ConnectivityState::LinkUp;
            }
        }

        ConnectivityState::SessionUp
    }

    /// One control-loop step: maintain layers, then drain inbound messages
    ///
    /// Always takes at least `window` so a failing layer cannot spin the loop.
    pub async fn tick(&mut self, window: Duration) -> Vec<Inbound> {
        match self.maintain().await {
            ConnectivityState::SessionUp => self.service(window).await,
            _ => {
                tokio::time::sleep(window).await;
                Vec::new()
            }
        }
    }

    /// Receive whatever arrives within `window`
    pub async fn service(&mut self, window: Duration) -> Vec<Inbound> {
        let mut bodies = Vec::new();
        let result = self.broker.poll_messages(window, &mut bodies).await;
        let mut inbox: Vec<Inbound> = bodies.into_iter().map(Inbound::Body).collect();

        match result {
            Ok(()) => {}
            Err(ConnectivityError::PacketTooLarge { len, limit }) => {
                tracing::warn!(
                    "Dropped {} byte packet over the {} byte limit, session reset",
                    len,
                    limit
                );
                inbox.push(Inbound::Oversized { len, limit });
            }
            Err(e) => tracing::warn!("MQTT session lost: {}", e),
        }
        inbox
    }

    async fn open_session(&mut self) -> Result<(), ConnectivityError> {
        let request = SessionRequest {
            client_id: self.settings.client_id.clone(),
            credentials: self.settings.credentials.clone(),
            will: self.settings.presence.as_ref().map(|p| WillMessage {
                topic: p.topic.clone(),
                payload: p.offline.clone(),
            }),
        };

        self.broker
            .open(&request, self.settings.connect_timeout)
            .await?;
        tracing::info!("MQTT session open as {}", request.client_id);

        if let Err(e) = self.broker.subscribe(&self.settings.topic).await {
            tracing::warn!("Subscribe to {} failed: {}", self.settings.topic, e);
        }

        if let Some(presence) = &self.settings.presence {
            if let Err(e) = self
                .broker
                .publish_retained(&presence.topic, presence.online.as_bytes())
                .await
            {
                tracing::warn!("Presence publish to {} failed: {}", presence.topic, e);
            }
        }

        Ok(())
    }
}

/// Prefix for client ids derived from the device MAC
const CLIENT_ID_PREFIX: &str = "status-display-";

/// Use the configured client id, or derive one from the device MAC address
pub fn resolve_client_id(configured: &str) -> String {
    if !configured.trim().is_empty() {
        return configured.to_string();
    }

    match mac_address::get_mac_address() {
        Ok(Some(mac)) => derive_client_id(mac.bytes()),
        Ok(None) => {
            tracing::warn!("No MAC address found, deriving client id from pid");
            format!("{}{:X}", CLIENT_ID_PREFIX, std::process::id())
        }
        Err(e) => {
            tracing::warn!("MAC address lookup failed: {}", e);
            format!("{}{:X}", CLIENT_ID_PREFIX, std::process::id())
        }
    }
}

/// Low 32 bits of the MAC in hex
fn derive_client_id(mac: [u8; 6]) -> String {
    let low = u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]);
    format!("{}{:X}", CLIENT_ID_PREFIX, low)
}
