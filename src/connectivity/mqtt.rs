//! MQTT broker session over rumqttc.

use super::{Broker, ConnectivityError, SessionRequest};
use bytes::Bytes;
use rumqttc::mqttbytes::Error as PacketError;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, LastWill, MqttOptions, Packet, QoS,
    StateError,
};
use std::time::Duration;
use tokio::time::Instant;

/// Request channel depth between client handle and event loop
const REQUEST_CAPACITY: usize = 10;

/// Packet ceiling; bodies between the decoder limit and this size reach the
/// decoder, larger ones are reported as [`ConnectivityError::PacketTooLarge`]
const MAX_PACKET_SIZE: usize = 64 * 1024;

/// Broker endpoint settings
#[derive(Debug, Clone)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
}

/// MQTT session; a fresh client is built for every open
pub struct MqttBroker {
    endpoint: BrokerEndpoint,
    client: Option<AsyncClient>,
    eventloop: Option<EventLoop>,
}

impl MqttBroker {
    pub fn new(endpoint: BrokerEndpoint) -> Self {
        Self {
            endpoint,
            client: None,
            eventloop: None,
        }
    }

    /// Drop the session without a DISCONNECT so the broker fires the last-will
    pub fn abandon(&mut self) {
        self.client = None;
        self.eventloop = None;
    }

    fn options(&self, request: &SessionRequest) -> MqttOptions {
        let mut options = MqttOptions::new(
            request.client_id.clone(),
            self.endpoint.host.clone(),
            self.endpoint.port,
        );
        options
            .set_keep_alive(self.endpoint.keep_alive)
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        if let Some((username, password)) = &request.credentials {
            options.set_credentials(username.clone(), password.clone());
        }

        if let Some(will) = &request.will {
            options.set_last_will(LastWill::new(
                will.topic.clone(),
                will.payload.clone().into_bytes(),
                QoS::AtLeastOnce,
                true,
            ));
        }

        options
    }

    fn client(&self) -> Result<&AsyncClient, ConnectivityError> {
        self.client.as_ref().ok_or(ConnectivityError::NotConnected)
    }
}

impl Broker for MqttBroker {
    fn is_connected(&self) -> bool {
        self.eventloop.is_some()
    }

    async fn open(
        &mut self,
        request: &SessionRequest,
        timeout: Duration,
    ) -> Result<(), ConnectivityError> {
        self.abandon();

        tracing::debug!(
            "Connecting to {}:{} as {}",
            self.endpoint.host,
            self.endpoint.port,
            request.client_id
        );

        let (client, mut eventloop) = AsyncClient::new(self.options(request), REQUEST_CAPACITY);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(ConnectivityError::Session(e.to_string())),
                }
            }
        };
        let outcome = tokio::time::timeout(timeout, handshake).await;

        match outcome {
            Ok(Ok(())) => {
                self.client = Some(client);
                self.eventloop = Some(eventloop);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ConnectivityError::SessionTimeout(timeout)),
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectivityError> {
        self.client()?
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| ConnectivityError::Session(e.to_string()))
    }

    async fn publish_retained(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), ConnectivityError> {
        self.client()?
            .publish(topic, QoS::AtLeastOnce, true, payload.to_vec())
            .await
            .map_err(|e| ConnectivityError::Session(e.to_string()))
    }

    async fn poll_messages(
        &mut self,
        window: Duration,
        inbox: &mut Vec<Bytes>,
    ) -> Result<(), ConnectivityError> {
        let eventloop = self
            .eventloop
            .as_mut()
            .ok_or(ConnectivityError::NotConnected)?;
        let deadline = Instant::now() + window;

        let failure = loop {
            match tokio::time::timeout_at(deadline, eventloop.poll()).await {
                Err(_) => break None,
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    tracing::debug!(
                        "Received {} bytes on {}",
                        publish.payload.len(),
                        publish.topic
                    );
                    inbox.push(publish.payload);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => break Some(e),
            }
        };

        match failure {
            None => Ok(()),
            Some(e) => {
                self.abandon();
                Err(session_error(e))
            }
        }
    }
}

/// Classify an event loop failure; an over-limit packet leaves the stream
/// unsynchronised, so the session is lost either way
fn session_error(e: ConnectionError) -> ConnectivityError {
    match e {
        ConnectionError::MqttState(StateError::Deserialization(
            PacketError::PayloadSizeLimitExceeded(len),
        )) => ConnectivityError::PacketTooLarge {
            len,
            limit: MAX_PACKET_SIZE,
        },
        other => ConnectivityError::Session(other.to_string()),
    }
}
