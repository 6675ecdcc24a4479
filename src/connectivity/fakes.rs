//! In-memory link and broker for exercising the control loop without a network.

use super::{Broker, ConnectivityError, NetworkLink, SessionRequest};
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug)]
struct LinkState {
    up: bool,
    attach_succeeds: bool,
    attach_calls: usize,
}

/// Network link whose state is shared with the test through clones
#[derive(Debug, Clone)]
pub struct FakeLink {
    state: Rc<RefCell<LinkState>>,
}

impl FakeLink {
    fn with(up: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(LinkState {
                up,
                attach_succeeds: true,
                attach_calls: 0,
            })),
        }
    }

    pub fn up() -> Self {
        Self::with(true)
    }

    pub fn down() -> Self {
        Self::with(false)
    }

    pub fn set_up(&self, up: bool) {
        self.state.borrow_mut().up = up;
    }

    pub fn set_attach_succeeds(&self, succeeds: bool) {
        self.state.borrow_mut().attach_succeeds = succeeds;
    }

    pub fn attach_calls(&self) -> usize {
        self.state.borrow().attach_calls
    }
}

impl NetworkLink for FakeLink {
    fn is_up(&self) -> bool {
        self.state.borrow().up
    }

    async fn attach(&mut self, timeout: Duration) -> Result<(), ConnectivityError> {
        let succeeds = {
            let mut state = self.state.borrow_mut();
            state.attach_calls += 1;
            state.attach_succeeds
        };

        if succeeds {
            self.state.borrow_mut().up = true;
            Ok(())
        } else {
            tokio::time::sleep(timeout).await;
            Err(ConnectivityError::LinkTimeout {
                interface: "fake0".to_string(),
                timeout,
            })
        }
    }
}

/// Broker interaction recorded by [`FakeBroker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Open(SessionRequest),
    Subscribe(String),
    Publish { topic: String, payload: Vec<u8> },
}

/// Transport limit reported for packets queued with [`FakeBroker::queue_oversized`]
pub const FAKE_PACKET_LIMIT: usize = 16 * 1024;

#[derive(Debug)]
struct BrokerState {
    connected: bool,
    open_succeeds: bool,
    calls: Vec<BrokerCall>,
    queued: VecDeque<Bytes>,
    /// Length of a packet that breaks the session after the queue drains
    oversized: Option<usize>,
}

/// Broker whose state is shared with the test through clones
#[derive(Debug, Clone)]
pub struct FakeBroker {
    state: Rc<RefCell<BrokerState>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BrokerState {
                connected: false,
                open_succeeds: true,
                calls: Vec::new(),
                queued: VecDeque::new(),
                oversized: None,
            })),
        }
    }

    pub fn set_open_succeeds(&self, succeeds: bool) {
        self.state.borrow_mut().open_succeeds = succeeds;
    }

    /// Simulate the broker dropping the session
    pub fn drop_session(&self) {
        self.state.borrow_mut().connected = false;
    }

    /// Deliver a body on the next poll
    pub fn queue(&self, body: &[u8]) {
        self.state
            .borrow_mut()
            .queued
            .push_back(Bytes::copy_from_slice(body));
    }

    /// Deliver a packet too large for the transport on the next poll
    pub fn queue_oversized(&self, len: usize) {
        self.state.borrow_mut().oversized = Some(len);
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.state.borrow().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.count(|call| matches!(call, BrokerCall::Open(_)))
    }

    pub fn publish_count(&self) -> usize {
        self.count(|call| matches!(call, BrokerCall::Publish { .. }))
    }

    fn count(&self, pred: impl Fn(&BrokerCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }
}

impl Broker for FakeBroker {
    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    async fn open(
        &mut self,
        request: &SessionRequest,
        timeout: Duration,
    ) -> Result<(), ConnectivityError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BrokerCall::Open(request.clone()));
        if state.open_succeeds {
            state.connected = true;
            Ok(())
        } else {
            Err(ConnectivityError::SessionTimeout(timeout))
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectivityError> {
        self.state
            .borrow_mut()
            .calls
            .push(BrokerCall::Subscribe(topic.to_string()));
        Ok(())
    }

    async fn publish_retained(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), ConnectivityError> {
        self.state.borrow_mut().calls.push(BrokerCall::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn poll_messages(
        &mut self,
        window: Duration,
        inbox: &mut Vec<Bytes>,
    ) -> Result<(), ConnectivityError> {
        {
            let mut state = self.state.borrow_mut();
            if !state.connected {
                return Err(ConnectivityError::NotConnected);
            }
            inbox.extend(state.queued.drain(..));
            if let Some(len) = state.oversized.take() {
                state.connected = false;
                return Err(ConnectivityError::PacketTooLarge {
                    len,
                    limit: FAKE_PACKET_LIMIT,
                });
            }
        }
        tokio::time::sleep(window).await;
        Ok(())
    }
}
