//! Control loop tying connectivity, decoding and rendering together.
//!
//! The controller owns every piece of runtime state. Each tick keeps the link
//! and broker session up, folds any received payloads into the model and
//! redraws the panel when the scheduler says so.

use crate::connectivity::{Broker, ConnectivityManager, Inbound, NetworkLink};
use crate::decoder::{DecodeError, PayloadDecoder};
use crate::display::{DisplayAdapter, RenderContext};
use crate::scheduler::{RenderScheduler, RenderTrigger};
use crate::status::StatusModel;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;

pub struct Controller<L, B, D> {
    connectivity: ConnectivityManager<L, B>,
    decoder: PayloadDecoder,
    model: StatusModel,
    scheduler: RenderScheduler,
    display: D,
    service_window: Duration,
}

impl<L, B, D> Controller<L, B, D>
where
    L: NetworkLink,
    B: Broker,
    D: DisplayAdapter,
{
    pub fn new(
        connectivity: ConnectivityManager<L, B>,
        decoder: PayloadDecoder,
        scheduler: RenderScheduler,
        display: D,
        service_window: Duration,
    ) -> Self {
        let model = decoder.placeholder();
        Self {
            connectivity,
            decoder,
            model,
            scheduler,
            display,
            service_window,
        }
    }

    #[allow(dead_code)]
    pub fn model(&self) -> &StatusModel {
        &self.model
    }

    /// First connectivity attempt followed by the unconditional startup render
    pub async fn startup(&mut self) {
        let state = self.connectivity.maintain().await;
        tracing::info!("Initial connectivity: {}", state.summary());
        self.render(RenderTrigger::Startup, Instant::now());
    }

    /// One loop iteration; returns the render trigger if the panel was redrawn
    pub async fn tick(&mut self) -> Option<RenderTrigger> {
        for inbound in self.connectivity.tick(self.service_window).await {
            match inbound {
                Inbound::Body(body) => self.ingest(&body),
                Inbound::Oversized { len, limit } => {
                    self.reject(DecodeError::Oversized { len, limit })
                }
            }
        }

        let now = Instant::now();
        let trigger = self.scheduler.poll(now)?;
        self.render(trigger, now);
        Some(trigger)
    }

    /// Fold one message body into the model
    pub fn ingest(&mut self, body: &[u8]) {
        match self.decoder.decode(body) {
            Ok(model) => {
                tracing::debug!(
                    "Status update: {} [{}] with {} metrics",
                    model.title,
                    model.status,
                    model.metrics.len()
                );
                self.model = model;
            }
            Err(e) => self.reject(e),
        }
    }

    fn reject(&mut self, e: DecodeError) {
        tracing::warn!("Rejected status payload: {}", e);
        self.model.mark_decode_failure(&e.to_string(), Instant::now());
    }

    fn render(&mut self, trigger: RenderTrigger, now: Instant) {
        let ctx = RenderContext {
            now,
            link_summary: self.connectivity.summary(),
        };

        match self.display.render_frame(&self.model, &ctx) {
            Ok(()) => tracing::info!("Display refreshed ({:?})", trigger),
            Err(e) => tracing::error!("Display refresh failed ({:?}): {}", trigger, e),
        }

        self.scheduler.mark_rendered(now);
    }

    /// Run until a shutdown signal arrives, then put the panel to sleep
    ///
    /// Shutdown is observed between ticks; a tick in progress always finishes.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            "Controller started, refresh every {:?}",
            self.scheduler.interval()
        );
        self.startup().await;

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }
            self.tick().await;
        }

        tracing::info!("Controller shutting down");
        if let Err(e) = self.display.sleep() {
            tracing::warn!("Failed to put display to sleep: {}", e);
        }
    }
}
