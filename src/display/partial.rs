//! Partial-refresh backend.
//!
//! Drawing happens in a 4-level gray frame that is thresholded to black and
//! white on commit. The partial waveform compares the new image in the
//! primary RAM against the previous image in the secondary RAM, so the
//! secondary plane is rewritten after every partial refresh.

use super::canvas::{GraphicsCanvas, Ink};
use super::frame::{FrameContent, paint};
use super::framebuffer::GrayFrame;
use super::layout::Layout;
use super::panel::{EpdPanel, RamPlane, RefreshMode};
use super::rotation::Rotation;
use super::{DisplayAdapter, RenderContext, RenderError};
use crate::status::StatusModel;
use embedded_graphics::prelude::*;

/// Draws the whole frame in memory and commits it with one partial refresh
pub struct PartialRefreshDisplay<P> {
    panel: P,
    frame: GrayFrame,
    initialized: bool,
}

impl<P: EpdPanel> PartialRefreshDisplay<P> {
    pub fn new(panel: P, rotation: Rotation) -> Self {
        let frame = GrayFrame::new(panel.native_size(), rotation);
        Self {
            panel,
            frame,
            initialized: false,
        }
    }

    fn ensure_init(&mut self) -> Result<(), RenderError> {
        if !self.initialized {
            self.panel.init()?;
            self.initialized = true;
        }
        Ok(())
    }

    fn commit(&mut self, mode: RefreshMode) -> Result<(), RenderError> {
        let bits = self.frame.mono();
        self.panel.write_plane(RamPlane::Primary, 0, &bits)?;
        match mode {
            RefreshMode::Full => {
                self.panel.write_plane(RamPlane::Secondary, 0, &bits)?;
                self.panel.refresh(mode)
            }
            RefreshMode::Partial => {
                self.panel.refresh(mode)?;
                self.panel.write_plane(RamPlane::Secondary, 0, &bits)
            }
        }
    }
}

impl<P: EpdPanel> DisplayAdapter for PartialRefreshDisplay<P> {
    fn geometry(&self) -> Size {
        self.frame.size()
    }

    fn render_frame(
        &mut self,
        model: &StatusModel,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        self.ensure_init()?;

        let content = FrameContent::compose(model, ctx);
        paint(
            &mut GraphicsCanvas::new(&mut self.frame),
            &content,
            &Layout::COMPACT,
        );

        self.commit(RefreshMode::Partial)
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.ensure_init()?;
        let Ok(()) = self.frame.clear(Ink::White.into());
        self.commit(RefreshMode::Full)
    }

    fn sleep(&mut self) -> Result<(), RenderError> {
        if self.initialized {
            self.panel.sleep()?;
            self.initialized = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::testing::{MockPanel, PanelCall};
    use crate::status::StatusDefaults;
    use tokio::time::Instant;

    fn display() -> (PartialRefreshDisplay<MockPanel>, MockPanel) {
        let panel = MockPanel::new(Size::new(128, 250));
        (
            PartialRefreshDisplay::new(panel.clone(), Rotation::Rotate90),
            panel,
        )
    }

    fn model() -> StatusModel {
        let mut model = StatusModel::placeholder(&StatusDefaults {
            subtitle: "Lab".to_string(),
            metrics_capacity: 4,
        });
        model.status = "OK".to_string();
        model.metrics.try_push("cpu", "7%");
        model
    }

    #[test]
    fn geometry_is_rotated() {
        let (display, _) = display();
        assert_eq!(display.geometry(), Size::new(250, 128));
    }

    #[test]
    fn partial_refresh_keeps_previous_image_in_secondary_plane() {
        let (mut display, panel) = display();
        let ctx = RenderContext {
            now: Instant::now(),
            link_summary: "MQTT: online",
        };
        display.render_frame(&model(), &ctx).unwrap();

        let calls = panel.take_calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], PanelCall::Init);
        let PanelCall::Write {
            plane: RamPlane::Primary,
            first_row: 0,
            data: first,
        } = &calls[1]
        else {
            panic!("expected primary write, got {:?}", calls[1]);
        };
        assert_eq!(first.len(), 16 * 250);
        assert_eq!(calls[2], PanelCall::Refresh(RefreshMode::Partial));
        assert_eq!(
            calls[3],
            PanelCall::Write {
                plane: RamPlane::Secondary,
                first_row: 0,
                data: first.clone(),
            }
        );

        let mut changed = model();
        changed.status = "FAIL".to_string();
        display.render_frame(&changed, &ctx).unwrap();

        let calls = panel.take_calls();
        let PanelCall::Write { data: second, .. } = &calls[0] else {
            panic!("expected primary write, got {:?}", calls[0]);
        };
        assert_ne!(second, first);
        assert_eq!(calls[1], PanelCall::Refresh(RefreshMode::Partial));
        assert!(matches!(
            &calls[2],
            PanelCall::Write { plane: RamPlane::Secondary, data, .. } if data == second
        ));
    }

    #[test]
    fn same_model_renders_identically() {
        let (mut display, panel) = display();
        let ctx = RenderContext {
            now: Instant::now(),
            link_summary: "MQTT: online",
        };
        let model = model();

        display.render_frame(&model, &ctx).unwrap();
        let mut first = panel.take_calls();
        first.remove(0);
        display.render_frame(&model, &ctx).unwrap();
        let second = panel.take_calls();

        assert_eq!(first, second);
    }

    #[test]
    fn clear_blanks_with_full_refresh_and_sleep_is_idempotent() {
        let (mut display, panel) = display();
        display.clear().unwrap();

        let calls = panel.take_calls();
        assert_eq!(calls.len(), 4);
        for (call, plane) in calls[1..3].iter().zip([RamPlane::Primary, RamPlane::Secondary]) {
            assert!(matches!(
                call,
                PanelCall::Write { plane: p, data, .. } if *p == plane && data.iter().all(|&b| b == 0xff)
            ));
        }
        assert_eq!(calls[3], PanelCall::Refresh(RefreshMode::Full));

        display.sleep().unwrap();
        display.sleep().unwrap();
        assert_eq!(panel.calls(), vec![PanelCall::Sleep]);
    }

    #[test]
    fn refresh_failure_is_reported() {
        let (mut display, panel) = display();
        panel.set_fail_refresh(true);
        let ctx = RenderContext {
            now: Instant::now(),
            link_summary: "MQTT: online",
        };
        assert!(matches!(
            display.render_frame(&model(), &ctx),
            Err(RenderError::Gpio(_))
        ));
    }
}
