//! Full-refresh monochrome backend drawing through a page buffer.
//!
//! Only one band of physical rows is held in memory. Every page repaints the
//! whole frame and keeps the pixels that fall inside the band; the band is
//! flushed to panel RAM and the last flush triggers a single full refresh.

use super::canvas::GraphicsCanvas;
use super::frame::{FrameContent, paint};
use super::framebuffer::PageBuffer;
use super::layout::Layout;
use super::panel::{EpdPanel, RamPlane, RefreshMode};
use super::rotation::Rotation;
use super::{DisplayAdapter, RenderContext, RenderError};
use crate::status::StatusModel;
use embedded_graphics::prelude::*;

pub struct PagedDisplay<P> {
    panel: P,
    page: PageBuffer,
    initialized: bool,
}

impl<P: EpdPanel> PagedDisplay<P> {
    pub fn new(panel: P, rotation: Rotation, page_height: u32) -> Self {
        let page = PageBuffer::new(panel.native_size(), rotation, page_height);
        Self {
            panel,
            page,
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

    fn first_page(&mut self) {
        self.page.start_page(0);
    }

    /// Flush the current band; `false` once the last band went out and the
    /// panel has refreshed
    fn next_page(&mut self) -> Result<bool, RenderError> {
        let window = self.page.window();
        self.panel
            .write_plane(RamPlane::Primary, window.start, self.page.bytes())?;

        if window.end >= self.page.native_size().height {
            self.panel.refresh(RefreshMode::Full)?;
            return Ok(false);
        }

        self.page.start_page(window.end);
        Ok(true)
    }

    /// Run the page loop, calling `draw` once per band
    fn draw_pages<F>(&mut self, mut draw: F) -> Result<(), RenderError>
    where
        F: FnMut(&mut PageBuffer),
    {
        self.ensure_init()?;
        self.first_page();
        loop {
            draw(&mut self.page);
            if !self.next_page()? {
                return Ok(());
            }
        }
    }
}

impl<P: EpdPanel> DisplayAdapter for PagedDisplay<P> {
    fn geometry(&self) -> Size {
        self.page.size()
    }

    fn render_frame(
        &mut self,
        model: &StatusModel,
        ctx: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        let content = FrameContent::compose(model, ctx);
        self.draw_pages(|page| {
            paint(&mut GraphicsCanvas::new(page), &content, &Layout::FRAMED);
        })
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        // pages start blank
        self.draw_pages(|_| {})
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

    fn model() -> StatusModel {
        StatusModel::placeholder(&StatusDefaults {
            subtitle: "Lab".to_string(),
            metrics_capacity: 4,
        })
    }

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            now: Instant::now(),
            link_summary: "WiFi: connecting",
        }
    }

    #[test]
    fn pages_cover_panel_then_refresh_once() {
        let panel = MockPanel::new(Size::new(128, 250));
        let mut display = PagedDisplay::new(panel.clone(), Rotation::Rotate90, 64);
        assert_eq!(display.geometry(), Size::new(250, 128));

        display.render_frame(&model(), &ctx()).unwrap();

        let calls = panel.calls();
        assert_eq!(calls.first(), Some(&PanelCall::Init));
        let bands: Vec<(u32, usize)> = calls
            .iter()
            .filter_map(|call| match call {
                PanelCall::Write {
                    plane: RamPlane::Primary,
                    first_row,
                    data,
                } => Some((*first_row, data.len() / 16)),
                _ => None,
            })
            .collect();
        assert_eq!(bands, vec![(0, 64), (64, 64), (128, 64), (192, 58)]);
        assert_eq!(panel.refreshes(), vec![RefreshMode::Full]);
        assert_eq!(calls.last(), Some(&PanelCall::Refresh(RefreshMode::Full)));
    }

    #[test]
    fn frame_ink_lands_in_bands() {
        let panel = MockPanel::new(Size::new(128, 250));
        let mut display = PagedDisplay::new(panel.clone(), Rotation::Rotate90, 64);
        display.render_frame(&model(), &ctx()).unwrap();

        // the title at the logical top-left maps to the right edge of the
        // first physical rows
        let first = match &panel.calls()[1] {
            PanelCall::Write { data, .. } => data.clone(),
            other => panic!("unexpected call {:?}", other),
        };
        assert!(first.iter().any(|&b| b != 0xff));
    }

    #[test]
    fn clear_writes_white_pages() {
        let panel = MockPanel::new(Size::new(16, 20));
        let mut display = PagedDisplay::new(panel.clone(), Rotation::None, 8);
        display.clear().unwrap();

        let calls = panel.calls();
        let writes: Vec<_> = calls
            .iter()
            .filter(|call| matches!(call, PanelCall::Write { .. }))
            .collect();
        assert_eq!(writes.len(), 3);
        for call in writes {
            if let PanelCall::Write { data, .. } = call {
                assert!(data.iter().all(|&b| b == 0xff));
            }
        }
        assert_eq!(panel.refreshes(), vec![RefreshMode::Full]);
    }

    #[test]
    fn failed_refresh_propagates() {
        let panel = MockPanel::new(Size::new(128, 250));
        panel.set_fail_refresh(true);
        let mut display = PagedDisplay::new(panel.clone(), Rotation::None, 64);
        assert!(display.render_frame(&model(), &ctx()).is_err());
        assert!(panel.refreshes().is_empty());
    }
}
