//! Hardware-free doubles for display tests.

use super::canvas::{Canvas, Font, Ink};
use super::panel::{EpdPanel, RamPlane, RefreshMode, rows_in};
use super::{GpioError, RenderError};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Clear(Ink),
    FillRect(Rectangle, Ink),
    Text {
        text: String,
        origin: Point,
        font: Font,
        ink: Ink,
    },
}

impl DrawOp {
    pub fn text(text: &str, x: i32, y: i32, font: Font, ink: Ink) -> Self {
        DrawOp::Text {
            text: text.to_string(),
            origin: Point::new(x, y),
            font,
            ink,
        }
    }
}

/// Canvas that records every call
pub struct RecordingCanvas {
    size: Size,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self, ink: Ink) {
        self.ops.push(DrawOp::Clear(ink));
    }

    fn fill_rect(&mut self, area: Rectangle, ink: Ink) {
        self.ops.push(DrawOp::FillRect(area, ink));
    }

    fn draw_text(&mut self, text: &str, origin: Point, font: Font, ink: Ink) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            origin,
            font,
            ink,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    Init,
    Write {
        plane: RamPlane,
        first_row: u32,
        data: Vec<u8>,
    },
    Refresh(RefreshMode),
    Sleep,
}

#[derive(Default)]
struct MockState {
    calls: Vec<PanelCall>,
    fail_refresh: bool,
}

/// Panel that records calls; clones share state
#[derive(Clone)]
pub struct MockPanel {
    native: Size,
    state: Rc<RefCell<MockState>>,
}

impl MockPanel {
    pub fn new(native: Size) -> Self {
        Self {
            native,
            state: Rc::default(),
        }
    }

    pub fn calls(&self) -> Vec<PanelCall> {
        self.state.borrow().calls.clone()
    }

    pub fn refreshes(&self) -> Vec<RefreshMode> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                PanelCall::Refresh(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }

    pub fn take_calls(&self) -> Vec<PanelCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.state.borrow_mut().fail_refresh = fail;
    }
}

impl EpdPanel for MockPanel {
    fn native_size(&self) -> Size {
        self.native
    }

    fn init(&mut self) -> Result<(), RenderError> {
        self.state.borrow_mut().calls.push(PanelCall::Init);
        Ok(())
    }

    fn write_plane(
        &mut self,
        plane: RamPlane,
        first_row: u32,
        data: &[u8],
    ) -> Result<(), RenderError> {
        rows_in(self.native, first_row, data)?;
        self.state.borrow_mut().calls.push(PanelCall::Write {
            plane,
            first_row,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn refresh(&mut self, mode: RefreshMode) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        if state.fail_refresh {
            return Err(GpioError::BusyTimeout(Duration::from_secs(10)).into());
        }
        state.calls.push(PanelCall::Refresh(mode));
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), RenderError> {
        self.state.borrow_mut().calls.push(PanelCall::Sleep);
        Ok(())
    }
}
