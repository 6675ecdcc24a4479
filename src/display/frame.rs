//! Frame composition shared by every backend.
//!
//! [`FrameContent::compose`] resolves the text of each frame element from the
//! model, and [`paint`] lays it out on a [`Canvas`]. Field order and fallback
//! rules live here; backends only choose a [`Layout`].

use super::RenderContext;
use super::canvas::{Canvas, Font, Ink};
use super::layout::Layout;
use crate::status::{DEFAULT_TITLE, StatusModel};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Resolved text of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameContent {
    pub title: String,
    pub status: String,
    pub subtitle: String,
    pub detail: String,
    /// One `label: value` entry per metric
    pub lines: Vec<String>,
    pub footer: String,
}

impl FrameContent {
    pub fn compose(model: &StatusModel, ctx: &RenderContext<'_>) -> Self {
        let title = if model.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            model.title.clone()
        };

        Self {
            title,
            status: model.status.clone(),
            subtitle: model.subtitle.clone(),
            detail: model.detail.clone(),
            lines: model
                .metrics
                .iter()
                .map(|m| format!("{}: {}", m.label, m.value))
                .collect(),
            footer: footer_text(model, ctx),
        }
    }
}

/// Footer by priority: payload timestamp, time since last message, link state
pub fn footer_text(model: &StatusModel, ctx: &RenderContext<'_>) -> String {
    if !model.updated_at.is_empty() {
        return format!("Updated: {}", model.updated_at);
    }

    if let Some(last) = model.last_message_at {
        let elapsed = ctx.now.saturating_duration_since(last).as_secs();
        return format!("Last MQTT: {}", format_elapsed(elapsed));
    }

    ctx.link_summary.to_string()
}

/// Compact elapsed time: `1h 5m`, `2m 5s` or `42s`
pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Paint a full frame; every call draws the same sequence for the same content
///
/// Metric lines that would reach into the footer row are left out.
pub fn paint<C: Canvas + ?Sized>(canvas: &mut C, content: &FrameContent, layout: &Layout) {
    let size = canvas.size();
    let width = size.width as i32;
    let height = size.height as i32;
    let small = Font::Small.line_height() as i32;
    let medium = Font::Medium.line_height() as i32;
    let left = layout.margin;

    canvas.clear(Ink::White);

    let mut y = layout.margin;
    canvas.draw_text(&content.title, Point::new(left, y), Font::Medium, Ink::Black);
    if !content.status.is_empty() {
        draw_badge(canvas, &content.status, width, layout);
    }
    y += medium + layout.title_gap;

    canvas.draw_text(&content.subtitle, Point::new(left, y), Font::Small, Ink::Black);
    y += small + layout.section_gap;

    canvas.draw_text(&content.detail, Point::new(left, y), Font::Small, Ink::Black);
    y += small + layout.section_gap;

    let footer_y = height - small - layout.margin;
    for line in &content.lines {
        if y + small > footer_y {
            break;
        }
        canvas.draw_text(line, Point::new(left, y), Font::Small, Ink::Black);
        y += small + layout.line_gap;
    }

    canvas.draw_text(&content.footer, Point::new(left, footer_y), Font::Small, Ink::Black);
}

/// Inverted status badge at the top-right corner
fn draw_badge<C: Canvas + ?Sized>(canvas: &mut C, status: &str, width: i32, layout: &Layout) {
    let pad = layout.badge_padding;
    let text_width = Font::Small.text_width(status) as i32;
    let box_width = text_width + 2 * pad;
    let box_height = Font::Small.line_height() as i32 + 2 * pad;
    let x = (width - layout.margin - box_width).max(0);
    let y = layout.margin;

    canvas.fill_rect(
        Rectangle::new(
            Point::new(x, y),
            Size::new(box_width as u32, box_height as u32),
        ),
        Ink::Black,
    );
    canvas.draw_text(status, Point::new(x + pad, y + pad), Font::Small, Ink::White);
}
