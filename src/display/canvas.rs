//! Drawing surface used by the frame painter.

use embedded_graphics::mono_font::ascii::{FONT_6X13, FONT_9X18_BOLD};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{BinaryColor, Gray2};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use std::convert::Infallible;

/// Foreground/background colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Black,
    White,
}

impl From<Ink> for Gray2 {
    fn from(ink: Ink) -> Self {
        match ink {
            Ink::Black => Gray2::new(0),
            Ink::White => Gray2::new(3),
        }
    }
}

impl From<Ink> for BinaryColor {
    fn from(ink: Ink) -> Self {
        match ink {
            Ink::Black => BinaryColor::On,
            Ink::White => BinaryColor::Off,
        }
    }
}

/// Text sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Small,
    Medium,
}

impl Font {
    pub fn mono(self) -> &'static MonoFont<'static> {
        match self {
            Font::Small => &FONT_6X13,
            Font::Medium => &FONT_9X18_BOLD,
        }
    }

    pub fn line_height(self) -> u32 {
        self.mono().character_size.height
    }

    /// Rendered width of `text` in pixels
    pub fn text_width(self, text: &str) -> u32 {
        let font = self.mono();
        let chars = text.chars().count() as u32;
        chars * font.character_size.width + chars.saturating_sub(1) * font.character_spacing
    }
}

/// Minimal drawing operations needed to paint a status frame
///
/// Coordinates are logical; text is positioned by its top-left corner.
pub trait Canvas {
    fn size(&self) -> Size;

    fn clear(&mut self, ink: Ink);

    fn fill_rect(&mut self, area: Rectangle, ink: Ink);

    fn draw_text(&mut self, text: &str, origin: Point, font: Font, ink: Ink);
}

/// [`Canvas`] over any infallible embedded-graphics target
pub struct GraphicsCanvas<'a, D> {
    target: &'a mut D,
}

impl<'a, D> GraphicsCanvas<'a, D> {
    pub fn new(target: &'a mut D) -> Self {
        Self { target }
    }
}

impl<D> Canvas for GraphicsCanvas<'_, D>
where
    D: DrawTarget<Error = Infallible> + OriginDimensions,
    D::Color: From<Ink>,
{
    fn size(&self) -> Size {
        self.target.size()
    }

    fn clear(&mut self, ink: Ink) {
        let Ok(()) = self.target.clear(ink.into());
    }

    fn fill_rect(&mut self, area: Rectangle, ink: Ink) {
        let Ok(()) = area
            .into_styled(PrimitiveStyle::with_fill(ink.into()))
            .draw(self.target);
    }

    fn draw_text(&mut self, text: &str, origin: Point, font: Font, ink: Ink) {
        let style = MonoTextStyle::new(font.mono(), ink.into());
        let Ok(_) = Text::with_baseline(text, origin, style, Baseline::Top).draw(self.target);
    }
}
