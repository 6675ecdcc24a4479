//! Spacing for the status frame on each backend.

/// Offsets in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Inset from every edge
    pub margin: i32,
    /// Between title and subtitle
    pub title_gap: i32,
    /// Before the detail line and before the metric block
    pub section_gap: i32,
    /// Between consecutive metric lines
    pub line_gap: i32,
    /// Around the status text inside its badge
    pub badge_padding: i32,
}

impl Layout {
    /// Edge-to-edge layout for the partial-refresh backend
    pub const COMPACT: Layout = Layout {
        margin: 0,
        title_gap: 1,
        section_gap: 2,
        line_gap: 0,
        badge_padding: 2,
    };

    /// Inset layout for the paged full-refresh backend
    pub const FRAMED: Layout = Layout {
        margin: 2,
        title_gap: 1,
        section_gap: 2,
        line_gap: 0,
        badge_padding: 2,
    };
}
