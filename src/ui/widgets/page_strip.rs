//! Page-number strip for paginated lists

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::pagination::{PageMarker, Pagination};

/// One-line "‹ Prev  1 … 4 5 6 … 9  Next ›" control
pub struct PageStrip {
    pagination: Pagination,
    /// Style for page numbers and enabled arrows
    style: Style,
    /// Style for the current page
    current_style: Style,
    /// Style for arrows that cannot be used
    disabled_style: Style,
}

impl PageStrip {
    pub fn new(pagination: Pagination) -> Self {
        Self {
            pagination,
            style: Style::default().fg(Color::Cyan),
            current_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            disabled_style: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn arrow_style(&self, enabled: bool) -> Style {
        if enabled {
            self.style
        } else {
            self.disabled_style
        }
    }

    /// The spans making up the strip
    fn spans(&self) -> Vec<Span<'static>> {
        let p = &self.pagination;
        let mut spans = vec![Span::styled("‹ Prev ", self.arrow_style(p.has_previous()))];

        for marker in p.page_markers() {
            spans.push(Span::raw(" "));
            match marker {
                PageMarker::Page(page) if page == p.current_page => {
                    spans.push(Span::styled(format!("[{}]", page), self.current_style));
                }
                PageMarker::Page(page) => {
                    spans.push(Span::styled(page.to_string(), self.style));
                }
                PageMarker::Ellipsis => {
                    spans.push(Span::styled("…", self.disabled_style));
                }
            }
        }

        spans.push(Span::styled("  Next ›", self.arrow_style(p.has_next())));
        spans
    }
}

impl Widget for PageStrip {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let line = Line::from(self.spans());
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
