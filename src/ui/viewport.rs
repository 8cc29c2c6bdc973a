//! Virtualization adapter
//!
//! Maps the scroll offset and viewport height onto row positions. The grid
//! asks it which rows must be resident (visible rows plus an overscan margin
//! ahead of the scroll) and feeds that to the window cache.

use std::ops::Range;
use tracing::trace;

/// Extra rows kept resident below the visible window
pub const DEFAULT_OVERSCAN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// First visible row (absolute index)
    scroll_offset: usize,
    /// Number of rows that fit on screen
    visible_rows: usize,
    /// Currently focused row (absolute index)
    focused: usize,
    overscan: usize,
}

impl Viewport {
    pub fn new(visible_rows: usize, overscan: usize) -> Self {
        Self {
            scroll_offset: 0,
            visible_rows: visible_rows.max(1),
            focused: 0,
            overscan,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Update the height after a terminal resize. Returns true if it changed.
    pub fn resize(&mut self, visible_rows: usize, total: usize) -> bool {
        let visible_rows = visible_rows.max(1);
        if visible_rows == self.visible_rows {
            return false;
        }
        self.visible_rows = visible_rows;
        self.clamp(total);
        self.scroll_to_index(self.focused);
        true
    }

    pub fn max_scroll(&self, total: usize) -> usize {
        total.saturating_sub(self.visible_rows)
    }

    /// Move the window to `offset`, clamped so it never scrolls past the
    /// rows that exist. Focus follows into the window.
    pub fn scroll_to(&mut self, offset: usize, total: usize) {
        self.scroll_offset = offset.min(self.max_scroll(total));
        let last_visible = self.scroll_offset + self.visible_rows - 1;
        if self.focused < self.scroll_offset {
            self.focused = self.scroll_offset;
        } else if self.focused > last_visible {
            self.focused = last_visible;
        }
        self.focused = self.focused.min(total.saturating_sub(1));
        trace!(target: "viewport", "Scrolled to {} (focus {})", self.scroll_offset, self.focused);
    }

    pub fn scroll_by(&mut self, delta: isize, total: usize) {
        let offset = if delta < 0 {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta as usize)
        };
        self.scroll_to(offset, total);
    }

    /// Scroll the minimum amount that brings `index` into view
    pub fn scroll_to_index(&mut self, index: usize) {
        if index < self.scroll_offset {
            self.scroll_offset = index;
        } else if index >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = index + 1 - self.visible_rows;
        }
    }

    /// Focus a row (clamped to `[0, total)`) and bring it into view
    pub fn focus(&mut self, index: usize, total: usize) {
        self.focused = index.min(total.saturating_sub(1));
        self.scroll_to_index(self.focused);
    }

    /// Visible positions `[first_visible, last_visible]` as a half-open range,
    /// limited to the rows that exist
    pub fn visible_range(&self, total: usize) -> Range<usize> {
        let start = self.scroll_offset.min(total);
        let end = (self.scroll_offset + self.visible_rows).min(total);
        start..end
    }

    /// `(start, count)` of the rows that must be resident for the current
    /// window: everything visible plus the overscan margin
    pub fn resident_range(&self) -> (usize, usize) {
        (self.scroll_offset, self.visible_rows + self.overscan)
    }

    /// Re-establish the invariants after the row count changed
    pub fn clamp(&mut self, total: usize) {
        self.focused = self.focused.min(total.saturating_sub(1));
        self.scroll_offset = self.scroll_offset.min(self.max_scroll(total));
    }

    /// Back to the top, used on every reset
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
        self.focused = 0;
    }
}
