//! Pager viewport manager: keeps a `display[]` window of logical lines over
//! the ingested document, re-deriving wrapped chunks from `core-state`'s
//! logical-line generator as the window moves.
//!
//! Grounded on `viewport.rs`'s existing `Viewport` (the editor-side vertical
//! window) for the crate's "small, value-like window struct" convention;
//! this manager is a distinct type because the pager's movement semantics
//! (physical-line-backed wrapping, capped `move_up`, status-line percent) do
//! not overlap with the editor's cursor-follows-viewport scrolling.

use std::collections::VecDeque;

use core_state::{LineStore, LogicalLine};

/// What to show in the status line's trailing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    End,
    AwaitingData,
    More,
}

/// The pager's visible window of logical lines, plus enough context to
/// extend or scroll it without re-reading the whole document.
pub struct PagerViewport {
    display: VecDeque<LogicalLine>,
    viewport_height: usize,
    viewport_width: u16,
    horizontal_offset: usize,
    search_pattern: Option<String>,
}

impl PagerViewport {
    pub fn new(viewport_height: usize, viewport_width: u16) -> Self {
        Self {
            display: VecDeque::with_capacity(viewport_height),
            viewport_height,
            viewport_width,
            horizontal_offset: 0,
            search_pattern: None,
        }
    }

    pub fn lines_in_page(&self) -> usize {
        self.display.len()
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn set_search_pattern(&mut self, pattern: Option<String>) {
        self.search_pattern = pattern;
    }

    pub fn search_pattern(&self) -> Option<&str> {
        self.search_pattern.as_deref()
    }

    pub fn display(&self) -> impl Iterator<Item = &LogicalLine> {
        self.display.iter()
    }

    fn chunks_for_physical(&self, store: &LineStore, line_number: u64) -> Vec<LogicalLine> {
        match store.snapshot_from(line_number, 1).first() {
            Some(p) => core_state::generate_with_search(p, self.viewport_width, self.search_pattern.as_deref()),
            None => Vec::new(),
        }
    }

    /// If `lines_in_page < viewport_height`, generate up to the shortfall
    /// following the last displayed line and append.
    pub fn add_new_lines_to_viewport(&mut self, store: &LineStore) {
        if self.display.len() >= self.viewport_height {
            return;
        }
        let need = self.viewport_height - self.display.len();
        self.append_following(store, need);
    }

    /// Generate up to `n` logical lines following the current last display
    /// line; if more are produced than fit, drop the oldest entries.
    pub fn move_down(&mut self, n: usize, store: &LineStore) {
        self.append_following(store, n);
        while self.display.len() > self.viewport_height {
            self.display.pop_front();
        }
    }

    fn append_following(&mut self, store: &LineStore, max_new: usize) {
        let (physical, offset) = self.next_position_after_display(store);
        self.append_following_from(store, physical, offset, max_new);
    }

    /// Where the next not-yet-displayed logical line lives: (physical line
    /// number, offset of that logical line within that physical line's
    /// chunk list).
    fn next_position_after_display(&self, store: &LineStore) -> (u64, usize) {
        match self.display.back() {
            None => (0, 0),
            Some(last) => {
                if last.is_last_chunk_of_physical {
                    (last.physical_line + 1, 0)
                } else {
                    let siblings = self.chunks_for_physical(store, last.physical_line);
                    let idx = siblings.iter().position(|c| c.text == last.text).unwrap_or(0);
                    (last.physical_line, idx + 1)
                }
            }
        }
    }

    /// Walk backward: if the current top logical line is not the first chunk
    /// of its physical line, regenerate within the same physical line;
    /// otherwise step to the previous physical line, count its logical
    /// lines, and take the trailing ones. Capped at `viewport_height - 1`
    /// per the resolved Open Question (matches observed source behavior).
    pub fn move_up(&mut self, n: usize, store: &LineStore) {
        let cap = self.viewport_height.saturating_sub(1).max(1);
        let n = n.min(cap);
        if n == 0 {
            return;
        }
        let mut virtual_top = match self.display.front() {
            Some(t) => t.clone(),
            None => return,
        };
        let mut prepend: Vec<LogicalLine> = Vec::new();
        let mut remaining = n;

        while remaining > 0 {
            let siblings = self.chunks_for_physical(store, virtual_top.physical_line);
            if siblings.is_empty() {
                break;
            }
            let idx = siblings
                .iter()
                .position(|c| c.text == virtual_top.text)
                .unwrap_or(0);

            if idx > 0 {
                let take = remaining.min(idx);
                let start = idx - take;
                for c in siblings[start..idx].iter().rev() {
                    prepend.push(c.clone());
                }
                virtual_top = siblings[start].clone();
                remaining -= take;
            } else {
                if virtual_top.physical_line == 0 {
                    break;
                }
                let prev_line = virtual_top.physical_line - 1;
                let prev_chunks = self.chunks_for_physical(store, prev_line);
                if prev_chunks.is_empty() {
                    break;
                }
                let take = remaining.min(prev_chunks.len());
                let start = prev_chunks.len() - take;
                for c in prev_chunks[start..].iter().rev() {
                    prepend.push(c.clone());
                }
                virtual_top = prev_chunks[start].clone();
                remaining -= take;
            }
        }

        for c in prepend {
            self.display.push_front(c);
        }
        while self.display.len() > self.viewport_height {
            self.display.pop_back();
        }
    }

    /// Apply a terminal resize (spec §4.9). A height-only change grows by
    /// generating additional trailing lines or shrinks by dropping trailing
    /// slots, preserving the top of the display; any width change captures
    /// the current top physical line and calls `regenerate`, since wrapping
    /// depends on width and cached chunks from the old width can't be
    /// reused. Callers are expected to have already gated the new size
    /// through `core_model::check_resize` themselves.
    pub fn resize(&mut self, new_height: usize, new_width: u16, store: &LineStore) {
        let width_changed = new_width != self.viewport_width;
        let top_physical = self.display.front().map(|l| l.physical_line).unwrap_or(0);
        self.viewport_height = new_height;
        self.viewport_width = new_width;
        if width_changed {
            self.regenerate(top_physical, store);
            return;
        }
        if self.display.len() < new_height {
            self.add_new_lines_to_viewport(store);
        } else {
            while self.display.len() > new_height {
                self.display.pop_back();
            }
        }
    }

    /// Recompute `viewport_height` lines starting at `first_physical`. To
    /// preserve color continuity at the new top line, first generate the
    /// immediately preceding logical line to obtain its trailing color
    /// context (skipped if `first_physical == 0`).
    pub fn regenerate(&mut self, first_physical: u64, store: &LineStore) {
        self.display.clear();
        if first_physical > 0 {
            // Touch the preceding physical line so a future highlight-aware
            // generator can thread color state across the boundary; the
            // current generator derives initial color from each physical
            // line's own stored `initial_color`, so no state needs carrying
            // here, but the lookup validates the boundary exists.
            let _ = self.chunks_for_physical(store, first_physical - 1);
        }
        self.append_following_from(store, first_physical, 0, self.viewport_height);
    }

    fn append_following_from(&mut self, store: &LineStore, mut physical: u64, mut offset: usize, max_new: usize) {
        let mut added = 0usize;
        while added < max_new {
            let chunks = self.chunks_for_physical(store, physical);
            if chunks.is_empty() {
                break;
            }
            if offset >= chunks.len() {
                physical += 1;
                offset = 0;
                continue;
            }
            for chunk in chunks[offset..].iter() {
                if added >= max_new {
                    break;
                }
                self.display.push_back(chunk.clone());
                added += 1;
            }
            physical += 1;
            offset = 0;
        }
    }

    pub fn move_left(&mut self, n: usize) {
        self.horizontal_offset = self.horizontal_offset.saturating_sub(n);
    }

    pub fn move_right(&mut self, n: usize) {
        self.horizontal_offset = self.horizontal_offset.saturating_add(n);
    }

    pub fn horizontal_offset(&self) -> usize {
        self.horizontal_offset
    }

    /// Build the `First-Last of Total, Percent%` status line, truncated with
    /// `...` if it would exceed `viewport_width`. `first`/`last` are the
    /// 1-based physical-line numbers of the currently displayed window's
    /// first and last entries (not a count of displayed rows: they track the
    /// actual scroll position, so paging down advances both).
    pub fn status_line(&self, total_physical_lines: u64, ingest_complete: bool) -> String {
        let first = self.display.front().map(|l| l.physical_line + 1).unwrap_or(0);
        let last = self.display.back().map(|l| l.physical_line + 1).unwrap_or(0);
        let label = if ingest_complete && last >= total_physical_lines {
            StatusLabel::End
        } else if (self.display.len()) < self.viewport_height {
            StatusLabel::AwaitingData
        } else {
            StatusLabel::More
        };
        let percent = if total_physical_lines == 0 {
            100
        } else {
            ((last.min(total_physical_lines) * 100) / total_physical_lines.max(1)).min(100)
        };
        let label_str = match label {
            StatusLabel::End => "End",
            StatusLabel::AwaitingData => "Awaiting data",
            StatusLabel::More => "More",
        };
        let mut line = format!("{first}-{last} of {total_physical_lines}, {percent}% {label_str}");
        if let Some(pattern) = &self.search_pattern {
            line.push_str(&format!(" Search: {pattern}"));
        }
        if line.chars().count() > self.viewport_width as usize && self.viewport_width > 3 {
            let keep = self.viewport_width as usize - 3;
            let truncated: String = line.chars().take(keep).collect();
            line = format!("{truncated}...");
        }
        line
    }
}
