//! VT→plain/RTF/HTML clipboard export for a rectangular pager selection
//! (SPEC_FULL §4.6).
//!
//! Grounded on `core_text::vt::carve` for the actual skip/take color-run
//! extraction (the normative algorithm: "uses the VT layout engine to skip
//! `left_col` cells ... then measure `right_col - left_col + 1` cells"); this
//! module only adds the per-row walk over the selection's rows and the three
//! output-format renderers.

use core_state::LineStore;
use core_text::color::ColorAttr;
use core_text::vt::carve;

use crate::pager_viewport::PagerViewport;
use crate::selection::RectSelection;

/// A 16-entry RGB palette matching `ColorAttr`'s 3-bit base color plus
/// intensity bit encoding. Per SPEC_FULL §9, the color table is optional
/// input to export; when the caller has none (no platform query available),
/// [`ColorTable::default`] supplies the standard ANSI 16-color palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    rgb: [(u8, u8, u8); 16],
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            rgb: [
                (0, 0, 0),       // 0 black
                (170, 0, 0),     // 1 red
                (0, 170, 0),     // 2 green
                (170, 85, 0),    // 3 yellow
                (0, 0, 170),     // 4 blue
                (170, 0, 170),   // 5 magenta
                (0, 170, 170),   // 6 cyan
                (170, 170, 170), // 7 white (light grey)
                (85, 85, 85),    // 8 bright black
                (255, 85, 85),   // 9 bright red
                (85, 255, 85),   // 10 bright green
                (255, 255, 85),  // 11 bright yellow
                (85, 85, 255),   // 12 bright blue
                (255, 85, 255),  // 13 bright magenta
                (85, 255, 255),  // 14 bright cyan
                (255, 255, 255), // 15 bright white
            ],
        }
    }
}

impl ColorTable {
    /// RGB for `attr`'s effective foreground/background index, folding the
    /// intensity bit into the high nibble (0-7 dim, 8-15 bright) the way the
    /// palette above is laid out.
    pub fn foreground_rgb(&self, attr: ColorAttr) -> (u8, u8, u8) {
        self.rgb[attr_index(attr, attr.foreground())]
    }
    pub fn background_rgb(&self, attr: ColorAttr) -> (u8, u8, u8) {
        self.rgb[attr_index(attr, attr.background())]
    }
}

fn attr_index(attr: ColorAttr, base: u8) -> usize {
    ((base & 0x07) as usize) | if attr.intensity() { 0x08 } else { 0 }
}

/// The three clipboard representations derived from one selection, per
/// SPEC_FULL §4.6 step 5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSelection {
    pub plain: String,
    pub rtf: String,
    pub html: String,
}

/// Carve the rows/cols bounded by `selection` out of `viewport`'s currently
/// displayed logical lines, resolving each row's source text through
/// `store`, and render all three clipboard formats.
///
/// `selection`'s rows are indices into `viewport.display()` (the visible
/// window) per SPEC_FULL §4.6 step 1's common case; a selection whose rows
/// extend outside the currently displayed window is clamped to what's
/// displayed rather than regenerated by walking the document, which the
/// spec allows as a fallback this implementation does not perform.
pub fn export_selection(
    viewport: &PagerViewport,
    store: &LineStore,
    selection: &RectSelection,
    color_table: Option<&ColorTable>,
) -> ExportedSelection {
    let default_table = ColorTable::default();
    let table = color_table.unwrap_or(&default_table);

    let (top, bottom, left, right) = selection.bounds();
    let take = (right - left + 1) as u16;
    let rows: Vec<&core_state::LogicalLine> = viewport
        .display()
        .enumerate()
        .filter(|(i, _)| (*i as u64) >= top && (*i as u64) <= bottom)
        .map(|(_, line)| line)
        .collect();

    let mut plain_rows = Vec::with_capacity(rows.len());
    let mut rtf_rows = Vec::with_capacity(rows.len());
    let mut html_rows = Vec::with_capacity(rows.len());

    for line in rows {
        let physical = store
            .snapshot_from(line.physical_line, 1)
            .into_iter()
            .next();
        let physical_text = physical.as_ref().map(|p| p.text.as_str()).unwrap_or("");
        let chars: Vec<char> = physical_text.chars().collect();
        let resolved = line.text.resolve(physical_text, &chars);

        let runs = carve(&resolved, left as u16, take, line.start_state);

        let mut plain_row = String::new();
        let mut rtf_row = String::new();
        let mut html_row = String::new();
        for run in &runs {
            plain_row.push_str(&run.text);
            rtf_row.push_str(&rtf_run(run, table));
            html_row.push_str(&html_run(run, table));
        }
        plain_rows.push(plain_row);
        rtf_rows.push(rtf_row);
        html_rows.push(html_row);
    }

    ExportedSelection {
        plain: plain_rows.join("\r\n"),
        rtf: wrap_rtf_document(&rtf_rows.join("\\line\n")),
        html: wrap_html_document(&html_rows.join("<br>\n")),
    }
}

fn rtf_run(run: &core_text::vt::ColorRun, table: &ColorTable) -> String {
    let (r, g, b) = table.foreground_rgb(run.color);
    format!(
        "{{\\cf1 \\red{r}\\green{g}\\blue{b}; {}}}",
        escape_rtf_text(&run.text)
    )
}

fn escape_rtf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            c if c as u32 > 127 => out.push_str(&format!("\\u{}?", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn wrap_rtf_document(body: &str) -> String {
    format!("{{\\rtf1\\ansi\\deff0 {body}}}")
}

fn html_run(run: &core_text::vt::ColorRun, table: &ColorTable) -> String {
    let (r, g, b) = table.foreground_rgb(run.color);
    format!(
        "<span style=\"color: rgb({r}, {g}, {b})\">{}</span>",
        escape_html_text(&run.text)
    )
}

fn escape_html_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn wrap_html_document(body: &str) -> String {
    format!("<pre style=\"font-family: monospace\">{body}</pre>")
}
