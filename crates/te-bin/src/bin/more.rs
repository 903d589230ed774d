//! `more`: the modeless pager binary.
//!
//! Grounded on `edit.rs`'s `AppStartup` / `*Runtime<'a>` / `LoopControl`
//! shape, generalized from the editor's buffer-mutation dispatch to the
//! pager's append-only `LineStore` + `PagerViewport` window, driven by
//! `core_actions::pager_dispatch::dispatch_pager` instead of
//! `core_actions::dispatcher::dispatch`.

use anyhow::Result;
use clap::Parser;
use core_actions::keymap::translate_pager_key;
use core_actions::mouse::{self, MouseEffect, MouseState};
use core_actions::pager_dispatch::{PagerAction, PagerDispatchResult, SearchDirection, dispatch_pager};
use core_events::{
    EVENT_CHANNEL_CAP, Event, EventSourceRegistry, InputEvent, KeyEventExt, KeyToken, ModMask,
    MouseEvent, NamedKey, TickEventSource,
};
use core_render::clipboard_export::{ColorTable, export_selection};
use core_render::pager_viewport::PagerViewport;
use core_render::selection::RectSelection;
use core_render::writer::Writer;
use core_state::{LineStore, LogicalLine};
use core_terminal::{CrosstermBackend, TerminalBackend};
use core_text::color::{ColorAttr, LayoutState};
use core_text::vt::carve;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const STATUS_ROWS: u16 = 1;
/// Byte budget for the in-memory line store. Chosen generously for a
/// terminal pager's typical working set (tens of megabytes of piped log or
/// file output) without letting a runaway producer exhaust the host.
const LINE_STORE_BYTE_BUDGET: u64 = 64 * 1024 * 1024;
const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "more", version, about = "Modeless pager")]
struct Args {
    /// Files to page through, concatenated in order. Reads stdin if none.
    files: Vec<PathBuf>,
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

struct RuntimeContext<'a> {
    viewport: PagerViewport,
    store: LineStore,
    terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    /// Opens the input source(s) before touching the terminal, so a missing
    /// file reports a plain stderr error and exit code instead of leaving
    /// the terminal in alternate-screen/raw mode.
    fn open_reader(args: &Args) -> Result<Box<dyn Read + Send>> {
        if args.files.is_empty() {
            return Ok(Box::new(std::io::stdin()));
        }
        let mut combined: Option<Box<dyn Read + Send>> = None;
        for path in &args.files {
            let file = std::fs::File::open(path)?;
            combined = Some(match combined {
                None => Box::new(file),
                Some(prev) => Box::new(prev.chain(file)),
            });
        }
        Ok(combined.expect("non-empty files checked above"))
    }

    fn run<'a>(&'a mut self) -> Result<(RuntimeContext<'a>, LineStore)> {
        self.log_guard = te_bin::configure_logging("oxidized-more.log")?;
        te_bin::install_panic_hook();

        info!(target: "runtime", "startup");

        let (width, height) = crossterm::terminal::size().unwrap_or((80, 24));
        if core_model::check_resize(width, height) == core_model::ResizeOutcome::WindowTooSmall {
            anyhow::bail!(
                "terminal too small: need at least {}x{}, got {width}x{height}",
                core_model::MIN_VIEWPORT_COLUMNS,
                core_model::MIN_VIEWPORT_ROWS
            );
        }

        self.backend.set_title("more")?;
        // Enabling mouse reporting is a stateless escape write, independent of
        // `entered`; done before `enter_guard` takes an exclusive borrow of
        // `self.backend` for the rest of the runtime's life.
        self.backend.enable_mouse_capture()?;
        let guard = self.backend.enter_guard()?;

        let store = LineStore::new(LINE_STORE_BYTE_BUDGET);
        let content_rows = height.saturating_sub(STATUS_ROWS) as usize;
        let viewport = PagerViewport::new(content_rows, width);

        Ok((
            RuntimeContext {
                viewport,
                store: store.clone(),
                terminal_guard: guard,
            },
            store,
        ))
    }
}

/// Tracks the live `/`/`?` prompt: the pattern text being typed and which
/// direction it will search in once confirmed.
enum SearchPrompt {
    None,
    Active {
        direction: SearchDirection,
        pattern: String,
    },
}

enum LoopControl {
    Continue,
    Break { reason: te_bin::ShutdownReason },
}

struct PagerRuntime<'a> {
    viewport: PagerViewport,
    store: LineStore,
    mouse_state: MouseState,
    selection: Option<RectSelection>,
    search_prompt: SearchPrompt,
    last_search: Option<(String, SearchDirection)>,
    last_message: Option<String>,
    color_table: ColorTable,
    dirty: bool,
    last_size: (u16, u16),
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_task: Option<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    ingest_task: Option<tokio::task::JoinHandle<()>>,
    ingest_shutdown: Option<core_input::ingest::IngestShutdown>,
    _terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl<'a> PagerRuntime<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        context: RuntimeContext<'a>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        input_task: tokio::task::JoinHandle<()>,
        input_shutdown: core_input::AsyncInputShutdown,
        source_handles: Vec<tokio::task::JoinHandle<()>>,
        ingest_task: tokio::task::JoinHandle<()>,
        ingest_shutdown: core_input::ingest::IngestShutdown,
    ) -> Self {
        let RuntimeContext {
            viewport,
            store,
            terminal_guard,
        } = context;
        let last_size = crossterm::terminal::size().unwrap_or((80, 24));
        Self {
            viewport,
            store,
            mouse_state: MouseState::new(),
            selection: None,
            search_prompt: SearchPrompt::None,
            last_search: None,
            last_message: None,
            color_table: ColorTable::default(),
            dirty: true,
            last_size,
            rx,
            tx: Some(tx),
            source_handles,
            input_task: Some(input_task),
            input_shutdown: Some(input_shutdown),
            ingest_task: Some(ingest_task),
            ingest_shutdown: Some(ingest_shutdown),
            _terminal_guard: terminal_guard,
        }
    }

    async fn run(&mut self) -> Result<()> {
        self.paint()?;

        let span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter = span.enter();

        let mut shutdown_reason = te_bin::ShutdownReason::ChannelClosed;
        let mut saw_any_line = false;
        while let Some(event) = self.rx.recv().await {
            let control = match &event {
                Event::Input(input) => self.handle_input_event(input),
                Event::Command(_) => LoopControl::Continue,
                Event::RenderRequested => LoopControl::Continue,
                Event::Tick => self.handle_tick(),
                Event::LinesAvailable => {
                    if self.store.len() > 0 {
                        saw_any_line = true;
                    }
                    self.viewport.add_new_lines_to_viewport(&self.store);
                    self.dirty = true;
                    LoopControl::Continue
                }
                Event::IngestCompleted => {
                    if !saw_any_line && self.store.len() == 0 {
                        LoopControl::Break {
                            reason: te_bin::ShutdownReason::OutOfMemory,
                        }
                    } else {
                        self.dirty = true;
                        LoopControl::Continue
                    }
                }
                Event::Shutdown => LoopControl::Break {
                    reason: te_bin::ShutdownReason::ShutdownEvent,
                },
            };

            match control {
                LoopControl::Break { reason } => {
                    shutdown_reason = reason;
                    break;
                }
                LoopControl::Continue => {
                    if self.dirty {
                        if let Err(e) = self.paint() {
                            error!(target: "render.engine", ?e, "paint_error");
                        }
                    }
                }
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: te_bin::ShutdownReason) {
        te_bin::log_shutdown_stage(reason, "begin");
        if let Some(tx) = self.tx.take() {
            drop(tx);
        }
        if let Some(shutdown) = self.ingest_shutdown.take() {
            shutdown.signal();
        }
        if let Some(handle) = self.ingest_task.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_millis(200), handle).await;
        }
        te_bin::join_background_tasks(
            reason,
            std::mem::take(&mut self.source_handles),
            self.input_shutdown.take(),
            self.input_task.take(),
        )
        .await;
        let mut backend = CrosstermBackend::new();
        let _ = backend.disable_mouse_capture();
        te_bin::log_shutdown_stage(reason, "complete");
    }

    fn handle_input_event(&mut self, input: &InputEvent) -> LoopControl {
        match input {
            InputEvent::KeyPress(key) => self.handle_key_press(key),
            InputEvent::CtrlC => {
                info!(target: "runtime", "shutdown");
                LoopControl::Break {
                    reason: te_bin::ShutdownReason::CtrlC,
                }
            }
            InputEvent::Resize(w, h) => {
                self.handle_resize(*w, *h);
                LoopControl::Continue
            }
            InputEvent::Mouse(event) => self.handle_mouse(event),
            InputEvent::Key(_)
            | InputEvent::TextCommit(_)
            | InputEvent::PasteStart
            | InputEvent::PasteChunk(_)
            | InputEvent::PasteEnd
            | InputEvent::FocusGained
            | InputEvent::FocusLost
            | InputEvent::RawBytes(_)
            | InputEvent::CompositionUpdate { .. } => LoopControl::Continue,
        }
    }

    fn handle_key_press(&mut self, key: &KeyEventExt) -> LoopControl {
        if matches!(self.search_prompt, SearchPrompt::Active { .. }) {
            return self.handle_search_prompt_key(key);
        }

        let (base, _mods) = token_parts(key);
        if matches!(base, KeyToken::Named(NamedKey::Enter)) {
            return self.handle_enter();
        }

        let Some(action) = translate_pager_key(key) else {
            return LoopControl::Continue;
        };
        self.dispatch_pager_action(action)
    }

    fn dispatch_pager_action(&mut self, action: PagerAction) -> LoopControl {
        if matches!(action, PagerAction::PageDown | PagerAction::PageUp) {
            self.selection = None;
        }
        let result: PagerDispatchResult = dispatch_pager(action, &mut self.viewport, &self.store);
        self.dirty = true;

        if result.quit {
            return LoopControl::Break {
                reason: te_bin::ShutdownReason::ActionQuit,
            };
        }
        if let Some(direction) = result.open_search_dialog {
            self.search_prompt = SearchPrompt::Active {
                direction,
                pattern: String::new(),
            };
            self.viewport.set_search_pattern(Some(String::new()));
        }
        if let Some(direction) = result.repeat_search {
            if let Some((pattern, _)) = self.last_search.clone() {
                self.perform_search(&pattern, direction);
            }
        }
        LoopControl::Continue
    }

    fn handle_enter(&mut self) -> LoopControl {
        if let Some(sel) = self.selection.take() {
            self.copy_selection(sel);
        } else if let Some((pattern, direction)) = self.last_search.clone() {
            self.perform_search(&pattern, direction);
        }
        self.dirty = true;
        LoopControl::Continue
    }

    fn handle_search_prompt_key(&mut self, key: &KeyEventExt) -> LoopControl {
        let (base, _mods) = token_parts(key);
        match base {
            KeyToken::Named(NamedKey::Esc) => {
                self.search_prompt = SearchPrompt::None;
                self.viewport.set_search_pattern(None);
            }
            KeyToken::Named(NamedKey::Enter) => {
                if let SearchPrompt::Active { direction, pattern } =
                    std::mem::replace(&mut self.search_prompt, SearchPrompt::None)
                {
                    self.last_search = Some((pattern.clone(), direction));
                    self.perform_search(&pattern, direction);
                }
            }
            KeyToken::Named(NamedKey::Backspace) => {
                if let SearchPrompt::Active { pattern, .. } = &mut self.search_prompt {
                    pattern.pop();
                    let p = pattern.clone();
                    self.viewport.set_search_pattern(Some(p));
                }
            }
            KeyToken::Char(c) => {
                if let SearchPrompt::Active { pattern, .. } = &mut self.search_prompt {
                    pattern.push(c);
                    let p = pattern.clone();
                    self.viewport.set_search_pattern(Some(p));
                }
            }
            _ => {}
        }
        self.dirty = true;
        LoopControl::Continue
    }

    /// Scan the document for `pattern` starting just past the current top
    /// displayed physical line, jumping the viewport there on a hit.
    fn perform_search(&mut self, pattern: &str, direction: SearchDirection) {
        let from = self.viewport.display().next().map(|l| l.physical_line).unwrap_or(0);
        match find_in_store(&self.store, pattern, from, direction) {
            Some(line_no) => {
                self.viewport.regenerate(line_no, &self.store);
                self.viewport.set_search_pattern(Some(pattern.to_string()));
                self.last_message = None;
            }
            None => {
                warn!(target: "search", pattern, "pattern_not_found");
                self.last_message = Some("Pattern not found".to_string());
            }
        }
        self.dirty = true;
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.last_size = (width, height);
        if core_model::check_resize(width, height) == core_model::ResizeOutcome::WindowTooSmall {
            self.last_message = Some("Window too small".to_string());
            self.dirty = true;
            return;
        }
        let content_rows = height.saturating_sub(STATUS_ROWS) as usize;
        self.viewport.resize(content_rows, width, &self.store);
        self.dirty = true;
    }

    fn handle_tick(&mut self) -> LoopControl {
        if self.mouse_state.scroll_overshoot_rows > 0 {
            self.viewport.move_down(1, &self.store);
            self.dirty = true;
        } else if self.mouse_state.scroll_overshoot_rows < 0 {
            self.viewport.move_up(1, &self.store);
            self.dirty = true;
        }
        if let Ok((w, h)) = crossterm::terminal::size() {
            if (w, h) != self.last_size {
                self.handle_resize(w, h);
            }
        }
        LoopControl::Continue
    }

    fn handle_mouse(&mut self, event: &MouseEvent) -> LoopControl {
        let height = self.viewport.viewport_height() as u16;
        let prev_selection = self.selection;
        let effect = self.mouse_state.handle(event, &mut self.selection, height);
        match effect {
            MouseEffect::SelectionChanged => {
                self.dirty = true;
            }
            MouseEffect::StopAutoScroll => {}
            MouseEffect::CopyAndClear => {
                if let Some(sel) = prev_selection {
                    self.copy_selection(sel);
                }
                self.dirty = true;
            }
            MouseEffect::DoubleClick { row, col } => {
                if let Some(text) = self.resolve_row_text(row as usize) {
                    let col_byte = byte_offset_for_column(&text, col + self.viewport.horizontal_offset());
                    let (start, end) = mouse::word_bounds_at(&text, col_byte);
                    self.selection = Some(RectSelection {
                        anchor_row: row,
                        anchor_col: start,
                        cursor_row: row,
                        cursor_col: end.saturating_sub(1).max(start),
                    });
                }
                self.dirty = true;
            }
            MouseEffect::None => {}
        }
        LoopControl::Continue
    }

    fn copy_selection(&mut self, sel: RectSelection) {
        let exported = export_selection(&self.viewport, &self.store, &sel, Some(&self.color_table));
        let mut backend = CrosstermBackend::new();
        if let Err(e) =
            backend.clipboard_set_text_rtf_html(&exported.plain, &exported.rtf, &exported.html)
        {
            warn!(target: "clipboard", ?e, "clipboard_write_failed");
        }
        self.selection = None;
    }

    fn resolve_row_text(&self, display_row: usize) -> Option<String> {
        let line = self.viewport.display().nth(display_row)?;
        let physical = self.store.snapshot_from(line.physical_line, 1).into_iter().next()?;
        let chars: Vec<char> = physical.text.chars().collect();
        Some(line.text.resolve(&physical.text, &chars).into_owned())
    }

    fn selection_cols_for_row(&self, row: u64) -> Option<(u16, u16)> {
        let sel = self.selection?;
        let (top, bottom, left, right) = sel.bounds();
        if row < top || row > bottom {
            return None;
        }
        Some((left as u16, right as u16))
    }

    fn paint(&mut self) -> Result<()> {
        let (width, height) = crossterm::terminal::size().unwrap_or(self.last_size);
        let content_rows = height.saturating_sub(STATUS_ROWS) as usize;
        let mut writer = Writer::new();
        let lines: Vec<LogicalLine> = self.viewport.display().cloned().collect();

        for row in 0..content_rows {
            writer.move_to(0, row as u16);
            writer.clear_line(0, row as u16);
            if let Some(line) = lines.get(row) {
                let physical = self.store.snapshot_from(line.physical_line, 1).into_iter().next();
                let physical_text = physical.as_ref().map(|p| p.text.as_str()).unwrap_or("");
                let chars: Vec<char> = physical_text.chars().collect();
                let resolved = line.text.resolve(physical_text, &chars).into_owned();
                let sel_cols = self.selection_cols_for_row(row as u64);
                let rendered = render_row(
                    &resolved,
                    self.viewport.horizontal_offset() as u16,
                    width,
                    line.start_state,
                    sel_cols,
                );
                writer.print(rendered);
            }
        }

        writer.move_to(0, content_rows as u16);
        writer.clear_line(0, content_rows as u16);
        let mut status = self.viewport.status_line(self.store.len(), self.store.is_ingest_complete());
        if let Some(msg) = &self.last_message {
            status.push_str(" - ");
            status.push_str(msg);
        }
        writer.print(status);
        writer.flush()?;
        self.dirty = false;
        Ok(())
    }
}

/// Render one visible row's worth of text, carving color runs from the
/// resolved logical-line text and inverting the cells covered by `sel`
/// (absolute, post-scroll column bounds) if given.
fn render_row(resolved: &str, skip: u16, take: u16, state: LayoutState, sel: Option<(u16, u16)>) -> String {
    let mut out = String::new();
    match sel {
        None => {
            for run in carve(resolved, skip, take, state) {
                out.push_str(&run.color.to_sgr());
                out.push_str(&run.text);
            }
        }
        Some((sel_start, sel_end)) => {
            let left_take = sel_start.saturating_sub(skip);
            for run in carve(resolved, skip, left_take, state) {
                out.push_str(&run.color.to_sgr());
                out.push_str(&run.text);
            }
            let mid_skip = sel_start.max(skip);
            let mid_take = sel_end.saturating_sub(mid_skip).saturating_add(1);
            for run in carve(resolved, mid_skip, mid_take, state) {
                out.push_str(&run.color.with_reverse(true).to_sgr());
                out.push_str(&run.text);
            }
            let right_skip = sel_end.saturating_add(1).max(skip);
            let right_take = take.saturating_sub(right_skip.saturating_sub(skip));
            for run in carve(resolved, right_skip, right_take, state) {
                out.push_str(&run.color.to_sgr());
                out.push_str(&run.text);
            }
        }
    }
    out
}

/// Plain-text rendering of a (possibly VT-escaped) physical line, for
/// substring search; reuses `carve`'s escape-stripping walk rather than
/// hand-rolling a second escape parser.
fn plain_text_of(physical_text: &str) -> String {
    carve(physical_text, 0, u16::MAX, LayoutState::initial(ColorAttr::default_attr()))
        .into_iter()
        .map(|r| r.text)
        .collect()
}

fn line_matches(store: &LineStore, line_no: u64, pattern: &str) -> bool {
    store
        .snapshot_from(line_no, 1)
        .first()
        .map(|p| plain_text_of(&p.text).contains(pattern))
        .unwrap_or(false)
}

/// Search for `pattern` strictly after (forward) or before (backward) `from`.
fn find_in_store(store: &LineStore, pattern: &str, from: u64, direction: SearchDirection) -> Option<u64> {
    if pattern.is_empty() {
        return None;
    }
    let total = store.len();
    if total == 0 {
        return None;
    }
    match direction {
        SearchDirection::Forward => (from + 1..total).find(|&line_no| line_matches(store, line_no, pattern)),
        SearchDirection::Backward => (0..from).rev().find(|&line_no| line_matches(store, line_no, pattern)),
    }
}

fn byte_offset_for_column(text: &str, col: usize) -> usize {
    text.char_indices().nth(col).map(|(b, _)| b).unwrap_or(text.len())
}

/// Peel modifiers out of a `KeyToken::Chord`, mirroring
/// `edit.rs::handle_dialog_key`'s same small destructure.
fn token_parts(key: &KeyEventExt) -> (KeyToken, ModMask) {
    match &key.token {
        KeyToken::Chord { base, mods } => ((**base).clone(), *mods),
        other => (other.clone(), ModMask::empty()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // Opened before the terminal is touched: a missing file reports a plain
    // stderr error and exit code instead of leaving raw mode/alt-screen active.
    let reader = AppStartup::open_reader(&args)?;

    let mut startup = AppStartup::new();
    let (context, store) = startup.run()?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let source_handles = registry.spawn_all(&tx);

    let buffered: Box<dyn BufRead + Send> = Box::new(BufReader::new(reader));
    let (ingest_task, ingest_shutdown) = core_input::ingest::spawn_ingest_task(buffered, store, tx.clone());

    let mut runtime = PagerRuntime::new(
        context,
        tx,
        rx,
        input_task,
        input_shutdown,
        source_handles,
        ingest_task,
        ingest_shutdown,
    );
    runtime.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::PhysicalLine;
    use core_text::color::ColorAttr;

    fn seeded_store(lines: &[&str]) -> LineStore {
        let store = LineStore::new(1_000_000);
        for (i, text) in lines.iter().enumerate() {
            store
                .push(PhysicalLine {
                    line_number: i as u64,
                    initial_color: ColorAttr::default_attr(),
                    text: text.to_string(),
                })
                .unwrap();
        }
        store.mark_ingest_complete();
        store
    }

    #[test]
    fn find_in_store_forward_finds_the_first_match_after_from() {
        let store = seeded_store(&["alpha", "beta needle", "gamma needle", "delta"]);
        let hit = find_in_store(&store, "needle", 0, SearchDirection::Forward);
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn find_in_store_backward_finds_the_last_match_before_from() {
        let store = seeded_store(&["alpha needle", "beta", "gamma needle", "delta"]);
        let hit = find_in_store(&store, "needle", 3, SearchDirection::Backward);
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn find_in_store_returns_none_when_pattern_absent() {
        let store = seeded_store(&["alpha", "beta", "gamma"]);
        assert_eq!(find_in_store(&store, "needle", 0, SearchDirection::Forward), None);
    }

    #[test]
    fn find_in_store_with_empty_pattern_is_a_noop() {
        let store = seeded_store(&["alpha", "beta"]);
        assert_eq!(find_in_store(&store, "", 0, SearchDirection::Forward), None);
    }

    #[test]
    fn plain_text_of_strips_embedded_color_escapes() {
        let colored = "\x1b[31mred\x1b[0m plain";
        assert_eq!(plain_text_of(colored), "red plain");
    }

    #[test]
    fn render_row_without_selection_emits_one_reset_per_run() {
        let rendered = render_row("hello", 0, 80, LayoutState::initial(ColorAttr::default_attr()), None);
        assert!(rendered.contains("hello"));
        assert!(rendered.starts_with("\x1b["));
    }

    #[test]
    fn byte_offset_for_column_resolves_ascii_columns() {
        assert_eq!(byte_offset_for_column("hello", 2), 2);
        assert_eq!(byte_offset_for_column("hello", 99), 5);
    }

    #[test]
    fn window_too_small_check_matches_minimum_bounds() {
        assert_eq!(
            core_model::check_resize(59, 30),
            core_model::ResizeOutcome::WindowTooSmall
        );
        assert_eq!(
            core_model::check_resize(80, 24),
            core_model::ResizeOutcome::Accepted
        );
    }
}
