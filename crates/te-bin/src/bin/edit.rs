//! `edit`: the modeless text-editor binary.
//!
//! Grounded on the teacher's original single-binary runtime (`AppStartup` /
//! `EditorRuntime` / render-decision plumbing), generalized from Vim-style
//! modal dispatch to the flat `core_actions::dispatcher::Action` model and
//! the modeless dialog framework (`core_model::dialog`).

use anyhow::Result;
use clap::Parser;
use core_actions::dispatcher::dispatch;
use core_actions::io_ops::{self, OpenFileResult, WriteFileResult};
use core_actions::keymap::translate_editor_key;
use core_actions::mouse;
use core_actions::{Action, ActionObserver, EditAction};
use core_config::{ConfigContext, ConfigPlatformTraits, load_from};
use core_events::{
    CommandEvent, EVENT_CHANNEL_CAP, Event, EventHooks, EventSourceRegistry, InputEvent,
    NoopEventHooks, TickEventSource,
};
use core_model::{Dialog, EditorModel, ReplaceField, ResizeOutcome, check_resize};
use core_render::apply::{
    CursorOnlyFrame, FrameSnapshot, LinesPartialFrame, ScrollShiftFrame, apply_cursor_only,
    apply_full, apply_lines_partial, apply_scroll_shift,
};
use core_render::render_engine::{RenderEngine, build_status_line_with_ephemeral};
use core_render::scheduler::{RenderDelta, RenderDeltaMetricsSnapshot, RenderScheduler};
use core_state::{EditorState, normalize_line_endings};
use core_terminal::{CrosstermBackend, TerminalBackend, TerminalCapabilities};
use core_text::Buffer;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

const STATUS_ROWS: u16 = 1;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "edit", version, about = "Modeless text editor")]
struct Args {
    /// Optional path to open at startup (UTF-8 text). If omitted a welcome buffer is used.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `oxidized.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

struct RuntimeContext<'a> {
    model: EditorModel,
    config: core_config::Config,
    platform_traits: ConfigPlatformTraits,
    terminal_guard: core_terminal::TerminalGuard<'a>,
}

struct EditorBootstrap {
    model: EditorModel,
    config: core_config::Config,
    platform_traits: ConfigPlatformTraits,
    opened_path: Option<PathBuf>,
    open_failed: bool,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn run<'a>(&'a mut self) -> Result<RuntimeContext<'a>> {
        self.log_guard = te_bin::configure_logging("oxidized.log")?;
        te_bin::install_panic_hook();

        info!(target: "runtime", "startup");
        self.backend.set_title("edit")?;
        let guard = self.backend.enter_guard()?;

        let args = Args::parse();
        let bootstrap = Self::load_editor_state(&args)?;

        info!(
            target: "runtime.startup",
            path = bootstrap.opened_path.as_ref().map(|p| p.to_string_lossy().to_string()).as_deref(),
            open_failed = bootstrap.open_failed,
            effective_margin = bootstrap.config.effective_vertical_margin,
            "bootstrap_complete"
        );

        Ok(RuntimeContext {
            model: bootstrap.model,
            config: bootstrap.config,
            platform_traits: bootstrap.platform_traits,
            terminal_guard: guard,
        })
    }

    fn load_editor_state(args: &Args) -> Result<EditorBootstrap> {
        let mut open_failed = false;
        let (buffer, file_name, norm_meta) = if let Some(path) = args.path.as_ref() {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let norm = normalize_line_endings(&content);
                    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
                    (
                        Buffer::from_str(name, &norm.normalized)?,
                        Some(path.clone()),
                        Some(norm),
                    )
                }
                Err(e) => {
                    error!(target: "io", ?e, "file_open_error");
                    open_failed = true;
                    (Buffer::from_str("untitled", "")?, None, None)
                }
            }
        } else {
            (Buffer::from_str("untitled", "")?, None, None)
        };

        let mut model = EditorModel::new(EditorState::new(buffer));
        {
            let state = model.state_mut();
            state.file_name = file_name;
            if let Some(n) = norm_meta {
                state.original_line_ending = n.original;
                state.had_trailing_newline = n.had_trailing_newline;
                if n.mixed {
                    tracing::warn!(target: "io", "mixed_line_endings_detected_startup");
                }
            }
            state.dirty = false;
            if open_failed {
                state.set_ephemeral("Open failed", std::time::Duration::from_secs(3));
            }
        }

        let mut config = load_from(args.config.clone())?;
        let terminal_caps = TerminalCapabilities::detect();
        let platform_traits =
            ConfigPlatformTraits::new(cfg!(windows), terminal_caps.supports_scroll_region);
        if let Ok((w, h)) = crossterm::terminal::size() {
            let ctx = ConfigContext::new(w, h, STATUS_ROWS, 0, platform_traits);
            config.apply_context(ctx);
        }
        model.state_mut().config_vertical_margin = config.effective_vertical_margin as usize;

        Ok(EditorBootstrap {
            model,
            config,
            platform_traits,
            opened_path: args.path.clone(),
            open_failed,
        })
    }
}

#[derive(Default)]
struct DispatchOutcome {
    dirty: bool,
    buffer_replaced: bool,
    quit: bool,
    status_changed: bool,
    line_changed: bool,
}

impl DispatchOutcome {
    fn absorb(&mut self, other: DispatchOutcome) {
        self.dirty |= other.dirty;
        self.buffer_replaced |= other.buffer_replaced;
        self.quit |= other.quit;
        self.status_changed |= other.status_changed;
        self.line_changed |= other.line_changed;
    }
}

#[derive(Clone)]
struct StatusSnapshot {
    ephemeral: Option<String>,
    dirty: bool,
    dialog_open: bool,
}

impl StatusSnapshot {
    fn capture(state: &EditorState, dialog: &Dialog) -> Self {
        Self {
            ephemeral: state.ephemeral_status.as_ref().map(|m| m.text.clone()),
            dirty: state.dirty,
            dialog_open: dialog.is_open(),
        }
    }

    fn differs(&self, other: &StatusSnapshot) -> bool {
        self.ephemeral != other.ephemeral
            || self.dirty != other.dirty
            || self.dialog_open != other.dialog_open
    }
}

#[derive(Default, Clone, Copy)]
struct RenderMetricsLedger {
    last_delta: Option<core_state::RenderDeltaSnapshotLite>,
    last_path: Option<core_state::RenderPathSnapshotLite>,
}

impl RenderMetricsLedger {
    fn store(
        &mut self,
        delta: Option<core_state::RenderDeltaSnapshotLite>,
        path: core_state::RenderPathSnapshotLite,
    ) {
        self.last_delta = delta;
        self.last_path = Some(path);
    }

    fn apply_to_state(&self, state: &mut EditorState) {
        state.last_render_delta = self.last_delta;
        state.last_render_path = self.last_path;
    }
}

enum LoopControl {
    Continue { lines_changed: usize },
    Break { reason: te_bin::ShutdownReason },
}

struct EditorRuntime<'a> {
    model: EditorModel,
    config: core_config::Config,
    platform_traits: ConfigPlatformTraits,
    scheduler: RenderScheduler,
    render_engine: RenderEngine,
    render_metrics: RenderMetricsLedger,
    sticky_visual_col: Option<usize>,
    paste: te_bin::PasteSession,
    dialog: Dialog,
    observers: Vec<Box<dyn ActionObserver>>,
    hooks: Box<dyn EventHooks>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_task: Option<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    _terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl<'a> EditorRuntime<'a> {
    fn new(
        context: RuntimeContext<'a>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        input_task: tokio::task::JoinHandle<()>,
        input_shutdown: core_input::AsyncInputShutdown,
        source_handles: Vec<tokio::task::JoinHandle<()>>,
    ) -> Self {
        let RuntimeContext {
            model,
            config,
            platform_traits,
            terminal_guard,
        } = context;
        Self {
            model,
            config,
            platform_traits,
            scheduler: RenderScheduler::new(),
            render_engine: RenderEngine::new(),
            render_metrics: RenderMetricsLedger::default(),
            sticky_visual_col: None,
            paste: te_bin::PasteSession::new(),
            dialog: Dialog::None,
            observers: Vec::new(),
            hooks: Box::new(NoopEventHooks),
            rx,
            tx: Some(tx),
            source_handles,
            input_task: Some(input_task),
            input_shutdown: Some(input_shutdown),
            _terminal_guard: terminal_guard,
        }
    }

    async fn run(&mut self) -> Result<()> {
        self.perform_initial_render();

        let render_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = render_span.enter();

        let mut shutdown_reason = te_bin::ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            self.hooks.pre_handle(&event);

            let control = match &event {
                Event::Input(input) => self.handle_input_event(input),
                Event::Command(cmd) => self.handle_command_event(cmd),
                Event::RenderRequested => LoopControl::Continue { lines_changed: 0 },
                Event::Tick => self.handle_tick(),
                Event::LinesAvailable | Event::IngestCompleted => {
                    LoopControl::Continue { lines_changed: 0 }
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
                LoopControl::Continue { lines_changed } => {
                    let scrolled = self.auto_scroll();
                    self.finish_cycle(lines_changed, scrolled);
                    self.hooks.post_handle(&event);
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
        te_bin::join_background_tasks(
            reason,
            std::mem::take(&mut self.source_handles),
            self.input_shutdown.take(),
            self.input_task.take(),
        )
        .await;
        te_bin::log_shutdown_stage(reason, "complete");
    }

    fn perform_initial_render(&mut self) {
        let decision = core_render::scheduler::Decision {
            semantic: RenderDelta::Full,
            effective: RenderDelta::Full,
        };
        if let Err(e) = self.invoke_render(&decision) {
            error!(target: "render.engine", ?e, "initial_render_error");
        }
    }

    fn invoke_render(&mut self, decision: &core_render::scheduler::Decision) -> Result<()> {
        let (state, view) = self.model.split_state_and_active_view();
        let path_snapshot = render(&mut self.render_engine, state, &*view, decision)?;
        let delta_snapshot = convert_delta_snapshot(self.scheduler.metrics_snapshot());
        self.render_metrics.store(delta_snapshot, path_snapshot);
        self.render_metrics.apply_to_state(state);
        Ok(())
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
            InputEvent::Resize(w, h) => self.handle_resize(*w, *h),
            InputEvent::TextCommit(text) => self.handle_text_commit(text),
            InputEvent::PasteStart => {
                self.paste.start();
                LoopControl::Continue { lines_changed: 0 }
            }
            InputEvent::PasteChunk(chunk) => {
                self.paste.push_chunk(chunk);
                LoopControl::Continue { lines_changed: 0 }
            }
            InputEvent::PasteEnd => {
                if let Some((normalized, graphemes)) = self.paste.finish() {
                    self.replay_text_input(&normalized, &graphemes)
                } else {
                    LoopControl::Continue { lines_changed: 0 }
                }
            }
            InputEvent::Key(_)
            | InputEvent::Mouse(_)
            | InputEvent::FocusGained
            | InputEvent::FocusLost
            | InputEvent::RawBytes(_)
            | InputEvent::CompositionUpdate { .. } => LoopControl::Continue { lines_changed: 0 },
        }
    }

    fn handle_key_press(&mut self, key: &core_events::KeyEventExt) -> LoopControl {
        if self.dialog.is_open() {
            return self.handle_dialog_key(key);
        }
        let Some(action) = translate_editor_key(key) else {
            return LoopControl::Continue { lines_changed: 0 };
        };
        let outcome = self.process_action(action);
        self.finish_dispatch(outcome)
    }

    fn handle_resize(&mut self, width: u16, height: u16) -> LoopControl {
        if check_resize(width, height) == ResizeOutcome::WindowTooSmall {
            self.model
                .state_mut()
                .set_ephemeral("Window too small", std::time::Duration::from_secs(2));
            self.scheduler.mark(RenderDelta::StatusLine);
            return LoopControl::Continue { lines_changed: 0 };
        }
        self.render_engine.invalidate_for_resize();
        self.scheduler.mark(RenderDelta::Full);
        let ctx = ConfigContext::new(width, height, STATUS_ROWS, 0, self.platform_traits);
        if let Some(new_margin) = self.config.recompute_with_context(ctx) {
            self.model.state_mut().config_vertical_margin = new_margin as usize;
        }
        LoopControl::Continue { lines_changed: 0 }
    }

    fn handle_tick(&mut self) -> LoopControl {
        if self.model.state_mut().tick_ephemeral() {
            self.scheduler.mark(RenderDelta::StatusLine);
        }
        LoopControl::Continue { lines_changed: 0 }
    }

    fn handle_text_commit(&mut self, text: &str) -> LoopControl {
        let (normalized, graphemes) = te_bin::normalize_into_graphemes(text);
        self.replay_text_input(&normalized, &graphemes)
    }

    fn handle_command_event(&mut self, cmd: &CommandEvent) -> LoopControl {
        match cmd {
            CommandEvent::Quit => LoopControl::Break {
                reason: te_bin::ShutdownReason::CommandQuit,
            },
        }
    }

    fn replay_text_input(&mut self, _normalized: &str, graphemes: &[String]) -> LoopControl {
        if self.dialog.is_open() {
            for g in graphemes {
                if let Some(c) = g.chars().next() {
                    self.dialog_input_char(c);
                }
            }
            return LoopControl::Continue { lines_changed: 0 };
        }
        let mut outcome = DispatchOutcome::default();
        for g in graphemes {
            if let Some(c) = g.chars().next() {
                let single = self.process_action(Action::Edit(EditAction::InsertChar(c)));
                outcome.absorb(single);
            }
        }
        self.finish_dispatch(outcome)
    }

    fn auto_scroll(&mut self) -> bool {
        if let Ok((width, height)) = crossterm::terminal::size() {
            let dialog_rows = self.dialog.row_span();
            let base_text_height = if height > 0 { (height - 1) as usize } else { 0 };
            let effective_text_height = base_text_height.saturating_sub(dialog_rows as usize);
            let before_first = self.model.active_view().viewport_first_line;
            let scroll_changed = {
                let (state, view) = self.model.split_state_and_active_view();
                view.auto_scroll(state, effective_text_height)
            };
            if scroll_changed {
                let after_first = self.model.active_view().viewport_first_line;
                self.scheduler.mark(RenderDelta::Scroll {
                    old_first: before_first,
                    new_first: after_first,
                });
                return true;
            }
            let _ = width;
        }
        false
    }

    fn finish_cycle(&mut self, lines_changed: usize, scrolled: bool) {
        if let Some(decision) = self.scheduler.consume() {
            log_render_decision(&decision, lines_changed, scrolled);
            if let Err(e) = self.invoke_render(&decision) {
                error!(target: "render.engine", ?e, "render_error");
            }
        }
    }

    fn finish_dispatch(&mut self, outcome: DispatchOutcome) -> LoopControl {
        let quit = outcome.quit;
        let lines_changed = self.apply_dispatch_outcome(outcome);
        if quit {
            LoopControl::Break {
                reason: te_bin::ShutdownReason::ActionQuit,
            }
        } else {
            LoopControl::Continue { lines_changed }
        }
    }

    fn apply_dispatch_outcome(&mut self, outcome: DispatchOutcome) -> usize {
        if outcome.buffer_replaced {
            self.render_engine.invalidate_for_resize();
            self.scheduler.mark(RenderDelta::Full);
            return 0;
        }
        if !outcome.dirty {
            if outcome.status_changed {
                self.scheduler.mark(RenderDelta::StatusLine);
            }
            return 0;
        }
        let after_line = self.model.active_view().cursor.line;
        if outcome.line_changed {
            self.scheduler
                .mark(RenderDelta::Lines(after_line..after_line + 1));
            1
        } else if outcome.status_changed {
            self.scheduler.mark(RenderDelta::StatusLine);
            0
        } else {
            self.scheduler.mark(RenderDelta::CursorOnly);
            0
        }
    }

    /// Dispatch `action` through `core_actions::dispatch`, then separately
    /// perform the file-I/O / clipboard / dialog-opening side effects that
    /// layer intentionally leaves as a clean no-op.
    fn process_action(&mut self, action: Action) -> DispatchOutcome {
        let pre_status = StatusSnapshot::capture(self.model.state(), &self.dialog);
        let before_line = self.model.active_view().cursor.line;
        let result = dispatch(
            &action,
            &mut self.model,
            &mut self.sticky_visual_col,
            &self.observers,
        );

        self.apply_side_effect(&action);

        let post_status = StatusSnapshot::capture(self.model.state(), &self.dialog);
        let after_line = self.model.active_view().cursor.line;
        let status_changed = post_status.differs(&pre_status);
        let line_changed = before_line != after_line;
        DispatchOutcome {
            dirty: result.dirty,
            buffer_replaced: result.buffer_replaced,
            quit: result.quit,
            status_changed,
            line_changed,
        }
    }

    fn apply_side_effect(&mut self, action: &Action) {
        match action {
            Action::OpenFindDialog => self.dialog = Dialog::find(),
            Action::OpenReplaceDialog => self.dialog = Dialog::replace(),
            Action::OpenGoToLineDialog => self.dialog = Dialog::go_to_line(),
            Action::Save => self.perform_save(None),
            Action::SaveAs(path) => self.perform_save(Some(path.clone())),
            Action::Open(path) => self.perform_open(path.clone()),
            Action::Cut => self.perform_cut(),
            Action::Copy => self.perform_copy(),
            Action::Paste => self.perform_paste(),
            _ => {}
        }
    }

    fn perform_save(&mut self, target: Option<PathBuf>) {
        if target.is_none() && self.model.state().file_name.is_none() {
            self.dialog = Dialog::save_as("");
            return;
        }
        let result = io_ops::write_file(self.model.state_mut(), target.as_deref());
        match result {
            WriteFileResult::Success => {
                if let Some(path) = target {
                    self.model.state_mut().file_name = Some(path);
                }
                self.model
                    .state_mut()
                    .set_ephemeral("Saved", std::time::Duration::from_secs(2));
            }
            WriteFileResult::NoFilename => {
                self.dialog = Dialog::save_as("");
            }
            WriteFileResult::ReadOnly => {
                self.model.state_mut().set_ephemeral(
                    "File is read-only",
                    std::time::Duration::from_secs(3),
                );
            }
            WriteFileResult::Error => {
                self.model
                    .state_mut()
                    .set_ephemeral("Save failed", std::time::Duration::from_secs(3));
            }
        }
    }

    fn perform_open(&mut self, path: PathBuf) {
        let requested_encoding = self.model.state().encoding;
        match io_ops::open_file(&path, requested_encoding) {
            OpenFileResult::Success(success) => {
                let state = self.model.state_mut();
                state.buffers[state.active] = success.buffer;
                state.file_name = Some(success.file_name);
                state.original_line_ending = success.original_line_ending;
                state.had_trailing_newline = success.had_trailing_newline;
                state.encoding = success.encoding;
                state.write_bom = success.write_bom;
                state.dirty = false;
                if success.mixed_line_endings {
                    tracing::warn!(target: "io", "mixed_line_endings_detected");
                }
                let view = self.model.active_view_mut();
                view.cursor = core_text::Position::origin();
                view.viewport_first_line = 0;
                self.render_engine.invalidate_for_resize();
                self.scheduler.mark(RenderDelta::Full);
            }
            OpenFileResult::Error => {
                self.model
                    .state_mut()
                    .set_ephemeral("Open failed", std::time::Duration::from_secs(3));
            }
        }
    }

    fn perform_copy(&mut self) {
        let Some(text) = self.selected_text() else {
            return;
        };
        self.set_clipboard_plain(&text);
    }

    fn perform_cut(&mut self) {
        let Some(span) = self.model.state().selection() else {
            return;
        };
        let (start, end) = span.inclusive_byte_range(self.model.state().active_buffer());
        let text = self.model.state().active_buffer().slice_bytes(start, end);
        self.set_clipboard_plain(&text);
        let (state, view) = self.model.split_state_and_active_view();
        state.delete_span_with_snapshot(&mut view.cursor, start, end);
        state.dirty = true;
        state.clear_selection();
        self.render_engine.invalidate_for_resize();
        self.scheduler.mark(RenderDelta::Full);
    }

    fn perform_paste(&mut self) {
        let text = {
            let mut backend = CrosstermBackend::new();
            match backend.clipboard_get_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(target: "clipboard", ?e, "clipboard_read_failed");
                    return;
                }
            }
        };
        if text.is_empty() {
            return;
        }
        let outcome = self.process_action(Action::Edit(EditAction::InsertText(text)));
        self.apply_dispatch_outcome(outcome);
    }

    fn selected_text(&self) -> Option<String> {
        let span = self.model.state().selection()?;
        let buffer = self.model.state().active_buffer();
        let (start, end) = span.inclusive_byte_range(buffer);
        Some(buffer.slice_bytes(start, end))
    }

    fn set_clipboard_plain(&mut self, text: &str) {
        let mut backend = CrosstermBackend::new();
        let escaped = text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
        let html = format!("<pre>{escaped}</pre>");
        if let Err(e) = backend.clipboard_set_text_rtf_html(text, text, &html) {
            tracing::warn!(target: "clipboard", ?e, "clipboard_write_failed");
        }
    }

    fn handle_dialog_key(&mut self, key: &core_events::KeyEventExt) -> LoopControl {
        use core_events::{KeyToken, ModMask, NamedKey};
        let (base, mods) = match &key.token {
            KeyToken::Chord { base, mods } => ((**base).clone(), *mods),
            other => (other.clone(), ModMask::empty()),
        };
        match base {
            KeyToken::Named(NamedKey::Esc) => {
                self.dialog.cancel();
                self.scheduler.mark(RenderDelta::Full);
            }
            KeyToken::Named(NamedKey::Enter) if mods.contains(ModMask::CTRL) => {
                self.confirm_dialog(true);
            }
            KeyToken::Named(NamedKey::Enter) => {
                self.confirm_dialog(false);
            }
            KeyToken::Named(NamedKey::Backspace) => {
                self.dialog_backspace();
            }
            KeyToken::Named(NamedKey::Tab) => {
                if let Dialog::Replace(replace) = &mut self.dialog {
                    replace.toggle_focus();
                    self.scheduler.mark(RenderDelta::StatusLine);
                }
            }
            KeyToken::Char(c) => {
                self.dialog_input_char(c);
            }
            _ => {}
        }
        LoopControl::Continue { lines_changed: 0 }
    }

    fn dialog_input_char(&mut self, c: char) {
        match &mut self.dialog {
            Dialog::Open(input) | Dialog::SaveAs(input) | Dialog::Find(input) | Dialog::GoToLine(input) => {
                input.insert_char(c);
            }
            Dialog::Replace(replace) => {
                replace.focused_mut().insert_char(c);
            }
            Dialog::None | Dialog::About | Dialog::Message(_) => {}
        }
        self.scheduler.mark(RenderDelta::StatusLine);
    }

    fn dialog_backspace(&mut self) {
        match &mut self.dialog {
            Dialog::Open(input) | Dialog::SaveAs(input) | Dialog::Find(input) | Dialog::GoToLine(input) => {
                input.backspace();
            }
            Dialog::Replace(replace) => {
                replace.focused_mut().backspace();
            }
            Dialog::None | Dialog::About | Dialog::Message(_) => {}
        }
        self.scheduler.mark(RenderDelta::StatusLine);
    }

    fn confirm_dialog(&mut self, all: bool) {
        match std::mem::replace(&mut self.dialog, Dialog::None) {
            Dialog::Open(input) => {
                self.dialog = Dialog::None;
                let outcome = self.process_action(Action::Open(PathBuf::from(input.value)));
                self.finish_dispatch(outcome);
            }
            Dialog::SaveAs(input) => {
                self.dialog = Dialog::None;
                let outcome = self.process_action(Action::SaveAs(PathBuf::from(input.value)));
                self.finish_dispatch(outcome);
            }
            Dialog::Find(input) => {
                let outcome = self.process_action(Action::FindNext(input.value.clone()));
                self.dialog = Dialog::Find(input);
                self.finish_dispatch(outcome);
            }
            Dialog::Replace(replace) => {
                let action = if all {
                    Action::ReplaceAll {
                        pattern: replace.find.value.clone(),
                        replacement: replace.replacement.value.clone(),
                    }
                } else {
                    Action::ReplaceOne {
                        pattern: replace.find.value.clone(),
                        replacement: replace.replacement.value.clone(),
                    }
                };
                let outcome = self.process_action(action);
                self.dialog = Dialog::Replace(replace);
                self.finish_dispatch(outcome);
            }
            Dialog::GoToLine(input) => {
                self.dialog = Dialog::None;
                if let Ok(line) = input.value.trim().parse::<u64>() {
                    let outcome = self.process_action(Action::GoToLine(line));
                    self.finish_dispatch(outcome);
                }
            }
            other @ (Dialog::None | Dialog::About | Dialog::Message(_)) => {
                self.dialog = Dialog::None;
                let _ = other;
            }
        }
        self.scheduler.mark(RenderDelta::Full);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    let context = startup.run()?;
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(std::time::Duration::from_millis(250)));
    let source_handles = registry.spawn_all(&tx);

    let mut runtime =
        EditorRuntime::new(context, tx, rx, input_task, input_shutdown, source_handles);
    runtime.run().await
}

fn render(
    engine: &mut RenderEngine,
    state: &mut EditorState,
    view: &core_model::View,
    decision: &core_render::scheduler::Decision,
) -> Result<core_state::RenderPathSnapshotLite> {
    use core_render::timing::record_last_render_ns;
    use crossterm::terminal::size;
    use std::time::Instant;
    let (w, h) = size()?;
    let span = tracing::debug_span!(target: "render.engine", "render_cycle", semantic=?decision.semantic, effective=?decision.effective, width=w, height=h);
    let _e = span.enter();
    let start = Instant::now();
    let layout = core_model::Layout::single(w, h);
    let res = match &decision.effective {
        RenderDelta::CursorOnly => {
            let status_line = build_status_line_with_ephemeral(state, view, w);
            let snapshot = FrameSnapshot::new(&*state, view, &layout, w, h, &status_line);
            apply_cursor_only(engine, CursorOnlyFrame::new(snapshot))
        }
        RenderDelta::Lines(dirty_lines) => {
            let status_line = build_status_line_with_ephemeral(state, view, w);
            let mut tracker = core_render::dirty::DirtyLinesTracker::new();
            for line in dirty_lines.start..dirty_lines.end {
                tracker.mark(line);
            }
            let snapshot = FrameSnapshot::new(&*state, view, &layout, w, h, &status_line);
            apply_lines_partial(engine, LinesPartialFrame::new(snapshot, &mut tracker))
        }
        RenderDelta::Scroll {
            old_first,
            new_first,
        } => {
            let status_line = build_status_line_with_ephemeral(state, view, w);
            let snapshot = FrameSnapshot::new(&*state, view, &layout, w, h, &status_line);
            apply_scroll_shift(
                engine,
                ScrollShiftFrame::new(snapshot, *old_first, *new_first),
            )
        }
        _ => {
            let status_line = build_status_line_with_ephemeral(state, view, w);
            let snapshot = FrameSnapshot::new(&*state, view, &layout, w, h, &status_line);
            apply_full(engine, snapshot)
        }
    };
    let elapsed = start.elapsed();
    record_last_render_ns(elapsed.as_nanos() as u64);
    match res {
        Ok(()) => {
            let snap = engine.metrics_snapshot();
            Ok(core_state::RenderPathSnapshotLite {
                full_frames: snap.full_frames,
                partial_frames: snap.partial_frames,
                cursor_only_frames: snap.cursor_only_frames,
                lines_frames: snap.lines_frames,
                escalated_large_set: snap.escalated_large_set,
                resize_invalidations: snap.resize_invalidations,
                dirty_lines_marked: snap.dirty_lines_marked,
                dirty_candidate_lines: snap.dirty_candidate_lines,
                dirty_lines_repainted: snap.dirty_lines_repainted,
                last_full_render_ns: snap.last_full_render_ns,
                last_partial_render_ns: snap.last_partial_render_ns,
                print_commands: snap.print_commands,
                cells_printed: snap.cells_printed,
                scroll_region_shifts: snap.scroll_region_shifts,
                scroll_region_lines_saved: snap.scroll_region_lines_saved,
                scroll_shift_degraded_full: snap.scroll_shift_degraded_full,
                trim_attempts: snap.trim_attempts,
                trim_success: snap.trim_success,
                cols_saved_total: snap.cols_saved_total,
                status_skipped: snap.status_skipped,
            })
        }
        Err(e) => Err(e),
    }
}

#[inline]
fn log_render_decision(
    decision: &core_render::scheduler::Decision,
    lines_changed: usize,
    scrolled: bool,
) {
    tracing::debug!(
        target: "render.scheduler",
        semantic = ?decision.semantic,
        effective = ?decision.effective,
        lines_changed,
        scrolled,
        "render_decision"
    );
}

fn convert_delta_snapshot(
    metrics: RenderDeltaMetricsSnapshot,
) -> Option<core_state::RenderDeltaSnapshotLite> {
    if metrics.semantic_frames == 0 {
        return None;
    }
    Some(core_state::RenderDeltaSnapshotLite {
        full: metrics.full,
        lines: metrics.lines,
        scroll: metrics.scroll,
        status_line: metrics.status_line,
        cursor_only: metrics.cursor_only,
        collapsed_scroll: metrics.collapsed_scroll,
        suppressed_scroll: metrics.suppressed_scroll,
        semantic_frames: metrics.semantic_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_actions::dispatcher::MotionKind;
    use core_model::{EditorModel, View, ViewId};
    use core_text::Position;

    fn mk_runtime_model(initial: &str) -> EditorModel {
        let state = EditorState::new(Buffer::from_str("buf", initial).unwrap());
        EditorModel::with_view(View::new(ViewId(0), 0, Position::origin(), 0), state)
    }

    #[test]
    fn selection_extends_with_shift_motion_and_collapses_on_plain_motion() {
        let mut model = mk_runtime_model("hello world");
        let mut sticky = None;
        dispatch(
            &Action::ExtendSelection(MotionKind::Right(5)),
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(model.state().selection().is_some());
        dispatch(
            &Action::Motion(MotionKind::Right(1)),
            &mut model,
            &mut sticky,
            &[],
        );
        assert!(model.state().selection().is_none());
    }

    #[test]
    fn cut_removes_selected_span_and_clears_selection() {
        let mut model = mk_runtime_model("hello world");
        let mut sticky = None;
        dispatch(
            &Action::ExtendSelection(MotionKind::Right(5)),
            &mut model,
            &mut sticky,
            &[],
        );
        let span = model.state().selection().unwrap();
        let (start, end) = span.inclusive_byte_range(model.state().active_buffer());
        let text = model.state().active_buffer().slice_bytes(start, end);
        assert_eq!(text, "hello");
        let (state, view) = model.split_state_and_active_view();
        state.delete_span_with_snapshot(&mut view.cursor, start, end);
        state.clear_selection();
        assert_eq!(model.state().active_buffer().line(0).unwrap(), " world");
        assert!(model.state().selection().is_none());
    }

    #[test]
    fn dialog_row_span_matches_kind() {
        assert_eq!(Dialog::find().row_span(), 3);
        assert_eq!(Dialog::replace().row_span(), 4);
    }

    #[test]
    fn replace_field_toggles_between_find_and_replacement() {
        let mut replace = match Dialog::replace() {
            Dialog::Replace(r) => r,
            _ => unreachable!(),
        };
        assert_eq!(replace.focus, ReplaceField::Find);
        replace.toggle_focus();
        assert_eq!(replace.focus, ReplaceField::Replacement);
    }

    #[test]
    fn window_too_small_check_matches_minimum_bounds() {
        assert_eq!(check_resize(59, 30), ResizeOutcome::WindowTooSmall);
        assert_eq!(check_resize(80, 24), ResizeOutcome::Accepted);
    }

    #[allow(dead_code)]
    fn observer_trait_object_compiles(_o: &dyn ActionObserver) {}

    #[allow(dead_code)]
    fn mouse_module_is_reachable() {
        let _ = mouse::MouseState::default();
    }
}
