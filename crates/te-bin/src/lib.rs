//! Shared startup/shutdown/telemetry plumbing for the `edit` and `more`
//! binaries: logging setup, panic hook, bracketed-paste assembly, and the
//! shutdown-reason bookkeeping both event loops share.

use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;

/// Configure the process-wide `tracing` subscriber: a non-blocking rolling
/// file appender at `<log_name>` in the current directory, filtered by
/// `RUST_LOG` (or `info` by default). Stale logs from a prior run are
/// removed first so each run starts a fresh file. Returns the worker guard;
/// dropping it flushes and stops the background writer thread.
pub fn configure_logging(log_name: &str) -> Result<Option<WorkerGuard>> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(log_name);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Ok(Some(guard)),
        Err(_err) => Ok(None),
    }
}

/// Install a panic hook that logs via `tracing::error!` before invoking the
/// previously-installed (default) hook. Idempotent across repeated calls.
pub fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[inline]
pub fn log_paste_commit(content: &str, grapheme_count: usize) {
    tracing::debug!(
        target: "input.paste",
        size_bytes = content.len(),
        grapheme_count = grapheme_count,
        "paste_commit"
    );
}

/// NFC-normalize `input` and return it alongside its grapheme clusters.
pub fn normalize_into_graphemes(input: &str) -> (String, Vec<String>) {
    let (normalized, segments) = core_text::segment::normalize_and_segment(input);
    let graphemes = segments
        .into_iter()
        .map(|segment| segment.cluster)
        .collect::<Vec<_>>();
    (normalized, graphemes)
}

/// Accumulates a bracketed-paste's chunks until `PasteEnd`, then normalizes
/// and segments the whole payload as one unit (so a paste replays as a
/// single coalesced insert rather than one undo step per chunk).
#[derive(Default)]
pub struct PasteSession {
    buffer: Option<String>,
}

impl PasteSession {
    pub fn new() -> Self {
        Self { buffer: None }
    }

    pub fn start(&mut self) {
        tracing::trace!(target: "input.paste", "paste_start");
        self.buffer = Some(String::new());
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        tracing::trace!(target: "input.paste", chunk_len = chunk.len(), "paste_chunk");
        if let Some(buffer) = &mut self.buffer {
            buffer.push_str(chunk);
        }
    }

    pub fn finish(&mut self) -> Option<(String, Vec<String>)> {
        let buffer = self.buffer.take()?;
        let (normalized, graphemes) = normalize_into_graphemes(&buffer);
        log_paste_commit(&normalized, graphemes.len());
        Some((normalized, graphemes))
    }
}

/// Why the event loop is shutting down, logged at each shutdown stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    CtrlC,
    CommandQuit,
    ActionQuit,
    ShutdownEvent,
    ChannelClosed,
    WindowTooSmall,
    /// Ingest hit its byte budget (`CoreError::OutOfMemory`) or stdin/file
    /// closed with zero lines ever ingested.
    OutOfMemory,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CtrlC => "ctrl_c",
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::ActionQuit => "action_quit",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
            ShutdownReason::WindowTooSmall => "window_too_small",
            ShutdownReason::OutOfMemory => "out_of_memory",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    tracing::info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

/// Join every background task a binary's event loop spawned (event sources,
/// the async input task), bounding each join with a short timeout so a
/// wedged task never hangs process exit.
pub async fn join_background_tasks(
    reason: ShutdownReason,
    mut source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    input_task: Option<tokio::task::JoinHandle<()>>,
) {
    while let Some(handle) = source_handles.pop() {
        match tokio::time::timeout(std::time::Duration::from_millis(200), handle).await {
            Ok(Ok(_)) => tracing::trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "event_source_task_stopped"
            ),
            Ok(Err(err)) if err.is_cancelled() => tracing::trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "event_source_task_cancelled"
            ),
            Ok(Err(err)) => tracing::error!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                ?err,
                "event_source_task_error"
            ),
            Err(_) => tracing::warn!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "event_source_task_timeout"
            ),
        }
    }

    if let Some(shutdown) = input_shutdown {
        tracing::trace!(
            target: "runtime.shutdown",
            reason = reason.as_str(),
            "input_task_shutdown_signal"
        );
        shutdown.signal();
    }

    if let Some(handle) = input_task {
        match handle.await {
            Ok(_) => tracing::trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_joined"
            ),
            Err(err) if err.is_cancelled() => tracing::trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_cancelled"
            ),
            Err(err) => tracing::error!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                ?err,
                "input_task_join_failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing::dispatcher::Dispatch;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::layer::Layer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::registry::Registry;

    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Clone, Debug)]
    struct CapturedEvent {
        target: String,
        fields: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct FieldCollector {
        fields: Vec<(String, String)>,
    }

    impl Visit for FieldCollector {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }

    impl<S> Layer<S> for Capture
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut collector = FieldCollector::default();
            event.record(&mut collector);
            let meta = event.metadata();
            self.events.lock().unwrap().push(CapturedEvent {
                target: meta.target().to_string(),
                fields: collector.fields,
            });
        }
    }

    #[test]
    fn paste_commit_log_redacts_content() {
        let capture = Capture::default();
        let events = capture.events.clone();
        let subscriber = Registry::default().with(capture);
        let dispatcher = Dispatch::new(subscriber);

        tracing::dispatcher::with_default(&dispatcher, || {
            let secret = "classified buffer \u{2702}\u{fe0f}";
            log_paste_commit(secret, 3);
        });

        let events = events.lock().unwrap();
        let event = events
            .iter()
            .find(|e| e.target == "input.paste")
            .expect("missing input.paste event");
        assert!(event.fields.iter().any(|(name, _)| name == "size_bytes"));
        for (_, value) in &event.fields {
            assert!(!value.contains("classified buffer"));
        }
    }

    #[test]
    fn paste_session_segments_into_graphemes_on_finish() {
        let mut session = PasteSession::new();
        session.start();
        session.push_chunk("h\u{e9}");
        session.push_chunk("llo");
        let (normalized, graphemes) = session.finish().expect("paste should commit");
        assert_eq!(normalized, "h\u{e9}llo");
        assert_eq!(graphemes.len(), 4);
    }

    #[test]
    fn paste_session_with_no_start_reports_nothing() {
        let mut session = PasteSession::new();
        assert!(session.finish().is_none());
    }

    #[test]
    fn shutdown_reason_labels_are_stable() {
        assert_eq!(ShutdownReason::CtrlC.as_str(), "ctrl_c");
        assert_eq!(ShutdownReason::WindowTooSmall.to_string(), "window_too_small");
    }
}
