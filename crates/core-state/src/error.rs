//! Error taxonomy shared across the core crates.
//!
//! `anyhow` remains the workhorse for internal plumbing (most call sites just
//! want `?` and a context chain), but the handful of conditions a caller
//! needs to match on by kind — out of memory during ingest, a read-only save
//! target, an undersized terminal — get a real enum so `te-bin` can render a
//! specific status message instead of a generic error string.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("out of memory while ingesting input ({limit_bytes} byte budget exceeded)")]
    OutOfMemory { limit_bytes: u64 },

    #[error("input exhausted before the requested line was reached")]
    InputExhausted,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} is read-only")]
    ReadOnlyTarget { path: PathBuf },

    #[error("window too small: need at least {min_cols}x{min_rows}, got {cols}x{rows}")]
    WindowTooSmall {
        min_cols: u16,
        min_rows: u16,
        cols: u16,
        rows: u16,
    },

    #[error("unrecognized input: {0:?}")]
    UnrecognizedInput(String),

    #[error("pattern not found: {0:?}")]
    SearchNotFound(String),
}
