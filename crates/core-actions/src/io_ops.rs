//! File IO helpers extracted from dispatcher (Refactor R2 Step 5).
//!
//! Breadth-first: synchronous, minimal, no async abstractions yet. These helpers isolate
//! normalization + reconstruction logic so the dispatcher focuses on command semantics.
//! Future (Phase 3+) replacements can provide async versions with identical signatures.
//!
//! Load resolves `Encoding::AutoDetect` to a concrete encoding via a BOM
//! sniff (spec §4.7/§9); save always threads the resolved encoding through,
//! never `AutoDetect` itself. Save writes to a sibling temp file and renames
//! it over the target so a write failure never destroys existing content —
//! the rename is atomic on POSIX and NTFS when source and destination share
//! a filesystem, which is why the temp file lives next to the target rather
//! than in a system temp directory.

use core_state::{EditorState, Encoding, LineEnding, normalize_line_endings};
use core_text::Buffer;
use std::path::{Path, PathBuf};

/// Result of attempting to open a file.
#[derive(Debug)]
pub enum OpenFileResult {
    Success(OpenSuccess),
    Error, // caller logs / sets ephemeral already
}

pub struct OpenSuccess {
    pub buffer: Buffer,
    pub file_name: std::path::PathBuf,
    pub original_line_ending: LineEnding,
    pub had_trailing_newline: bool,
    pub mixed_line_endings: bool,
    /// Encoding actually used to decode the file; `AutoDetect` never appears
    /// here, it's already been resolved by the BOM sniff.
    pub encoding: Encoding,
    /// Whether the file had a BOM, and therefore whether one should be
    /// re-written on save.
    pub write_bom: bool,
}

impl std::fmt::Debug for OpenSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSuccess")
            .field("file_name", &self.file_name)
            .field("original_line_ending", &self.original_line_ending)
            .field("had_trailing_newline", &self.had_trailing_newline)
            .field("mixed_line_endings", &self.mixed_line_endings)
            .field("encoding", &self.encoding)
            .field("write_bom", &self.write_bom)
            .finish()
    }
}

/// Open a file path into a new Buffer applying line ending normalization and
/// encoding resolution. `requested_encoding` is the configured encoding
/// (`Encoding::AutoDetect` triggers the BOM sniff; any other value is used
/// as-is, skipping detection).
pub fn open_file(path: &std::path::Path, requested_encoding: Encoding) -> OpenFileResult {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(target: "io", ?e, "file_open_error");
            return OpenFileResult::Error;
        }
    };

    let (encoding, bom_len) = match requested_encoding {
        Encoding::AutoDetect => match Encoding::sniff_bom(&bytes) {
            Some((enc, len)) => (enc, len),
            None => (Encoding::Utf8, 0),
        },
        other => (other, 0),
    };

    let decoded = match decode(&bytes[bom_len..], encoding) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(target: "io.encoding", ?e, ?encoding, "decode_failed");
            return OpenFileResult::Error;
        }
    };

    let norm = normalize_line_endings(&decoded);
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    match Buffer::from_str(name, &norm.normalized) {
        Ok(buffer) => OpenFileResult::Success(OpenSuccess {
            buffer,
            file_name: path.to_path_buf(),
            original_line_ending: norm.original,
            had_trailing_newline: norm.had_trailing_newline,
            mixed_line_endings: norm.mixed,
            encoding,
            write_bom: bom_len > 0,
        }),
        Err(e) => {
            tracing::error!(target: "io", ?e, "buffer_create_failed");
            OpenFileResult::Error
        }
    }
}

/// Decode `bytes` (BOM already stripped by the caller) per `encoding`. ANSI
/// and ASCII are treated as UTF-8 at this boundary: real code-page
/// conversion is an external collaborator per the Non-goals, this core only
/// tags and threads the encoding through.
fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, String> {
    match encoding {
        Encoding::Utf16Le => {
            let units: Vec<u16> = bytes
                .chunks(2)
                .map(|c| u16::from_le_bytes([c[0], *c.get(1).unwrap_or(&0)]))
                .collect();
            String::from_utf16(&units).map_err(|e| e.to_string())
        }
        Encoding::Utf8 | Encoding::Ansi | Encoding::Ascii => {
            String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
        }
        Encoding::AutoDetect => unreachable!("resolved before decode is called"),
    }
}

/// Encode `content` per `encoding`, prefixing a BOM when `write_bom` is set.
fn encode(content: &str, encoding: Encoding, write_bom: bool) -> Vec<u8> {
    match encoding {
        Encoding::Utf16Le => {
            let mut out = Vec::with_capacity(content.len() * 2 + 2);
            if write_bom {
                out.extend_from_slice(&[0xFF, 0xFE]);
            }
            for unit in content.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        Encoding::Utf8 | Encoding::Ansi | Encoding::Ascii | Encoding::AutoDetect => {
            let mut out = Vec::with_capacity(content.len() + 3);
            if write_bom {
                out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
            }
            out.extend_from_slice(content.as_bytes());
            out
        }
    }
}

/// Result of a write attempt.
#[derive(Debug)]
pub enum WriteFileResult {
    Success,
    NoFilename,
    /// Target exists and its read-only attribute is set; caller should
    /// prompt the user, and on confirmation call `clear_readonly` then retry.
    ReadOnly,
    Error,
}

/// Clear the read-only attribute on `path` so a subsequent save can proceed.
pub fn clear_readonly(path: &Path) -> std::io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    std::fs::set_permissions(path, perms)
}

/// Serialize the active buffer out to its associated file name (or provided
/// target) honoring original line ending style, trailing newline presence,
/// and the configured encoding/BOM. Writes through a sibling temp file and
/// renames it into place so a write failure never destroys the existing
/// file; a stray temp file may be left behind if the rename itself fails.
pub fn write_file(state: &mut EditorState, target: Option<&std::path::Path>) -> WriteFileResult {
    let path = if let Some(p) = target {
        p.to_path_buf()
    } else if let Some(existing) = state.file_name.clone() {
        existing
    } else {
        return WriteFileResult::NoFilename;
    };

    if let Ok(meta) = std::fs::metadata(&path)
        && meta.permissions().readonly()
    {
        return WriteFileResult::ReadOnly;
    }

    let content = serialize_buffer(state);
    let bytes = encode(&content, state.encoding, state.write_bom);

    let tmp_path = sibling_temp_path(&path);
    if let Err(e) = std::fs::write(&tmp_path, &bytes) {
        tracing::error!(target: "io.save", ?e, "temp_write_failed");
        let _ = std::fs::remove_file(&tmp_path);
        return WriteFileResult::Error;
    }
    match std::fs::rename(&tmp_path, &path) {
        Ok(()) => {
            state.dirty = false;
            state.clear_provisional_indent();
            WriteFileResult::Success
        }
        Err(e) => {
            tracing::error!(target: "io.save", ?e, "atomic_rename_failed");
            WriteFileResult::Error
        }
    }
}

fn sibling_temp_path(target: &Path) -> PathBuf {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("buffer");
    dir.join(format!(".{name}.tmp-save"))
}

/// Reconstruct file content from the active buffer, honoring the original
/// line-ending style and trailing-newline presence. The line marked as
/// holding unconfirmed auto-indent whitespace (if any) is written empty
/// rather than with its provisional prefix (spec §4.7).
fn serialize_buffer(state: &EditorState) -> String {
    let mut content = String::new();
    let line_ending = state.original_line_ending.as_str();
    let last_index = state.active_buffer().line_count();
    let provisional_line = state.provisional_indent_line();
    for i in 0..last_index {
        if let Some(mut l) = state.active_buffer().line(i) {
            let ends_nl = l.ends_with('\n');
            if ends_nl {
                l.pop();
            }
            if provisional_line == Some(i as u64) {
                l.clear();
            }
            content.push_str(&l);
            if (i + 1 < last_index) || (state.had_trailing_newline && i + 1 == last_index) {
                content.push_str(line_ending);
            }
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    #[test]
    fn open_file_normalizes_and_sets_metadata() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            // Mixed line endings CRLF + LF + final CRLF
            write!(f, "line1\r\nline2\nline3\r\n").unwrap();
        }
        match open_file(&path, Encoding::AutoDetect) {
            OpenFileResult::Success(s) => {
                assert!(s.buffer.line(0).unwrap().starts_with("line1"));
                assert!(s.mixed_line_endings, "should detect mixed endings");
                assert!(s.had_trailing_newline, "should detect trailing newline");
                assert_eq!(s.encoding, Encoding::Utf8);
                assert!(!s.write_bom);
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn open_file_detects_utf8_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.txt");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hi\n");
        std::fs::write(&path, &bytes).unwrap();
        match open_file(&path, Encoding::AutoDetect) {
            OpenFileResult::Success(s) => {
                assert_eq!(s.buffer.line(0).unwrap(), "hi\n");
                assert_eq!(s.encoding, Encoding::Utf8);
                assert!(s.write_bom);
                assert!(matches!(s.original_line_ending, LineEnding::Lf));
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn open_file_decodes_utf16le_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u16.txt");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();
        match open_file(&path, Encoding::AutoDetect) {
            OpenFileResult::Success(s) => {
                assert_eq!(s.buffer.line(0).unwrap(), "hi");
                assert_eq!(s.encoding, Encoding::Utf16Le);
                assert!(s.write_bom);
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn write_file_preserves_original_style() {
        let buffer = Buffer::from_str("t", "a\nb\n").unwrap();
        let mut state = EditorState::new(buffer);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        state.file_name = Some(path.clone());
        state.original_line_ending = LineEnding::Crlf;
        state.had_trailing_newline = true;
        state.dirty = true;
        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::Success));
        assert!(!state.dirty, "dirty cleared after write");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("a\r\nb\r\n"));
    }

    #[test]
    fn write_file_no_filename() {
        let buffer = Buffer::from_str("t", "x").unwrap();
        let mut state = EditorState::new(buffer);
        state.dirty = true;
        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::NoFilename));
        assert!(state.dirty, "dirty unchanged when no filename");
    }

    #[test]
    fn write_file_leaves_existing_content_intact_when_target_is_readonly() {
        let buffer = Buffer::from_str("t", "new\n").unwrap();
        let mut state = EditorState::new(buffer);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.txt");
        std::fs::write(&path, b"old\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();
        state.file_name = Some(path.clone());

        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::ReadOnly));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\n");

        clear_readonly(&path).unwrap();
        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::Success));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn write_file_writes_bom_when_configured() {
        let buffer = Buffer::from_str("t", "hi\n").unwrap();
        let mut state = EditorState::new(buffer);
        state.write_bom = true;
        state.encoding = core_state::Encoding::Utf8;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom_out.txt");
        state.file_name = Some(path.clone());
        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::Success));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
    }

    #[test]
    fn write_file_skips_provisional_auto_indent_line() {
        let buffer = Buffer::from_str("t", "one\n  \n").unwrap();
        let mut state = EditorState::new(buffer);
        state.mark_provisional_indent(1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provisional.txt");
        state.file_name = Some(path.clone());
        state.had_trailing_newline = true;
        let res = write_file(&mut state, None);
        assert!(matches!(res, WriteFileResult::Success));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "one\n\n");
        assert_eq!(state.provisional_indent_line(), None);
    }
}
