use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zstd::stream::read::Decoder;

use crate::util::open_with_backoff;

#[inline]
fn is_zst(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("zst"))
}

/// Open `path` for buffered text reading, decoding zstd when the name ends in `.zst`.
///
/// We request `window_log_max(31)` up front to avoid "Frame requires too much memory"
/// on dumps compressed with long-distance matching.
pub fn open_text(path: &Path, read_buf_bytes: usize) -> Result<Box<dyn BufRead>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let cap = read_buf_bytes.max(8 * 1024);
    if is_zst(path) {
        let mut decoder = Decoder::new(file)?;
        decoder.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(cap, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(cap, file)))
    }
}

/// Read a whole (possibly compressed) document into memory.
pub fn read_to_string(path: &Path, read_buf_bytes: usize) -> Result<String> {
    let mut reader = open_text(path, read_buf_bytes)?;
    let mut s = String::new();
    reader
        .read_to_string(&mut s)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(s)
}

/// Stream a JSONL file line-by-line; call `on_line` with each non-blank line (no terminator).
pub fn for_each_line(path: &Path, read_buf_bytes: usize, mut on_line: impl FnMut(&str) -> Result<()>) -> Result<()> {
    let mut reader = open_text(path, read_buf_bytes)?;
    let mut buf = String::with_capacity(16 * 1024);
    loop {
        buf.clear();
        let n = reader
            .read_line(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        on_line(line)?;
    }
    Ok(())
}
