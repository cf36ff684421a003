//! Table sinks. Every write replaces the named table wholesale.

use crate::config::TableFormat;
use crate::records::{RenderOptions, TableRow};
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for flushed tables.
pub trait TableSink {
    /// Replace table `name` with exactly `rows`.
    fn write_table<R: TableRow>(&mut self, name: &str, rows: &[R]) -> Result<()>;
}

impl<S: TableSink + ?Sized> TableSink for &mut S {
    fn write_table<R: TableRow>(&mut self, name: &str, rows: &[R]) -> Result<()> {
        (**self).write_table(name, rows)
    }
}

/// Writes `<dir>/<name>.csv` or `<dir>/<name>.jsonl` through a temp file + atomic replace,
/// so readers never see a half-written table.
#[derive(Clone, Debug)]
pub struct FileSink {
    dir: PathBuf,
    format: TableFormat,
    render: RenderOptions,
    write_buf: usize,
}

impl FileSink {
    pub fn create(dir: &Path, format: TableFormat) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf(), format, render: RenderOptions::default(), write_buf: 256 * 1024 })
    }

    pub fn human_timestamps(mut self, yes: bool) -> Self {
        self.render.human_timestamps = yes;
        self
    }

    pub fn write_buffer(mut self, bytes: usize) -> Self {
        self.write_buf = bytes.max(8 * 1024);
        self
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }

    fn write_rows<R: TableRow, W: Write>(&self, w: &mut W, rows: &[R]) -> Result<()> {
        match self.format {
            TableFormat::Csv => {
                write_csv_record(w, R::HEADER.iter().copied())?;
                for row in rows {
                    let cells = row.cells(self.render);
                    write_csv_record(w, cells.iter().map(String::as_str))?;
                }
            }
            TableFormat::Jsonl => {
                for row in rows {
                    serde_json::to_writer(&mut *w, &row.to_json(self.render)?)?;
                    w.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }
}

impl TableSink for FileSink {
    fn write_table<R: TableRow>(&mut self, name: &str, rows: &[R]) -> Result<()> {
        let final_path = self.path_for(name);
        let tmp_path = self.dir.join(format!(".{name}.{}.tmp", self.format.extension()));
        let file = create_with_backoff(&tmp_path, 16, 50)
            .with_context(|| format!("create {}", tmp_path.display()))?;
        let mut w = BufWriter::with_capacity(self.write_buf, file);
        self.write_rows(&mut w, rows)
            .with_context(|| format!("write {}", tmp_path.display()))?;
        w.flush().with_context(|| format!("flush {}", tmp_path.display()))?;
        drop(w);
        replace_file_atomic_backoff(&tmp_path, &final_path)
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// One RFC 4180 record: quote fields with separators, quotes or line breaks; double inner quotes.
fn write_csv_record<'a, W: Write>(w: &mut W, fields: impl Iterator<Item = &'a str>) -> std::io::Result<()> {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(field) {
            w.write_all(b"\"")?;
            w.write_all(field.replace('"', "\"\"").as_bytes())?;
            w.write_all(b"\"")?;
        } else {
            w.write_all(field.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}
