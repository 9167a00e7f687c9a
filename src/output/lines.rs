use crate::document::Document;
use crate::output::traits::{OutputResult, Sink};
use std::io::Write;

/// Writes the first link target of every document, one per line
///
/// Documents without any link are skipped.
pub struct LineSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for LineSink<W> {
    fn write_document(&mut self, document: &Document) -> OutputResult<()> {
        match document.first_link_target() {
            Some(target) => {
                writeln!(self.writer, "{}", target)?;
                self.written += 1;
            }
            None => tracing::debug!("{} has no links to print", document.location()),
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
