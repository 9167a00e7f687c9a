use crate::document::Document;
use crate::output::traits::{OutputResult, Sink};
use std::io::Write;

/// Writes every document payload as one JSON line
pub struct NdjsonSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for NdjsonSink<W> {
    fn write_document(&mut self, document: &Document) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, document.body())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
