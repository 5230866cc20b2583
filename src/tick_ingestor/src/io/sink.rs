use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use snafu::{Backtrace, ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// An error occurred while trying to write the data (e.g., the writer is unusable).
    #[snafu(display("Failed to write data: {message}"))]
    WriteError {
        message: String,
        backtrace: Backtrace,
    },

    /// A row could not be encoded into the destination format.
    #[snafu(display("Failed to encode row {row}: {source}"))]
    Encode {
        row: usize,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// A generic I/O error.
    #[snafu(display("I/O error: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

/// Destination for the rows accumulated by a run.
#[async_trait]
pub trait DataSink {
    /// The type of output returned after a successful write operation.
    ///
    /// This makes the trait flexible. For example:
    /// - A stream sink might return `usize`, the number of rows written.
    /// - A file sink might return the path of the created file.
    type Output;

    /// Writes every row to the destination, in order.
    async fn write<R: Serialize + Sync>(&self, rows: &[R]) -> Result<Self::Output, SinkError>;
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| {
            WriteSnafu {
                message: "writer lock poisoned",
            }
            .build()
        })
    }
}

#[async_trait]
impl<W: Write + Send> DataSink for JsonLinesSink<W> {
    /// Number of rows written.
    type Output = usize;

    async fn write<R: Serialize + Sync>(&self, rows: &[R]) -> Result<usize, SinkError> {
        let mut writer = self.writer.lock().map_err(|_| {
            WriteSnafu {
                message: "writer lock poisoned",
            }
            .build()
        })?;

        for (row, record) in rows.iter().enumerate() {
            serde_json::to_writer(&mut *writer, record).context(EncodeSnafu { row })?;
            writer.write_all(b"\n").context(IoSnafu)?;
        }
        writer.flush().context(IoSnafu)?;

        Ok(rows.len())
    }
}
