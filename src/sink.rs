// SPDX-License-Identifier: Apache-2.0 OR MIT
// Output sinks and the per-client sink table

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::client::{Client, ClientId, MAX_CLIENT, MIN_CLIENT};
use crate::item::LogItem;

/// Destination for dispatched records.
///
/// `write_item` borrows the item for the duration of the call only; the
/// dispatcher recycles it as soon as the call returns, so a sink must copy
/// out anything it wants to keep.
pub trait LogSink: Send {
    /// Consume one record
    fn write_item(&mut self, item: &LogItem);

    /// Flush any buffered output
    fn flush(&mut self);
}

/// Standard output sink (writes record text verbatim)
pub struct StdoutSink {
    stdout: io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn write_item(&mut self, item: &LogItem) {
        let _ = self.stdout.write_all(item.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

/// Standard error sink
pub struct StderrSink {
    stderr: io::Stderr,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StderrSink {
    fn write_item(&mut self, item: &LogItem) {
        let _ = self.stderr.write_all(item.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.stderr.flush();
    }
}

/// Buffered append-only file sink
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LogSink for FileSink {
    fn write_item(&mut self, item: &LogItem) {
        let _ = self.writer.write_all(item.as_bytes());
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

/// One sink slot per client id in `[MIN_CLIENT, MAX_CLIENT)`.
///
/// Built before init and moved into the dispatcher, which never exposes it
/// for mutation again.
pub struct SinkTable {
    slots: Vec<Option<Box<dyn LogSink>>>,
}

impl SinkTable {
    /// Table with every slot empty
    pub fn new() -> Self {
        Self {
            slots: (MIN_CLIENT..MAX_CLIENT).map(|_| None).collect(),
        }
    }

    /// Text client to stdout, MSC client to stderr
    pub fn console() -> Self {
        Self::new()
            .with_sink(Client::Txt, Box::new(StdoutSink::new()))
            .with_sink(Client::Msc, Box::new(StderrSink::new()))
    }

    /// Install (or replace) the sink for `client`
    pub fn with_sink(mut self, client: Client, sink: Box<dyn LogSink>) -> Self {
        self.slots[client.index()] = Some(sink);
        self
    }

    pub fn is_installed(&self, client: Client) -> bool {
        self.slots[client.index()].is_some()
    }

    /// Sink for a raw id; None when out of range or not installed
    pub(crate) fn get_mut(&mut self, client_id: ClientId) -> Option<&mut (dyn LogSink + 'static)> {
        if !Client::is_valid_id(client_id) {
            return None;
        }
        self.slots
            .get_mut((client_id - MIN_CLIENT) as usize)?
            .as_deref_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Flush the sinks whose `touched` flag is set
    pub(crate) fn flush_touched(&mut self, touched: &[bool]) {
        for (slot, _) in self.slots.iter_mut().zip(touched).filter(|(_, t)| **t) {
            if let Some(sink) = slot {
                sink.flush();
            }
        }
    }
}

impl Default for SinkTable {
    fn default() -> Self {
        Self::new()
    }
}
