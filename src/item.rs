// SPDX-License-Identifier: Apache-2.0 OR MIT
// Recyclable log record buffer

use crate::client::{Client, ClientId};

/// Initial buffer capacity of a freshly allocated item
pub const LOG_MESSAGE_MIN_ALLOC_SIZE: usize = 256;

/// One log record on its way from a producer to a sink.
///
/// Items are handed out by the [`ItemPool`](crate::ItemPool) and travel back
/// to it after dispatch, so the text buffer keeps its allocation between
/// records. Producers fill it through [`push_str`](Self::push_str) or
/// [`std::fmt::Write`].
#[derive(Debug)]
pub struct LogItem {
    client_id: ClientId,
    buf: String,
}

impl LogItem {
    pub(crate) fn with_capacity(client_id: ClientId, capacity: usize) -> Self {
        Self {
            client_id,
            buf: String::with_capacity(capacity),
        }
    }

    /// Raw destination id
    #[inline]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Destination client, if the id is a known one
    pub fn client(&self) -> Option<Client> {
        Client::from_id(self.client_id)
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Append text to the record
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Prepare a pooled item for a new producer
    #[inline]
    pub(crate) fn reset(&mut self, client_id: ClientId) {
        self.client_id = client_id;
        self.buf.clear();
    }

    /// Empty the buffer before it goes back to the pool.
    ///
    /// Buffers that grew beyond `max_retained` are shrunk to `min_alloc` so a
    /// single huge record does not pin memory in the free list.
    pub(crate) fn truncate_for_reuse(&mut self, min_alloc: usize, max_retained: usize) {
        self.buf.clear();
        if self.buf.capacity() > max_retained {
            self.buf.shrink_to(min_alloc);
        }
    }
}

impl std::fmt::Write for LogItem {
    #[inline]
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}
