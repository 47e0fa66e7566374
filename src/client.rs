// SPDX-License-Identifier: Apache-2.0 OR MIT
// Client identifiers (which sink a record is routed to)

use serde::{Deserialize, Serialize};

/// Raw client id carried by every [`LogItem`](crate::LogItem).
///
/// Kept as a plain integer so that a corrupted or foreign id can reach the
/// dispatcher and be rejected there instead of being unrepresentable.
pub type ClientId = u8;

/// Lowest valid client id (inclusive)
pub const MIN_CLIENT: ClientId = 0;

/// Upper bound of valid client ids (exclusive)
pub const MAX_CLIENT: ClientId = 2;

/// Known log clients - each one owns one slot in the sink table
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Client {
    /// Plain text log lines
    Txt = 0,
    /// Message sequence chart trace records
    Msc = 1,
}

impl Client {
    /// Every client, in id order
    pub const ALL: [Client; MAX_CLIENT as usize] = [Client::Txt, Client::Msc];

    /// Get client id as u8
    #[inline]
    pub const fn id(self) -> ClientId {
        self as ClientId
    }

    /// Slot index in the sink table
    #[inline]
    pub const fn index(self) -> usize {
        (self as ClientId - MIN_CLIENT) as usize
    }

    /// Get client name as static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Client::Txt => "txt",
            Client::Msc => "msc",
        }
    }

    /// Create from raw id (returns None if out of range)
    pub const fn from_id(id: ClientId) -> Option<Self> {
        match id {
            0 => Some(Client::Txt),
            1 => Some(Client::Msc),
            _ => None,
        }
    }

    /// Check that `id` lies in `[MIN_CLIENT, MAX_CLIENT)`
    #[inline]
    pub const fn is_valid_id(id: ClientId) -> bool {
        id >= MIN_CLIENT && id < MAX_CLIENT
    }
}

impl std::fmt::Display for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
