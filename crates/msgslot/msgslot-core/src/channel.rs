//! A single-message mailbox inside a slot.

use crate::error::{SlotError, SlotResult};
use crate::message::Message;
use parking_lot::RwLock;
use std::fmt;
use std::num::NonZeroU32;

/// Identifier of a channel within one slot. Zero is reserved for "unbound".
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(NonZeroU32);

impl ChannelId {
    /// Returns `None` for the reserved id `0`.
    #[inline]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = SlotError;

    fn try_from(raw: u32) -> SlotResult<Self> {
        Self::new(raw).ok_or(SlotError::InvalidArgument("channel id 0 is reserved"))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One channel and its current message.
///
/// The message sits behind a per-channel lock so unrelated channels never
/// contend. The lock is only held to swap in a finished message or to copy
/// one out; allocation and length checks happen before it is taken.
pub struct Channel {
    id: ChannelId,
    current: RwLock<Option<Message>>,
}

impl Channel {
    pub(crate) fn new(id: ChannelId) -> Self {
        Self {
            id,
            current: RwLock::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn has_message(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replaces the current message with a copy of `data`.
    ///
    /// A rejected payload leaves the previous message in place.
    pub fn write(&self, data: &[u8]) -> SlotResult<usize> {
        let next = Message::new(data)?;
        let len = next.len();
        let previous = self.current.write().replace(next);
        // Dropped outside the lock.
        drop(previous);
        tracing::trace!(channel = %self.id, len, "message replaced");
        Ok(len)
    }

    /// Copies the whole current message into `dst`.
    pub fn read_into(&self, dst: &mut [u8]) -> SlotResult<usize> {
        let guard = self.current.read();
        match guard.as_ref() {
            Some(message) => message.copy_into(dst),
            None => Err(SlotError::NotReady { channel: self.id }),
        }
    }

    /// Returns the current message if it fits in `capacity` bytes.
    pub fn read(&self, capacity: usize) -> SlotResult<Vec<u8>> {
        let guard = self.current.read();
        let message = guard
            .as_ref()
            .ok_or(SlotError::NotReady { channel: self.id })?;
        if message.len() > capacity {
            return Err(SlotError::InsufficientSpace {
                needed: message.len(),
                capacity,
            });
        }
        Ok(message.as_bytes().to_vec())
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("current", &*self.current.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(raw: u32) -> Channel {
        Channel::new(ChannelId::new(raw).unwrap())
    }

    #[test]
    fn zero_id_is_reserved() {
        assert!(ChannelId::new(0).is_none());
        assert_eq!(
            ChannelId::try_from(0).unwrap_err(),
            SlotError::InvalidArgument("channel id 0 is reserved")
        );
        assert_eq!(ChannelId::try_from(u32::MAX).unwrap().get(), u32::MAX);
    }

    #[test]
    fn empty_channel_is_not_ready() {
        let ch = channel(1);
        assert!(!ch.has_message());
        let mut buf = [0u8; 16];
        assert!(matches!(
            ch.read_into(&mut buf),
            Err(SlotError::NotReady { .. })
        ));
    }

    #[test]
    fn failed_write_keeps_previous_message() {
        let ch = channel(2);
        ch.write(b"kept").unwrap();
        assert!(ch.write(&[]).is_err());
        assert!(ch.write(&[1u8; 200]).is_err());
        assert_eq!(ch.read(128).unwrap(), b"kept");
    }

    #[test]
    fn read_does_not_consume() {
        let ch = channel(3);
        ch.write(b"again").unwrap();
        assert_eq!(ch.read(5).unwrap(), b"again");
        assert_eq!(ch.read(5).unwrap(), b"again");
    }
}
