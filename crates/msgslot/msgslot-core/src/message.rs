//! Owned, length-tagged message payloads.
//!
//! A [`Message`] only exists once something was written, so a channel with no
//! message holds `None` rather than an empty buffer. The length bound is a fixed
//! system constant and is checked before any allocation happens.

use crate::error::{SlotError, SlotResult};

/// Largest payload a channel accepts, in bytes.
pub const MAX_MESSAGE_LEN: usize = 127;

/// Checks `1 <= len <= MAX_MESSAGE_LEN`.
#[inline]
pub fn check_len(len: usize) -> SlotResult<()> {
    if len == 0 || len > MAX_MESSAGE_LEN {
        return Err(SlotError::MessageSizeInvalid { len });
    }
    Ok(())
}

/// Copies `src` into the front of `dst` only if all of it fits.
///
/// On failure `dst` is left untouched.
#[inline]
pub fn copy_whole(src: &[u8], dst: &mut [u8]) -> SlotResult<usize> {
    if src.len() > dst.len() {
        return Err(SlotError::InsufficientSpace {
            needed: src.len(),
            capacity: dst.len(),
        });
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

/// A single immutable payload of `1..=MAX_MESSAGE_LEN` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Box<[u8]>,
}

impl Message {
    /// Copies `data` into a new message after validating its length.
    pub fn new(data: &[u8]) -> SlotResult<Self> {
        check_len(data.len())?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(data.len())
            .map_err(|_| SlotError::ResourceExhausted("message allocation failed"))?;
        bytes.extend_from_slice(data);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes; never zero.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`: an empty payload is rejected by [`Message::new`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies the whole message into `dst`, or nothing if it does not fit.
    #[inline]
    pub fn copy_into(&self, dst: &mut [u8]) -> SlotResult<usize> {
        copy_whole(&self.bytes, dst)
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("len", &self.len())
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_payloads() {
        assert_eq!(
            Message::new(b"").unwrap_err(),
            SlotError::MessageSizeInvalid { len: 0 }
        );
        let big = [b'x'; MAX_MESSAGE_LEN + 1];
        assert_eq!(
            Message::new(&big).unwrap_err(),
            SlotError::MessageSizeInvalid { len: 128 }
        );
    }

    #[test]
    fn accepts_the_full_bound() {
        let max = [7u8; MAX_MESSAGE_LEN];
        let msg = Message::new(&max).unwrap();
        assert_eq!(msg.len(), MAX_MESSAGE_LEN);
        assert!(!msg.is_empty());
        assert_eq!(msg.as_bytes(), &max[..]);
    }

    #[test]
    fn copy_into_is_all_or_nothing() {
        let msg = Message::new(b"hello").unwrap();

        let mut small = [0u8; 4];
        assert_eq!(
            msg.copy_into(&mut small).unwrap_err(),
            SlotError::InsufficientSpace {
                needed: 5,
                capacity: 4
            }
        );
        assert_eq!(small, [0u8; 4]);

        let mut exact = [0u8; 5];
        assert_eq!(msg.copy_into(&mut exact).unwrap(), 5);
        assert_eq!(&exact, b"hello");
    }
}
