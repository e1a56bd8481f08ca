use crate::channel::ChannelId;
use crate::message::MAX_MESSAGE_LEN;

pub type SlotResult<T> = Result<T, SlotError>;

/// Failures surfaced by the slot protocol.
///
/// Every variant is returned synchronously to the caller of the failing
/// operation; none of them leaves partially applied state behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid operation: handle is not bound to a channel")]
    InvalidOperation,

    #[error("message size {len} is invalid (must be 1..={max})", max = MAX_MESSAGE_LEN)]
    MessageSizeInvalid { len: usize },

    #[error("channel {channel} has no message yet")]
    NotReady { channel: ChannelId },

    #[error("buffer of {capacity} bytes cannot hold the {needed}-byte message")]
    InsufficientSpace { needed: usize, capacity: usize },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

impl SlotError {
    /// POSIX error code matching the character-device convention for this kind.
    pub fn errno(&self) -> i32 {
        match self {
            SlotError::InvalidArgument(_) | SlotError::InvalidOperation => libc::EINVAL,
            SlotError::MessageSizeInvalid { .. } => libc::EMSGSIZE,
            SlotError::NotReady { .. } => libc::EWOULDBLOCK,
            SlotError::InsufficientSpace { .. } => libc::ENOSPC,
            SlotError::ResourceExhausted(_) => libc::ENOMEM,
        }
    }
}
