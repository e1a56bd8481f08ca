//! Binary layout of a slot file.
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    SlotHeader (64B)                          │
//! │  magic │ version │ channel_capacity │ max_message_len │ pad   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ChannelCell[0]   id │ len │ seq │ words[16]                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ChannelCell[1]                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │                          ...                                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ChannelCell[channel_capacity - 1]                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A freshly sized file is all zeroes. Zeroed cells are already valid empty
//! cells, so only the header needs initializing, and that happens exactly
//! once: the first opener moves `magic` from `0` to [`SLOT_INITIALIZING`],
//! fills in the other fields, then publishes [`SLOT_MAGIC`].

use crate::cell::ChannelCell;
use crate::error::{ShmError, ShmResult};
use msgslot_core::MAX_MESSAGE_LEN;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// ASCII "MSGSLOT1".
pub const SLOT_MAGIC: u64 = 0x4D53_4753_4C4F_5431;

/// Placeholder magic while the winning opener fills in the header.
pub const SLOT_INITIALIZING: u64 = 0x4D53_4753_494E_4954;

/// Bump on any incompatible layout change.
pub const SLOT_VERSION: u64 = 1;

/// How long an opener waits for another process to finish initializing.
const INIT_WAIT: Duration = Duration::from_secs(1);

#[repr(C, align(64))]
pub struct SlotHeader {
    pub magic: AtomicU64,
    pub version: AtomicU64,
    pub channel_capacity: AtomicU64,
    pub max_message_len: AtomicU64,
}

impl SlotHeader {
    /// Initializes a zeroed header, or waits for a racing opener to do so.
    ///
    /// Returns `true` if this call performed the initialization.
    pub fn initialize_or_wait(&self, channel_capacity: usize) -> ShmResult<bool> {
        match self.magic.compare_exchange(
            0,
            SLOT_INITIALIZING,
            Ordering::Acquire,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.version.store(SLOT_VERSION, Ordering::Relaxed);
                self.channel_capacity
                    .store(channel_capacity as u64, Ordering::Relaxed);
                self.max_message_len
                    .store(MAX_MESSAGE_LEN as u64, Ordering::Relaxed);
                self.magic.store(SLOT_MAGIC, Ordering::Release);
                Ok(true)
            }
            Err(SLOT_INITIALIZING) => {
                let deadline = Instant::now() + INIT_WAIT;
                while self.magic.load(Ordering::Acquire) == SLOT_INITIALIZING {
                    if Instant::now() >= deadline {
                        return Err(ShmError::Layout("slot file initialization never completed"));
                    }
                    std::hint::spin_loop();
                }
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }

    /// Checks an initialized header against this build and the mapped size.
    pub fn validate(&self, mapped_len: usize) -> ShmResult<usize> {
        if self.magic.load(Ordering::Acquire) != SLOT_MAGIC {
            return Err(ShmError::Layout("bad magic"));
        }
        if self.version.load(Ordering::Relaxed) != SLOT_VERSION {
            return Err(ShmError::Layout("wrong version"));
        }
        if self.max_message_len.load(Ordering::Relaxed) != MAX_MESSAGE_LEN as u64 {
            return Err(ShmError::Layout("max message length mismatch"));
        }
        let capacity = usize::try_from(self.channel_capacity.load(Ordering::Relaxed))
            .map_err(|_| ShmError::Layout("channel capacity overflows usize"))?;
        if !capacity.is_power_of_two() {
            return Err(ShmError::Layout("channel capacity must be power of two"));
        }
        // The cell slice built from `capacity` must stay inside the mapping.
        let max_cells = mapped_len.saturating_sub(size_of::<SlotHeader>()) / size_of::<ChannelCell>();
        if capacity > max_cells {
            return Err(ShmError::Layout("slot file shorter than its channel table"));
        }
        Ok(capacity)
    }
}

/// Total bytes for a slot file holding `channel_capacity` cells, or `None`
/// if that does not fit in `usize`.
pub fn bytes_for_slot(channel_capacity: usize) -> Option<usize> {
    channel_capacity
        .checked_mul(size_of::<ChannelCell>())?
        .checked_add(size_of::<SlotHeader>())
}
