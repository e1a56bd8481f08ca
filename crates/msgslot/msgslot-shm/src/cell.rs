//! Channel cell: one channel's id and message, guarded by a sequence lock.
//!
//! Several processes may write the same channel, so unlike a single-writer
//! seqlock the writer first claims the cell by moving `seq` from even to odd
//! with a compare-and-swap. Readers never take anything: they copy the
//! payload and retry if `seq` was odd or moved while they copied.
//!
//! # Sequence Number Semantics
//!
//! - **0**: never written (`NotReady`)
//! - **Odd**: write in progress
//! - **Even, non-zero**: a complete message is stored
//!
//! The payload lives in atomic words so that a reader racing a writer copies
//! stale-but-defined bytes, which the sequence check then discards.
//!
//! A writer killed between claiming and publishing leaves `seq` odd for good.
//! Waits on an odd `seq` are therefore bounded by [`WRITER_WAIT`]; past it the
//! channel reports `ResourceExhausted` instead of spinning forever.

use msgslot_core::{ChannelId, MAX_MESSAGE_LEN, SlotError, SlotResult, check_len, copy_whole};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};
use std::time::{Duration, Instant};

const WORD: usize = size_of::<u64>();
const WORDS: usize = MAX_MESSAGE_LEN.div_ceil(WORD);

/// Longest a reader or writer waits for another writer to publish.
pub const WRITER_WAIT: Duration = Duration::from_millis(500);

/// Spins between clock reads while waiting on an odd `seq`.
const SPINS_PER_CLOCK_CHECK: u32 = 1 << 10;

#[repr(C, align(64))]
pub struct ChannelCell {
    /// Channel id owning this cell; 0 while the cell is free.
    pub(crate) id: AtomicU32,
    len: AtomicU32,
    seq: AtomicU64,
    words: [AtomicU64; WORDS],
}

impl ChannelCell {
    /// Channel id stored in this cell, `None` while the cell is unclaimed.
    #[inline]
    pub fn id(&self) -> Option<ChannelId> {
        ChannelId::new(self.id.load(Ordering::Acquire))
    }

    #[inline]
    pub fn has_message(&self) -> bool {
        self.seq.load(Ordering::Acquire) != 0
    }

    /// Replaces the stored message with `data`; returns `data.len()`.
    pub fn write(&self, data: &[u8]) -> SlotResult<usize> {
        check_len(data.len())?;

        let s0 = self.lock()?;
        for (word, chunk) in self.words.iter().zip(data.chunks(WORD)) {
            let mut bytes = [0u8; WORD];
            bytes[..chunk.len()].copy_from_slice(chunk);
            word.store(u64::from_ne_bytes(bytes), Ordering::Relaxed);
        }
        self.len.store(data.len() as u32, Ordering::Relaxed);
        // Even again: publish.
        self.seq.store(s0.wrapping_add(2), Ordering::Release);
        Ok(data.len())
    }

    /// Copies the whole stored message into `dst`; returns its length.
    pub fn read_into(&self, dst: &mut [u8]) -> SlotResult<usize> {
        let mut snapshot = [0u8; WORDS * WORD];
        let len = self.snapshot(&mut snapshot)?;
        copy_whole(&snapshot[..len], dst)
    }

    /// Returns the stored message if it fits in `capacity` bytes.
    pub fn read(&self, capacity: usize) -> SlotResult<Vec<u8>> {
        let mut snapshot = [0u8; WORDS * WORD];
        let len = self.snapshot(&mut snapshot)?;
        if len > capacity {
            return Err(SlotError::InsufficientSpace {
                needed: len,
                capacity,
            });
        }
        Ok(snapshot[..len].to_vec())
    }

    /// Waits out any writer holding the cell, then moves `seq` to odd.
    /// Returns the even value it started from.
    fn lock(&self) -> SlotResult<u64> {
        loop {
            let s0 = self.settled_seq(Ordering::Relaxed)?;
            if self
                .seq
                .compare_exchange_weak(s0, s0.wrapping_add(1), Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                // Payload stores must not become visible before the odd seq.
                fence(Ordering::Release);
                return Ok(s0);
            }
        }
    }

    /// Copies a consistent message into `out`, retrying across writes.
    fn snapshot(&self, out: &mut [u8; WORDS * WORD]) -> SlotResult<usize> {
        loop {
            let s1 = self.settled_seq(Ordering::Acquire)?;
            if s1 == 0 {
                let channel = self.id().ok_or(SlotError::InvalidOperation)?;
                return Err(SlotError::NotReady { channel });
            }

            let len = self.len.load(Ordering::Relaxed) as usize;
            for (word, chunk) in self.words.iter().zip(out.chunks_mut(WORD)) {
                chunk.copy_from_slice(&word.load(Ordering::Relaxed).to_ne_bytes());
            }

            fence(Ordering::Acquire);
            let s2 = self.seq.load(Ordering::Relaxed);
            if s1 == s2 {
                return Ok(len.min(MAX_MESSAGE_LEN));
            }
            std::hint::spin_loop();
        }
    }

    /// First even `seq` observed, or `ResourceExhausted` once a writer has
    /// held the cell for longer than [`WRITER_WAIT`].
    fn settled_seq(&self, order: Ordering) -> SlotResult<u64> {
        let mut spins = 0u32;
        let mut deadline = None;
        loop {
            let seq = self.seq.load(order);
            if seq & 1 == 0 {
                return Ok(seq);
            }
            spins = spins.wrapping_add(1);
            if spins % SPINS_PER_CLOCK_CHECK == 0 {
                let now = Instant::now();
                if now >= *deadline.get_or_insert(now + WRITER_WAIT) {
                    tracing::warn!(channel = ?self.id(), seq, "channel cell stuck mid-write");
                    return Err(SlotError::ResourceExhausted("channel cell stuck mid-write"));
                }
            }
            std::hint::spin_loop();
        }
    }
}
