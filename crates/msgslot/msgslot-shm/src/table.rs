//! Open-addressed channel table over a slice of [`ChannelCell`]s.
//!
//! Cells are claimed, never released, so an unclaimed cell on a probe path
//! means the id is absent. Claiming is a single compare-and-swap of the cell
//! id from `0`; of several racing claimers exactly one wins and the rest see
//! its id on their next load.

use crate::cell::ChannelCell;
use crate::error::{ShmError, ShmResult};
use msgslot_core::{ChannelId, SlotError, SlotResult};
use std::sync::atomic::Ordering;

/// Channel table sizing. The capacity must be a power of 2 so that probe
/// positions wrap with a mask instead of a modulo.
#[derive(Debug, Copy, Clone)]
pub struct TableConfig {
    pub capacity: usize,
}

impl TableConfig {
    pub fn new(capacity: usize) -> ShmResult<Self> {
        if !capacity.is_power_of_two() {
            return Err(ShmError::Layout("channel capacity must be power of two"));
        }
        Ok(Self { capacity })
    }

    #[inline(always)]
    pub fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Finds the cell holding `id`, claiming a free one if `id` is new.
    ///
    /// `cells` must hold exactly `capacity` cells.
    pub fn claim<'c>(&self, cells: &'c [ChannelCell], id: ChannelId) -> SlotResult<&'c ChannelCell> {
        debug_assert_eq!(cells.len(), self.capacity);
        let mask = self.mask();
        let home = home_index(id, mask);
        for step in 0..self.capacity {
            let index = (home + step) & mask;
            let cell = &cells[index];
            let current = cell.id.load(Ordering::Acquire);
            if current == id.get() {
                return Ok(cell);
            }
            if current != 0 {
                continue;
            }
            match cell
                .id
                .compare_exchange(0, id.get(), Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    tracing::debug!(channel = %id, cell = index, "channel cell claimed");
                    return Ok(cell);
                }
                Err(winner) if winner == id.get() => return Ok(cell),
                Err(_) => continue,
            }
        }
        Err(SlotError::ResourceExhausted("slot file channel table is full"))
    }

    /// Finds the cell holding `id` without claiming anything.
    pub fn find<'c>(&self, cells: &'c [ChannelCell], id: ChannelId) -> Option<&'c ChannelCell> {
        debug_assert_eq!(cells.len(), self.capacity);
        let mask = self.mask();
        let home = home_index(id, mask);
        for step in 0..self.capacity {
            let cell = &cells[(home + step) & mask];
            match cell.id.load(Ordering::Acquire) {
                0 => return None,
                current if current == id.get() => return Some(cell),
                _ => {}
            }
        }
        None
    }
}

/// First probe position for `id`.
///
/// Fibonacci hashing spreads consecutive ids across the table.
#[inline(always)]
pub fn home_index(id: ChannelId, mask: usize) -> usize {
    (id.get().wrapping_mul(0x9E37_79B9) as usize) & mask
}
