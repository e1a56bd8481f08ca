//! Slot registry: one lazily created [`ChannelStore`] per slot id.
//!
//! Slot ids are small and dense (`0..MAX_SLOTS`), so the registry is a flat
//! array indexed directly by id. Each entry is a `OnceLock`, which gives the
//! "first opener creates the store, everyone else observes it" rule without a
//! registry-wide lock.

use crate::error::{SlotError, SlotResult};
use crate::handle::Handle;
use crate::store::ChannelStore;
use std::fmt;
use std::sync::OnceLock;

/// Number of distinct slot ids.
pub const MAX_SLOTS: usize = 256;

/// Identifier of a slot, `0..MAX_SLOTS`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SlotId(u8);

impl SlotId {
    /// Returns `None` when `raw` is outside `0..MAX_SLOTS`.
    #[inline]
    pub fn new(raw: u32) -> Option<Self> {
        u8::try_from(raw).ok().map(Self)
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u32> for SlotId {
    type Error = SlotError;

    fn try_from(raw: u32) -> SlotResult<Self> {
        Self::new(raw).ok_or(SlotError::ResourceExhausted("slot id outside 0..256"))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What [`SlotRegistry::teardown`] released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub stores: usize,
    pub channels: usize,
    pub messages: usize,
}

pub struct SlotRegistry {
    stores: [OnceLock<ChannelStore>; MAX_SLOTS],
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            stores: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Opens `slot`, creating its store on first use, and returns an unbound handle.
    pub fn open(&self, slot: SlotId) -> Handle<'_> {
        let store = self.stores[slot.index()].get_or_init(|| ChannelStore::new(slot));
        Handle::new(store)
    }

    /// [`open`](Self::open) for a raw slot number.
    pub fn open_raw(&self, slot: u32) -> SlotResult<Handle<'_>> {
        Ok(self.open(SlotId::try_from(slot)?))
    }

    /// Releases `handle`. Channels and messages stay in the store.
    pub fn close(&self, handle: Handle<'_>) {
        handle.close();
    }

    /// Store for `slot`, if the slot was ever opened.
    pub fn store(&self, slot: SlotId) -> Option<&ChannelStore> {
        self.stores[slot.index()].get()
    }

    /// Slots that currently have a store, ascending.
    pub fn open_slots(&self) -> Vec<SlotId> {
        self.stores
            .iter()
            .enumerate()
            .filter(|(_, store)| store.get().is_some())
            .filter_map(|(i, _)| SlotId::new(i as u32))
            .collect()
    }

    /// Frees every store, channel and message.
    ///
    /// Takes `&mut self`, so it cannot run while any [`Handle`] borrowed from
    /// this registry is still alive.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for cell in self.stores.iter_mut() {
            if let Some(store) = cell.take() {
                report.stores += 1;
                report.channels += store.channel_count();
                report.messages += store.message_count();
            }
        }
        tracing::info!(
            stores = report.stores,
            channels = report.channels,
            messages = report.messages,
            "slot registry torn down"
        );
        report
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("open_slots", &self.open_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(raw: u32) -> SlotId {
        SlotId::new(raw).unwrap()
    }

    #[test]
    fn slot_ids_are_bounded() {
        assert_eq!(SlotId::new(255).map(SlotId::get), Some(255));
        assert!(SlotId::new(256).is_none());
        assert!(matches!(
            SlotId::try_from(1000),
            Err(SlotError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn open_raw_rejects_out_of_range() {
        let registry = SlotRegistry::new();
        assert!(matches!(
            registry.open_raw(256),
            Err(SlotError::ResourceExhausted(_))
        ));
        assert!(registry.open_slots().is_empty());
    }

    #[test]
    fn store_is_created_once() {
        let registry = SlotRegistry::new();
        assert!(registry.store(slot(3)).is_none());

        let a = registry.open(slot(3));
        let b = registry.open(slot(3));
        assert!(std::ptr::eq(a.store(), b.store()));
        assert_eq!(registry.open_slots(), vec![slot(3)]);
    }

    #[test]
    fn teardown_reports_and_clears() {
        let mut registry = SlotRegistry::new();
        {
            let mut h = registry.open(slot(0));
            h.bind(1).unwrap();
            h.write(b"a").unwrap();
            h.bind(2).unwrap();
            registry.close(h);

            let mut h = registry.open(slot(9));
            h.bind(1).unwrap();
            registry.close(h);
        }

        let report = registry.teardown();
        assert_eq!(
            report,
            TeardownReport {
                stores: 2,
                channels: 3,
                messages: 1
            }
        );
        assert!(registry.open_slots().is_empty());
        assert_eq!(registry.teardown(), TeardownReport::default());
    }
}
