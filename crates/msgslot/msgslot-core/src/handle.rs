//! Per-connection protocol: bind a channel, then read or write it.
//!
//! [`Binding`] is the two-state machine on its own (`Unbound` until the first
//! bind, then `Bound(id)`), with no store attached. [`Handle`] pairs a binding
//! with the slot's store and performs the actual reads and writes.

use crate::channel::{Channel, ChannelId};
use crate::error::{SlotError, SlotResult};
use crate::registry::SlotId;
use crate::store::ChannelStore;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Binding {
    #[default]
    Unbound,
    Bound(ChannelId),
}

impl Binding {
    /// Moves to `Bound(id)` from either state, returning the previous channel.
    #[inline]
    pub fn bind(&mut self, id: ChannelId) -> Option<ChannelId> {
        match std::mem::replace(self, Binding::Bound(id)) {
            Binding::Unbound => None,
            Binding::Bound(prev) => Some(prev),
        }
    }

    /// Bound channel, or `InvalidOperation` when nothing was bound yet.
    #[inline]
    pub fn channel(&self) -> SlotResult<ChannelId> {
        match *self {
            Binding::Bound(id) => Ok(id),
            Binding::Unbound => Err(SlotError::InvalidOperation),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound(_))
    }
}

/// One open connection to a slot.
///
/// Holds no ownership over the store; it borrows it from the registry, so the
/// registry cannot be torn down while a handle is alive. The bound channel is
/// kept alongside the binding, so reads and writes never touch the store map.
#[derive(Debug)]
pub struct Handle<'r> {
    store: &'r ChannelStore,
    binding: Binding,
    /// `Some` exactly when `binding` is bound.
    channel: Option<Arc<Channel>>,
}

impl<'r> Handle<'r> {
    pub(crate) fn new(store: &'r ChannelStore) -> Self {
        Self {
            store,
            binding: Binding::Unbound,
            channel: None,
        }
    }

    #[inline]
    pub fn slot(&self) -> SlotId {
        self.store.slot()
    }

    #[inline]
    pub fn store(&self) -> &'r ChannelStore {
        self.store
    }

    #[inline]
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Selects the channel for subsequent reads and writes, creating it if new.
    ///
    /// Fails with `InvalidArgument` for channel `0`, leaving the binding as it was.
    pub fn bind(&mut self, channel: u32) -> SlotResult<()> {
        let id = ChannelId::try_from(channel)?;
        let channel = self.store.ensure_channel(id);
        self.binding.bind(id);
        self.channel = Some(channel);
        Ok(())
    }

    /// Replaces the bound channel's message with `data`; returns `data.len()`.
    pub fn write(&self, data: &[u8]) -> SlotResult<usize> {
        self.bound_channel()?.write(data)
    }

    /// Returns the bound channel's whole message if it fits in `capacity`.
    pub fn read(&self, capacity: usize) -> SlotResult<Vec<u8>> {
        self.bound_channel()?.read(capacity)
    }

    /// Copies the bound channel's whole message into `buf`; returns its length.
    pub fn read_into(&self, buf: &mut [u8]) -> SlotResult<usize> {
        self.bound_channel()?.read_into(buf)
    }

    /// Ends the connection. The bound channel keeps its message.
    pub fn close(self) {
        tracing::trace!(slot = %self.slot(), binding = ?self.binding, "handle closed");
    }

    fn bound_channel(&self) -> SlotResult<&Channel> {
        self.channel.as_deref().ok_or(SlotError::InvalidOperation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ChannelId {
        ChannelId::new(raw).unwrap()
    }

    #[test]
    fn binding_starts_unbound() {
        let binding = Binding::default();
        assert!(!binding.is_bound());
        assert_eq!(binding.channel(), Err(SlotError::InvalidOperation));
    }

    #[test]
    fn rebinding_replaces_previous_channel() {
        let mut binding = Binding::Unbound;
        assert_eq!(binding.bind(id(1)), None);
        assert_eq!(binding.channel(), Ok(id(1)));
        assert_eq!(binding.bind(id(2)), Some(id(1)));
        assert_eq!(binding, Binding::Bound(id(2)));
    }

    #[test]
    fn handle_rejects_zero_channel_and_keeps_binding() {
        let store = ChannelStore::new(SlotId::default());
        let mut handle = Handle::new(&store);
        handle.bind(5).unwrap();

        assert!(matches!(
            handle.bind(0),
            Err(SlotError::InvalidArgument(_))
        ));
        assert_eq!(handle.binding(), Binding::Bound(id(5)));
        assert_eq!(store.channel_ids(), vec![id(5)]);
    }

    #[test]
    fn unbound_handle_rejects_io() {
        let store = ChannelStore::new(SlotId::default());
        let handle = Handle::new(&store);
        assert_eq!(handle.write(b"x"), Err(SlotError::InvalidOperation));
        assert_eq!(handle.read(128), Err(SlotError::InvalidOperation));
        let mut buf = [0u8; 8];
        assert_eq!(handle.read_into(&mut buf), Err(SlotError::InvalidOperation));
    }

    #[test]
    fn bound_channel_is_held_by_the_handle() {
        let store = ChannelStore::new(SlotId::default());
        let mut handle = Handle::new(&store);
        handle.bind(3).unwrap();
        let held = handle.bound_channel().unwrap() as *const Channel;
        assert!(std::ptr::eq(held, &*store.lookup_channel(id(3)).unwrap()));

        // Later insertions by other handles leave the held channel in place.
        let mut other = Handle::new(&store);
        for raw in 10..100 {
            other.bind(raw).unwrap();
        }
        handle.write(b"kept").unwrap();
        assert!(std::ptr::eq(handle.bound_channel().unwrap(), held));
        assert_eq!(store.lookup_channel(id(3)).unwrap().read(128).unwrap(), b"kept");
    }

    #[test]
    fn rebind_leaves_old_message() {
        let store = ChannelStore::new(SlotId::default());
        let mut handle = Handle::new(&store);
        handle.bind(1).unwrap();
        handle.write(b"first").unwrap();
        handle.bind(2).unwrap();
        assert!(matches!(handle.read(128), Err(SlotError::NotReady { .. })));
        handle.bind(1).unwrap();
        assert_eq!(handle.read(128).unwrap(), b"first");
    }
}
