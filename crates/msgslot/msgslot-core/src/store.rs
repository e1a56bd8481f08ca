//! Per-slot channel table.
//!
//! Channels are inserted on first bind and never removed while the store
//! lives. Each channel is reference counted so that inserting a new id never
//! moves or invalidates a channel another handle is already using.

use crate::channel::{Channel, ChannelId};
use crate::registry::SlotId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ChannelStore {
    slot: SlotId,
    channels: RwLock<BTreeMap<ChannelId, Arc<Channel>>>,
}

impl ChannelStore {
    pub(crate) fn new(slot: SlotId) -> Self {
        tracing::debug!(%slot, "channel store created");
        Self {
            slot,
            channels: RwLock::new(BTreeMap::new()),
        }
    }

    #[inline]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Returns the channel for `id`, inserting an empty one if it is new.
    ///
    /// Concurrent callers racing on the same new id all get the same channel.
    pub fn ensure_channel(&self, id: ChannelId) -> Arc<Channel> {
        if let Some(channel) = self.lookup_channel(id) {
            return channel;
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            tracing::debug!(slot = %self.slot, channel = %id, "channel created");
            Arc::new(Channel::new(id))
        });
        Arc::clone(channel)
    }

    pub fn lookup_channel(&self, id: ChannelId) -> Option<Arc<Channel>> {
        self.channels.read().get(&id).cloned()
    }

    /// Ids of every channel created in this slot, ascending.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.read().keys().copied().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Number of channels currently holding a message.
    pub fn message_count(&self) -> usize {
        self.channels
            .read()
            .values()
            .filter(|channel| channel.has_message())
            .count()
    }
}

impl std::fmt::Debug for ChannelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStore")
            .field("slot", &self.slot)
            .field("channels", &self.channel_ids())
            .finish()
    }
}
