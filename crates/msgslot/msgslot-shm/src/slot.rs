//! A slot backed by a memory-mapped file, shared between processes.
//!
//! Every process that opens the same path sees the same channels. Handles
//! follow the same protocol and report the same errors as the in-process
//! [`msgslot_core::Handle`].

use crate::cell::ChannelCell;
use crate::error::{ShmError, ShmResult};
use crate::shm_layout::{SlotHeader, bytes_for_slot};
use crate::table::TableConfig;
use msgslot_core::{Binding, ChannelId, SlotError, SlotResult};
use msgslot_mmap::MmapFileMut;
use std::mem::size_of;
use std::path::{Path, PathBuf};

pub struct SharedSlot {
    /// Owns the mapping; `base` points into it.
    _mm: MmapFileMut,
    base: *mut u8,
    table: TableConfig,
    path: PathBuf,
}

// SAFETY: after `open` the mapping is only accessed through atomics in
// `SlotHeader` and `ChannelCell`, and `base` stays valid as long as `_mm`.
unsafe impl Send for SharedSlot {}
unsafe impl Sync for SharedSlot {}

impl SharedSlot {
    /// Opens the slot file at `path`, creating it with room for
    /// `channel_capacity` channels if it does not exist yet.
    ///
    /// An existing file keeps the capacity it was created with.
    ///
    /// # Errors
    /// - `channel_capacity` is not a power of 2
    /// - the file cannot be created, sized or mapped
    /// - the file is not a slot file, or was written by an incompatible build
    pub fn open<P: AsRef<Path>>(path: P, channel_capacity: usize) -> ShmResult<Self> {
        let cfg = TableConfig::new(channel_capacity)?;
        let path = path.as_ref();
        let size = bytes_for_slot(cfg.capacity)
            .ok_or(ShmError::Layout("channel capacity too large"))?;
        let mut mm = MmapFileMut::open_or_create_rw(path, size as u64)?;
        if mm.len() < size_of::<SlotHeader>() {
            return Err(ShmError::Layout("slot file shorter than its header"));
        }
        let base = mm.as_mut_ptr();

        // SAFETY: the mapping is at least one header long and page aligned.
        let header = unsafe { &*(base as *const SlotHeader) };
        if header.initialize_or_wait(cfg.capacity)? {
            tracing::debug!(path = %path.display(), capacity = cfg.capacity, "slot file initialized");
        }
        let table = TableConfig::new(header.validate(mm.len())?)?;
        tracing::debug!(
            path = %path.display(),
            capacity = table.capacity,
            created = mm.created(),
            "slot file attached"
        );

        Ok(Self {
            _mm: mm,
            base,
            table,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of channel cells in this slot file.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity
    }

    /// Returns a new unbound handle.
    pub fn handle(&self) -> SharedHandle<'_> {
        SharedHandle {
            slot: self,
            binding: Binding::Unbound,
            cell: None,
        }
    }

    /// Returns the cell for `id`, claiming one if the channel is new.
    ///
    /// Fails with `ResourceExhausted` once every cell is taken.
    pub fn ensure_channel(&self, id: ChannelId) -> SlotResult<&ChannelCell> {
        self.table.claim(self.cells(), id)
    }

    pub fn lookup_channel(&self, id: ChannelId) -> Option<&ChannelCell> {
        self.table.find(self.cells(), id)
    }

    /// Ids of every channel created in this slot, ascending.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self.cells().iter().filter_map(ChannelCell::id).collect();
        ids.sort_unstable();
        ids
    }

    #[inline(always)]
    fn cells(&self) -> &[ChannelCell] {
        // SAFETY: `validate` checked the mapping holds `capacity` cells after
        // the 64-byte header, so the cast stays in bounds and aligned.
        unsafe {
            std::slice::from_raw_parts(
                self.base.add(size_of::<SlotHeader>()) as *const ChannelCell,
                self.table.capacity,
            )
        }
    }
}

impl std::fmt::Debug for SharedSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSlot")
            .field("path", &self.path)
            .field("capacity", &self.table.capacity)
            .finish()
    }
}

/// One open connection to a [`SharedSlot`].
pub struct SharedHandle<'s> {
    slot: &'s SharedSlot,
    binding: Binding,
    /// Cell of the bound channel; `Some` exactly when `binding` is bound.
    cell: Option<&'s ChannelCell>,
}

impl<'s> SharedHandle<'s> {
    #[inline]
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Selects the channel for subsequent reads and writes, creating it if new.
    pub fn bind(&mut self, channel: u32) -> SlotResult<()> {
        let id = ChannelId::try_from(channel)?;
        let cell = self.slot.ensure_channel(id)?;
        self.binding.bind(id);
        self.cell = Some(cell);
        Ok(())
    }

    /// Replaces the bound channel's message with `data`; returns `data.len()`.
    pub fn write(&self, data: &[u8]) -> SlotResult<usize> {
        self.bound_cell()?.write(data)
    }

    /// Returns the bound channel's whole message if it fits in `capacity`.
    pub fn read(&self, capacity: usize) -> SlotResult<Vec<u8>> {
        self.bound_cell()?.read(capacity)
    }

    /// Copies the bound channel's whole message into `buf`; returns its length.
    pub fn read_into(&self, buf: &mut [u8]) -> SlotResult<usize> {
        self.bound_cell()?.read_into(buf)
    }

    /// Ends the connection. The channel keeps its message.
    pub fn close(self) {
        tracing::trace!(path = %self.slot.path.display(), binding = ?self.binding, "handle closed");
    }

    fn bound_cell(&self) -> SlotResult<&'s ChannelCell> {
        self.cell.ok_or(SlotError::InvalidOperation)
    }
}

impl std::fmt::Debug for SharedHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHandle")
            .field("path", &self.slot.path)
            .field("binding", &self.binding)
            .finish()
    }
}
