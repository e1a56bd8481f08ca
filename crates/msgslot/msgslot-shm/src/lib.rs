//! Message slots shared between processes through memory-mapped slot files.
//!
//! A slot file plays the role of a device node: any process that opens the
//! same path gets the same channel table. The protocol (bind, write, read,
//! close) and its errors are those of `msgslot-core`.

mod cell;
mod error;
mod shm_layout;
mod slot;
mod table;

pub use cell::{ChannelCell, WRITER_WAIT};
pub use error::{ShmError, ShmResult};
pub use shm_layout::bytes_for_slot;
pub use slot::{SharedHandle, SharedSlot};
