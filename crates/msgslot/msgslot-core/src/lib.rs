//! In-process message slots.
//!
//! A [`SlotRegistry`] holds up to [`MAX_SLOTS`] slots. Each slot owns a
//! [`ChannelStore`] of single-message channels. Callers [`open`] a slot to get a
//! [`Handle`], [`bind`] it to a channel id, then [`write`] and [`read`] whole
//! messages of at most [`MAX_MESSAGE_LEN`] bytes.
//!
//! ```
//! use msgslot_core::{SlotId, SlotRegistry};
//!
//! let registry = SlotRegistry::new();
//! let mut tx = registry.open(SlotId::new(0).unwrap());
//! tx.bind(7).unwrap();
//! tx.write(b"hello").unwrap();
//! tx.close();
//!
//! let mut rx = registry.open(SlotId::new(0).unwrap());
//! rx.bind(7).unwrap();
//! assert_eq!(rx.read(128).unwrap(), b"hello");
//! ```
//!
//! [`open`]: SlotRegistry::open
//! [`bind`]: Handle::bind
//! [`write`]: Handle::write
//! [`read`]: Handle::read

mod channel;
mod error;
mod handle;
mod message;
mod registry;
mod store;

pub use channel::{Channel, ChannelId};
pub use error::{SlotError, SlotResult};
pub use handle::{Binding, Handle};
pub use message::{MAX_MESSAGE_LEN, Message, check_len, copy_whole};
pub use registry::{MAX_SLOTS, SlotId, SlotRegistry, TeardownReport};
pub use store::ChannelStore;
