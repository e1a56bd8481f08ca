mod config;

pub use config::{ConfigError, MsgslotConfig};
