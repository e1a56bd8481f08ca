use msgslot_core::{SlotId, SlotResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MsgslotConfig {
    /// Directory holding numbered slot files.
    #[serde(default = "defaults::slot_dir")]
    pub slot_dir: PathBuf,
    /// File name prefix of numbered slot files, followed by the slot id.
    #[serde(default = "defaults::slot_prefix")]
    pub slot_prefix: String,
    /// Channel cells in a newly created slot file. Power of 2.
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    use std::path::PathBuf;

    pub fn slot_dir() -> PathBuf {
        PathBuf::from("/tmp")
    }

    pub fn slot_prefix() -> String {
        "msgslot".into()
    }

    pub fn channel_capacity() -> usize {
        1 << 10 // 1024
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for MsgslotConfig {
    fn default() -> Self {
        Self {
            slot_dir: defaults::slot_dir(),
            slot_prefix: defaults::slot_prefix(),
            channel_capacity: defaults::channel_capacity(),
            log_level: defaults::log_level(),
        }
    }
}

impl MsgslotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: MsgslotConfig = toml::from_str(&toml_to_str)?;
        Ok(config)
    }

    /// Path of the numbered slot file `slot`, e.g. `/tmp/msgslot3`.
    ///
    /// Fails with `ResourceExhausted` for ids outside `0..MAX_SLOTS`.
    pub fn slot_path(&self, slot: u32) -> SlotResult<PathBuf> {
        let slot = SlotId::try_from(slot)?;
        Ok(self.slot_dir.join(format!("{}{}", self.slot_prefix, slot)))
    }

    /// Resolves a command-line slot argument.
    ///
    /// A bare number names a numbered slot file under `slot_dir`; anything
    /// else (including `./3`) is taken as a path.
    pub fn resolve_slot(&self, target: &str) -> SlotResult<PathBuf> {
        match target.parse::<u32>() {
            Ok(slot) => self.slot_path(slot),
            Err(_) => Ok(PathBuf::from(target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgslot_core::SlotError;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config: MsgslotConfig = toml::from_str("").unwrap();
        assert_eq!(config, MsgslotConfig::default());
        assert_eq!(config.channel_capacity, 1024);
    }

    #[test]
    fn load_overrides_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "slot_dir = \"/run/slots\"\nchannel_capacity = 64\nlog_level = \"debug\""
        )
        .unwrap();

        let config = MsgslotConfig::load(file.path()).unwrap();
        assert_eq!(config.slot_dir, PathBuf::from("/run/slots"));
        assert_eq!(config.slot_prefix, "msgslot");
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn load_reports_missing_file_and_bad_toml() {
        assert!(matches!(
            MsgslotConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Read { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "channel_capacity = \"lots\"").unwrap();
        assert!(matches!(
            MsgslotConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn slot_path_is_bounded() {
        let config = MsgslotConfig::default();
        assert_eq!(config.slot_path(3).unwrap(), PathBuf::from("/tmp/msgslot3"));
        assert!(matches!(
            config.slot_path(256),
            Err(SlotError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn resolve_slot_accepts_numbers_and_paths() {
        let config = MsgslotConfig {
            slot_dir: PathBuf::from("/dev"),
            slot_prefix: "message_slot".into(),
            ..MsgslotConfig::default()
        };
        assert_eq!(
            config.resolve_slot("0").unwrap(),
            PathBuf::from("/dev/message_slot0")
        );
        assert_eq!(config.resolve_slot("./0").unwrap(), PathBuf::from("./0"));
        assert_eq!(
            config.resolve_slot("/tmp/custom").unwrap(),
            PathBuf::from("/tmp/custom")
        );
        assert!(config.resolve_slot("999").is_err());
    }
}
