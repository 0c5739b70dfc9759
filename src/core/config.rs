//! Purpose: Per-plugin bridge settings loaded from the host config directory.
//! Exports: `BridgeConfig`, `LogConfig`, `LevelSetting`.
//! Role: One JSON file per plugin; every field has a default so an absent file is valid.
//! Invariants: Unknown keys are rejected so typos surface instead of being ignored.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::core::chat::ChatColor;
use crate::core::error::{Error, ErrorKind};
use crate::core::host::{Host, HostApi};
use crate::core::text::TextEncoding;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub encoding: TextEncoding,
    pub translate_ansi: bool,
    pub chat_color: ChatColor,
    pub log: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::default(),
            translate_ansi: true,
            chat_color: ChatColor::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Level for lines echoed into host chat; `None` disables the layer.
    pub console: Option<LevelSetting>,
    /// Level for the rolling file in the host logs directory; `None` disables it.
    pub file: Option<LevelSetting>,
    /// File name prefix for rolled log files. Defaults to the plugin name.
    pub file_prefix: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console: Some(LevelSetting::Info),
            file: None,
            file_prefix: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelSetting {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LevelSetting> for LevelFilter {
    fn from(level: LevelSetting) -> Self {
        match level {
            LevelSetting::Off => LevelFilter::OFF,
            LevelSetting::Error => LevelFilter::ERROR,
            LevelSetting::Warn => LevelFilter::WARN,
            LevelSetting::Info => LevelFilter::INFO,
            LevelSetting::Debug => LevelFilter::DEBUG,
            LevelSetting::Trace => LevelFilter::TRACE,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid config: {err}"))
                .with_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read config")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json(&text).map_err(|err| err.with_path(path))
    }

    /// Like [`BridgeConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(Error::new(ErrorKind::Io)
                .with_message("failed to stat config")
                .with_path(path)
                .with_source(err)),
        }
    }

    /// `<host config dir>/<plugin>.json`.
    pub fn path_for_plugin<A: HostApi>(host: &Host<A>, plugin: &str) -> Result<PathBuf, Error> {
        if plugin.is_empty() || plugin.contains(['/', '\\']) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid plugin name {plugin:?}")));
        }
        let dir = host.config()?;
        Ok(Path::new(&dir).join(format!("{plugin}.json")))
    }

    pub fn for_plugin<A: HostApi>(host: &Host<A>, plugin: &str) -> Result<Self, Error> {
        Self::load_or_default(&Self::path_for_plugin(host, plugin)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to serialize config")
                .with_source(err)
        })
    }

    fn validate(&self) -> Result<(), Error> {
        if let Some(prefix) = &self.log.file_prefix {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("log.file_prefix must be a bare file name"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::fs;

    use tempfile::tempdir;

    use super::{BridgeConfig, LevelSetting};
    use crate::core::chat::ChatColor;
    use crate::core::error::ErrorKind;
    use crate::core::host::{Host, HostApi, PathKind};
    use crate::core::text::TextEncoding;

    struct ConfigDirHost {
        config: Vec<u8>,
    }

    impl HostApi for ConfigDirHost {
        fn is_initialized(&self) -> bool {
            true
        }

        fn path_buffer(&self, kind: PathKind) -> Option<&[u8]> {
            match kind {
                PathKind::Config => Some(self.config.as_slice()),
                _ => Some(&b"\0"[..]),
            }
        }

        fn write_chat_color(&self, _line: &CStr, _color: i32) {}
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = BridgeConfig::from_json("{}").expect("parse");
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert!(config.translate_ansi);
        assert_eq!(config.chat_color, ChatColor::Default);
        assert_eq!(config.log.console, Some(LevelSetting::Info));
        assert_eq!(config.log.file, None);
    }

    #[test]
    fn parses_full_config() {
        let config = BridgeConfig::from_json(
            r#"{
                "encoding": "latin1",
                "translate_ansi": false,
                "chat_color": 256,
                "log": {"console": null, "file": "debug", "file_prefix": "mqrust"}
            }"#,
        )
        .expect("parse");
        assert_eq!(config.encoding, TextEncoding::Latin1);
        assert!(!config.translate_ansi);
        assert_eq!(config.chat_color, ChatColor::Say);
        assert_eq!(config.log.console, None);
        assert_eq!(config.log.file, Some(LevelSetting::Debug));
        assert_eq!(config.log.file_prefix.as_deref(), Some("mqrust"));
    }

    #[test]
    fn unknown_keys_are_usage_errors() {
        let err = BridgeConfig::from_json(r#"{"encodng": "utf8"}"#).expect_err("typo");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn file_prefix_must_be_bare() {
        let err = BridgeConfig::from_json(r#"{"log": {"file_prefix": "../x"}}"#)
            .expect_err("separator");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn load_reports_path_on_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").expect("write");
        let err = BridgeConfig::load(&path).expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.path(), Some(path.as_path()));

        let missing = dir.path().join("missing.json");
        let err = BridgeConfig::load(&missing).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Io);
        let config = BridgeConfig::load_or_default(&missing).expect("defaults");
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn plugin_config_lives_in_host_config_dir() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("MQRustSimple.json"), r#"{"encoding": "utf8_lossy"}"#)
            .expect("write");
        let mut config_path = dir.path().to_string_lossy().into_owned().into_bytes();
        config_path.push(0);
        let host = Host::new(ConfigDirHost {
            config: config_path,
        });

        let config = BridgeConfig::for_plugin(&host, "MQRustSimple").expect("load");
        assert_eq!(config.encoding, TextEncoding::Utf8Lossy);

        let absent = BridgeConfig::for_plugin(&host, "Other").expect("defaults");
        assert_eq!(absent, BridgeConfig::default());

        let err = BridgeConfig::for_plugin(&host, "a/b").expect_err("bad name");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn round_trips_through_pretty_json() {
        let config = BridgeConfig::default();
        let text = config.to_json_pretty().expect("json");
        assert_eq!(BridgeConfig::from_json(&text).expect("parse"), config);
    }
}
