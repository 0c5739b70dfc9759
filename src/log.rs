//! Purpose: Route `tracing` output into host chat and the host logs directory.
//! Exports: tracing macros, `LevelFilter`, `ConsoleWriter`, `Logger`, `LoggerBuilder`.
//! Role: Optional logging sink for plugins; the boundary itself only emits events.
//! Invariants: Console output reaches the host only through the literal chat write.
//! Invariants: Console ANSI colors are only produced for a host handle that translates them.
//! Invariants: Console lines produced off the host thread are dropped; the file layer keeps them.
//! Invariants: Installing a second global subscriber is a `Usage` error, never a panic.
use std::io;
use std::sync::Arc;

use bstr::ByteSlice;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;

pub use tracing::{debug, error, info, trace, warn};
pub use tracing_subscriber::filter::LevelFilter;

use crate::core::config::LogConfig;
use crate::core::error::{Error, ErrorKind};
use crate::core::host::{Host, HostApi};

/// Line-buffered writer into host chat.
///
/// Complete lines are written as they arrive; a trailing partial line is
/// written on flush or drop.
pub struct ConsoleWriter<A: HostApi> {
    host: Arc<Host<A>>,
    pending: Vec<u8>,
}

impl<A: HostApi> ConsoleWriter<A> {
    pub fn new(host: Arc<Host<A>>) -> Self {
        Self {
            host,
            pending: Vec::new(),
        }
    }

    fn send(&self, line: &[u8]) -> io::Result<()> {
        if !self.host.is_owner_thread() {
            return Ok(());
        }
        let text = line.to_str_lossy();
        self.host
            .write_chat(text.trim_end_matches('\r'))
            .map_err(io::Error::other)
    }

    fn emit_complete_lines(&mut self) -> io::Result<()> {
        while let Some(end) = self.pending.find_byte(b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.send(&line[..end])?;
        }
        Ok(())
    }
}

impl<A: HostApi> io::Write for ConsoleWriter<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.emit_complete_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines()?;
        if self.pending.is_empty() {
            return Ok(());
        }
        let rest = std::mem::take(&mut self.pending);
        self.send(&rest)
    }
}

impl<A: HostApi> Drop for ConsoleWriter<A> {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

#[derive(Clone, Debug)]
struct ConsoleLogger {
    level: LevelFilter,
    ansi: bool,
}

#[derive(Clone, Debug)]
struct FileLogger {
    level: LevelFilter,
    prefix: String,
}

#[derive(Clone, Debug, Default)]
pub struct LoggerBuilder {
    console: Option<ConsoleLogger>,
    file: Option<FileLogger>,
}

impl LoggerBuilder {
    /// Echo events at `level` and above into host chat.
    pub fn console(mut self, level: impl Into<LevelFilter>) -> Self {
        self.console = Some(ConsoleLogger {
            level: level.into(),
            ansi: true,
        });
        self
    }

    /// Emit ANSI colors on the console layer. They are only emitted when the
    /// host handle translates them into host color codes.
    pub fn console_ansi(mut self, enabled: bool) -> Self {
        if let Some(console) = &mut self.console {
            console.ansi = enabled;
        }
        self
    }

    /// Write events at `level` and above to `<logs>/<prefix>.<date>.log`, rolled daily.
    pub fn file(mut self, level: impl Into<LevelFilter>, prefix: impl Into<String>) -> Self {
        self.file = Some(FileLogger {
            level: level.into(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            console: self.console,
            file: self.file,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Logger {
    console: Option<ConsoleLogger>,
    file: Option<FileLogger>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Logger described by a plugin's `log` config section.
    pub fn from_config(config: &LogConfig, default_prefix: &str) -> Self {
        let mut builder = Self::builder();
        if let Some(level) = config.console {
            builder = builder.console(level);
        }
        if let Some(level) = config.file {
            let prefix = config.file_prefix.as_deref().unwrap_or(default_prefix);
            builder = builder.file(level, prefix);
        }
        builder.build()
    }

    /// Builds the subscriber without installing it.
    pub fn subscriber<A>(
        &self,
        host: Arc<Host<A>>,
    ) -> Result<impl tracing::Subscriber + Send + Sync + 'static, Error>
    where
        A: HostApi + Send + Sync + 'static,
    {
        let file_layer = match &self.file {
            Some(file) => {
                let logs = host.logs()?;
                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(file.prefix.as_str())
                    .filename_suffix("log")
                    .build(&logs)
                    .map_err(|err| {
                        Error::new(ErrorKind::Io)
                            .with_message("failed to open log file")
                            .with_path(&logs)
                            .with_source(err)
                    })?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(appender)
                        .with_filter(file.level),
                )
            }
            None => None,
        };

        let translates_ansi = host.translates_ansi();
        let console_layer = self.console.as_ref().map(|console| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi && translates_ansi)
                .without_time()
                .with_target(false)
                .with_writer(move || ConsoleWriter::new(Arc::clone(&host)))
                .with_filter(console.level)
        });

        Ok(tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer))
    }

    /// Installs the global subscriber.
    pub fn install<A>(&self, host: Arc<Host<A>>) -> Result<(), Error>
    where
        A: HostApi + Send + Sync + 'static,
    {
        self.subscriber(host)?.try_init().map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("a global tracing subscriber is already installed")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tempfile::tempdir;

    use super::{ConsoleWriter, LevelFilter, Logger};
    use crate::core::config::{LevelSetting, LogConfig};
    use crate::core::error::ErrorKind;
    use crate::core::host::{Host, HostApi, PathKind};

    struct RecordingHost {
        logs: Vec<u8>,
        lines: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn new(logs: &str) -> Self {
            let mut buf = logs.as_bytes().to_vec();
            buf.push(0);
            Self {
                logs: buf,
                lines: Mutex::new(Vec::new()),
            }
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().expect("lines").clone()
        }
    }

    impl HostApi for RecordingHost {
        fn is_initialized(&self) -> bool {
            true
        }

        fn path_buffer(&self, kind: PathKind) -> Option<&[u8]> {
            match kind {
                PathKind::Logs => Some(self.logs.as_slice()),
                _ => Some(&b"\0"[..]),
            }
        }

        fn write_chat_color(&self, line: &CStr, _color: i32) {
            self.lines
                .lock()
                .expect("lines")
                .push(line.to_string_lossy().into_owned());
        }
    }

    #[test]
    fn writer_emits_one_chat_line_per_newline() {
        let host = Arc::new(Host::new(RecordingHost::new("")));
        {
            let mut writer = ConsoleWriter::new(Arc::clone(&host));
            writer.write_all(b"first\r\nsec").expect("write");
            writer.write_all(b"ond\nthird").expect("write");
            assert_eq!(host.api().lines(), vec!["first", "second"]);
        }
        assert_eq!(host.api().lines(), vec!["first", "second", "third"]);
    }

    #[test]
    fn writer_drops_lines_from_other_threads() {
        let host = Arc::new(Host::new(RecordingHost::new("")));
        let remote = Arc::clone(&host);
        std::thread::spawn(move || {
            let mut writer = ConsoleWriter::new(remote);
            writer.write_all(b"from a worker\n").expect("write");
        })
        .join()
        .expect("join");
        assert!(host.api().lines().is_empty());
    }

    #[test]
    fn console_layer_filters_by_level() {
        let host = Arc::new(Host::new(RecordingHost::new("")));
        let logger = Logger::builder()
            .console(LevelFilter::INFO)
            .console_ansi(false)
            .build();
        let subscriber = logger.subscriber(Arc::clone(&host)).expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!("loaded 100%s of zones");
        });
        let lines = host.api().lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].ends_with("loaded 100%s of zones"));
    }

    #[test]
    fn console_colors_follow_host_translation() {
        let raw = Arc::new(Host::new(RecordingHost::new("")).with_ansi_translation(false));
        let logger = Logger::from_config(&LogConfig::default(), "mqbridge");
        let subscriber = logger.subscriber(Arc::clone(&raw)).expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("low mana");
        });
        let lines = raw.api().lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"));
        assert!(!lines[0].contains('\x1b'), "{:?}", lines[0]);

        let translated = Arc::new(Host::new(RecordingHost::new("")));
        let subscriber = logger.subscriber(Arc::clone(&translated)).expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("low mana");
        });
        let lines = translated.api().lines();
        assert!(!lines[0].contains('\x1b'));
        assert!(lines[0].contains('\x07'), "{:?}", lines[0]);
    }

    #[test]
    fn file_layer_writes_into_host_logs_dir() {
        let dir = tempdir().expect("tempdir");
        let host = Arc::new(Host::new(RecordingHost::new(
            dir.path().to_str().expect("utf8 tempdir"),
        )));
        let config = LogConfig {
            console: None,
            file: Some(LevelSetting::Debug),
            file_prefix: None,
        };
        let logger = Logger::from_config(&config, "mqbridge");
        let subscriber = logger.subscriber(Arc::clone(&host)).expect("subscriber");
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(zone = "poknowledge", "entered zone");
        });

        let mut contents = String::new();
        for entry in fs::read_dir(dir.path()).expect("read_dir") {
            let path = entry.expect("entry").path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            assert!(name.starts_with("mqbridge"), "unexpected file {name}");
            contents.push_str(&fs::read_to_string(&path).expect("read"));
        }
        assert!(contents.contains("entered zone"));
        assert!(contents.contains("poknowledge"));
        assert!(host.api().lines().is_empty());
    }

    #[test]
    fn second_install_is_a_usage_error() {
        let host = Arc::new(Host::new(RecordingHost::new("")));
        let logger = Logger::builder().console(LevelFilter::OFF).build();
        let _ = logger.install(Arc::clone(&host));
        let err = logger.install(host).expect_err("already installed");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
