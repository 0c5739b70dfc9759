//! Purpose: Host handle over the native accessor layer.
//! Exports: `HostApi`, `Host`, `HostState`, `PathKind`, `Paths`.
//! Role: The one capability every boundary call goes through; owns the init latch,
//!       the text policy and the thread check.
//! Invariants: Initialization latches once and is never reversed.
//! Invariants: Every operation runs on the thread that created the handle; host
//!             globals and records are mutated by that thread without locks.
//! Invariants: Only the literal chat entry point is reachable; caller text is never
//!             handed to the host as a format template.
//! Notes: Reads are not atomic with respect to the host's own updates. Calling in
//!        from a host callback that is mid-way through mutating a record is the
//!        caller's responsibility.
use std::borrow::Cow;
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use crate::core::chat::{ChatColor, colorize_line};
use crate::core::config::BridgeConfig;
use crate::core::error::{Error, ErrorKind};
use crate::core::game::GameState;
use crate::core::record::{
    DisplayName, FieldLayout, GroundItem, GroundItemPrefix, PlayerClientPrefix,
    PluginDescriptor, PluginDescriptorPrefix, Projection, Raw, RecordKind, Spawn, with_record,
};
use crate::core::text::{HostStr, TextEncoding, to_host_cstring};

#[cfg(feature = "host")]
mod native;
#[cfg(feature = "host")]
pub(crate) mod sys;

#[cfg(feature = "host")]
pub use native::NativeHost;

/// Host path globals, resolved once at host startup.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PathKind {
    Root,
    Config,
    Ini,
    Macros,
    Logs,
    CrashDumps,
    Plugins,
    Resources,
    Game,
}

impl PathKind {
    pub const ALL: [PathKind; 9] = [
        PathKind::Root,
        PathKind::Config,
        PathKind::Ini,
        PathKind::Macros,
        PathKind::Logs,
        PathKind::CrashDumps,
        PathKind::Plugins,
        PathKind::Resources,
        PathKind::Game,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PathKind::Root => "root",
            PathKind::Config => "config",
            PathKind::Ini => "ini",
            PathKind::Macros => "macros",
            PathKind::Logs => "logs",
            PathKind::CrashDumps => "crash_dumps",
            PathKind::Plugins => "plugins",
            PathKind::Resources => "resources",
            PathKind::Game => "game",
        }
    }

    /// Code shared with the native shim and the C ABI.
    pub fn code(self) -> i32 {
        match self {
            PathKind::Root => 0,
            PathKind::Config => 1,
            PathKind::Ini => 2,
            PathKind::Macros => 3,
            PathKind::Logs => 4,
            PathKind::CrashDumps => 5,
            PathKind::Plugins => 6,
            PathKind::Resources => 7,
            PathKind::Game => 8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Raw access to host state.
///
/// Implementations are thin: they hand back host memory and call host entry
/// points, and leave every policy decision to [`Host`].
pub trait HostApi {
    /// Whether the host has populated its path globals.
    fn is_initialized(&self) -> bool;

    /// The whole backing buffer of a path global, terminator included.
    ///
    /// The slice must cover only memory the host allocated for that global;
    /// the string inside is found by scanning for the first NUL.
    fn path_buffer(&self, kind: PathKind) -> Option<&[u8]>;

    /// Appends `line` to host chat. Must bind the literal (non-templating)
    /// entry point.
    fn write_chat_color(&self, line: &CStr, color: i32);

    /// Where the host build places a record's name field, when it can tell.
    fn field_layout(&self, record: RecordKind) -> Option<FieldLayout> {
        let _ = record;
        None
    }

    /// The host's raw game state code, when it can tell.
    fn game_state(&self) -> Option<i32> {
        None
    }

    /// The name a plugin registered under, copied out of the host with its
    /// terminator. `None` means the host has no copy and the descriptor
    /// prefix is read instead.
    ///
    /// # Safety
    ///
    /// `plugin` is non-null and references a registered descriptor.
    unsafe fn plugin_name(&self, plugin: *const PluginDescriptorPrefix) -> Option<Vec<u8>> {
        let _ = plugin;
        None
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostState {
    Uninitialized,
    Initialized,
}

/// Snapshot of all nine host paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Paths {
    root: PathBuf,
    config: PathBuf,
    ini: PathBuf,
    macros: PathBuf,
    logs: PathBuf,
    crash_dumps: PathBuf,
    plugins: PathBuf,
    resources: PathBuf,
    game: PathBuf,
}

impl Paths {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn ini(&self) -> &Path {
        &self.ini
    }

    pub fn macros(&self) -> &Path {
        &self.macros
    }

    pub fn logs(&self) -> &Path {
        &self.logs
    }

    pub fn crash_dumps(&self) -> &Path {
        &self.crash_dumps
    }

    pub fn plugins(&self) -> &Path {
        &self.plugins
    }

    pub fn resources(&self) -> &Path {
        &self.resources
    }

    pub fn game(&self) -> &Path {
        &self.game
    }

    pub fn get(&self, kind: PathKind) -> &Path {
        match kind {
            PathKind::Root => self.root(),
            PathKind::Config => self.config(),
            PathKind::Ini => self.ini(),
            PathKind::Macros => self.macros(),
            PathKind::Logs => self.logs(),
            PathKind::CrashDumps => self.crash_dumps(),
            PathKind::Plugins => self.plugins(),
            PathKind::Resources => self.resources(),
            PathKind::Game => self.game(),
        }
    }
}

#[derive(Debug)]
struct LayoutFault {
    record: RecordKind,
    message: String,
}

/// Process-wide handle to the host.
///
/// Create it on the host's main thread (plugin initialization runs there)
/// and pass it to whatever needs host access.
#[derive(Debug)]
pub struct Host<A> {
    api: A,
    initialized: AtomicBool,
    owner: ThreadId,
    encoding: TextEncoding,
    translate_ansi: bool,
    chat_color: ChatColor,
    layouts: OnceLock<Option<LayoutFault>>,
}

impl<A: HostApi> Host<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            initialized: AtomicBool::new(false),
            owner: thread::current().id(),
            encoding: TextEncoding::default(),
            translate_ansi: true,
            chat_color: ChatColor::default(),
            layouts: OnceLock::new(),
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_ansi_translation(mut self, enabled: bool) -> Self {
        self.translate_ansi = enabled;
        self
    }

    pub fn with_chat_color(mut self, color: ChatColor) -> Self {
        self.chat_color = color;
        self
    }

    pub fn with_config(self, config: &BridgeConfig) -> Self {
        self.with_encoding(config.encoding)
            .with_ansi_translation(config.translate_ansi)
            .with_chat_color(config.chat_color)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Whether chat writes turn ANSI SGR sequences into host color codes.
    pub fn translates_ansi(&self) -> bool {
        self.translate_ansi
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn state(&self) -> HostState {
        if self.initialized.load(Ordering::Acquire) {
            return HostState::Initialized;
        }
        if self.api.is_initialized() {
            self.initialized.store(true, Ordering::Release);
            tracing::debug!("host initialized");
            HostState::Initialized
        } else {
            HostState::Uninitialized
        }
    }

    fn check_thread(&self, operation: &str) -> Result<(), Error> {
        if self.is_owner_thread() {
            return Ok(());
        }
        Err(Error::new(ErrorKind::WrongThread).with_message(format!(
            "{operation} called off the host main thread ({:?})",
            self.owner
        )))
    }

    fn require_initialized(&self, operation: &str) -> Result<(), Error> {
        match self.state() {
            HostState::Initialized => Ok(()),
            HostState::Uninitialized => Err(Error::new(ErrorKind::Uninitialized)
                .with_message(format!("{operation} called before host initialization"))),
        }
    }

    /// Borrows a host path for the duration of `f`.
    pub fn with_path<R>(&self, kind: PathKind, f: impl FnOnce(&str) -> R) -> Result<R, Error> {
        self.check_thread("path read")?;
        self.require_initialized("path read")?;
        let buf = self.api.path_buffer(kind).ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message(format!(
                "host reported initialized but has no {} path",
                kind.as_str()
            ))
        })?;
        let text = HostStr::from_buffer(buf)
            .and_then(|text| text.decode(self.encoding))
            .map_err(|err| {
                let cause = err.message().unwrap_or("invalid text").to_string();
                err.with_message(format!("{} path is not representable: {cause}", kind.as_str()))
            })?;
        Ok(f(&text))
    }

    /// Owned snapshot of a host path.
    pub fn path(&self, kind: PathKind) -> Result<String, Error> {
        self.with_path(kind, str::to_owned)
    }

    pub fn root(&self) -> Result<String, Error> {
        self.path(PathKind::Root)
    }

    pub fn config(&self) -> Result<String, Error> {
        self.path(PathKind::Config)
    }

    pub fn ini(&self) -> Result<String, Error> {
        self.path(PathKind::Ini)
    }

    pub fn macros(&self) -> Result<String, Error> {
        self.path(PathKind::Macros)
    }

    pub fn logs(&self) -> Result<String, Error> {
        self.path(PathKind::Logs)
    }

    pub fn crash_dumps(&self) -> Result<String, Error> {
        self.path(PathKind::CrashDumps)
    }

    pub fn plugins(&self) -> Result<String, Error> {
        self.path(PathKind::Plugins)
    }

    pub fn resources(&self) -> Result<String, Error> {
        self.path(PathKind::Resources)
    }

    pub fn game(&self) -> Result<String, Error> {
        self.path(PathKind::Game)
    }

    pub fn paths(&self) -> Result<Paths, Error> {
        let get = |kind| self.path(kind).map(PathBuf::from);
        Ok(Paths {
            root: get(PathKind::Root)?,
            config: get(PathKind::Config)?,
            ini: get(PathKind::Ini)?,
            macros: get(PathKind::Macros)?,
            logs: get(PathKind::Logs)?,
            crash_dumps: get(PathKind::CrashDumps)?,
            plugins: get(PathKind::Plugins)?,
            resources: get(PathKind::Resources)?,
            game: get(PathKind::Game)?,
        })
    }

    /// Writes a line to host chat in the configured default color.
    pub fn write_chat(&self, line: &str) -> Result<(), Error> {
        self.write_chat_color(line, self.chat_color)
    }

    /// Writes a line to host chat.
    ///
    /// The text reaches the host verbatim (after optional ANSI translation):
    /// `%s` and friends are printed, never expanded.
    pub fn write_chat_color(&self, line: &str, color: impl Into<ChatColor>) -> Result<(), Error> {
        self.check_thread("chat write")?;
        self.require_initialized("chat write")?;
        let line = if self.translate_ansi {
            colorize_line(line)
        } else {
            Cow::Borrowed(line)
        };
        let line = to_host_cstring(&line, self.encoding)?;
        self.api.write_chat_color(&line, i32::from(color.into()));
        Ok(())
    }

    /// Runs `f` against a host record for the duration of the call.
    ///
    /// # Safety
    ///
    /// See [`with_record`]: a non-null `ptr` must reference a live record of
    /// the matching host type.
    pub unsafe fn with_record<P, R>(
        &self,
        ptr: *const Raw<P>,
        f: impl FnOnce(&P) -> R,
    ) -> Result<R, Error>
    where
        P: Projection,
    {
        self.check_thread("record read")?;
        self.verify_layouts()?;
        unsafe { with_record(ptr, f) }
    }

    unsafe fn record_name<P>(&self, ptr: *const Raw<P>) -> Result<String, Error>
    where
        P: DisplayName,
    {
        let encoding = self.encoding;
        unsafe { self.with_record::<P, _>(ptr, |record| record.display_name(encoding)) }?
    }

    /// Owned copy of a spawn's display name.
    ///
    /// # Safety
    ///
    /// A non-null `spawn` must reference a live `PlayerClient`.
    pub unsafe fn spawn_name(&self, spawn: *const PlayerClientPrefix) -> Result<String, Error> {
        unsafe { self.record_name::<Spawn>(spawn) }
    }

    /// Owned copy of a ground item's display name.
    ///
    /// # Safety
    ///
    /// A non-null `item` must reference a live `EQGroundItem`.
    pub unsafe fn ground_item_name(&self, item: *const GroundItemPrefix) -> Result<String, Error> {
        unsafe { self.record_name::<GroundItem>(item) }
    }

    /// Owned copy of the name the host registered a plugin under.
    ///
    /// # Safety
    ///
    /// A non-null `plugin` must reference a registered `MQPlugin`.
    pub unsafe fn plugin_name(&self, plugin: *const PluginDescriptorPrefix) -> Result<String, Error> {
        if !plugin.is_null() {
            self.check_thread("record read")?;
            self.verify_layouts()?;
            // SAFETY: non-null and registered per the caller's contract.
            if let Some(buf) = unsafe { self.api.plugin_name(plugin) } {
                return HostStr::from_buffer(&buf)
                    .and_then(|name| name.to_owned_string(self.encoding))
                    .map_err(|err| err.with_record(RecordKind::PluginDescriptor.as_str()));
            }
        }
        unsafe { self.record_name::<PluginDescriptor>(plugin) }
    }

    /// Current game state as the host reports it.
    pub fn game_state(&self) -> Result<GameState, Error> {
        self.check_thread("game state read")?;
        self.api
            .game_state()
            .map(GameState::from)
            .ok_or_else(|| {
                Error::new(ErrorKind::Internal).with_message("host does not report game state")
            })
    }

    /// Checks the host's record layouts against the compiled-in contract.
    ///
    /// The comparison runs once; its outcome is latched and every record read
    /// goes through it first.
    pub fn verify_layouts(&self) -> Result<(), Error> {
        self.check_thread("layout check")?;
        match self.layouts.get_or_init(|| self.compare_layouts()) {
            None => Ok(()),
            Some(fault) => Err(Error::new(ErrorKind::LayoutMismatch)
                .with_message(fault.message.clone())
                .with_record(fault.record.as_str())),
        }
    }

    fn compare_layouts(&self) -> Option<LayoutFault> {
        for record in RecordKind::ALL {
            let expected = record.name_field();
            let Some(actual) = self.api.field_layout(record) else {
                tracing::debug!(record = record.as_str(), "host does not report layout");
                continue;
            };
            if actual != expected {
                let message = format!(
                    "{} is at {:#x} ({} bytes) in the host but {:#x} ({} bytes) here",
                    record.host_field(),
                    actual.offset,
                    actual.capacity,
                    expected.offset,
                    expected.capacity
                );
                tracing::warn!(record = record.as_str(), "{message}");
                return Some(LayoutFault { record, message });
            }
        }
        None
    }
}
