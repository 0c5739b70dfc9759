//! Purpose: Define the stable public Rust API boundary for plugins.
//! Exports: Host handle, path/chat/record operations, projections, config and errors.
//! Role: Public, additive-only surface; hides the internal `core` modules.
//! Invariants: This module is the only public path to host access.
//! Invariants: Raw host record layouts stay opaque; only verified fields are reachable.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::chat::{ChatColor, colorize_line};
pub use crate::core::config::{BridgeConfig, LevelSetting, LogConfig};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::game::GameState;
#[cfg(feature = "host")]
pub use crate::core::host::NativeHost;
pub use crate::core::host::{Host, HostApi, HostState, PathKind, Paths};
pub use crate::core::record::{
    DisplayName, FieldLayout, GroundItem, GroundItemPrefix, PlayerClientPrefix, PluginDescriptor,
    PluginDescriptorPrefix, PluginSlot, Projection, Raw, RecordKind, Spawn, with_record,
};
pub use crate::core::text::{HostStr, TextEncoding, to_host_cstring};
