//! Purpose: Verified-prefix views over host-owned records.
//! Exports: prefix structs, `Spawn`, `GroundItem`, `PluginDescriptor`, `PluginSlot`, `with_record`.
//! Role: Narrowing layer; the caller only ever sees the fields declared here.
//! Invariants: Each prefix struct is `#[repr(C)]` and ends at the last verified field.
//! Invariants: Field offsets are pinned by compile-time assertions against `RecordKind::name_field`.
//! Invariants: A projection never outlives the closure it was handed to.
//!
//! # Layout contract
//!
//! | Record | Host type | Field | Offset | Capacity |
//! |---|---|---|---|---|
//! | `PlayerClient` | `eqlib::PlayerClient` | `Name` | `0xa4` | 64 |
//! | `GroundItem` | `eqlib::EQGroundItem` | `Name` | `0x38` | 64 |
//! | `PluginDescriptor` | `mq::MQPlugin` | `szFilename` | `0x0` | 260 |
//!
//! The native shim reports the offsets the host was compiled with. `Host`
//! checks them once, before its first record read, and every record read
//! fails with `LayoutMismatch` against a host that disagrees.
//! `MQPlugin::name` is not a fixed buffer, so a host that can copy it out
//! (`HostApi::plugin_name`) supplies the descriptor name; the `szFilename`
//! prefix is the fallback view.
//! A layout break is fixed by changing the constants below and nothing else.
use std::fmt;
use std::mem::offset_of;
use std::sync::atomic::{AtomicPtr, Ordering};

use ref_cast::RefCast;
use serde::Serialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::text::{HostStr, TextEncoding};

pub const PLAYER_CLIENT_NAME_OFFSET: usize = 0xa4;
pub const PLAYER_CLIENT_NAME_LEN: usize = 0x40;
pub const GROUND_ITEM_NAME_OFFSET: usize = 0x38;
pub const GROUND_ITEM_NAME_LEN: usize = 0x40;
pub const PLUGIN_NAME_OFFSET: usize = 0;
pub const PLUGIN_NAME_LEN: usize = 260;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum RecordKind {
    PlayerClient,
    GroundItem,
    PluginDescriptor,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::PlayerClient,
        RecordKind::GroundItem,
        RecordKind::PluginDescriptor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::PlayerClient => "PlayerClient",
            RecordKind::GroundItem => "GroundItem",
            RecordKind::PluginDescriptor => "PluginDescriptor",
        }
    }

    /// Code shared with the native shim.
    pub fn code(self) -> i32 {
        match self {
            RecordKind::PlayerClient => 0,
            RecordKind::GroundItem => 1,
            RecordKind::PluginDescriptor => 2,
        }
    }

    pub fn host_field(self) -> &'static str {
        match self {
            RecordKind::PlayerClient | RecordKind::GroundItem => "Name",
            RecordKind::PluginDescriptor => "szFilename",
        }
    }

    /// The verified location of the display-name field.
    pub fn name_field(self) -> FieldLayout {
        match self {
            RecordKind::PlayerClient => FieldLayout {
                offset: PLAYER_CLIENT_NAME_OFFSET,
                capacity: PLAYER_CLIENT_NAME_LEN,
            },
            RecordKind::GroundItem => FieldLayout {
                offset: GROUND_ITEM_NAME_OFFSET,
                capacity: GROUND_ITEM_NAME_LEN,
            },
            RecordKind::PluginDescriptor => FieldLayout {
                offset: PLUGIN_NAME_OFFSET,
                capacity: PLUGIN_NAME_LEN,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct FieldLayout {
    pub offset: usize,
    pub capacity: usize,
}

/// Leading bytes of `eqlib::PlayerClient` up to and including `Name`.
#[repr(C)]
pub struct PlayerClientPrefix {
    _unverified: [u8; PLAYER_CLIENT_NAME_OFFSET],
    name: [u8; PLAYER_CLIENT_NAME_LEN],
}

/// Leading bytes of `eqlib::EQGroundItem` up to and including `Name`.
#[repr(C)]
pub struct GroundItemPrefix {
    _unverified: [u8; GROUND_ITEM_NAME_OFFSET],
    name: [u8; GROUND_ITEM_NAME_LEN],
}

/// Leading bytes of `mq::MQPlugin`; the filename is the registered name.
#[repr(C)]
pub struct PluginDescriptorPrefix {
    name: [u8; PLUGIN_NAME_LEN],
}

const _: () = assert!(offset_of!(PlayerClientPrefix, name) == PLAYER_CLIENT_NAME_OFFSET);
const _: () = assert!(offset_of!(GroundItemPrefix, name) == GROUND_ITEM_NAME_OFFSET);
const _: () = assert!(offset_of!(PluginDescriptorPrefix, name) == PLUGIN_NAME_OFFSET);
const _: () = assert!(std::mem::align_of::<PlayerClientPrefix>() == 1);
const _: () = assert!(std::mem::align_of::<GroundItemPrefix>() == 1);
const _: () = assert!(std::mem::align_of::<PluginDescriptorPrefix>() == 1);

/// The raw prefix a projection views.
pub type Raw<P> = <P as RefCast>::From;

/// A caller-facing view over a host record prefix.
pub trait Projection: RefCast + Sized {
    const KIND: RecordKind;

    fn project(raw: &Raw<Self>) -> &Self {
        Self::ref_cast(raw)
    }
}

/// Projections that expose the record's display name.
pub trait DisplayName: Projection {
    fn name(&self) -> Result<HostStr<'_>, Error>;

    /// Fresh owned copy of the name, safe to keep after the record changes.
    fn display_name(&self, encoding: TextEncoding) -> Result<String, Error> {
        self.name()
            .and_then(|name| name.to_owned_string(encoding))
            .map_err(|err| err.with_record(Self::KIND.as_str()))
    }
}

/// Runs `f` against the record behind `ptr`.
///
/// This is the only way to turn a host record pointer into a projection, and
/// the higher-ranked closure keeps the view from escaping the call.
///
/// # Safety
///
/// When non-null, `ptr` must point to a live host record of the matching
/// type whose leading `size_of::<Raw<P>>()` bytes stay readable and are not
/// written by the host for the duration of the call.
pub unsafe fn with_record<P, R>(ptr: *const Raw<P>, f: impl FnOnce(&P) -> R) -> Result<R, Error>
where
    P: Projection,
{
    // SAFETY: non-null validity is the caller's contract.
    let Some(raw) = (unsafe { ptr.as_ref() }) else {
        return Err(Error::new(ErrorKind::InvalidReference)
            .with_message("record pointer is null")
            .with_record(P::KIND.as_str()));
    };
    Ok(f(P::project(raw)))
}

macro_rules! name_projection {
    ($(#[$meta:meta])* $name:ident, $raw:ty, $kind:expr) => {
        $(#[$meta])*
        #[derive(RefCast)]
        #[repr(transparent)]
        pub struct $name($raw);

        impl Projection for $name {
            const KIND: RecordKind = $kind;
        }

        impl DisplayName for $name {
            fn name(&self) -> Result<HostStr<'_>, Error> {
                HostStr::from_buffer(&self.0.name)
            }
        }

        impl AsRef<$name> for $raw {
            fn as_ref(&self) -> &$name {
                $name::ref_cast(self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = self
                    .name()
                    .map(|name| name.decode(TextEncoding::Utf8Lossy).map(|n| n.into_owned()));
                f.debug_struct(stringify!($name))
                    .field("name", &name.ok().and_then(Result::ok))
                    .finish()
            }
        }
    };
}

name_projection!(
    /// A spawn (player, NPC, corpse...) as seen through `PlayerClientPrefix`.
    Spawn,
    PlayerClientPrefix,
    RecordKind::PlayerClient
);
name_projection!(GroundItem, GroundItemPrefix, RecordKind::GroundItem);
name_projection!(
    /// The host's registration record for this plugin.
    PluginDescriptor,
    PluginDescriptorPrefix,
    RecordKind::PluginDescriptor
);

/// Storage the host fills with this plugin's descriptor.
///
/// Export one as `ThisPlugin` and the host writes its `MQPlugin*` into it
/// after loading the plugin:
///
/// ```ignore
/// #[unsafe(no_mangle)]
/// pub static ThisPlugin: mqbridge::api::PluginSlot = mqbridge::api::PluginSlot::new();
/// ```
#[repr(transparent)]
pub struct PluginSlot(AtomicPtr<PluginDescriptorPrefix>);

impl PluginSlot {
    pub const fn new() -> Self {
        Self(AtomicPtr::new(std::ptr::null_mut()))
    }

    pub fn set(&self, descriptor: *mut PluginDescriptorPrefix) {
        self.0.store(descriptor, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        !self.0.load(Ordering::Acquire).is_null()
    }

    pub fn get(&self) -> *const PluginDescriptorPrefix {
        self.0.load(Ordering::Acquire)
    }

    /// # Safety
    ///
    /// The descriptor the host stored must still be registered.
    pub unsafe fn with<R>(&self, f: impl FnOnce(&PluginDescriptor) -> R) -> Result<R, Error> {
        unsafe { with_record(self.get(), f) }
    }
}

impl Default for PluginSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::mem::size_of;

    use super::*;

    /// Host-shaped bytes with `name` written at the contract offset.
    pub(crate) fn record_bytes<P>(name: &[u8]) -> Vec<u8>
    where
        P: Projection,
        Raw<P>: Sized,
    {
        let field = P::KIND.name_field();
        let mut bytes = vec![0xccu8; size_of::<Raw<P>>() + 32];
        bytes[field.offset..field.offset + field.capacity].fill(0);
        bytes[field.offset..field.offset + name.len()].copy_from_slice(name);
        bytes
    }

    #[test]
    fn prefix_sizes_end_at_the_name_field() {
        for kind in RecordKind::ALL {
            let field = kind.name_field();
            let size = match kind {
                RecordKind::PlayerClient => size_of::<PlayerClientPrefix>(),
                RecordKind::GroundItem => size_of::<GroundItemPrefix>(),
                RecordKind::PluginDescriptor => size_of::<PluginDescriptorPrefix>(),
            };
            assert_eq!(size, field.offset + field.capacity, "{}", kind.as_str());
        }
    }

    #[test]
    fn spawn_name_is_read_at_the_contract_offset() {
        let bytes = record_bytes::<Spawn>(b"Bristlebane");
        let name = unsafe {
            with_record::<Spawn, _>(bytes.as_ptr().cast(), |spawn| {
                spawn.display_name(TextEncoding::Utf8)
            })
        }
        .expect("non-null")
        .expect("name");
        assert_eq!(name, "Bristlebane");
    }

    #[test]
    fn ground_item_and_plugin_names_project() {
        let item = record_bytes::<GroundItem>(b"Bone Chips");
        let plugin = record_bytes::<PluginDescriptor>(b"MQRustBasic");
        unsafe {
            let item_name = with_record::<GroundItem, _>(item.as_ptr().cast(), |item| {
                item.display_name(TextEncoding::Utf8)
            });
            assert_eq!(item_name.expect("non-null").expect("name"), "Bone Chips");

            let plugin_name =
                with_record::<PluginDescriptor, _>(plugin.as_ptr().cast(), |plugin| {
                    plugin.display_name(TextEncoding::Utf8)
                });
            assert_eq!(plugin_name.expect("non-null").expect("name"), "MQRustBasic");
        }
    }

    #[test]
    fn null_pointer_is_an_invalid_reference() {
        let err = unsafe { with_record::<Spawn, _>(std::ptr::null(), |_| ()) }
            .expect_err("null");
        assert_eq!(err.kind(), ErrorKind::InvalidReference);
        assert_eq!(err.record(), Some("PlayerClient"));
    }

    #[test]
    fn unterminated_name_field_is_an_encoding_error() {
        let field = RecordKind::GroundItem.name_field();
        let mut bytes = record_bytes::<GroundItem>(b"");
        bytes[field.offset..field.offset + field.capacity].fill(b'x');
        let err = unsafe {
            with_record::<GroundItem, _>(bytes.as_ptr().cast(), |item| {
                item.display_name(TextEncoding::Utf8)
            })
        }
        .expect("non-null")
        .expect_err("unterminated");
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(err.record(), Some("GroundItem"));
    }

    #[test]
    fn plugin_slot_projects_once_set() {
        static SLOT: PluginSlot = PluginSlot::new();
        let err = unsafe { SLOT.with(|_| ()) }.expect_err("unset");
        assert_eq!(err.kind(), ErrorKind::InvalidReference);

        let mut bytes = record_bytes::<PluginDescriptor>(b"mqbridge");
        SLOT.set(bytes.as_mut_ptr().cast());
        assert!(SLOT.is_set());
        let name = unsafe { SLOT.with(|plugin| plugin.display_name(TextEncoding::Utf8)) }
            .expect("set")
            .expect("name");
        assert_eq!(name, "mqbridge");
        SLOT.set(std::ptr::null_mut());
    }

    #[test]
    fn debug_shows_only_the_name() {
        let bytes = record_bytes::<Spawn>(b"Fippy Darkpaw");
        let raw = unsafe { &*bytes.as_ptr().cast::<PlayerClientPrefix>() };
        let spawn: &Spawn = raw.as_ref();
        assert_eq!(format!("{spawn:?}"), "Spawn { name: Some(\"Fippy Darkpaw\") }");
    }
}
