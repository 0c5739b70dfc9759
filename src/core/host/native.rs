//! Purpose: `HostApi` over the linked MacroQuest build.
//! Role: Only compiled with the `host` feature; every call is one shim call.
//! Invariants: Path slices span exactly the buffer the shim reports for the global.
use std::ffi::CStr;
use libc::c_int;

use super::sys;
use super::{HostApi, PathKind};
use crate::core::record::{FieldLayout, PluginDescriptorPrefix, RecordKind};

/// The live host process this library is loaded into.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeHost {
    _private: (),
}

impl NativeHost {
    /// # Safety
    ///
    /// Must only be constructed inside a process where the MacroQuest shim is linked
    /// and the host's globals are live for the rest of the process.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl HostApi for NativeHost {
    fn is_initialized(&self) -> bool {
        unsafe { sys::mqbridge_is_initialized() != 0 }
    }

    fn path_buffer(&self, kind: PathKind) -> Option<&[u8]> {
        let text = unsafe { sys::mqbridge_path(kind.code() as c_int) };
        if text.ptr.is_null() || text.cap == 0 {
            return None;
        }
        // Path globals are fixed arrays that live for the whole process.
        Some(unsafe { std::slice::from_raw_parts(text.ptr.cast::<u8>(), text.cap) })
    }

    fn write_chat_color(&self, line: &CStr, color: i32) {
        unsafe { sys::mqbridge_write_chat_color(line.as_ptr(), color as c_int) }
    }

    fn field_layout(&self, record: RecordKind) -> Option<FieldLayout> {
        let mut offset = 0usize;
        let mut capacity = 0usize;
        let rc = unsafe {
            sys::mqbridge_field_layout(record.code() as c_int, &mut offset, &mut capacity)
        };
        (rc == 0).then_some(FieldLayout { offset, capacity })
    }

    fn game_state(&self) -> Option<i32> {
        Some(unsafe { sys::mqbridge_game_state() })
    }

    unsafe fn plugin_name(&self, plugin: *const PluginDescriptorPrefix) -> Option<Vec<u8>> {
        let plugin = plugin.cast::<libc::c_void>();
        let len = unsafe { sys::mqbridge_plugin_name(plugin, std::ptr::null_mut(), 0) };
        let mut buf = vec![0u8; len + 1];
        // `name` is a host string, not a fixed field; the shim copies it out.
        let copied = unsafe {
            sys::mqbridge_plugin_name(plugin, buf.as_mut_ptr().cast(), buf.len())
        };
        buf.truncate(copied.min(len) + 1);
        Some(buf)
    }
}
