//! Purpose: C ABI over the host boundary for non-Rust plugin code.
//! Exports: `mqb_*` path, chat and record-name functions plus buffer/error helpers.
//! Role: Stable ABI surface; each export is a thin wrapper over a generic `Host` call.
//! Invariants: Every pointer argument is null-checked; failures return -1 with an `mqb_error`.
//! Invariants: Strings out are UTF-8 byte buffers owned by the caller until `mqb_buf_free`.
//! Invariants: Error kinds map 1:1 with core error kinds.
//! Notes: Host-backed exports exist only with the `host` feature. The first call pins the
//!        host thread, so it must come from plugin initialization.
#![allow(non_camel_case_types)]
#![cfg_attr(not(feature = "host"), allow(dead_code))]

use std::ffi::{CStr, CString};
use std::ptr;

use libc::{c_char, c_void};

use crate::core::chat::ChatColor;
use crate::core::error::{Error, ErrorKind, to_exit_code};
use crate::core::host::{Host, HostApi, PathKind};
use crate::core::record::{GroundItemPrefix, PlayerClientPrefix, PluginDescriptorPrefix};
use crate::core::text::HostStr;

#[repr(C)]
pub struct mqb_buf {
    data: *mut u8,
    len: usize,
}

#[repr(C)]
pub struct mqb_error {
    kind: i32,
    message: *mut c_char,
    record: *mut c_char,
}

#[cfg(feature = "host")]
mod exports {
    use std::sync::OnceLock;

    use libc::{c_char, c_void};

    use super::{mqb_buf, mqb_error};
    use crate::core::host::{Host, NativeHost};

    fn native_host() -> &'static Host<NativeHost> {
        static HOST: OnceLock<Host<NativeHost>> = OnceLock::new();
        // Safety: this library is only built with `host` when loaded into MacroQuest.
        HOST.get_or_init(|| Host::new(unsafe { NativeHost::new() }))
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn mqb_path(
        kind: i32,
        out_path: *mut mqb_buf,
        out_err: *mut *mut mqb_error,
    ) -> i32 {
        super::path(native_host(), kind, out_path, out_err)
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn mqb_write_chat(
        line: *const c_char,
        color: i32,
        out_err: *mut *mut mqb_error,
    ) -> i32 {
        unsafe { super::write_chat(native_host(), line, color, out_err) }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn mqb_spawn_name(
        spawn: *const c_void,
        out_name: *mut mqb_buf,
        out_err: *mut *mut mqb_error,
    ) -> i32 {
        unsafe { super::spawn_name(native_host(), spawn, out_name, out_err) }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn mqb_ground_item_name(
        item: *const c_void,
        out_name: *mut mqb_buf,
        out_err: *mut *mut mqb_error,
    ) -> i32 {
        unsafe { super::ground_item_name(native_host(), item, out_name, out_err) }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn mqb_plugin_name(
        plugin: *const c_void,
        out_name: *mut mqb_buf,
        out_err: *mut *mut mqb_error,
    ) -> i32 {
        unsafe { super::plugin_name(native_host(), plugin, out_name, out_err) }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn mqb_buf_free(buf: *mut mqb_buf) {
    if buf.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *buf;
        if !buf.data.is_null() && buf.len != 0 {
            drop(Vec::from_raw_parts(buf.data, buf.len, buf.len));
        }
        buf.data = ptr::null_mut();
        buf.len = 0;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn mqb_error_free(err: *mut mqb_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
        if !err.record.is_null() {
            drop(CString::from_raw(err.record));
        }
    }
}

pub(crate) fn path<A: HostApi>(
    host: &Host<A>,
    kind: i32,
    out_path: *mut mqb_buf,
    out_err: *mut *mut mqb_error,
) -> i32 {
    let Some(kind) = PathKind::from_code(kind) else {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message(format!("unknown path kind {kind}")),
        );
    };
    match host.path(kind).and_then(|path| write_buf(out_path, path)) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// # Safety
///
/// A non-null `line` must be a NUL-terminated string.
pub(crate) unsafe fn write_chat<A: HostApi>(
    host: &Host<A>,
    line: *const c_char,
    color: i32,
    out_err: *mut *mut mqb_error,
) -> i32 {
    if line.is_null() {
        return fail(out_err, Error::new(ErrorKind::Usage).with_message("line is null"));
    }
    let line = unsafe { CStr::from_ptr(line) };
    let result = HostStr::from_buffer(line.to_bytes_with_nul())
        .and_then(|text| text.decode(host.encoding()))
        .and_then(|text| host.write_chat_color(&text, ChatColor::from(color)));
    match result {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// # Safety
///
/// A non-null `spawn` must reference a live `PlayerClient`.
pub(crate) unsafe fn spawn_name<A: HostApi>(
    host: &Host<A>,
    spawn: *const c_void,
    out_name: *mut mqb_buf,
    out_err: *mut *mut mqb_error,
) -> i32 {
    let name = unsafe { host.spawn_name(spawn.cast::<PlayerClientPrefix>()) };
    finish_name(name, out_name, out_err)
}

/// # Safety
///
/// A non-null `item` must reference a live `EQGroundItem`.
pub(crate) unsafe fn ground_item_name<A: HostApi>(
    host: &Host<A>,
    item: *const c_void,
    out_name: *mut mqb_buf,
    out_err: *mut *mut mqb_error,
) -> i32 {
    let name = unsafe { host.ground_item_name(item.cast::<GroundItemPrefix>()) };
    finish_name(name, out_name, out_err)
}

/// # Safety
///
/// A non-null `plugin` must reference a registered `MQPlugin`.
pub(crate) unsafe fn plugin_name<A: HostApi>(
    host: &Host<A>,
    plugin: *const c_void,
    out_name: *mut mqb_buf,
    out_err: *mut *mut mqb_error,
) -> i32 {
    let name = unsafe { host.plugin_name(plugin.cast::<PluginDescriptorPrefix>()) };
    finish_name(name, out_name, out_err)
}

fn finish_name(
    name: Result<String, Error>,
    out_name: *mut mqb_buf,
    out_err: *mut *mut mqb_error,
) -> i32 {
    match name.and_then(|name| write_buf(out_name, name)) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

fn write_buf(out: *mut mqb_buf, text: String) -> Result<(), Error> {
    if out.is_null() {
        return Err(Error::new(ErrorKind::Usage).with_message("output buffer is null"));
    }
    unsafe {
        let buf = &mut *out;
        let mut data = text.into_bytes().into_boxed_slice();
        buf.len = data.len();
        buf.data = if data.is_empty() {
            ptr::null_mut()
        } else {
            data.as_mut_ptr()
        };
        std::mem::forget(data);
    }
    Ok(())
}

fn fail(out_err: *mut *mut mqb_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(mqb_error {
        kind: to_exit_code(err.kind()),
        message: to_c_string(&err.to_string()),
        record: err.record().map(to_c_string).unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}
