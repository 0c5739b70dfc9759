// Raw FFI bindings to the MacroQuest C shim.
use libc::{c_char, c_int, c_void};

/// A host-owned character buffer and its full capacity.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct mqb_text {
    pub ptr: *const c_char,
    pub cap: usize,
}

unsafe extern "C" {
    pub fn mqbridge_is_initialized() -> c_int;

    pub fn mqbridge_path(kind: c_int) -> mqb_text;

    pub fn mqbridge_write_chat_color(line: *const c_char, color: c_int);

    pub fn mqbridge_field_layout(
        record: c_int,
        out_offset: *mut usize,
        out_capacity: *mut usize,
    ) -> c_int;

    pub fn mqbridge_game_state() -> c_int;

    pub fn mqbridge_plugin_name(plugin: *const c_void, out: *mut c_char, cap: usize) -> usize;
}
