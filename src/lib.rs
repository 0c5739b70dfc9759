//! Purpose: Safe boundary between Rust plugins and the MacroQuest host process.
//! Exports: `api` (host handle, projections, config, errors), `log` (tracing sinks), `abi` (C ABI),
//!          `println!` (formatted chat line).
//! Role: Library linked into plugins; the `mqbridge` binary only inspects the compiled contract.
//! Invariants: Host memory is borrowed for one call at most; everything returned is owned.
//! Invariants: Every fallible crossing returns a typed `Error`, never a sentinel value.
mod core;

mod macros {
    /// Formats a line and writes it to host chat in the chat channel color.
    ///
    /// Takes the `Host` first and returns the write's `Result`:
    ///
    /// ```ignore
    /// mqbridge::println!(host, "loaded {} spells", count)?;
    /// ```
    #[macro_export]
    macro_rules! println {
        ($host:expr) => {
            $host.write_chat_color("", $crate::api::ChatColor::ChatChannel)
        };
        ($host:expr, $($arg:tt)*) => {
            $host.write_chat_color(
                &::std::format!($($arg)*),
                $crate::api::ChatColor::ChatChannel,
            )
        };
    }
}

pub mod abi;
pub mod api;
pub mod log;
