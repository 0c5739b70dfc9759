//! Purpose: Marshal text between host byte buffers and Rust strings.
//! Exports: `TextEncoding`, `HostStr`, `to_host_cstring`.
//! Role: The only place host bytes become `str` and caller `str` becomes host bytes.
//! Invariants: Reads stop at the end of the buffer the host handed out; no NUL inside it is an error.
//! Invariants: Outbound text with an interior NUL is rejected, never silently truncated.
//! Invariants: The encoding policy is always explicit; there is no implicit fallback between policies.
use std::borrow::Cow;
use std::ffi::CString;

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

/// How host bytes map to Rust strings and back.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// Host bytes must be valid UTF-8; anything else is an `Encoding` error.
    #[default]
    Utf8,
    /// Invalid UTF-8 sequences are replaced with U+FFFD.
    Utf8Lossy,
    /// One byte per code point (ISO-8859-1). Outbound characters above
    /// U+00FF are rejected.
    Latin1,
}

/// Borrowed view of a NUL-terminated string living in a host buffer.
///
/// The lifetime ties the view to the borrow of the buffer it came from, so
/// it cannot outlive the crossing that produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HostStr<'a> {
    bytes: &'a [u8],
}

impl<'a> HostStr<'a> {
    /// Takes the text up to the first NUL inside `buf`.
    pub fn from_buffer(buf: &'a [u8]) -> Result<Self, Error> {
        match buf.find_byte(0) {
            Some(end) => Ok(Self { bytes: &buf[..end] }),
            None => Err(Error::new(ErrorKind::Encoding).with_message(format!(
                "host string is not NUL-terminated within its {} byte buffer",
                buf.len()
            ))),
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes without copying whenever the policy allows it.
    pub fn decode(&self, encoding: TextEncoding) -> Result<Cow<'a, str>, Error> {
        match encoding {
            TextEncoding::Utf8 => self.bytes.to_str().map(Cow::Borrowed).map_err(|err| {
                Error::new(ErrorKind::Encoding)
                    .with_message("host string is not valid UTF-8")
                    .with_source(err)
            }),
            TextEncoding::Utf8Lossy => Ok(self.bytes.to_str_lossy()),
            TextEncoding::Latin1 => {
                if self.bytes.is_ascii() {
                    if let Ok(text) = self.bytes.to_str() {
                        return Ok(Cow::Borrowed(text));
                    }
                }
                Ok(Cow::Owned(
                    self.bytes.iter().copied().map(char::from).collect(),
                ))
            }
        }
    }

    /// Decodes into a fresh owned copy, detached from host memory.
    pub fn to_owned_string(&self, encoding: TextEncoding) -> Result<String, Error> {
        self.decode(encoding).map(Cow::into_owned)
    }
}

/// Converts caller text into the NUL-terminated form host entry points take.
pub fn to_host_cstring(text: &str, encoding: TextEncoding) -> Result<CString, Error> {
    let bytes = match encoding {
        TextEncoding::Utf8 | TextEncoding::Utf8Lossy => text.as_bytes().to_vec(),
        TextEncoding::Latin1 => encode_latin1(text)?,
    };
    CString::new(bytes).map_err(|err| {
        let position = err.nul_position();
        Error::new(ErrorKind::Encoding)
            .with_message(format!("text contains NUL at byte {position}"))
            .with_source(err)
    })
}

fn encode_latin1(text: &str) -> Result<Vec<u8>, Error> {
    text.chars()
        .map(|ch| {
            u8::try_from(u32::from(ch)).map_err(|_| {
                Error::new(ErrorKind::Encoding)
                    .with_message(format!("character {ch:?} has no Latin-1 encoding"))
            })
        })
        .collect()
}
