use alloc::borrow::Cow;
use core::fmt::Display;

/// Error types used throughout the `elf_cave` library.
///
/// These represent the failure conditions of a patch run: file and mapping
/// I/O, malformed input images, and the two patch-specific conditions (no
/// expandable section, payload larger than the reserved slack space).
#[derive(Debug)]
pub enum Error {
    /// An error occurred while opening, reading, or writing files.
    ///
    /// This covers every system call on the input, payload, and output paths,
    /// including short writes during export.
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },

    /// An error occurred during memory mapping operations.
    Mmap {
        /// A descriptive message about the memory mapping error.
        msg: Cow<'static, str>,
    },

    /// The input image is not an ELF file this crate can patch, or one of its
    /// header fields points outside the image.
    Parse {
        /// A descriptive message about the parse error.
        msg: Cow<'static, str>,
    },

    /// No section was found that terminates a loadable executable segment.
    NotFound {
        /// A descriptive message about what was being located.
        msg: Cow<'static, str>,
    },

    /// The payload does not fit in the slack space reserved by the patch.
    PayloadTooLarge {
        /// Size of the payload in bytes.
        payload_size: usize,
        /// Size of the reserved slack space in bytes.
        slack: usize,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::Mmap { msg } => write!(f, "Memory mapping error: {msg}"),
            Error::Parse { msg } => write!(f, "ELF parse error: {msg}"),
            Error::NotFound { msg } => write!(f, "Locate error: {msg}"),
            Error::PayloadTooLarge { payload_size, slack } => write!(
                f,
                "payload too large: {payload_size} bytes exceeds {slack} bytes of slack space"
            ),
        }
    }
}

impl core::error::Error for Error {}

/// Creates an I/O error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

/// Creates a memory mapping error with the specified message.
#[cold]
#[inline(never)]
#[allow(unused)]
pub(crate) fn map_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Mmap { msg: msg.into() }
}

/// Creates a parse error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Parse { msg: msg.into() }
}

/// Creates a locate error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn not_found_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::NotFound { msg: msg.into() }
}

/// Creates a payload-too-large error from the offending sizes.
#[cold]
#[inline(never)]
pub(crate) fn payload_too_large(payload_size: usize, slack: usize) -> Error {
    Error::PayloadTooLarge { payload_size, slack }
}
