//! # elf_cave
//! Patch a 64-bit little-endian ELF executable to carve out a code cave and
//! embed an opaque payload blob in it, without breaking the binary's
//! loadability.
//!
//! A patch run is three stages wired in a straight line:
//! 1. [`find_expandable_section`] scans the program headers for a loadable
//!    executable segment and picks the section whose end address coincides
//!    with the segment's end.
//! 2. [`expand_section`] grows that section by one unit of slack space (an OS
//!    page) and shifts every section header, program header, and ELF header
//!    offset that lies after the insertion point.
//! 3. [`export_image`] streams the pre-insertion bytes, the payload, zero
//!    padding, and the post-insertion bytes to the output, which is always
//!    exactly one slack unit larger than the input.
//!
//! The payload is treated as an opaque byte blob; nothing is relocated or
//! rewritten beyond the three header tables.
//!
//! ## Example
//! ```no_run
//! elf_cave::patch_file("./a.out", "./payload.bin", "./a.patched").unwrap();
//! ```
//!
//! Progress is reported through the [`log`] facade; install any logger (the
//! tests use `env_logger`) to see the per-stage messages.
#![no_std]
extern crate alloc;

mod error;
mod export;
mod image;
mod locate;
pub mod mmap;
mod os;
mod patch;

pub use error::Error;
pub use export::{ElfSink, export_image};
pub use image::{ElfImage, MAX_SECTION_NAME_LEN};
pub use locate::{SectionInfo, find_expandable_section};
pub use patch::{PatchPlan, expand_section};

#[cfg(unix)]
pub use export::export_to_file;
#[cfg(unix)]
pub use os::{FileMapping, RawFile, page_size};

pub type Result<T> = core::result::Result<T, Error>;

/// Runs the in-memory patch pipeline over a caller-owned image buffer.
///
/// `bytes` is patched in place (header fields only; the buffer keeps its
/// length) and the complete output stream goes to `sink`. `slack` is the
/// amount of space reserved for the payload, one OS page in the file
/// pipeline. Returns the plan so callers can find the inserted span in the
/// output.
pub fn patch_bytes(
    bytes: &mut [u8],
    payload: &[u8],
    slack: u64,
    sink: &mut impl ElfSink,
) -> Result<PatchPlan> {
    let plan = {
        let mut image = ElfImage::parse(bytes)?;
        let sinfo = find_expandable_section(&image, slack)?;
        expand_section(&mut image, &sinfo)?
    };
    export_image(bytes, payload, &plan, sink)?;
    Ok(plan)
}

/// Patches the ELF at `elf_path` with the contents of `payload_path` and
/// writes the result to `out_path`.
///
/// The ELF is mapped copy-on-write (the input file is never modified) and
/// the payload read-only; both mappings and the output descriptor are
/// released on every return path, success or failure. The slack added is one
/// OS page, so the output file is always one page larger than the input. A
/// run that returns an error has not produced a usable output file.
#[cfg(unix)]
pub fn patch_file(elf_path: &str, payload_path: &str, out_path: &str) -> Result<()> {
    let mut elf = FileMapping::map_readwrite(elf_path)?;
    let payload = FileMapping::map_readonly(payload_path)?;
    let slack = page_size() as u64;
    let plan = {
        let mut image = ElfImage::parse(elf.as_mut_slice())?;
        let sinfo = find_expandable_section(&image, slack)?;
        expand_section(&mut image, &sinfo)?
    };
    export_to_file(elf.as_slice(), payload.as_slice(), &plan, out_path)
}
