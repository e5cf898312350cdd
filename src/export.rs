//! Streaming the patched image out as a new file.

use crate::{
    Result,
    error::{parse_error, payload_too_large},
    patch::PatchPlan,
};
use alloc::vec;
use alloc::vec::Vec;

/// Byte sink the exporter streams into.
///
/// Implementations must consume the whole buffer or fail; a short write is
/// reported as a fatal I/O error, never retried.
pub trait ElfSink {
    /// Writes all of `buf` to the sink.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

impl ElfSink for Vec<u8> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

/// Streams the patched image plus the embedded payload into `sink`.
///
/// The output is `image[..base]`, then the payload, then zero padding up to
/// one slack unit, then `image[base..]`, so the result is always exactly
/// `plan.size()` bytes larger than the image. Fails with
/// [`Error::PayloadTooLarge`] before anything is written when the payload
/// exceeds the slack space. A failed export leaves the sink incomplete;
/// callers must not treat its contents as usable.
///
/// [`Error::PayloadTooLarge`]: crate::Error::PayloadTooLarge
pub fn export_image(
    image: &[u8],
    payload: &[u8],
    plan: &PatchPlan,
    sink: &mut impl ElfSink,
) -> Result<()> {
    if payload.len() as u64 > plan.size() {
        return Err(payload_too_large(payload.len(), plan.size() as usize));
    }
    let base = plan.base() as usize;
    if plan.base() > image.len() as u64 {
        return Err(parse_error("insertion point outside image"));
    }

    log::info!("writing first part of ELF (size: {base})");
    sink.write_all(&image[..base])?;

    log::info!("writing payload (size: {})", payload.len());
    sink.write_all(payload)?;

    let padsize = plan.size() as usize - payload.len();
    log::info!("writing pad to maintain page alignment (size: {padsize})");
    let pad = vec![0u8; padsize];
    sink.write_all(&pad)?;

    let remaining = image.len() - base;
    if remaining > 0 {
        log::info!("writing remaining data (size: {remaining})");
        sink.write_all(&image[base..])?;
    }
    Ok(())
}

/// Exports the patched image to a new file at `path`.
///
/// The file is created or truncated and closed on every return path.
#[cfg(unix)]
pub fn export_to_file(image: &[u8], payload: &[u8], plan: &PatchPlan, path: &str) -> Result<()> {
    log::info!("exporting patched ELF to {path}");
    let mut out = crate::os::RawFile::create(path)?;
    export_image(image, payload, plan, &mut out)
}
