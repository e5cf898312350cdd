//! Header relocation: growing the chosen section and shifting every offset
//! that lies after the insertion point.

use crate::{Result, error::parse_error, image::ElfImage, locate::SectionInfo};
use elf::abi::PF_X;

/// The insertion point and inserted span computed by [`expand_section`].
///
/// Immutable once computed; the exporter consumes it to split the image into
/// the pre-insertion and post-insertion chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchPlan {
    base: u64,
    size: u64,
}

impl PatchPlan {
    /// File offset where the inserted bytes begin, immediately after the
    /// original end of the expanded section.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of bytes inserted: one unit of slack space.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Grows the chosen section by its slack amount and rewrites every header
/// offset that depends on bytes after the insertion point.
///
/// The insertion point is `base = offset + size` of the chosen section. The
/// tie-breaks at `base` differ on purpose:
/// * a section header with `sh_offset == base` is shifted (the inserted
///   content starts exactly there),
/// * a program header with `p_offset == base` keeps its offset (a segment
///   starting at the insertion point describes bytes that move as one block).
///
/// Independently, every `PF_X`-flagged program header grows its file size and
/// memory size by the slack amount, whatever its offset, because the inserted
/// bytes land at the tail of the executable segment.
///
/// After this call the header fields describe a file one slack unit larger
/// than the buffer; the byte insertion itself is deferred to the exporter.
/// Not idempotent: a second call on the same image double-shifts every
/// offset, so call it at most once per loaded image.
pub fn expand_section(image: &mut ElfImage, sinfo: &SectionInfo) -> Result<PatchPlan> {
    let base = sinfo
        .offset()
        .checked_add(sinfo.size())
        .ok_or_else(|| parse_error("section end overflows a file offset"))?;
    let plan = PatchPlan {
        base,
        size: sinfo.slack(),
    };

    log::info!("expanding {} size by {} bytes", sinfo.name(), plan.size);
    image.set_sh_size(sinfo.shndx, sinfo.size() + sinfo.slack())?;

    log::info!("adjusting section header offsets");
    for i in 0..image.e_shnum()? {
        let offset = image.sh_offset(i)?;
        if offset < base {
            continue;
        }
        image.set_sh_offset(i, offset + plan.size)?;
    }

    log::info!("adjusting program header offsets");
    for i in 0..image.e_phnum()? {
        let offset = image.p_offset(i)?;
        if offset > base {
            image.set_p_offset(i, offset + plan.size)?;
        }
        if image.p_flags(i)? & PF_X != 0 {
            let filesz = image.p_filesz(i)?;
            image.set_p_filesz(i, filesz + plan.size)?;
            let memsz = image.p_memsz(i)?;
            image.set_p_memsz(i, memsz + plan.size)?;
        }
    }

    // The table offsets go last so the loops above still address the tables
    // at their original locations.
    log::info!("adjusting ELF header offsets");
    let shoff = image.e_shoff()?;
    if shoff > base {
        image.set_e_shoff(shoff + plan.size)?;
    }
    let phoff = image.e_phoff()?;
    if phoff > base {
        image.set_e_phoff(phoff + plan.size)?;
    }

    Ok(plan)
}
