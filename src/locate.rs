//! Locating the section that terminates a loadable executable segment.

use crate::{Result, error::not_found_error, image::ElfImage};
use alloc::string::String;
use elf::abi::{PF_X, PT_LOAD};

/// The section chosen for expansion.
///
/// Holds the section-header table index rather than copies of the header
/// fields; the relocator mutates the header through [`ElfImage`] setters at
/// this index, so the change is visible in the image buffer itself. The
/// offset and size recorded here are the pre-patch values.
#[derive(Debug)]
pub struct SectionInfo {
    name: String,
    pub(crate) shndx: usize,
    offset: u64,
    size: u64,
    slack: u64,
}

impl SectionInfo {
    /// Section name, truncated to [`MAX_SECTION_NAME_LEN`].
    ///
    /// [`MAX_SECTION_NAME_LEN`]: crate::MAX_SECTION_NAME_LEN
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File offset of the section before the patch.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the section before the patch.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Slack space the patch will add to the section.
    pub fn slack(&self) -> u64 {
        self.slack
    }
}

/// Finds the section whose end address coincides with the end of a loadable
/// executable segment.
///
/// Every `PT_LOAD` program header flagged `PF_X` is evaluated; for each, the
/// section header table is scanned for a section with
/// `sh_addr + sh_size == p_vaddr + p_memsz`. When several sections qualify
/// the last match in header-table order wins, so callers that need a single
/// deterministic candidate should validate that exactly one executable
/// segment exists. Returns [`Error::NotFound`] when no section qualifies.
///
/// [`Error::NotFound`]: crate::Error::NotFound
pub fn find_expandable_section(image: &ElfImage, slack: u64) -> Result<SectionInfo> {
    let mut found = None;
    for i in 0..image.e_phnum()? {
        if image.p_type(i)? != PT_LOAD || image.p_flags(i)? & PF_X == 0 {
            continue;
        }
        let segment_end = image.p_vaddr(i)?.wrapping_add(image.p_memsz(i)?);
        log::info!(
            "found executable segment at {:#010x} (size: {:#010x})",
            image.p_offset(i)?,
            image.p_memsz(i)?
        );
        for j in 0..image.e_shnum()? {
            if image.sh_addr(j)?.wrapping_add(image.sh_size(j)?) != segment_end {
                continue;
            }
            let name = image.section_name(j)?;
            log::debug!("candidate section {name} ends the segment");
            found = Some(SectionInfo {
                name,
                shndx: j,
                offset: image.sh_offset(j)?,
                size: image.sh_size(j)?,
                slack,
            });
        }
    }
    found.ok_or_else(|| not_found_error("no section terminates an executable segment"))
}
