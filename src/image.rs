//! Bounds-checked field access over a raw ELF64 image.
//!
//! The patcher never materializes header structs or hands out pointers into
//! the image. Every header field is read and written through an accessor that
//! takes the image buffer and a byte offset, so all mutations land in the one
//! buffer and all access is bounds checked.

use crate::{Result, error::parse_error};
use alloc::string::String;
use elf::abi::{
    EI_CLASS, EI_DATA, EI_VERSION, ELFCLASS64, ELFDATA2LSB, ELFMAGIC, EV_CURRENT, SHN_UNDEF,
};

/// Size of the ELF64 file header.
pub(crate) const EHDR_SIZE: usize = 64;
/// Smallest program header entry the patcher accepts.
const PHDR_SIZE: usize = 56;
/// Smallest section header entry the patcher accepts.
const SHDR_SIZE: usize = 64;

// ELF64 header field offsets.
const E_PHOFF: usize = 32;
const E_SHOFF: usize = 40;
const E_PHENTSIZE: usize = 54;
const E_PHNUM: usize = 56;
const E_SHENTSIZE: usize = 58;
const E_SHNUM: usize = 60;
const E_SHSTRNDX: usize = 62;

// ELF64 program header field offsets.
const P_TYPE: usize = 0;
const P_FLAGS: usize = 4;
const P_OFFSET: usize = 8;
const P_VADDR: usize = 16;
const P_FILESZ: usize = 32;
const P_MEMSZ: usize = 40;

// ELF64 section header field offsets.
const SH_NAME: usize = 0;
const SH_ADDR: usize = 16;
const SH_OFFSET: usize = 24;
const SH_SIZE: usize = 32;

/// Longest section name copied out of the string table; longer names are
/// truncated, never overflowed.
pub const MAX_SECTION_NAME_LEN: usize = 32;

/// A mutable view of a complete ELF file held in one byte buffer.
///
/// The buffer is never reallocated or resized; a patch changes header fields
/// in place and the size growth only exists in the exporter's output stream.
#[derive(Debug)]
pub struct ElfImage<'bytes> {
    bytes: &'bytes mut [u8],
}

impl<'bytes> ElfImage<'bytes> {
    /// Wraps a raw image after validating the ELF identification bytes.
    ///
    /// Only 64-bit little-endian images are accepted.
    pub fn parse(bytes: &'bytes mut [u8]) -> Result<Self> {
        if bytes.len() < EHDR_SIZE {
            return Err(parse_error("image shorter than an ELF64 header"));
        }
        if bytes[0..4] != ELFMAGIC {
            return Err(parse_error("invalid ELF magic"));
        }
        if bytes[EI_CLASS] != ELFCLASS64 {
            return Err(parse_error("not a 64-bit ELF file"));
        }
        if bytes[EI_DATA] != ELFDATA2LSB {
            return Err(parse_error("not a little-endian ELF file"));
        }
        if bytes[EI_VERSION] != EV_CURRENT {
            return Err(parse_error("invalid ELF version"));
        }
        Ok(Self { bytes })
    }

    /// Total size of the image in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read-only view of the full image.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        let bytes = self
            .bytes
            .get(offset..offset + 2)
            .ok_or_else(|| parse_error("field offset outside image"))?;
        Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        let bytes = self
            .bytes
            .get(offset..offset + 4)
            .ok_or_else(|| parse_error("field offset outside image"))?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&self, offset: usize) -> Result<u64> {
        let bytes = self
            .bytes
            .get(offset..offset + 8)
            .ok_or_else(|| parse_error("field offset outside image"))?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn write_u64(&mut self, offset: usize, value: u64) -> Result<()> {
        let bytes = self
            .bytes
            .get_mut(offset..offset + 8)
            .ok_or_else(|| parse_error("field offset outside image"))?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub(crate) fn e_phoff(&self) -> Result<u64> {
        self.read_u64(E_PHOFF)
    }

    pub(crate) fn set_e_phoff(&mut self, value: u64) -> Result<()> {
        self.write_u64(E_PHOFF, value)
    }

    pub(crate) fn e_shoff(&self) -> Result<u64> {
        self.read_u64(E_SHOFF)
    }

    pub(crate) fn set_e_shoff(&mut self, value: u64) -> Result<()> {
        self.write_u64(E_SHOFF, value)
    }

    pub(crate) fn e_phnum(&self) -> Result<usize> {
        Ok(self.read_u16(E_PHNUM)? as usize)
    }

    pub(crate) fn e_shnum(&self) -> Result<usize> {
        Ok(self.read_u16(E_SHNUM)? as usize)
    }

    fn e_phentsize(&self) -> Result<usize> {
        Ok(self.read_u16(E_PHENTSIZE)? as usize)
    }

    fn e_shentsize(&self) -> Result<usize> {
        Ok(self.read_u16(E_SHENTSIZE)? as usize)
    }

    fn e_shstrndx(&self) -> Result<u16> {
        self.read_u16(E_SHSTRNDX)
    }

    /// Byte offset of program header `index`, checked against the image.
    fn phdr_at(&self, index: usize) -> Result<usize> {
        let entsize = self.e_phentsize()?;
        if entsize < PHDR_SIZE {
            return Err(parse_error("program header entry too small"));
        }
        let start = (self.e_phoff()? as usize)
            .checked_add(
                index
                    .checked_mul(entsize)
                    .ok_or_else(|| parse_error("program header table overflow"))?,
            )
            .ok_or_else(|| parse_error("program header table overflow"))?;
        if start.checked_add(entsize).is_none_or(|end| end > self.bytes.len()) {
            return Err(parse_error("program header outside image"));
        }
        Ok(start)
    }

    /// Byte offset of section header `index`, checked against the image.
    fn shdr_at(&self, index: usize) -> Result<usize> {
        let entsize = self.e_shentsize()?;
        if entsize < SHDR_SIZE {
            return Err(parse_error("section header entry too small"));
        }
        let start = (self.e_shoff()? as usize)
            .checked_add(
                index
                    .checked_mul(entsize)
                    .ok_or_else(|| parse_error("section header table overflow"))?,
            )
            .ok_or_else(|| parse_error("section header table overflow"))?;
        if start.checked_add(entsize).is_none_or(|end| end > self.bytes.len()) {
            return Err(parse_error("section header outside image"));
        }
        Ok(start)
    }

    pub(crate) fn p_type(&self, index: usize) -> Result<u32> {
        self.read_u32(self.phdr_at(index)? + P_TYPE)
    }

    pub(crate) fn p_flags(&self, index: usize) -> Result<u32> {
        self.read_u32(self.phdr_at(index)? + P_FLAGS)
    }

    pub(crate) fn p_offset(&self, index: usize) -> Result<u64> {
        self.read_u64(self.phdr_at(index)? + P_OFFSET)
    }

    pub(crate) fn set_p_offset(&mut self, index: usize, value: u64) -> Result<()> {
        let at = self.phdr_at(index)?;
        self.write_u64(at + P_OFFSET, value)
    }

    pub(crate) fn p_vaddr(&self, index: usize) -> Result<u64> {
        self.read_u64(self.phdr_at(index)? + P_VADDR)
    }

    pub(crate) fn p_filesz(&self, index: usize) -> Result<u64> {
        self.read_u64(self.phdr_at(index)? + P_FILESZ)
    }

    pub(crate) fn set_p_filesz(&mut self, index: usize, value: u64) -> Result<()> {
        let at = self.phdr_at(index)?;
        self.write_u64(at + P_FILESZ, value)
    }

    pub(crate) fn p_memsz(&self, index: usize) -> Result<u64> {
        self.read_u64(self.phdr_at(index)? + P_MEMSZ)
    }

    pub(crate) fn set_p_memsz(&mut self, index: usize, value: u64) -> Result<()> {
        let at = self.phdr_at(index)?;
        self.write_u64(at + P_MEMSZ, value)
    }

    fn sh_name(&self, index: usize) -> Result<u32> {
        self.read_u32(self.shdr_at(index)? + SH_NAME)
    }

    pub(crate) fn sh_addr(&self, index: usize) -> Result<u64> {
        self.read_u64(self.shdr_at(index)? + SH_ADDR)
    }

    pub(crate) fn sh_offset(&self, index: usize) -> Result<u64> {
        self.read_u64(self.shdr_at(index)? + SH_OFFSET)
    }

    pub(crate) fn set_sh_offset(&mut self, index: usize, value: u64) -> Result<()> {
        let at = self.shdr_at(index)?;
        self.write_u64(at + SH_OFFSET, value)
    }

    pub(crate) fn sh_size(&self, index: usize) -> Result<u64> {
        self.read_u64(self.shdr_at(index)? + SH_SIZE)
    }

    pub(crate) fn set_sh_size(&mut self, index: usize, value: u64) -> Result<()> {
        let at = self.shdr_at(index)?;
        self.write_u64(at + SH_SIZE, value)
    }

    /// Copies the name of section `index` out of the section-header string
    /// table, truncated to [`MAX_SECTION_NAME_LEN`] bytes.
    pub(crate) fn section_name(&self, index: usize) -> Result<String> {
        let shstrndx = self.e_shstrndx()?;
        if shstrndx == SHN_UNDEF {
            return Ok(String::new());
        }
        let strtab_off = self.sh_offset(shstrndx as usize)? as usize;
        let strtab_size = self.sh_size(shstrndx as usize)? as usize;
        let name_off = self.sh_name(index)? as usize;
        if name_off >= strtab_size {
            return Err(parse_error("section name outside string table"));
        }
        let start = strtab_off
            .checked_add(name_off)
            .ok_or_else(|| parse_error("string table overflow"))?;
        let end = strtab_off
            .checked_add(strtab_size)
            .ok_or_else(|| parse_error("string table overflow"))?;
        let tail = self
            .bytes
            .get(start..end)
            .ok_or_else(|| parse_error("string table outside image"))?;
        let name = &tail[..tail.iter().position(|&b| b == 0).unwrap_or(tail.len())];
        let name = &name[..name.len().min(MAX_SECTION_NAME_LEN)];
        Ok(String::from_utf8_lossy(name).into_owned())
    }
}
