//! File mappings and output descriptors backed by libc.

use crate::{
    Result,
    error::{io_error, map_error},
    export::ElfSink,
    mmap::{MapFlags, ProtFlags},
};
use alloc::{borrow::ToOwned, ffi::CString, format, string::String};
use core::{ffi::c_void, ptr::NonNull};
use libc::{O_CREAT, O_RDONLY, O_RDWR, O_TRUNC};

/// Creation mode for exported files. Kept deliberately permissive so the
/// patched binary is executable as written.
const OUTPUT_MODE: libc::mode_t = 0o777;

/// Returns the OS page size: the unit of slack space added by a patch.
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 { 0x1000 } else { size as usize }
}

/// A private file mapping together with the descriptor backing it.
///
/// Both are released exactly once when the mapping is dropped, on every exit
/// path. The ELF side maps read-write (copy-on-write, the input file is never
/// modified); the payload side maps read-only.
pub struct FileMapping {
    name: String,
    fd: i32,
    ptr: NonNull<c_void>,
    len: usize,
    writable: bool,
}

impl FileMapping {
    /// Maps `path` copy-on-write so header patches stay local to this mapping.
    pub fn map_readwrite(path: &str) -> Result<Self> {
        log::info!("loading ELF file: {path}");
        Self::map(path, ProtFlags::PROT_READ | ProtFlags::PROT_WRITE)
    }

    /// Maps `path` read-only.
    pub fn map_readonly(path: &str) -> Result<Self> {
        log::info!("loading payload blob: {path}");
        Self::map(path, ProtFlags::PROT_READ)
    }

    fn map(path: &str, prot: ProtFlags) -> Result<Self> {
        let name = CString::new(path).map_err(|_| io_error("path contains a NUL byte"))?;
        let fd = unsafe { libc::open(name.as_ptr(), O_RDONLY) };
        if fd == -1 {
            return Err(io_error(format!("failed to open {path}")));
        }
        let mut st: libc::stat = unsafe { core::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } < 0 {
            unsafe { libc::close(fd) };
            return Err(io_error(format!("failed to get size of {path}")));
        }
        let len = st.st_size as usize;
        if len == 0 {
            unsafe { libc::close(fd) };
            return Err(io_error(format!("{path} is empty")));
        }
        let ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                prot.bits(),
                MapFlags::MAP_PRIVATE.bits(),
                fd,
                0,
            )
        };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            unsafe { libc::close(fd) };
            return Err(map_error(format!("failed to map {path}")));
        }
        Ok(Self {
            name: path.to_owned(),
            fd,
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            len,
            writable: prot.contains(ProtFlags::PROT_WRITE),
        })
    }

    /// Size of the mapped file in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The path this mapping was created from.
    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr().cast(), self.len) }
    }

    /// Mutable view of the mapping. Only valid for read-write mappings.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        debug_assert!(self.writable);
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }
}

impl Drop for FileMapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr(), self.len);
            libc::close(self.fd);
        }
    }
}

/// An output file descriptor closed on drop.
pub struct RawFile {
    name: String,
    fd: i32,
}

impl RawFile {
    /// Creates `path`, truncating any existing file.
    pub fn create(path: &str) -> Result<Self> {
        let name = CString::new(path).map_err(|_| io_error("path contains a NUL byte"))?;
        let fd = unsafe {
            libc::open(
                name.as_ptr(),
                O_RDWR | O_CREAT | O_TRUNC,
                OUTPUT_MODE as libc::c_uint,
            )
        };
        if fd == -1 {
            return Err(io_error(format!("failed to create {path}")));
        }
        Ok(Self {
            name: path.to_owned(),
            fd,
        })
    }
}

impl ElfSink for RawFile {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 || n as usize != buf.len() {
            return Err(io_error(format!("short write to {}", self.name)));
        }
        Ok(())
    }
}

impl Drop for RawFile {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}
