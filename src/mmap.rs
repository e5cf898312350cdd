//! Protection and mapping flags for the file mappings.
//!
//! The numeric values match the unix ABI and are handed to `mmap` directly.

use bitflags::bitflags;
use core::ffi::c_int;

bitflags! {
    /// Memory protection flags applied to a file mapping.
    #[derive(Clone, Copy, Debug)]
    pub struct ProtFlags: c_int {
        /// Allow reading from the mapped region.
        const PROT_READ = 1;

        /// Allow writing to the mapped region.
        const PROT_WRITE = 2;
    }
}

bitflags! {
    /// Mapping configuration flags.
    #[derive(Clone, Copy)]
    pub struct MapFlags: c_int {
        /// Private copy-on-write mapping; changes never reach the backing file.
        const MAP_PRIVATE = 2;
    }
}
