#![allow(dead_code)]
//! Synthetic ELF64 executable shared by the integration tests.
//!
//! File layout (offsets in hex):
//! ```text
//! 0000  ELF header
//! 0040  program headers: PT_LOAD R+X  offset 1000, vaddr 401000, size 200
//!                        PT_LOAD R+W  offset 1200, vaddr 402200, size 100
//! 1000  .text     (addr 401000, size 200)  <- ends the executable segment
//! 1200  .data     (addr 402200, size 100)  <- starts at the insertion point
//! 1400  .shstrtab
//! 1500  section headers: null, .text, .data, .shstrtab
//! 1600  end of file
//! ```
//! The insertion point computed from `.text` is 0x1200. The R+W segment
//! starts exactly there, probing the program-header tie-break.

pub const TEXT_OFF: u64 = 0x1000;
pub const TEXT_SIZE: u64 = 0x200;
pub const TEXT_ADDR: u64 = 0x401000;
pub const BASE: u64 = TEXT_OFF + TEXT_SIZE;
pub const DATA_OFF: u64 = 0x1200;
pub const DATA_SIZE: u64 = 0x100;
pub const DATA_ADDR: u64 = 0x402200;
pub const SHSTRTAB_OFF: u64 = 0x1400;
pub const SHOFF: u64 = 0x1500;
pub const FILE_SIZE: usize = 0x1600;

/// Slack used by the tests in place of the runtime page size.
pub const SLACK: u64 = 0x1000;

/// Buffer offset of program header `i`.
pub const fn ph(i: usize) -> usize {
    0x40 + i * 56
}

/// Buffer offset of section header `i`.
pub const fn sh(i: usize) -> usize {
    SHOFF as usize + i * 64
}

pub const SHSTRTAB_NAMES: &[u8] = b"\0.text\0.data\0.shstrtab\0";

pub fn put16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn put32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn put64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

pub fn get16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
}

pub fn get32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

pub fn get64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn build_fixture() -> Vec<u8> {
    let mut b = vec![0u8; FILE_SIZE];

    // ELF header
    b[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    b[4] = 2; // ELFCLASS64
    b[5] = 1; // ELFDATA2LSB
    b[6] = 1; // EV_CURRENT
    put16(&mut b, 16, 2); // e_type = ET_EXEC
    put16(&mut b, 18, 62); // e_machine = EM_X86_64
    put32(&mut b, 20, 1); // e_version
    put64(&mut b, 24, TEXT_ADDR); // e_entry
    put64(&mut b, 32, 0x40); // e_phoff
    put64(&mut b, 40, SHOFF); // e_shoff
    put16(&mut b, 52, 64); // e_ehsize
    put16(&mut b, 54, 56); // e_phentsize
    put16(&mut b, 56, 2); // e_phnum
    put16(&mut b, 58, 64); // e_shentsize
    put16(&mut b, 60, 4); // e_shnum
    put16(&mut b, 62, 3); // e_shstrndx

    // PT_LOAD R+X covering .text
    put32(&mut b, ph(0), 1); // PT_LOAD
    put32(&mut b, ph(0) + 4, 0x5); // PF_R | PF_X
    put64(&mut b, ph(0) + 8, TEXT_OFF);
    put64(&mut b, ph(0) + 16, TEXT_ADDR);
    put64(&mut b, ph(0) + 24, TEXT_ADDR);
    put64(&mut b, ph(0) + 32, TEXT_SIZE);
    put64(&mut b, ph(0) + 40, TEXT_SIZE);
    put64(&mut b, ph(0) + 48, 0x1000);

    // PT_LOAD R+W starting exactly at the insertion point
    put32(&mut b, ph(1), 1); // PT_LOAD
    put32(&mut b, ph(1) + 4, 0x6); // PF_R | PF_W
    put64(&mut b, ph(1) + 8, DATA_OFF);
    put64(&mut b, ph(1) + 16, DATA_ADDR);
    put64(&mut b, ph(1) + 24, DATA_ADDR);
    put64(&mut b, ph(1) + 32, DATA_SIZE);
    put64(&mut b, ph(1) + 40, DATA_SIZE);
    put64(&mut b, ph(1) + 48, 0x1000);

    // Section contents carry recognizable patterns so byte-exact round-trip
    // checks catch any misplaced chunk.
    for (i, byte) in b[TEXT_OFF as usize..(TEXT_OFF + TEXT_SIZE) as usize]
        .iter_mut()
        .enumerate()
    {
        *byte = (i % 251) as u8;
    }
    for byte in b[DATA_OFF as usize..(DATA_OFF + DATA_SIZE) as usize].iter_mut() {
        *byte = 0xAB;
    }

    b[SHSTRTAB_OFF as usize..SHSTRTAB_OFF as usize + SHSTRTAB_NAMES.len()]
        .copy_from_slice(SHSTRTAB_NAMES);

    // Section headers; entry 0 stays all zeros (SHT_NULL).
    put32(&mut b, sh(1), 1); // sh_name ".text"
    put32(&mut b, sh(1) + 4, 1); // SHT_PROGBITS
    put64(&mut b, sh(1) + 8, 0x6); // SHF_ALLOC | SHF_EXECINSTR
    put64(&mut b, sh(1) + 16, TEXT_ADDR);
    put64(&mut b, sh(1) + 24, TEXT_OFF);
    put64(&mut b, sh(1) + 32, TEXT_SIZE);
    put64(&mut b, sh(1) + 48, 16); // sh_addralign

    put32(&mut b, sh(2), 7); // sh_name ".data"
    put32(&mut b, sh(2) + 4, 1); // SHT_PROGBITS
    put64(&mut b, sh(2) + 8, 0x3); // SHF_WRITE | SHF_ALLOC
    put64(&mut b, sh(2) + 16, DATA_ADDR);
    put64(&mut b, sh(2) + 24, DATA_OFF);
    put64(&mut b, sh(2) + 32, DATA_SIZE);
    put64(&mut b, sh(2) + 48, 8);

    put32(&mut b, sh(3), 13); // sh_name ".shstrtab"
    put32(&mut b, sh(3) + 4, 3); // SHT_STRTAB
    put64(&mut b, sh(3) + 24, SHSTRTAB_OFF);
    put64(&mut b, sh(3) + 32, SHSTRTAB_NAMES.len() as u64);
    put64(&mut b, sh(3) + 48, 1);

    b
}
