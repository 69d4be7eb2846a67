use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, PsxError>;

/// Host-level failures. Exceptions raised by the emulated program are not
/// errors and never show up here, see `r3000::cop0::Exception`.
#[derive(Error, Debug)]
pub enum PsxError {
    #[error("Input output error: {0}")]
    Io(#[from] io::Error),
    #[error("BIOS image is too short: expected {expected} bytes, got {got}")]
    BiosTooShort { expected: usize, got: usize },
    #[error("Unsupported instruction 0x{word:08X} at 0x{pc:08X}")]
    UnsupportedInstruction { pc: u32, word: u32 },
    #[error("Access to unmapped physical address 0x{physical:08X} (virtual 0x{address:08X})")]
    UnknownRegion { address: u32, physical: u32 },
    #[error("Out of bounds {device} access at offset 0x{offset:08X} ({length} bytes)")]
    OutOfBounds {
        device: &'static str,
        offset: u32,
        length: usize,
    },
    #[error("Memory regions {first} and {second} overlap")]
    OverlappingRegions {
        first: &'static str,
        second: &'static str,
    },
    #[error("Unsupported {length} byte port access at 0x{address:08X}")]
    AccessWidth { address: u32, length: usize },
}
