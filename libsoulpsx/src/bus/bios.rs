/*
    PS1 BIOS Structure
*/

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{PsxError, Result};

// BIOS Size is 512KiB
pub const BIOS_SIZE: usize = 512 * 1024;

#[derive(Clone)]
pub struct BIOS {
    // BIOS bytes loaded off from a storage device
    bytes: Vec<u8>,
}

impl BIOS {
    pub fn new(path: &Path) -> Result<BIOS> {
        let data: Vec<u8> = fs::read(path)?;
        info!("Loaded BIOS image {} ({} bytes)", path.display(), data.len());
        BIOS::from_bytes(data)
    }

    /// Builds the ROM out of an already loaded image. Images shorter than the
    /// ROM are rejected, longer ones are truncated.
    pub fn from_bytes(mut data: Vec<u8>) -> Result<BIOS> {
        if data.len() < BIOS_SIZE {
            return Err(PsxError::BiosTooShort {
                expected: BIOS_SIZE,
                got: data.len(),
            });
        }

        if data.len() > BIOS_SIZE {
            warn!(
                "BIOS image is {} bytes, ignoring everything past 0x{:X}",
                data.len(),
                BIOS_SIZE
            );
            data.truncate(BIOS_SIZE);
        }

        Ok(BIOS { bytes: data })
    }

    /// Lays out little-endian instruction words at the start of an otherwise
    /// zeroed ROM.
    pub fn from_words(words: &[u32]) -> BIOS {
        let mut bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        bytes.resize(BIOS_SIZE, 0);

        BIOS { bytes }
    }

    pub fn read(&self, offset: u32, length: usize) -> Result<&[u8]> {
        let start = offset as usize;
        self.bytes
            .get(start..start + length)
            .ok_or(PsxError::OutOfBounds {
                device: "BIOS",
                offset,
                length,
            })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
