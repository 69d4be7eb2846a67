use tracing::trace;

use super::map::Region;
use crate::error::{PsxError, Result};

/// Stand-in for the I/O ports that are not emulated yet. Every read returns
/// the same zeroed dummy word, every write is dropped.
pub struct Stubs {
    dummy: [u8; 4],
}

impl Stubs {
    pub fn new() -> Self {
        Stubs { dummy: [0; 4] }
    }

    pub fn read(&self, region: Region, physical: u32, length: usize) -> Result<&[u8]> {
        let value = self.dummy.get(..length).ok_or(PsxError::AccessWidth {
            address: physical,
            length,
        })?;

        trace!(
            "{} read{}: addr=0x{:08X} (stubbed)",
            region.name(),
            length * 8,
            physical
        );
        Ok(value)
    }

    pub fn write(&mut self, region: Region, physical: u32, data: &[u8]) -> Result<()> {
        if data.len() > self.dummy.len() {
            return Err(PsxError::AccessWidth {
                address: physical,
                length: data.len(),
            });
        }

        trace!(
            "{} write{}: addr=0x{:08X}, data={:02X?} (ignored)",
            region.name(),
            data.len() * 8,
            physical,
            data
        );
        Ok(())
    }
}

impl Default for Stubs {
    fn default() -> Self {
        Self::new()
    }
}
