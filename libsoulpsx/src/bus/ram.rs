/*
    PS1 main RAM
*/

use crate::error::{PsxError, Result};

// 2MiB of main RAM
pub const RAM_SIZE: usize = 2048 * 1024;

pub struct RAM {
    bytes: Vec<u8>,
}

impl RAM {
    pub fn new() -> Self {
        RAM {
            bytes: vec![0; RAM_SIZE],
        }
    }

    pub fn read(&self, offset: u32, length: usize) -> Result<&[u8]> {
        let start = offset as usize;
        self.bytes
            .get(start..start + length)
            .ok_or(PsxError::OutOfBounds {
                device: "RAM",
                offset,
                length,
            })
    }

    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let target = self
            .bytes
            .get_mut(start..start + data.len())
            .ok_or(PsxError::OutOfBounds {
                device: "RAM",
                offset,
                length: data.len(),
            })?;

        target.copy_from_slice(data);
        Ok(())
    }
}

impl Default for RAM {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let ram = RAM::new();
        assert_eq!(ram.read(0x1000, 4).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn write_overwrites_the_whole_range() {
        let mut ram = RAM::new();
        ram.write(0x10, &[1, 2, 3, 4]).unwrap();
        ram.write(0x11, &[0xAA, 0xBB]).unwrap();
        assert_eq!(ram.read(0x10, 4).unwrap(), &[1, 0xAA, 0xBB, 4]);
    }

    #[test]
    fn accesses_are_bounds_checked() {
        let mut ram = RAM::new();
        let last = RAM_SIZE as u32 - 4;
        assert!(ram.write(last, &[1, 2, 3, 4]).is_ok());
        assert!(ram.write(last + 1, &[1, 2, 3, 4]).is_err());
        assert!(ram.read(last + 2, 4).is_err());
    }
}
