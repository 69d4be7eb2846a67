pub mod bios;
pub mod ram;
mod stubs;

use bios::BIOS;
use ram::RAM;
use stubs::Stubs;
use tracing::{error, info, warn};

use crate::error::{PsxError, Result};
use crate::gpu::GPU;

use map::Region;

pub mod map {
    use crate::error::{PsxError, Result};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Range(pub u32, pub u32);

    impl Range {
        pub fn contains(self, addr: u32) -> Option<u32> {
            let Range(start, length) = self;
            let offset = addr.wrapping_sub(start);
            if offset < length {
                Some(offset)
            } else {
                None
            }
        }

        pub fn start(self) -> u32 {
            self.0
        }

        /// One past the last address, widened so the top of the address
        /// space does not wrap.
        pub fn end(self) -> u64 {
            self.0 as u64 + self.1 as u64
        }
    }

    // Physical address ranges
    pub const RAM:            Range = Range(0x0000_0000, 2048 * 1024);
    pub const EXPANSION_1:    Range = Range(0x1F00_0000, 1024 * 1024);
    pub const MEM_CONTROL_1:  Range = Range(0x1F80_1000, 0x24);
    pub const MEM_CONTROL_2:  Range = Range(0x1F80_1060, 4);
    pub const IRQ_CONTROL:    Range = Range(0x1F80_1070, 8);
    pub const DMA:            Range = Range(0x1F80_1080, 0x80);
    pub const TIMERS:         Range = Range(0x1F80_1100, 0x2C);
    pub const GPU:            Range = Range(0x1F80_1810, 8);
    pub const SPU:            Range = Range(0x1F80_1C00, 0x280);
    pub const EXPANSION_2:    Range = Range(0x1F80_2000, 0x80);
    pub const BIOS:           Range = Range(0x1FC0_0000, 512 * 1024);
    pub const CACHE_CONTROL:  Range = Range(0xFFFE_0130, 4);

    // Masks indexed by the top 3 bits of the virtual address:
    // KUSEG (2GiB), KSEG0 (512MiB), KSEG1 (512MiB), KSEG2 (1GiB)
    const REGION_MASK: [u32; 8] = [
        0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, 0xFFFF_FFFF,
        0x7FFF_FFFF,
        0x1FFF_FFFF,
        0xFFFF_FFFF, 0xFFFF_FFFF,
    ];

    pub fn to_physical_address(virtual_address: u32) -> u32 {
        let segment = (virtual_address >> 29) as usize;
        virtual_address & REGION_MASK[segment]
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum Region {
        Bios,
        Ram,
        Gpu,
        IrqControl,
        Timers,
        Dma,
        CacheControl,
        Expansion1,
        Expansion2,
        MemControl1,
        MemControl2,
        Spu,
        Unknown,
    }

    impl Region {
        /// Every mapped region, in ascending address order.
        pub const MAPPED: [Region; 12] = [
            Region::Ram,
            Region::Expansion1,
            Region::MemControl1,
            Region::MemControl2,
            Region::IrqControl,
            Region::Dma,
            Region::Timers,
            Region::Gpu,
            Region::Spu,
            Region::Expansion2,
            Region::Bios,
            Region::CacheControl,
        ];

        pub fn range(self) -> Option<Range> {
            match self {
                Region::Bios => Some(BIOS),
                Region::Ram => Some(RAM),
                Region::Gpu => Some(GPU),
                Region::IrqControl => Some(IRQ_CONTROL),
                Region::Timers => Some(TIMERS),
                Region::Dma => Some(DMA),
                Region::CacheControl => Some(CACHE_CONTROL),
                Region::Expansion1 => Some(EXPANSION_1),
                Region::Expansion2 => Some(EXPANSION_2),
                Region::MemControl1 => Some(MEM_CONTROL_1),
                Region::MemControl2 => Some(MEM_CONTROL_2),
                Region::Spu => Some(SPU),
                Region::Unknown => None,
            }
        }

        pub fn name(self) -> &'static str {
            match self {
                Region::Bios => "BIOS",
                Region::Ram => "RAM",
                Region::Gpu => "GPU",
                Region::IrqControl => "IRQ control",
                Region::Timers => "Timers",
                Region::Dma => "DMA",
                Region::CacheControl => "Cache control",
                Region::Expansion1 => "Expansion 1",
                Region::Expansion2 => "Expansion 2",
                Region::MemControl1 => "Memory control 1",
                Region::MemControl2 => "Memory control 2",
                Region::Spu => "SPU",
                Region::Unknown => "Unknown",
            }
        }

        /// Finds the region claiming a physical address along with the
        /// offset into it.
        pub fn locate(physical: u32) -> (Region, u32) {
            Region::MAPPED
                .iter()
                .find_map(|&region| {
                    region
                        .range()
                        .and_then(|range| range.contains(physical))
                        .map(|offset| (region, offset))
                })
                .unwrap_or((Region::Unknown, physical))
        }
    }

    /// Checks that no two mapped regions share an address.
    pub fn validate() -> Result<()> {
        let mut regions: Vec<(Region, Range)> = Region::MAPPED
            .iter()
            .filter_map(|&region| region.range().map(|range| (region, range)))
            .collect();
        regions.sort_by_key(|(_, range)| range.start());

        for pair in regions.windows(2) {
            let (first, first_range) = pair[0];
            let (second, second_range) = pair[1];
            if first_range.end() > second_range.start() as u64 {
                return Err(PsxError::OverlappingRegions {
                    first: first.name(),
                    second: second.name(),
                });
            }
        }

        Ok(())
    }
}

fn le_word(bytes: &[u8]) -> u32 {
    bytes.iter().rev().fold(0, |word, &byte| (word << 8) | byte as u32)
}

pub struct Bus {
    bios: BIOS,
    ram: RAM,
    gpu: GPU,
    stubs: Stubs,

    // Backing store for responses that are computed rather than stored
    port_latch: [u8; 4],
}

impl Bus {
    pub fn new(bios: BIOS) -> Result<Bus> {
        map::validate()?;

        let bus = Bus {
            bios,
            ram: RAM::new(),
            gpu: GPU::new(),
            stubs: Stubs::new(),
            port_latch: [0; 4],
        };

        info!("Bus initialized");
        Ok(bus)
    }

    pub fn to_physical_address(virtual_address: u32) -> u32 {
        map::to_physical_address(virtual_address)
    }

    pub fn read(&mut self, address: u32, length: usize) -> Result<&[u8]> {
        let physical = Bus::to_physical_address(address);

        match Region::locate(physical) {
            (Region::Bios, offset) => self.bios.read(offset, length),
            (Region::Ram, offset) => self.ram.read(offset, length),
            (Region::Gpu, offset) => {
                let lane = (offset & 3) as usize;
                let value = self.gpu.read32(offset & !3);
                self.port_latch = value.to_le_bytes();
                self.port_latch
                    .get(lane..lane + length)
                    .ok_or(PsxError::AccessWidth {
                        address: physical,
                        length,
                    })
            }
            (Region::Unknown, _) => {
                error!(
                    "Unhandled read{} from physical address 0x{:08X} (virtual 0x{:08X})",
                    length * 8,
                    physical,
                    address
                );
                Err(PsxError::UnknownRegion { address, physical })
            }
            (region, _) => self.stubs.read(region, physical, length),
        }
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let physical = Bus::to_physical_address(address);

        match Region::locate(physical) {
            (Region::Bios, _) => {
                warn!(
                    "Illegal write{} to read only memory (BIOS) at 0x{:08X}",
                    data.len() * 8,
                    physical
                );
                Ok(())
            }
            (Region::Ram, offset) => self.ram.write(offset, data),
            (Region::Gpu, offset) => {
                if data.len() > 4 {
                    return Err(PsxError::AccessWidth {
                        address: physical,
                        length: data.len(),
                    });
                }
                if offset & 3 != 0 {
                    warn!("Ignoring unaligned GPU write at 0x{:08X}", physical);
                    return Ok(());
                }
                self.gpu.write32(offset, le_word(data));
                Ok(())
            }
            (Region::Unknown, _) => {
                error!(
                    "Unhandled write{} to physical address 0x{:08X} (virtual 0x{:08X})",
                    data.len() * 8,
                    physical,
                    address
                );
                Err(PsxError::UnknownRegion { address, physical })
            }
            (region, _) => self.stubs.write(region, physical, data),
        }
    }

    pub fn read8(&mut self, address: u32) -> Result<u8> {
        Ok(self.read(address, 1)?[0])
    }

    pub fn read16(&mut self, address: u32) -> Result<u16> {
        Ok(le_word(self.read(address, 2)?) as u16)
    }

    pub fn read32(&mut self, address: u32) -> Result<u32> {
        Ok(le_word(self.read(address, 4)?))
    }

    pub fn write8(&mut self, address: u32, value: u8) -> Result<()> {
        self.write(address, &[value])
    }

    pub fn write16(&mut self, address: u32, value: u16) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn write32(&mut self, address: u32, value: u32) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn gpu(&self) -> &GPU {
        &self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuPort;

    fn bus_with_bios(words: &[u32]) -> Bus {
        Bus::new(BIOS::from_words(words)).unwrap()
    }

    #[test]
    fn segments_translate_to_physical() {
        assert_eq!(Bus::to_physical_address(0x8000_0000), 0x0000_0000);
        assert_eq!(Bus::to_physical_address(0xA000_0000), 0x0000_0000);
        assert_eq!(Bus::to_physical_address(0x1F80_0000), 0x1F80_0000);
        assert_eq!(Bus::to_physical_address(0xBFC0_0000), 0x1FC0_0000);
        assert_eq!(Bus::to_physical_address(0x9FC0_0010), 0x1FC0_0010);
        assert_eq!(Bus::to_physical_address(0xFFFE_0130), 0xFFFE_0130);
    }

    #[test]
    fn memory_map_does_not_overlap() {
        assert!(map::validate().is_ok());
    }

    #[test]
    fn regions_are_half_open() {
        assert_eq!(Region::locate(0x1FC0_0000), (Region::Bios, 0));
        assert_eq!(Region::locate(0x1FC7_FFFF), (Region::Bios, 0x7FFFF));
        assert_eq!(Region::locate(0x1FC8_0000).0, Region::Unknown);
        assert_eq!(Region::locate(0x001F_FFFF), (Region::Ram, 0x1F_FFFF));
        assert_eq!(Region::locate(0x0020_0000).0, Region::Unknown);
        assert_eq!(Region::locate(0x1F80_1814), (Region::Gpu, 4));
        assert_eq!(Region::locate(0x1F80_1818).0, Region::Unknown);
        assert_eq!(Region::locate(0xFFFE_0130), (Region::CacheControl, 0));
        assert_eq!(Region::locate(0xFFFE_0134).0, Region::Unknown);
    }

    #[test]
    fn bios_reads_route_to_rom() {
        let mut bus = bus_with_bios(&[0xDEAD_BEEF]);
        assert_eq!(bus.read(0x1FC0_0000, 1).unwrap(), &[0xEF]);
        assert_eq!(bus.read32(0xBFC0_0000).unwrap(), 0xDEAD_BEEF);
        assert!(bus.read(0x1FC0_0000 + 0x7FFFF, 1).is_ok());

        match bus.read(0x1FC0_0000 + 0x80000, 1) {
            Err(PsxError::UnknownRegion { physical, .. }) => assert_eq!(physical, 0x1FC8_0000),
            _ => panic!("read past the ROM must not reach the ROM"),
        }
    }

    #[test]
    fn rom_writes_are_discarded() {
        let mut bus = bus_with_bios(&[0x1234_5678]);
        bus.write32(0xBFC0_0000, 0xFFFF_FFFF).unwrap();
        bus.write8(0x1FC0_0001, 0).unwrap();
        assert_eq!(bus.read32(0xBFC0_0000).unwrap(), 0x1234_5678);
    }

    #[test]
    fn ram_is_mirrored_across_segments() {
        let mut bus = bus_with_bios(&[]);
        bus.write32(0x8000_0010, 0xCAFE_BABE).unwrap();
        assert_eq!(bus.read32(0xA000_0010).unwrap(), 0xCAFE_BABE);
        assert_eq!(bus.read32(0x0000_0010).unwrap(), 0xCAFE_BABE);
        assert_eq!(bus.read16(0x0000_0012).unwrap(), 0xCAFE);
        assert_eq!(bus.read8(0x0000_0010).unwrap(), 0xBE);
    }

    #[test]
    fn gpu_ports_respond() {
        let mut bus = bus_with_bios(&[]);
        assert_eq!(bus.read32(0x1F80_1814).unwrap(), 0x1000_0000);
        assert_eq!(bus.read32(0x1F80_1810).unwrap(), 0);

        bus.write32(0x1F80_1810, 0xE100_0000).unwrap();
        assert_eq!(bus.gpu().last_command(), Some((GpuPort::Gp0, 0xE100_0000)));
        assert!(bus.read(0x1F80_1814, 8).is_err());
    }

    #[test]
    fn stub_regions_read_zero_and_drop_writes() {
        let mut bus = bus_with_bios(&[]);
        bus.write32(0x1F80_1070, 0xFFFF_FFFF).unwrap();
        assert_eq!(bus.read32(0x1F80_1070).unwrap(), 0);
        bus.write32(0xFFFE_0130, 0x0001_E988).unwrap();
        assert_eq!(bus.read32(0xFFFE_0130).unwrap(), 0);
        bus.write8(0x1F80_2041, 0x01).unwrap();
        assert_eq!(bus.read16(0x1F80_1C00).unwrap(), 0);
    }

    #[test]
    fn unmapped_accesses_fail() {
        let mut bus = bus_with_bios(&[]);
        assert!(matches!(
            bus.write32(0x1F90_0000, 1),
            Err(PsxError::UnknownRegion { physical: 0x1F90_0000, .. })
        ));
        assert!(bus.read32(0xC000_0000).is_err());
    }
}
