use tracing::{trace, warn};

/// GP0: command port on write, GPUREAD on read
pub const GP0_OFFSET: u32 = 0x0;
/// GP1: control port on write, GPUSTAT on read
pub const GP1_OFFSET: u32 = 0x4;

// Hardcoded until the GPU actually draws something
const GPUSTAT_RESET: u32 = 0x1000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuPort {
    Gp0,
    Gp1,
}

/// Memory mapped responder for the GPU ports. Commands are accepted and
/// recorded but not processed.
#[derive(Debug)]
pub struct GPU {
    gpustat: u32,
    gpuread: u32,
    last_command: Option<(GpuPort, u32)>,
}

impl Default for GPU {
    fn default() -> Self {
        GPU {
            gpustat: GPUSTAT_RESET,
            gpuread: 0,
            last_command: None,
        }
    }
}

impl GPU {
    pub fn new() -> Self {
        GPU::default()
    }

    pub fn read32(&self, offset: u32) -> u32 {
        match offset {
            GP1_OFFSET => {
                trace!("GPU: Sent GPUSTAT 0x{:08X}", self.gpustat);
                self.gpustat
            }
            _ => {
                trace!("GPU: Sent GPUREAD response 0x{:08X}", self.gpuread);
                self.gpuread
            }
        }
    }

    pub fn write32(&mut self, offset: u32, value: u32) {
        match offset {
            GP0_OFFSET => self.gp0(value),
            GP1_OFFSET => self.gp1(value),
            _ => warn!(
                "GPU: Ignoring write to unknown port offset 0x{:X}, value=0x{:08X}",
                offset, value
            ),
        }
    }

    fn gp0(&mut self, command: u32) {
        match command >> 24 {
            0xE1 => trace!("GPU: Received texpage command 0x{:08X}", command),
            opcode => trace!("GPU: GP0 command 0x{:02X} (0x{:08X})", opcode, command),
        }
        self.last_command = Some((GpuPort::Gp0, command));
    }

    fn gp1(&mut self, command: u32) {
        trace!("GPU: GP1 command 0x{:08X}", command);
        self.last_command = Some((GpuPort::Gp1, command));
    }

    pub fn gpustat(&self) -> u32 {
        self.gpustat
    }

    pub fn last_command(&self) -> Option<(GpuPort, u32)> {
        self.last_command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_port_reports_gpustat() {
        let gpu = GPU::new();
        assert_eq!(gpu.read32(GP1_OFFSET), 0x1000_0000);
        assert_eq!(gpu.read32(GP0_OFFSET), 0);
    }

    #[test]
    fn commands_are_recorded_per_port() {
        let mut gpu = GPU::new();
        gpu.write32(GP0_OFFSET, 0xE100_0508);
        assert_eq!(gpu.last_command(), Some((GpuPort::Gp0, 0xE100_0508)));

        gpu.write32(GP1_OFFSET, 0x0300_0000);
        assert_eq!(gpu.last_command(), Some((GpuPort::Gp1, 0x0300_0000)));
        assert_eq!(gpu.gpustat(), 0x1000_0000);
    }
}
