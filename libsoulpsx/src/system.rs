use tracing::{debug, info};

use crate::bus::Bus;
use crate::bus::bios::BIOS;
use crate::cpu::{CPU, EmulationBackend};
use crate::error::Result;
use crate::r3000::{Interpreter, R3000};

/// Owns the whole machine and drives the CPU one instruction per tick.
pub struct System {
    backend: Interpreter,
    paused: bool,
}

impl System {
    pub fn new(bios: BIOS) -> Result<Self> {
        let bus = Bus::new(bios)?;
        let cpu = R3000::new(bus);

        info!("System initialized");
        Ok(System {
            backend: Interpreter::new(cpu),
            paused: false,
        })
    }

    /// Executes one instruction unless paused.
    pub fn run(&mut self) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        self.backend.step()
    }

    /// Executes up to `steps` instructions, stopping early when the PC lands
    /// on a breakpoint. Returns how many instructions ran.
    pub fn run_for(&mut self, steps: u64) -> Result<u64> {
        let mut executed = 0;

        while executed < steps && !self.paused {
            self.backend.step()?;
            executed += 1;

            let pc = self.backend.cpu().pc();
            if self.backend.cpu().has_breakpoint(pc) {
                debug!("Breakpoint hit at 0x{:08X} after {} steps", pc, executed);
                break;
            }
        }

        Ok(executed)
    }

    /// Runs until a breakpoint or an error.
    pub fn run_until_break(&mut self) -> Result<()> {
        self.backend.run()
    }

    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn add_breakpoint(&mut self, addr: u32) {
        self.backend.cpu_mut().add_breakpoint(addr);
    }

    pub fn cpu(&self) -> &R3000 {
        self.backend.cpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // lui $t0, 0x1234 ; ori $t0, $t0, 0x5678 ; j 0xBFC00008 ; nop
    const PROGRAM: [u32; 4] = [0x3C08_1234, 0x3508_5678, 0x0BF0_0002, 0x0000_0000];

    #[test]
    fn paused_system_does_not_step() {
        let mut system = System::new(BIOS::from_words(&PROGRAM)).unwrap();
        system.pause(true);
        system.run().unwrap();
        assert_eq!(system.cpu().pc(), 0xBFC0_0000);
        assert_eq!(system.run_for(10).unwrap(), 0);

        system.pause(false);
        system.run().unwrap();
        assert_eq!(system.cpu().pc(), 0xBFC0_0004);
    }

    #[test]
    fn run_for_stops_at_breakpoints() {
        let mut system = System::new(BIOS::from_words(&PROGRAM)).unwrap();
        system.add_breakpoint(0xBFC0_0008);

        assert_eq!(system.run_for(100).unwrap(), 2);
        assert_eq!(system.cpu().pc(), 0xBFC0_0008);
        assert_eq!(system.cpu().read_register(8), 0x1234_5678);
    }

    #[test]
    fn run_until_break_spins_in_loop() {
        let mut system = System::new(BIOS::from_words(&PROGRAM)).unwrap();
        system.add_breakpoint(0xBFC0_0008);
        system.run_until_break().unwrap();
        assert_eq!(system.cpu().pc(), 0xBFC0_0008);

        // j 0xBFC00008 then its delay slot: back on the breakpoint
        system.run_until_break().unwrap();
        assert_eq!(system.cpu().pc(), 0xBFC0_0008);
        assert_eq!(system.cpu().current_pc(), 0xBFC0_000C);
    }
}
