/*
    System control coprocessor (COP0)
*/

use tracing::{debug, warn};

pub const COP0_REGISTER_COUNT: usize = 16;

pub const BAD_VADDR: usize = 8;
pub const SR: usize = 12;
pub const CAUSE: usize = 13;
pub const EPC: usize = 14;
pub const PRID: usize = 15;

// Status register bits
const SR_MODE_STACK: u32 = 0x3F;
const SR_ISOLATE_CACHE: u32 = 1 << 16;
const SR_BEV: u32 = 1 << 22;

const CAUSE_BRANCH_DELAY: u32 = 1 << 31;

const ROM_EXCEPTION_VECTOR: u32 = 0xBFC0_0180;
const RAM_EXCEPTION_VECTOR: u32 = 0x8000_0080;

// R3000A implementation/revision
const PRID_RESET: u32 = 0x0000_0002;

/// Exceptions raised by the emulated program, with their Cause.ExcCode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Exception {
    Interrupt = 0x0,
    LoadAddressError = 0x4,
    StoreAddressError = 0x5,
    InstructionBusError = 0x6,
    DataBusError = 0x7,
    Syscall = 0x8,
    Breakpoint = 0x9,
    ReservedInstruction = 0xA,
    CoprocessorUnusable = 0xB,
    ArithmeticOverflow = 0xC,
}

impl Exception {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Exception::Interrupt => "interrupt",
            Exception::LoadAddressError => "load_address_error",
            Exception::StoreAddressError => "store_address_error",
            Exception::InstructionBusError => "instruction_bus_error",
            Exception::DataBusError => "data_bus_error",
            Exception::Syscall => "syscall",
            Exception::Breakpoint => "breakpoint",
            Exception::ReservedInstruction => "reserved_instruction",
            Exception::CoprocessorUnusable => "coprocessor_unusable",
            Exception::ArithmeticOverflow => "arithmetic_overflow",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cop0 {
    registers: [u32; COP0_REGISTER_COUNT],
}

impl Default for Cop0 {
    fn default() -> Self {
        let mut registers = [0; COP0_REGISTER_COUNT];
        registers[PRID] = PRID_RESET;
        Cop0 { registers }
    }
}

impl Cop0 {
    pub fn new() -> Self {
        Cop0::default()
    }

    /// Indices past the implemented registers read as zero.
    pub fn read(&self, index: usize) -> u32 {
        match self.registers.get(index) {
            Some(value) => *value,
            None => {
                warn!("COP0: Read from reserved register {}", index);
                0
            }
        }
    }

    pub fn write(&mut self, index: usize, value: u32) {
        match self.registers.get_mut(index) {
            Some(register) => *register = value,
            None => warn!(
                "COP0: Ignoring write to reserved register {} (0x{:08X})",
                index, value
            ),
        }
    }

    pub fn sr(&self) -> u32 {
        self.registers[SR]
    }

    pub fn cause(&self) -> u32 {
        self.registers[CAUSE]
    }

    pub fn epc(&self) -> u32 {
        self.registers[EPC]
    }

    pub fn cache_isolated(&self) -> bool {
        self.sr() & SR_ISOLATE_CACHE != 0
    }

    pub fn exception_vector(&self) -> u32 {
        if self.sr() & SR_BEV != 0 {
            ROM_EXCEPTION_VECTOR
        } else {
            RAM_EXCEPTION_VECTOR
        }
    }

    /// Pushes a kernel mode, interrupts disabled context onto the mode stack
    /// and records the cause. Returns the handler address.
    pub fn enter_exception(&mut self, exception: Exception, epc: u32, branch_delay: bool) -> u32 {
        let handler = self.exception_vector();

        let sr = self.sr();
        let mode = sr & SR_MODE_STACK;
        self.registers[SR] = (sr & !SR_MODE_STACK) | ((mode << 2) & SR_MODE_STACK);

        let mut cause = exception.code() << 2;
        let mut epc = epc;
        if branch_delay {
            cause |= CAUSE_BRANCH_DELAY;
            epc = epc.wrapping_sub(4);
        }

        self.registers[CAUSE] = cause;
        self.registers[EPC] = epc;

        debug!(
            "COP0: {} exception, EPC=0x{:08X}, CAUSE=0x{:08X}, handler=0x{:08X}",
            exception.name(),
            epc,
            cause,
            handler
        );
        handler
    }

    /// Pops the mode stack. The old pair (bits 4-5) is left in place.
    pub fn return_from_exception(&mut self) {
        let sr = self.sr();
        self.registers[SR] = (sr & !0xF) | ((sr & SR_MODE_STACK) >> 2);
        debug!("COP0: rfe, SR=0x{:08X}", self.registers[SR]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_follows_bev() {
        let mut cop0 = Cop0::new();
        assert_eq!(cop0.exception_vector(), 0x8000_0080);
        cop0.write(SR, 1 << 22);
        assert_eq!(cop0.exception_vector(), 0xBFC0_0180);
    }

    #[test]
    fn exception_pushes_and_rfe_pops_mode_stack() {
        let mut cop0 = Cop0::new();
        cop0.write(SR, 0b00_0101);

        let handler = cop0.enter_exception(Exception::Syscall, 0x8001_0000, false);
        assert_eq!(handler, 0x8000_0080);
        assert_eq!(cop0.sr() & 0x3F, 0b01_0100);
        assert_eq!(cop0.cause(), 0x8 << 2);
        assert_eq!(cop0.epc(), 0x8001_0000);

        cop0.return_from_exception();
        assert_eq!(cop0.sr() & 0x3F, 0b01_0101);
    }

    #[test]
    fn branch_delay_backdates_epc() {
        let mut cop0 = Cop0::new();
        cop0.enter_exception(Exception::ArithmeticOverflow, 0x8001_0004, true);
        assert_eq!(cop0.epc(), 0x8001_0000);
        assert_eq!(cop0.cause(), (1 << 31) | (0xC << 2));
    }

    #[test]
    fn reserved_registers_read_zero() {
        let mut cop0 = Cop0::new();
        cop0.write(20, 0xFFFF_FFFF);
        assert_eq!(cop0.read(20), 0);
        assert_eq!(cop0.read(PRID), 2);
    }
}
