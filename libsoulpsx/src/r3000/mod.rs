/*
    MIPS R3000A PS1 CPU
*/

use std::collections::HashSet;

use crate::Bus;
use crate::cpu::CPU;
use crate::error::Result;

pub mod cop0;
pub mod disasm;
pub mod instruction;
pub mod interpreter;


pub use cop0::{Cop0, Exception};
pub use disasm::{cop0_register_name, register_name};
pub use instruction::{Instruction, Opcode};
pub use interpreter::Interpreter;

use tracing::{debug, info};

const R3000_RESET_VEC: u32 = 0xBFC00000;

const RA: usize = 31;

/// A load whose result lands in the register file one instruction late.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadDelay {
    pub register: usize,
    pub value: u32,
}

/// Architectural state captured before a step, restored when the step fails
/// with a host-level error so the faulting instruction can be retried.
#[derive(Clone, Copy)]
struct StepCheckpoint {
    current_pc: u32,
    pc: u32,
    next_pc: u32,
    load_delay: Option<LoadDelay>,
    was_branch: bool,
    in_delay_slot: bool,
    current_instruction: Instruction,
}

pub struct R3000 {
    bus: Bus,

    // Address of the instruction in flight and of the one fetched next
    current_pc: u32,
    pc: u32,
    next_pc: u32,

    // Instructions read `registers`, writes go to `pending_registers` and
    // become visible once the step commits.
    registers: [u32; 32],
    pending_registers: [u32; 32],
    cop0: Cop0,
    pending_cop0: Cop0,

    lo: u32,
    hi: u32,

    load_delay: Option<LoadDelay>,

    was_branch: bool,
    in_delay_slot: bool,

    current_instruction: Instruction,
    breakpoints: HashSet<u32>,
}

impl R3000 {
    pub fn new(bus: Bus) -> Self {
        info!("R3000 reset, PC=0x{:08X}", R3000_RESET_VEC);

        R3000 {
            bus,
            current_pc: R3000_RESET_VEC,
            pc: R3000_RESET_VEC,
            next_pc: R3000_RESET_VEC.wrapping_add(4),
            registers: [0; 32],
            pending_registers: [0; 32],
            cop0: Cop0::new(),
            pending_cop0: Cop0::new(),
            lo: 0,
            hi: 0,
            load_delay: None,
            was_branch: false,
            in_delay_slot: false,
            current_instruction: Instruction::default(),
            breakpoints: HashSet::new(),
        }
    }

    pub fn current_pc(&self) -> u32 {
        self.current_pc
    }

    pub fn current_instruction(&self) -> Instruction {
        self.current_instruction
    }

    pub fn load_delay(&self) -> Option<LoadDelay> {
        self.load_delay
    }

    pub fn in_delay_slot(&self) -> bool {
        self.in_delay_slot
    }

    fn reg(&self, index: usize) -> u32 {
        self.registers[index]
    }

    /// $zero is forced back to zero on every write.
    fn set_reg(&mut self, index: usize, value: u32) {
        self.pending_registers[index] = value;
        self.pending_registers[0] = 0;
    }

    fn schedule_load(&mut self, register: usize, value: u32) {
        self.load_delay = Some(LoadDelay { register, value });
    }

    fn commit_load_delay(&mut self) {
        if let Some(LoadDelay { register, value }) = self.load_delay.take() {
            debug!(
                "Load delay: ${} <- 0x{:08X}",
                register_name(register),
                value
            );
            self.set_reg(register, value);
        }
    }

    fn checkpoint(&self) -> StepCheckpoint {
        StepCheckpoint {
            current_pc: self.current_pc,
            pc: self.pc,
            next_pc: self.next_pc,
            load_delay: self.load_delay,
            was_branch: self.was_branch,
            in_delay_slot: self.in_delay_slot,
            current_instruction: self.current_instruction,
        }
    }

    /// Drops everything the failed step wrote to the pending views.
    fn rollback(&mut self, checkpoint: StepCheckpoint) {
        self.current_pc = checkpoint.current_pc;
        self.pc = checkpoint.pc;
        self.next_pc = checkpoint.next_pc;
        self.load_delay = checkpoint.load_delay;
        self.was_branch = checkpoint.was_branch;
        self.in_delay_slot = checkpoint.in_delay_slot;
        self.current_instruction = checkpoint.current_instruction;

        self.pending_registers = self.registers;
        self.pending_cop0 = self.cop0;
    }

    fn commit(&mut self) {
        self.registers = self.pending_registers;
        self.cop0 = self.pending_cop0;
    }

    fn branch(&mut self, offset: u32) {
        self.next_pc = self.next_pc.wrapping_add(offset).wrapping_sub(4);
        self.was_branch = true;
    }

    fn jump(&mut self, target: u32) {
        self.next_pc = target;
        self.was_branch = true;
    }

    fn exception(&mut self, exception: Exception) {
        let handler = self
            .pending_cop0
            .enter_exception(exception, self.current_pc, self.in_delay_slot);

        self.pc = handler;
        self.next_pc = handler.wrapping_add(4);
        self.was_branch = false;
    }

    fn address_error(&mut self, exception: Exception, address: u32) {
        self.pending_cop0.write(cop0::BAD_VADDR, address);
        self.exception(exception);
    }

    fn load8(&mut self, address: u32) -> Result<u8> {
        self.bus.read8(address)
    }

    fn load16(&mut self, address: u32) -> Result<u16> {
        self.bus.read16(address)
    }

    fn load32(&mut self, address: u32) -> Result<u32> {
        self.bus.read32(address)
    }

    /// Stores go to the data cache instead of the bus while it is isolated.
    fn store_suppressed(&self, address: u32, bits: usize) -> bool {
        let isolated = self.cop0.cache_isolated();
        if isolated {
            debug!("Cache isolated: ignoring write{} to 0x{:08X}", bits, address);
        }
        isolated
    }

    fn store(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if self.store_suppressed(address, data.len() * 8) {
            return Ok(());
        }
        self.bus.write(address, data)
    }

    #[cfg(test)]
    pub(crate) fn test_set_register(&mut self, index: usize, value: u32) {
        self.set_reg(index, value);
        self.registers = self.pending_registers;
    }

    #[cfg(test)]
    pub(crate) fn test_set_cop0_register(&mut self, index: usize, value: u32) {
        self.pending_cop0.write(index, value);
        self.cop0 = self.pending_cop0;
    }

    #[cfg(test)]
    pub(crate) fn test_set_hi_lo(&mut self, hi: u32, lo: u32) {
        self.hi = hi;
        self.lo = lo;
    }

    #[cfg(test)]
    pub(crate) fn test_bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }
}

impl CPU for R3000 {
    type RegisterType = u32;

    fn pc(&self) -> u32 {
        self.pc
    }

    fn next_pc(&self) -> u32 {
        self.next_pc
    }

    fn read_register(&self, index: usize) -> Self::RegisterType {
        self.registers[index]
    }

    fn read_cop0_register(&self, index: usize) -> u32 {
        self.cop0.read(index)
    }

    fn read_hi(&self) -> Self::RegisterType {
        self.hi
    }

    fn read_lo(&self) -> Self::RegisterType {
        self.lo
    }

    fn read32(&mut self, addr: u32) -> Result<u32> {
        self.bus.read32(addr)
    }

    #[inline(always)]
    fn fetch(&mut self) -> Result<u32> {
        self.read32(self.pc)
    }

    fn add_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove(&addr);
    }

    fn has_breakpoint(&self, addr: u32) -> bool {
        self.breakpoints.contains(&addr)
    }
}
