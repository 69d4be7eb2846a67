use crate::error::Result;

/// Read-only view of a CPU, used by debuggers and frontends. Mutating the
/// CPU is left to its emulation backend.
pub trait CPU {
    type RegisterType;

    fn pc(&self) -> u32;
    fn next_pc(&self) -> u32;

    fn read_register(&self, index: usize) -> Self::RegisterType;
    fn read_cop0_register(&self, index: usize) -> u32;

    fn read_hi(&self) -> Self::RegisterType;
    fn read_lo(&self) -> Self::RegisterType;

    fn read32(&mut self, addr: u32) -> Result<u32>;

    fn fetch(&mut self) -> Result<u32>;

    fn add_breakpoint(&mut self, addr: u32);
    fn remove_breakpoint(&mut self, addr: u32);
    fn has_breakpoint(&self, addr: u32) -> bool;
}

pub trait EmulationBackend<C> {
    /// Executes exactly one instruction.
    fn step(&mut self) -> Result<()>;

    /// Steps until the PC lands on a breakpoint.
    fn run(&mut self) -> Result<()>;

    fn cpu(&self) -> &C;
    fn cpu_mut(&mut self) -> &mut C;
}
