use tracing::{error, trace};

use super::cop0::{Exception, SR};
use super::instruction::{Instruction, Opcode};
use super::{R3000, RA};
use crate::cpu::{CPU, EmulationBackend};
use crate::error::{PsxError, Result};

pub struct Interpreter {
    pub cpu: R3000,
}

impl Interpreter {
    pub fn new(cpu: R3000) -> Self {
        Interpreter { cpu }
    }

    pub fn decode_execute(&mut self, instruction: Instruction) -> Result<()> {
        let cpu = &mut self.cpu;

        match instruction.opcode() {
            Opcode::Add => cpu.op_add(instruction),
            Opcode::Addu => cpu.op_addu(instruction),
            Opcode::Addi => cpu.op_addi(instruction),
            Opcode::Addiu => cpu.op_addiu(instruction),
            Opcode::Sub => cpu.op_sub(instruction),
            Opcode::Subu => cpu.op_subu(instruction),
            Opcode::And => cpu.op_and(instruction),
            Opcode::Andi => cpu.op_andi(instruction),
            Opcode::Or => cpu.op_or(instruction),
            Opcode::Ori => cpu.op_ori(instruction),
            Opcode::Xor => cpu.op_xor(instruction),
            Opcode::Xori => cpu.op_xori(instruction),
            Opcode::Nor => cpu.op_nor(instruction),
            Opcode::Slt => cpu.op_slt(instruction),
            Opcode::Sltu => cpu.op_sltu(instruction),
            Opcode::Slti => cpu.op_slti(instruction),
            Opcode::Sltiu => cpu.op_sltiu(instruction),
            Opcode::Lui => cpu.op_lui(instruction),
            Opcode::Sll => cpu.op_sll(instruction),
            Opcode::Srl => cpu.op_srl(instruction),
            Opcode::Sra => cpu.op_sra(instruction),
            Opcode::Sllv => cpu.op_sllv(instruction),
            Opcode::Srlv => cpu.op_srlv(instruction),
            Opcode::Srav => cpu.op_srav(instruction),
            Opcode::Mult => cpu.op_mult(instruction),
            Opcode::Multu => cpu.op_multu(instruction),
            Opcode::Div => cpu.op_div(instruction),
            Opcode::Divu => cpu.op_divu(instruction),
            Opcode::Mfhi => cpu.op_mfhi(instruction),
            Opcode::Mflo => cpu.op_mflo(instruction),
            Opcode::Mthi => cpu.op_mthi(instruction),
            Opcode::Mtlo => cpu.op_mtlo(instruction),
            Opcode::Lb => return cpu.op_lb(instruction),
            Opcode::Lbu => return cpu.op_lbu(instruction),
            Opcode::Lh => return cpu.op_lh(instruction),
            Opcode::Lhu => return cpu.op_lhu(instruction),
            Opcode::Lw => return cpu.op_lw(instruction),
            Opcode::Lwl => return cpu.op_lwl(instruction),
            Opcode::Lwr => return cpu.op_lwr(instruction),
            Opcode::Sb => return cpu.op_sb(instruction),
            Opcode::Sh => return cpu.op_sh(instruction),
            Opcode::Sw => return cpu.op_sw(instruction),
            Opcode::Swl => return cpu.op_swl(instruction),
            Opcode::Swr => return cpu.op_swr(instruction),
            Opcode::J => cpu.op_j(instruction),
            Opcode::Jal => cpu.op_jal(instruction),
            Opcode::Jr => cpu.op_jr(instruction),
            Opcode::Jalr => cpu.op_jalr(instruction),
            Opcode::Beq => cpu.op_beq(instruction),
            Opcode::Bne => cpu.op_bne(instruction),
            Opcode::Blez => cpu.op_blez(instruction),
            Opcode::Bgtz => cpu.op_bgtz(instruction),
            Opcode::Bltz => cpu.op_bltz(instruction),
            Opcode::Bgez => cpu.op_bgez(instruction),
            Opcode::Bltzal => cpu.op_bltzal(instruction),
            Opcode::Bgezal => cpu.op_bgezal(instruction),
            Opcode::Mfc0 => cpu.op_mfc0(instruction),
            Opcode::Mtc0 => cpu.op_mtc0(instruction),
            Opcode::Rfe => cpu.op_rfe(),
            Opcode::Syscall => cpu.exception(Exception::Syscall),
            Opcode::Break => cpu.exception(Exception::Breakpoint),
            Opcode::Cop1 | Opcode::Cop3 => cpu.exception(Exception::CoprocessorUnusable),
            Opcode::Unknown => {
                error!(
                    "Unhandled R3000 instruction 0x{:08X} at 0x{:08X}",
                    instruction.word(),
                    cpu.current_pc
                );
                return Err(PsxError::UnsupportedInstruction {
                    pc: cpu.current_pc,
                    word: instruction.word(),
                });
            }
        }

        Ok(())
    }
}

impl EmulationBackend<R3000> for Interpreter {
    fn step(&mut self) -> Result<()> {
        let cpu = &mut self.cpu;
        let checkpoint = cpu.checkpoint();

        cpu.current_pc = cpu.pc;
        cpu.in_delay_slot = cpu.was_branch;
        cpu.was_branch = false;

        if cpu.current_pc % 4 != 0 {
            cpu.address_error(Exception::LoadAddressError, cpu.current_pc);
            cpu.commit();
            return Ok(());
        }

        let word = match cpu.fetch() {
            Ok(word) => word,
            Err(e) => {
                cpu.rollback(checkpoint);
                return Err(e);
            }
        };
        let instruction = Instruction::new(word);
        cpu.current_instruction = instruction;

        cpu.pc = cpu.next_pc;
        cpu.next_pc = cpu.next_pc.wrapping_add(4);

        // The previous load lands in the pending view: this instruction still
        // reads the old value, and its own write to the same register wins.
        cpu.commit_load_delay();

        trace!("0x{:08X}: {}", cpu.current_pc, instruction);

        match self.decode_execute(instruction) {
            Ok(()) => {
                self.cpu.commit();
                Ok(())
            }
            Err(e) => {
                // Nothing from the faulting instruction becomes visible
                self.cpu.rollback(checkpoint);
                Err(e)
            }
        }
    }

    fn run(&mut self) -> Result<()> {
        loop {
            self.step()?;

            if self.cpu.has_breakpoint(self.cpu.pc) {
                trace!("Breakpoint hit at 0x{:08X}", self.cpu.pc);
                return Ok(());
            }
        }
    }

    fn cpu(&self) -> &R3000 {
        &self.cpu
    }

    fn cpu_mut(&mut self) -> &mut R3000 {
        &mut self.cpu
    }
}

// Instruction handlers. Operands are read from the committed register view.
impl R3000 {
    fn op_add(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32;
        let rt = self.reg(instruction.rt()) as i32;

        match rs.checked_add(rt) {
            Some(result) => self.set_reg(instruction.rd(), result as u32),
            None => self.exception(Exception::ArithmeticOverflow),
        }
    }

    fn op_addu(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()).wrapping_add(self.reg(instruction.rt()));
        self.set_reg(instruction.rd(), result);
    }

    fn op_addi(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32;
        let imm = instruction.imm16_se() as i32;

        match rs.checked_add(imm) {
            Some(result) => self.set_reg(instruction.rt(), result as u32),
            None => self.exception(Exception::ArithmeticOverflow),
        }
    }

    fn op_addiu(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()).wrapping_add(instruction.imm16_se());
        self.set_reg(instruction.rt(), result);
    }

    fn op_sub(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32;
        let rt = self.reg(instruction.rt()) as i32;

        match rs.checked_sub(rt) {
            Some(result) => self.set_reg(instruction.rd(), result as u32),
            None => self.exception(Exception::ArithmeticOverflow),
        }
    }

    fn op_subu(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()).wrapping_sub(self.reg(instruction.rt()));
        self.set_reg(instruction.rd(), result);
    }

    fn op_and(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) & self.reg(instruction.rt());
        self.set_reg(instruction.rd(), result);
    }

    fn op_andi(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) & instruction.imm16();
        self.set_reg(instruction.rt(), result);
    }

    fn op_or(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) | self.reg(instruction.rt());
        self.set_reg(instruction.rd(), result);
    }

    fn op_ori(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) | instruction.imm16();
        self.set_reg(instruction.rt(), result);
    }

    fn op_xor(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) ^ self.reg(instruction.rt());
        self.set_reg(instruction.rd(), result);
    }

    fn op_xori(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) ^ instruction.imm16();
        self.set_reg(instruction.rt(), result);
    }

    fn op_nor(&mut self, instruction: Instruction) {
        let result = !(self.reg(instruction.rs()) | self.reg(instruction.rt()));
        self.set_reg(instruction.rd(), result);
    }

    fn op_slt(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32;
        let rt = self.reg(instruction.rt()) as i32;
        self.set_reg(instruction.rd(), (rs < rt) as u32);
    }

    fn op_sltu(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) < self.reg(instruction.rt());
        self.set_reg(instruction.rd(), result as u32);
    }

    fn op_slti(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32;
        let imm = instruction.imm16_se() as i32;
        self.set_reg(instruction.rt(), (rs < imm) as u32);
    }

    fn op_sltiu(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rs()) < instruction.imm16_se();
        self.set_reg(instruction.rt(), result as u32);
    }

    fn op_lui(&mut self, instruction: Instruction) {
        self.set_reg(instruction.rt(), instruction.imm16() << 16);
    }

    fn op_sll(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rt()) << instruction.shamt();
        self.set_reg(instruction.rd(), result);
    }

    fn op_srl(&mut self, instruction: Instruction) {
        let result = self.reg(instruction.rt()) >> instruction.shamt();
        self.set_reg(instruction.rd(), result);
    }

    fn op_sra(&mut self, instruction: Instruction) {
        let result = (self.reg(instruction.rt()) as i32) >> instruction.shamt();
        self.set_reg(instruction.rd(), result as u32);
    }

    fn op_sllv(&mut self, instruction: Instruction) {
        let shift = self.reg(instruction.rs()) & 0x1F;
        let result = self.reg(instruction.rt()) << shift;
        self.set_reg(instruction.rd(), result);
    }

    fn op_srlv(&mut self, instruction: Instruction) {
        let shift = self.reg(instruction.rs()) & 0x1F;
        let result = self.reg(instruction.rt()) >> shift;
        self.set_reg(instruction.rd(), result);
    }

    fn op_srav(&mut self, instruction: Instruction) {
        let shift = self.reg(instruction.rs()) & 0x1F;
        let result = (self.reg(instruction.rt()) as i32) >> shift;
        self.set_reg(instruction.rd(), result as u32);
    }

    fn op_mult(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as i32 as i64;
        let rt = self.reg(instruction.rt()) as i32 as i64;
        let result = (rs * rt) as u64;

        self.hi = (result >> 32) as u32;
        self.lo = result as u32;
    }

    fn op_multu(&mut self, instruction: Instruction) {
        let rs = self.reg(instruction.rs()) as u64;
        let rt = self.reg(instruction.rt()) as u64;
        let result = rs * rt;

        self.hi = (result >> 32) as u32;
        self.lo = result as u32;
    }

    // Division never traps: divide by zero and i32::MIN / -1 produce fixed
    // results instead.
    fn op_div(&mut self, instruction: Instruction) {
        let numerator = self.reg(instruction.rs()) as i32;
        let denominator = self.reg(instruction.rt()) as i32;

        if denominator == 0 {
            self.hi = numerator as u32;
            self.lo = if numerator >= 0 { 0xFFFF_FFFF } else { 1 };
        } else if numerator == i32::MIN && denominator == -1 {
            self.hi = 0;
            self.lo = i32::MIN as u32;
        } else {
            self.hi = (numerator % denominator) as u32;
            self.lo = (numerator / denominator) as u32;
        }
    }

    fn op_divu(&mut self, instruction: Instruction) {
        let numerator = self.reg(instruction.rs());
        let denominator = self.reg(instruction.rt());

        if denominator == 0 {
            self.hi = numerator;
            self.lo = 0xFFFF_FFFF;
        } else {
            self.hi = numerator % denominator;
            self.lo = numerator / denominator;
        }
    }

    fn op_mfhi(&mut self, instruction: Instruction) {
        self.set_reg(instruction.rd(), self.hi);
    }

    fn op_mflo(&mut self, instruction: Instruction) {
        self.set_reg(instruction.rd(), self.lo);
    }

    fn op_mthi(&mut self, instruction: Instruction) {
        self.hi = self.reg(instruction.rs());
    }

    fn op_mtlo(&mut self, instruction: Instruction) {
        self.lo = self.reg(instruction.rs());
    }

    fn effective_address(&self, instruction: Instruction) -> u32 {
        self.reg(instruction.base()).wrapping_add(instruction.imm16_se())
    }

    fn op_lb(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let value = self.load8(address)? as i8;
        self.schedule_load(instruction.rt(), value as u32);
        Ok(())
    }

    fn op_lbu(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let value = self.load8(address)?;
        self.schedule_load(instruction.rt(), value as u32);
        Ok(())
    }

    fn op_lh(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        if address % 2 != 0 {
            self.address_error(Exception::LoadAddressError, address);
            return Ok(());
        }

        let value = self.load16(address)? as i16;
        self.schedule_load(instruction.rt(), value as u32);
        Ok(())
    }

    fn op_lhu(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        if address % 2 != 0 {
            self.address_error(Exception::LoadAddressError, address);
            return Ok(());
        }

        let value = self.load16(address)?;
        self.schedule_load(instruction.rt(), value as u32);
        Ok(())
    }

    fn op_lw(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        if address % 4 != 0 {
            self.address_error(Exception::LoadAddressError, address);
            return Ok(());
        }

        let value = self.load32(address)?;
        self.schedule_load(instruction.rt(), value);
        Ok(())
    }

    // lwl/lwr merge into the freshest value of rt, which includes a load that
    // landed at the start of this step. That lets a back to back pair work.
    fn op_lwl(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let current = self.pending_registers[instruction.rt()];
        let word = self.load32(address & !3)?;

        let value = match address & 3 {
            0 => (current & 0x00FF_FFFF) | (word << 24),
            1 => (current & 0x0000_FFFF) | (word << 16),
            2 => (current & 0x0000_00FF) | (word << 8),
            _ => word,
        };

        self.schedule_load(instruction.rt(), value);
        Ok(())
    }

    fn op_lwr(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let current = self.pending_registers[instruction.rt()];
        let word = self.load32(address & !3)?;

        let value = match address & 3 {
            0 => word,
            1 => (current & 0xFF00_0000) | (word >> 8),
            2 => (current & 0xFFFF_0000) | (word >> 16),
            _ => (current & 0xFFFF_FF00) | (word >> 24),
        };

        self.schedule_load(instruction.rt(), value);
        Ok(())
    }

    fn op_sb(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let value = self.reg(instruction.rt()) as u8;
        self.store(address, &[value])
    }

    fn op_sh(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        if address % 2 != 0 {
            self.address_error(Exception::StoreAddressError, address);
            return Ok(());
        }

        let value = self.reg(instruction.rt()) as u16;
        self.store(address, &value.to_le_bytes())
    }

    fn op_sw(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        if address % 4 != 0 {
            self.address_error(Exception::StoreAddressError, address);
            return Ok(());
        }

        let value = self.reg(instruction.rt());
        self.store(address, &value.to_le_bytes())
    }

    fn op_swl(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let aligned = address & !3;
        if self.store_suppressed(aligned, 32) {
            return Ok(());
        }
        let value = self.reg(instruction.rt());
        let memory = self.load32(aligned)?;

        let merged = match address & 3 {
            0 => (memory & 0xFFFF_FF00) | (value >> 24),
            1 => (memory & 0xFFFF_0000) | (value >> 16),
            2 => (memory & 0xFF00_0000) | (value >> 8),
            _ => value,
        };

        self.store(aligned, &merged.to_le_bytes())
    }

    fn op_swr(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.effective_address(instruction);
        let aligned = address & !3;
        if self.store_suppressed(aligned, 32) {
            return Ok(());
        }
        let value = self.reg(instruction.rt());
        let memory = self.load32(aligned)?;

        let merged = match address & 3 {
            0 => value,
            1 => (memory & 0x0000_00FF) | (value << 8),
            2 => (memory & 0x0000_FFFF) | (value << 16),
            _ => (memory & 0x00FF_FFFF) | (value << 24),
        };

        self.store(aligned, &merged.to_le_bytes())
    }

    fn op_j(&mut self, instruction: Instruction) {
        let target = (self.pc & 0xF000_0000) | (instruction.jump_target() << 2);
        self.jump(target);
    }

    fn op_jal(&mut self, instruction: Instruction) {
        self.set_reg(RA, self.next_pc);
        self.op_j(instruction);
    }

    fn op_jr(&mut self, instruction: Instruction) {
        let target = self.reg(instruction.rs());
        self.jump(target);
    }

    fn op_jalr(&mut self, instruction: Instruction) {
        let target = self.reg(instruction.rs());
        self.set_reg(instruction.rd(), self.next_pc);
        self.jump(target);
    }

    fn branch_offset(instruction: Instruction) -> u32 {
        instruction.imm16_se() << 2
    }

    fn op_beq(&mut self, instruction: Instruction) {
        if self.reg(instruction.rs()) == self.reg(instruction.rt()) {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_bne(&mut self, instruction: Instruction) {
        if self.reg(instruction.rs()) != self.reg(instruction.rt()) {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_blez(&mut self, instruction: Instruction) {
        if (self.reg(instruction.rs()) as i32) <= 0 {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_bgtz(&mut self, instruction: Instruction) {
        if (self.reg(instruction.rs()) as i32) > 0 {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_bltz(&mut self, instruction: Instruction) {
        if (self.reg(instruction.rs()) as i32) < 0 {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_bgez(&mut self, instruction: Instruction) {
        if (self.reg(instruction.rs()) as i32) >= 0 {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    // The link happens whether or not the branch is taken
    fn op_bltzal(&mut self, instruction: Instruction) {
        let taken = (self.reg(instruction.rs()) as i32) < 0;
        self.set_reg(RA, self.next_pc);
        if taken {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_bgezal(&mut self, instruction: Instruction) {
        let taken = (self.reg(instruction.rs()) as i32) >= 0;
        self.set_reg(RA, self.next_pc);
        if taken {
            self.branch(R3000::branch_offset(instruction));
        }
    }

    fn op_mfc0(&mut self, instruction: Instruction) {
        let value = self.cop0.read(instruction.cop0_rd());
        self.schedule_load(instruction.rt(), value);
    }

    fn op_mtc0(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rt());
        let index = instruction.cop0_rd();
        if index == SR {
            trace!("SR <- 0x{:08X}", value);
        }
        self.pending_cop0.write(index, value);
    }

    fn op_rfe(&mut self) {
        self.pending_cop0.return_from_exception();
    }
}
