use std::fmt;

use super::instruction::{Instruction, Opcode};

const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3",
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7",
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

const COP0_REGISTER_NAMES: [&str; 32] = [
    "r0", "r1", "r2", "bpc", "r4", "bda", "tar", "dcic",
    "bada", "bdam", "r10", "bpcm", "sr", "cause", "epc", "prid",
    "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23",
    "r24", "r25", "r26", "r27", "r28", "r29", "r30", "r31",
];

pub fn register_name(index: usize) -> &'static str {
    REGISTER_NAMES[index]
}

pub fn cop0_register_name(index: usize) -> &'static str {
    COP0_REGISTER_NAMES[index]
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mnemonic();
        let rs = register_name(self.rs());
        let rt = register_name(self.rt());
        let rd = register_name(self.rd());
        let simm = self.imm16_se() as i32;

        match self.opcode() {
            Opcode::Sll if self.word() == 0 => write!(f, "nop"),

            Opcode::Add | Opcode::Addu | Opcode::Sub | Opcode::Subu
            | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Nor
            | Opcode::Slt | Opcode::Sltu => write!(f, "{m} ${rd}, ${rs}, ${rt}"),

            Opcode::Sllv | Opcode::Srlv | Opcode::Srav => write!(f, "{m} ${rd}, ${rt}, ${rs}"),

            Opcode::Sll | Opcode::Srl | Opcode::Sra => {
                write!(f, "{m} ${rd}, ${rt}, {}", self.shamt())
            }

            Opcode::Addi | Opcode::Addiu | Opcode::Slti | Opcode::Sltiu => {
                write!(f, "{m} ${rt}, ${rs}, {simm}")
            }

            Opcode::Andi | Opcode::Ori | Opcode::Xori => {
                write!(f, "{m} ${rt}, ${rs}, 0x{:x}", self.imm16())
            }

            Opcode::Lui => write!(f, "{m} ${rt}, 0x{:x}", self.imm16()),

            Opcode::Mult | Opcode::Multu | Opcode::Div | Opcode::Divu => {
                write!(f, "{m} ${rs}, ${rt}")
            }

            Opcode::Mfhi | Opcode::Mflo => write!(f, "{m} ${rd}"),
            Opcode::Mthi | Opcode::Mtlo => write!(f, "{m} ${rs}"),

            Opcode::Lb | Opcode::Lbu | Opcode::Lh | Opcode::Lhu | Opcode::Lw
            | Opcode::Lwl | Opcode::Lwr | Opcode::Sb | Opcode::Sh | Opcode::Sw
            | Opcode::Swl | Opcode::Swr => {
                write!(f, "{m} ${rt}, {simm}(${})", register_name(self.base()))
            }

            Opcode::J | Opcode::Jal => write!(f, "{m} 0x{:08x}", self.jump_target() << 2),
            Opcode::Jr => write!(f, "{m} ${rs}"),
            Opcode::Jalr => write!(f, "{m} ${rd}, ${rs}"),

            Opcode::Beq | Opcode::Bne => write!(f, "{m} ${rs}, ${rt}, {}", simm << 2),

            Opcode::Blez | Opcode::Bgtz | Opcode::Bltz | Opcode::Bgez
            | Opcode::Bltzal | Opcode::Bgezal => write!(f, "{m} ${rs}, {}", simm << 2),

            Opcode::Mfc0 | Opcode::Mtc0 => {
                write!(f, "{m} ${rt}, ${}", cop0_register_name(self.cop0_rd()))
            }

            Opcode::Rfe | Opcode::Syscall | Opcode::Break | Opcode::Cop1 | Opcode::Cop3 => {
                write!(f, "{m}")
            }

            Opcode::Unknown => write!(f, "{m} ({})", self.as_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(word: u32) -> String {
        Instruction::new(word).to_string()
    }

    #[test]
    fn names() {
        assert_eq!(register_name(0), "zero");
        assert_eq!(register_name(29), "sp");
        assert_eq!(register_name(31), "ra");
        assert_eq!(cop0_register_name(12), "sr");
        assert_eq!(cop0_register_name(13), "cause");
        assert_eq!(cop0_register_name(14), "epc");
        assert_eq!(cop0_register_name(20), "r20");
    }

    #[test]
    #[should_panic]
    fn register_index_past_31_is_rejected() {
        register_name(32);
    }

    #[test]
    #[should_panic]
    fn cop0_register_index_past_31_is_rejected() {
        cop0_register_name(40);
    }

    #[test]
    fn renders_assembly() {
        assert_eq!(text(0x0000_0000), "nop");
        assert_eq!(text(0x3C08_0013), "lui $t0, 0x13");
        assert_eq!(text(0x3508_243F), "ori $t0, $t0, 0x243f");
        assert_eq!(text(0x27BD_FFE8), "addiu $sp, $sp, -24");
        assert_eq!(text(0x8FA8_0004), "lw $t0, 4($sp)");
        assert_eq!(text(0x1509_FFFE), "bne $t0, $t1, -8");
        assert_eq!(text(0x408C_6000), "mtc0 $t4, $sr");
        assert_eq!(text(0x0109_5021), "addu $t2, $t0, $t1");
        assert_eq!(text(0x0BF0_0054), "j 0x0fc00150");
        assert_eq!(text(0x03E0_0008), "jr $ra");
        assert_eq!(text(0x4200_0010), "rfe");
        assert_eq!(text(0xFC00_0000), "unknown (0xfc000000)");
    }
}
