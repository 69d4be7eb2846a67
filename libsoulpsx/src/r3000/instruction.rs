/*
    MIPS-I instruction decoding
*/

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ALU
    Add,
    Addu,
    Addi,
    Addiu,
    Sub,
    Subu,
    And,
    Andi,
    Or,
    Ori,
    Xor,
    Xori,
    Nor,
    Slt,
    Sltu,
    Slti,
    Sltiu,
    Lui,

    // Shifts
    Sll,
    Srl,
    Sra,
    Sllv,
    Srlv,
    Srav,

    // Multiply / divide
    Mult,
    Multu,
    Div,
    Divu,
    Mfhi,
    Mflo,
    Mthi,
    Mtlo,

    // Loads and stores
    Lb,
    Lbu,
    Lh,
    Lhu,
    Lw,
    Lwl,
    Lwr,
    Sb,
    Sh,
    Sw,
    Swl,
    Swr,

    // Jumps and branches
    J,
    Jal,
    Jr,
    Jalr,
    Beq,
    Bne,
    Blez,
    Bgtz,
    Bltz,
    Bgez,
    Bltzal,
    Bgezal,

    // System
    Mfc0,
    Mtc0,
    Rfe,
    Syscall,
    Break,
    Cop1,
    Cop3,

    Unknown,
}

impl Opcode {
    pub fn decode(word: u32) -> Opcode {
        let primary = word >> 26;

        match primary {
            0b000000 => Opcode::decode_special(word),
            0b000001 => Opcode::decode_regimm(word),
            0b000010 => Opcode::J,
            0b000011 => Opcode::Jal,
            0b000100 => Opcode::Beq,
            0b000101 => Opcode::Bne,
            0b000110 => Opcode::Blez,
            0b000111 => Opcode::Bgtz,
            0b001000 => Opcode::Addi,
            0b001001 => Opcode::Addiu,
            0b001010 => Opcode::Slti,
            0b001011 => Opcode::Sltiu,
            0b001100 => Opcode::Andi,
            0b001101 => Opcode::Ori,
            0b001110 => Opcode::Xori,
            0b001111 => Opcode::Lui,
            0b010000 => Opcode::decode_cop0(word),
            0b010001 => Opcode::Cop1,
            0b010011 => Opcode::Cop3,
            0b100000 => Opcode::Lb,
            0b100001 => Opcode::Lh,
            0b100010 => Opcode::Lwl,
            0b100011 => Opcode::Lw,
            0b100100 => Opcode::Lbu,
            0b100101 => Opcode::Lhu,
            0b100110 => Opcode::Lwr,
            0b101000 => Opcode::Sb,
            0b101001 => Opcode::Sh,
            0b101010 => Opcode::Swl,
            0b101011 => Opcode::Sw,
            0b101110 => Opcode::Swr,
            _ => Opcode::Unknown,
        }
    }

    fn decode_special(word: u32) -> Opcode {
        match word & 0x3F {
            0b000000 => Opcode::Sll,
            0b000010 => Opcode::Srl,
            0b000011 => Opcode::Sra,
            0b000100 => Opcode::Sllv,
            0b000110 => Opcode::Srlv,
            0b000111 => Opcode::Srav,
            0b001000 => Opcode::Jr,
            0b001001 => Opcode::Jalr,
            0b001100 => Opcode::Syscall,
            0b001101 => Opcode::Break,
            0b010000 => Opcode::Mfhi,
            0b010001 => Opcode::Mthi,
            0b010010 => Opcode::Mflo,
            0b010011 => Opcode::Mtlo,
            0b011000 => Opcode::Mult,
            0b011001 => Opcode::Multu,
            0b011010 => Opcode::Div,
            0b011011 => Opcode::Divu,
            0b100000 => Opcode::Add,
            0b100001 => Opcode::Addu,
            0b100010 => Opcode::Sub,
            0b100011 => Opcode::Subu,
            0b100100 => Opcode::And,
            0b100101 => Opcode::Or,
            0b100110 => Opcode::Xor,
            0b100111 => Opcode::Nor,
            0b101010 => Opcode::Slt,
            0b101011 => Opcode::Sltu,
            _ => Opcode::Unknown,
        }
    }

    fn decode_regimm(word: u32) -> Opcode {
        match (word >> 16) & 0x1F {
            0b00000 => Opcode::Bltz,
            0b00001 => Opcode::Bgez,
            0b10000 => Opcode::Bltzal,
            0b10001 => Opcode::Bgezal,
            _ => Opcode::Unknown,
        }
    }

    fn decode_cop0(word: u32) -> Opcode {
        match (word >> 21) & 0x1F {
            0b00000 => Opcode::Mfc0,
            0b00100 => Opcode::Mtc0,
            0b10000 if word & 0x3F == 0b010000 => Opcode::Rfe,
            _ => Opcode::Unknown,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Addu => "addu",
            Opcode::Addi => "addi",
            Opcode::Addiu => "addiu",
            Opcode::Sub => "sub",
            Opcode::Subu => "subu",
            Opcode::And => "and",
            Opcode::Andi => "andi",
            Opcode::Or => "or",
            Opcode::Ori => "ori",
            Opcode::Xor => "xor",
            Opcode::Xori => "xori",
            Opcode::Nor => "nor",
            Opcode::Slt => "slt",
            Opcode::Sltu => "sltu",
            Opcode::Slti => "slti",
            Opcode::Sltiu => "sltiu",
            Opcode::Lui => "lui",
            Opcode::Sll => "sll",
            Opcode::Srl => "srl",
            Opcode::Sra => "sra",
            Opcode::Sllv => "sllv",
            Opcode::Srlv => "srlv",
            Opcode::Srav => "srav",
            Opcode::Mult => "mult",
            Opcode::Multu => "multu",
            Opcode::Div => "div",
            Opcode::Divu => "divu",
            Opcode::Mfhi => "mfhi",
            Opcode::Mflo => "mflo",
            Opcode::Mthi => "mthi",
            Opcode::Mtlo => "mtlo",
            Opcode::Lb => "lb",
            Opcode::Lbu => "lbu",
            Opcode::Lh => "lh",
            Opcode::Lhu => "lhu",
            Opcode::Lw => "lw",
            Opcode::Lwl => "lwl",
            Opcode::Lwr => "lwr",
            Opcode::Sb => "sb",
            Opcode::Sh => "sh",
            Opcode::Sw => "sw",
            Opcode::Swl => "swl",
            Opcode::Swr => "swr",
            Opcode::J => "j",
            Opcode::Jal => "jal",
            Opcode::Jr => "jr",
            Opcode::Jalr => "jalr",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Blez => "blez",
            Opcode::Bgtz => "bgtz",
            Opcode::Bltz => "bltz",
            Opcode::Bgez => "bgez",
            Opcode::Bltzal => "bltzal",
            Opcode::Bgezal => "bgezal",
            Opcode::Mfc0 => "mfc0",
            Opcode::Mtc0 => "mtc0",
            Opcode::Rfe => "rfe",
            Opcode::Syscall => "syscall",
            Opcode::Break => "break",
            Opcode::Cop1 => "cop1",
            Opcode::Cop3 => "cop3",
            Opcode::Unknown => "unknown",
        }
    }
}

/// A raw instruction word together with its decoded opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    word: u32,
    opcode: Opcode,
}

impl Instruction {
    pub fn new(word: u32) -> Self {
        Instruction {
            word,
            opcode: Opcode::decode(word),
        }
    }

    pub fn word(&self) -> u32 {
        self.word
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }

    pub fn as_hex(&self) -> String {
        format!("0x{:08x}", self.word)
    }

    pub fn rs(&self) -> usize {
        ((self.word >> 21) & 0x1F) as usize
    }

    pub fn base(&self) -> usize {
        self.rs()
    }

    pub fn rt(&self) -> usize {
        ((self.word >> 16) & 0x1F) as usize
    }

    pub fn rd(&self) -> usize {
        ((self.word >> 11) & 0x1F) as usize
    }

    /// Destination register of `mtc0`, source of `mfc0`.
    pub fn cop0_rd(&self) -> usize {
        self.rd()
    }

    pub fn shamt(&self) -> u32 {
        (self.word >> 6) & 0x1F
    }

    pub fn imm16(&self) -> u32 {
        self.word & 0xFFFF
    }

    /// The immediate sign extended through i16.
    pub fn imm16_se(&self) -> u32 {
        self.word as u16 as i16 as u32
    }

    pub fn jump_target(&self) -> u32 {
        self.word & 0x03FF_FFFF
    }
}

impl Default for Instruction {
    fn default() -> Self {
        // sll $zero, $zero, 0
        Instruction::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_opcodes() {
        assert_eq!(Opcode::decode(0b001101 << 26), Opcode::Ori);
        assert_eq!(Opcode::decode(0b001111 << 26), Opcode::Lui);
        assert_eq!(Opcode::decode(0b100011 << 26), Opcode::Lw);
        assert_eq!(Opcode::decode(0b101011 << 26), Opcode::Sw);
        assert_eq!(Opcode::decode(0b000010 << 26), Opcode::J);
        assert_eq!(Opcode::decode(0b010011 << 26), Opcode::Cop3);
    }

    #[test]
    fn special_opcodes() {
        assert_eq!(Opcode::decode(0b100000), Opcode::Add);
        assert_eq!(Opcode::decode(0b100001), Opcode::Addu);
        assert_eq!(Opcode::decode(0b001000), Opcode::Jr);
        assert_eq!(Opcode::decode(0b011011), Opcode::Divu);
        assert_eq!(Opcode::decode(0), Opcode::Sll);
        assert_eq!(Opcode::decode(0b111111), Opcode::Unknown);
    }

    #[test]
    fn regimm_opcodes() {
        let regimm = 0b000001 << 26;
        assert_eq!(Opcode::decode(regimm), Opcode::Bltz);
        assert_eq!(Opcode::decode(regimm | (0b00001 << 16)), Opcode::Bgez);
        assert_eq!(Opcode::decode(regimm | (0b10000 << 16)), Opcode::Bltzal);
        assert_eq!(Opcode::decode(regimm | (0b10001 << 16)), Opcode::Bgezal);
        assert_eq!(Opcode::decode(regimm | (0b00011 << 16)), Opcode::Unknown);
    }

    #[test]
    fn cop0_opcodes() {
        let cop0 = 0b010000 << 26;
        assert_eq!(Opcode::decode(cop0 | (0b00100 << 21)), Opcode::Mtc0);
        assert_eq!(Opcode::decode(cop0), Opcode::Mfc0);
        assert_eq!(Opcode::decode(0x4200_0010), Opcode::Rfe);
        assert_eq!(Opcode::decode(0x4200_0001), Opcode::Unknown);
        // COP2 is not modeled
        assert_eq!(Opcode::decode(0b010010 << 26), Opcode::Unknown);
    }

    #[test]
    fn operand_fields() {
        // addiu $sp, $sp, -24
        let instruction = Instruction::new(0x27BD_FFE8);
        assert_eq!(instruction.opcode(), Opcode::Addiu);
        assert_eq!(instruction.rs(), 29);
        assert_eq!(instruction.rt(), 29);
        assert_eq!(instruction.imm16(), 0xFFE8);
        assert_eq!(instruction.imm16_se(), 0xFFFF_FFE8);

        // sll $t0, $t1, 4
        let instruction = Instruction::new(0x0009_4100);
        assert_eq!(instruction.rd(), 8);
        assert_eq!(instruction.rt(), 9);
        assert_eq!(instruction.shamt(), 4);

        // j 0x0BF00054
        let instruction = Instruction::new(0x0BF0_0054);
        assert_eq!(instruction.jump_target(), 0x03F0_0054);
        assert_eq!(instruction.as_hex(), "0x0bf00054");
    }

    #[test]
    fn positive_immediate_is_not_extended() {
        let instruction = Instruction::new(0x3408_7FFF);
        assert_eq!(instruction.imm16_se(), 0x7FFF);
    }
}
