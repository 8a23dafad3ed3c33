use std::fmt::Write;

/// The opcode space shared by the compiler and the VM.
///
/// Every instruction is a single opcode byte followed by the operands its
/// `Definition` declares. Operands are fixed width (one or two bytes) and
/// two-byte operands are encoded big-endian. The discriminant values are the
/// wire encoding, so the catalog below must never be reordered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Constant = 0,
    Add,
    Sub,
    Mul,
    Div,
    True,
    False,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    Minus,
    Bang,
    Pop,
    CurrentClosure,
    JumpNotTruthy,
    Jump,
    Null,
    GetGlobal,
    SetGlobal,
    SetLocal,
    GetLocal,
    Array,
    Hash,
    Index,
    ReturnValue,
    Return,
    Call,
    GetBuiltin,
    Closure,
    GetFree,
}

#[derive(Debug, PartialEq)]
pub struct Definition {
    pub name: &'static str,
    pub operand_widths: &'static [usize],
}

// Indexed by opcode byte. Keep in sync with `Op` and `OPS`.
const DEFINITIONS: [Definition; 31] = [
    Definition { name: "OpConstant", operand_widths: &[2] },
    Definition { name: "OpAdd", operand_widths: &[] },
    Definition { name: "OpSub", operand_widths: &[] },
    Definition { name: "OpMul", operand_widths: &[] },
    Definition { name: "OpDiv", operand_widths: &[] },
    Definition { name: "OpTrue", operand_widths: &[] },
    Definition { name: "OpFalse", operand_widths: &[] },
    Definition { name: "OpEqual", operand_widths: &[] },
    Definition { name: "OpNotEqual", operand_widths: &[] },
    Definition { name: "OpGreaterThan", operand_widths: &[] },
    Definition { name: "OpLessThan", operand_widths: &[] },
    Definition { name: "OpMinus", operand_widths: &[] },
    Definition { name: "OpBang", operand_widths: &[] },
    Definition { name: "OpPop", operand_widths: &[] },
    Definition { name: "OpCurrentClosure", operand_widths: &[] },
    Definition { name: "OpJumpNotTruthy", operand_widths: &[2] },
    Definition { name: "OpJump", operand_widths: &[2] },
    Definition { name: "OpNull", operand_widths: &[] },
    Definition { name: "OpGetGlobal", operand_widths: &[2] },
    Definition { name: "OpSetGlobal", operand_widths: &[2] },
    Definition { name: "OpSetLocal", operand_widths: &[1] },
    Definition { name: "OpGetLocal", operand_widths: &[1] },
    Definition { name: "OpArray", operand_widths: &[2] },
    Definition { name: "OpHash", operand_widths: &[2] },
    Definition { name: "OpIndex", operand_widths: &[] },
    Definition { name: "OpReturnValue", operand_widths: &[] },
    Definition { name: "OpReturn", operand_widths: &[] },
    Definition { name: "OpCall", operand_widths: &[1] },
    Definition { name: "OpGetBuiltin", operand_widths: &[1] },
    Definition { name: "OpClosure", operand_widths: &[2, 1] },
    Definition { name: "OpGetFree", operand_widths: &[1] },
];

const OPS: [Op; 31] = [
    Op::Constant,
    Op::Add,
    Op::Sub,
    Op::Mul,
    Op::Div,
    Op::True,
    Op::False,
    Op::Equal,
    Op::NotEqual,
    Op::GreaterThan,
    Op::LessThan,
    Op::Minus,
    Op::Bang,
    Op::Pop,
    Op::CurrentClosure,
    Op::JumpNotTruthy,
    Op::Jump,
    Op::Null,
    Op::GetGlobal,
    Op::SetGlobal,
    Op::SetLocal,
    Op::GetLocal,
    Op::Array,
    Op::Hash,
    Op::Index,
    Op::ReturnValue,
    Op::Return,
    Op::Call,
    Op::GetBuiltin,
    Op::Closure,
    Op::GetFree,
];

impl Op {
    pub fn definition(self) -> &'static Definition {
        &DEFINITIONS[self as usize]
    }

    /// Decode an opcode byte. Returns `None` for bytes outside the catalog,
    /// which the VM reports as a runtime error rather than misbehaving.
    pub fn from_byte(byte: u8) -> Option<Op> {
        OPS.get(byte as usize).copied()
    }
}

pub fn lookup(byte: u8) -> Option<&'static Definition> {
    Op::from_byte(byte).map(Op::definition)
}

/// Encode a single instruction.
///
/// Surplus operands are ignored and missing operands are simply not encoded;
/// the compiler always passes exactly as many operands as the definition
/// declares, and the tests pin that down.
pub fn make(op: Op, operands: &[usize]) -> Vec<u8> {
    let def = op.definition();
    let length = 1 + def.operand_widths.iter().sum::<usize>();
    let mut instruction = Vec::with_capacity(length);
    instruction.push(op as u8);

    for (operand, width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction.push(*operand as u8),
            _ => unreachable!("operand widths are 1 or 2 bytes"),
        }
    }

    instruction
}

/// Decode the operand region of a single instruction (everything after the
/// opcode byte). Returns the operand values and the number of bytes read.
pub fn read_operands(def: &Definition, bytes: &[u8]) -> (Vec<usize>, usize) {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for width in def.operand_widths {
        match width {
            2 => operands.push(read_u16(&bytes[offset..]) as usize),
            1 => operands.push(read_u8(&bytes[offset..]) as usize),
            _ => unreachable!("operand widths are 1 or 2 bytes"),
        }
        offset += width;
    }

    (operands, offset)
}

#[inline]
pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

#[inline]
pub fn read_u8(bytes: &[u8]) -> u8 {
    bytes[0]
}

/// One compiled instruction stream. Grows by appends during compilation;
/// the only in-place mutation is the fixed-width patch of a jump operand.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instructions {
    pub bytes: Vec<u8>,
}

impl Instructions {
    pub fn new() -> Self {
        Self { bytes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append an encoded instruction and return the address it was placed at.
    pub fn append(&mut self, instruction: &[u8]) -> usize {
        let address = self.bytes.len();
        self.bytes.extend_from_slice(instruction);
        address
    }

    /// Overwrite the instruction at `address` in place. The replacement must
    /// have the same width as the original.
    pub fn patch(&mut self, address: usize, instruction: &[u8]) {
        self.bytes[address..address + instruction.len()].copy_from_slice(instruction);
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Render the stream as one line per instruction: `offset name operands`.
    /// Undefined opcodes and an instruction truncated mid-operand render as
    /// inline error markers instead of aborting, so corrupt streams still
    /// disassemble.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut address = 0;

        while address < self.bytes.len() {
            match lookup(self.bytes[address]) {
                Some(def) => {
                    let width: usize = def.operand_widths.iter().sum();
                    if address + 1 + width > self.bytes.len() {
                        writeln!(out, "{:04} ERROR: truncated {}", address, def.name).unwrap();
                        break;
                    }
                    let (operands, read) = read_operands(def, &self.bytes[address + 1..]);
                    writeln!(out, "{:04} {}", address, fmt_instruction(def, &operands)).unwrap();
                    address += 1 + read;
                }
                None => {
                    writeln!(out, "{:04} ERROR: undefined opcode {}", address, self.bytes[address])
                        .unwrap();
                    address += 1;
                }
            }
        }

        out
    }
}

fn fmt_instruction(def: &Definition, operands: &[usize]) -> String {
    match operands {
        [] => def.name.to_string(),
        [a] => format!("{} {}", def.name, a),
        [a, b] => format!("{} {} {}", def.name, a, b),
        _ => format!("ERROR: unhandled operand count for {}", def.name),
    }
}
