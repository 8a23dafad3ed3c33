use super::byte_code::{lookup, read_operands, Instructions, Op};
use super::value::Value;
use std::io::Write;

/// Pretty-printer for compiled code. Unlike `Instructions::disassemble`, which
/// renders raw operands only, this writer annotates constant-loading
/// instructions with the constant they refer to.
pub struct Disassembler<T: Write> {
    writer: T,
}

impl<T: Write> Disassembler<T> {
    pub fn new(writer: T) -> Disassembler<T> {
        Disassembler { writer }
    }

    pub fn disassemble(
        &mut self,
        instructions: &Instructions,
        constants: &[Value],
        context: &str,
    ) -> std::io::Result<()> {
        writeln!(self.writer, "== {} ==", context)?;

        let mut address = 0;
        while address < instructions.len() {
            address = self.disassemble_instruction(instructions, constants, address)?;
        }
        writeln!(self.writer)
    }

    fn disassemble_instruction(
        &mut self,
        instructions: &Instructions,
        constants: &[Value],
        address: usize,
    ) -> std::io::Result<usize> {
        let byte = instructions.bytes[address];

        let def = match lookup(byte) {
            Some(def) => def,
            None => {
                writeln!(self.writer, "{:04} ERROR: undefined opcode {}", address, byte)?;
                return Ok(address + 1);
            }
        };

        let width: usize = def.operand_widths.iter().sum();
        if address + 1 + width > instructions.len() {
            writeln!(self.writer, "{:04} ERROR: truncated {}", address, def.name)?;
            return Ok(instructions.len());
        }

        let (operands, read) = read_operands(def, &instructions.bytes[address + 1..]);
        write!(self.writer, "{:04} {:<16}", address, def.name)?;
        for operand in &operands {
            write!(self.writer, " {:04}", operand)?;
        }

        match Op::from_byte(byte) {
            Some(Op::Constant) | Some(Op::Closure) => {
                if let Some(constant) = constants.get(operands[0]) {
                    write!(self.writer, "        '{}'", constant)?;
                }
            }
            _ => (),
        }

        writeln!(self.writer)?;
        Ok(address + 1 + read)
    }
}
