use crate::compiler::Compiler;
use crate::frontend::parser;
use crate::vm::disassembler::Disassembler;
use crate::vm::value::Value;
use clap::Parser;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about = "Compile the file specified by <input> and print its bytecode")]
pub struct Opts {
    pub input: PathBuf,
}

pub fn execute(opts: &Opts) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&opts.input)?;
    let program = parser::parse(&source)?;

    let mut compiler = Compiler::new();
    let bytecode = compiler.compile(&program)?;

    let mut disassembler = Disassembler::new(io::stdout());
    disassembler.disassemble(&bytecode.instructions, &bytecode.constants, "main")?;

    for (index, constant) in bytecode.constants.iter().enumerate() {
        if let Value::Function(function) = constant {
            disassembler.disassemble(
                &function.instructions,
                &bytecode.constants,
                &format!("function @ constant {}", index),
            )?;
        }
    }

    Ok(())
}
