use crate::cmd::Engine;
use crate::compiler::Compiler;
use crate::eval;
use crate::eval::environment::Environment;
use crate::frontend::parser;
use crate::vm::value::Value;
use crate::vm::VM;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about = "Run the file specified by <input>")]
pub struct Opts {
    pub input: PathBuf,
    #[clap(long, arg_enum, default_value = "vm")]
    pub engine: Engine,
}

pub fn execute(opts: &Opts) -> anyhow::Result<()> {
    log::debug!("running {} with engine {}", opts.input.display(), opts.engine);

    let source = std::fs::read_to_string(&opts.input)?;
    let program = parser::parse(&source)?;

    let result = match opts.engine {
        Engine::Vm => {
            let mut compiler = Compiler::new();
            let bytecode = compiler.compile(&program)?;
            VM::new(bytecode).run()?
        }
        Engine::Eval => eval::eval_program(&program, &Environment::new_env()),
    };

    match result {
        Value::Null => Ok(()),
        Value::Error(message) => Err(anyhow::anyhow!("{}", message)),
        value => {
            println!("{}", value);
            Ok(())
        }
    }
}
