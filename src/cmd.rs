pub mod compile;
pub mod repl;
pub mod run;

use clap::{ArgEnum, Parser, Subcommand};
use std::fmt;

#[derive(Parser, Debug)]
#[clap(
    name = "tamarin",
    version,
    about = "A bytecode compiler and VM for the tamarin language"
)]
pub struct Opts {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Repl(repl::Opts),
    Run(run::Opts),
    Compile(compile::Opts),
}

/// Which of the two engines executes the program. They agree on results;
/// the evaluator exists to cross-check the VM and to aid debugging.
#[derive(ArgEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Engine {
    Vm,
    Eval,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Engine::Vm => write!(f, "vm"),
            Engine::Eval => write!(f, "eval"),
        }
    }
}

pub fn execute(opts: &Opts) -> anyhow::Result<()> {
    match &opts.command {
        None => repl::execute(&repl::Opts::default()),
        Some(Command::Repl(opts)) => repl::execute(opts),
        Some(Command::Run(opts)) => run::execute(opts),
        Some(Command::Compile(opts)) => compile::execute(opts),
    }
}
