use crate::cmd::Engine;
use crate::repl::Repl;
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(about = "Start the interactive session")]
pub struct Opts {
    #[clap(long, arg_enum, default_value = "vm")]
    pub engine: Engine,
}

impl Default for Opts {
    fn default() -> Self {
        Self { engine: Engine::Vm }
    }
}

pub fn execute(opts: &Opts) -> anyhow::Result<()> {
    Repl::new(opts.engine)?.run_loop()
}
