use crate::cmd::Engine;
use crate::compiler::Compiler;
use crate::eval;
use crate::eval::environment::{Env, Environment};
use crate::frontend::parser;
use crate::tamarin_config_directory;
use crate::vm::global::Globals;
use crate::vm::value::Value;
use crate::vm::VM;
use crate::TAMARIN_VERSION;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::result::Result::Err;

/// The interactive session. Compiler state and globals (or the evaluator's
/// environment) are threaded across inputs, so definitions from earlier
/// lines stay visible.
pub struct Repl {
    engine: Engine,
    editor: Editor<()>,
    compiler: Compiler,
    globals: Globals,
    env: Env,
}

impl Repl {
    pub fn new(engine: Engine) -> anyhow::Result<Self> {
        Self::create_directories()?;

        let editor = Editor::<()>::with_config(Self::default_config());

        Ok(Self {
            engine,
            editor,
            compiler: Compiler::new(),
            globals: Globals::new(),
            env: Environment::new_env(),
        })
    }

    // main read-eval-print loop
    pub fn run_loop(&mut self) -> anyhow::Result<()> {
        self.editor.load_history(&Self::history_path())?;
        self.banner();

        loop {
            let line = self.read_line();

            match line {
                Ok(input) => match self.eval(&input) {
                    Ok(_) => (),
                    Err(e) => {
                        eprintln!("{}", e);
                    }
                },
                Err(err) => match err.downcast_ref() {
                    Some(ReadlineError::Interrupted) => {
                        println!("CTRL-C");
                        break;
                    }
                    Some(ReadlineError::Eof) => {
                        println!("CTRL-D");
                        break;
                    }
                    err => {
                        println!("Error: {:?}", err);
                        break;
                    }
                },
            }
        }

        self.editor.save_history(&Self::history_path())?;
        Ok(())
    }

    fn banner(&self) {
        println!("TAMARIN - bytecode at your fingertips");
        println!("Version: {}", TAMARIN_VERSION);
        println!("Engine: {}\n", self.engine);
    }

    fn read_line(&mut self) -> anyhow::Result<String> {
        let line = self.editor.readline(">> ")?;
        Ok(line)
    }

    fn eval(&mut self, source: &str) -> anyhow::Result<()> {
        let program = parser::parse(source)?;

        match self.engine {
            Engine::Vm => {
                let bytecode = self.compiler.compile(&program)?;
                let mut vm = VM::with_globals(bytecode, std::mem::take(&mut self.globals));
                let result = vm.run();
                self.globals = vm.into_globals();

                match result? {
                    Value::Null => (),
                    value => println!("{}", value),
                }
            }
            Engine::Eval => match eval::eval_program(&program, &self.env) {
                Value::Null => (),
                value @ Value::Error(_) => eprintln!("{}", value),
                value => println!("{}", value),
            },
        }

        Ok(())
    }

    fn default_config() -> rustyline::config::Config {
        let config_builder = rustyline::config::Config::builder();

        config_builder
            .auto_add_history(true)
            .history_ignore_dups(true)
            .history_ignore_space(false)
            .max_history_size(500)
            .build()
    }

    fn history_path() -> std::path::PathBuf {
        Self::config_dir().join("history")
    }

    #[inline]
    fn create_directories() -> anyhow::Result<()> {
        std::fs::create_dir_all(Self::config_dir())?;

        if !Self::history_path().exists() {
            std::fs::File::create(Self::history_path())?;
        }

        Ok(())
    }

    #[inline]
    fn config_dir() -> std::path::PathBuf {
        tamarin_config_directory().join("repl")
    }
}
