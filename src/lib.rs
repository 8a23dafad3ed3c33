extern crate thiserror;

pub mod cmd;
pub mod compiler;
pub mod eval;
pub mod frontend;
pub mod repl;
pub mod vm;

pub const TAMARIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base directory for user-local state (REPL history and friends).
pub fn tamarin_config_directory() -> std::path::PathBuf {
    directories::ProjectDirs::from("", "", "tamarin")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from(".tamarin"))
}

#[cfg(test)]
#[macro_use]
extern crate matches;

#[cfg(test)]
extern crate quickcheck;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
