use clap::Parser;
use tamarin::cmd;

fn main() {
    pretty_env_logger::init();

    let opts = cmd::Opts::parse();
    if let Err(e) = cmd::execute(&opts) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
