mod cmd;

use crate::cmd::cli::Cli;
use crate::cmd::config::Config;

use clap::Parser;
use env_logger::Env;
use std::process;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg: Config = cli.into_config();
    if let Err(e) = cfg.run() {
        eprintln!("{e}");
        process::exit(1);
    }
}
