use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "checkin", version, about = "Daily check-in for the credits service")]
struct Cli {
    /// Echo logs to stdout and print paths and the run result
    #[arg(long)]
    test: bool,

    /// Send a test email and exit
    #[arg(long, conflicts_with = "init")]
    test_email: bool,

    /// Config document (default: ~/.config/daily-checkin/checkin_config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep the day ledger in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Write a template config document and exit
    #[arg(long)]
    init: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = commands::config_path(cli.config).and_then(|path| {
        if cli.init {
            commands::init::run(&path)
        } else {
            let opts = commands::RunOptions {
                verbose: cli.test,
                ephemeral: cli.ephemeral,
            };
            if cli.test_email {
                commands::checkin::test_email(&path, opts)
            } else {
                commands::checkin::run(&path, opts)
            }
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
