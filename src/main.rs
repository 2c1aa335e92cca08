//! descdiff - differential test harness for descriptor-file tools
//!
//! Runs a baseline and a modified tool over a corpus of descriptor files
//! and reports every entry where their normalized output differs.

use clap::Parser;
use descdiff::commands::RunArgs;
use descdiff::report::EXIT_USAGE;
use descdiff::{cli, common::logging};

#[derive(Parser)]
#[command(name = "descdiff", about = "Diff a baseline and a modified tool over a descriptor corpus")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.run.verbose);

    let code = match cli::dispatch(cli.run).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_usage() {
                EXIT_USAGE
            } else {
                1
            }
        }
    };

    std::process::exit(code);
}
