use clap::{Parser, Subcommand};
use readknead::cli::{run_process, RunArgs};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(RunArgs),
}

fn main() {
    let args = Cli::parse();

    let result = match args.command {
        Commands::Run(run_args) => run_process(run_args),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
