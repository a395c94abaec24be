use clap::Parser;
use experiments_engine::cli::{self, Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Show(args) => cli::assignments::show(args),
        Command::Set(args) => cli::assignments::set(args),
        Command::Clear => cli::assignments::clear(),
        Command::Assign(args) => cli::assign::run(args),
    }
}
