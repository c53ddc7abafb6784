mod cli;
mod commands;
mod host;
mod paths;
mod run;
mod state;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::run(cli)
}
