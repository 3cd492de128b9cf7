use clap::Parser;

use stablebridge::cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();

    run(&mut stdout, cli).await
}
