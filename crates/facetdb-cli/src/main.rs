use anyhow::Context;
use clap::Parser;
use facetdb_cli::{commands, load_config, logging, Cli, Command};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init_logging(&config.logging)?;

    log::info!(
        "Opening {} store at {}",
        config.storage.engine,
        config.storage.data_path
    );
    let store = facetdb_store::open_store(&config)?;

    match cli.command {
        Command::Export { output, pretty } => {
            let count = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Cannot create {}", path.display()))?;
                    commands::export(&store, BufWriter::new(file), pretty).await?
                }
                None => commands::export(&store, io::stdout().lock(), pretty).await?,
            };
            log::info!("Exported {} item(s)", count);
        }
        Command::Import { input } => {
            let count = if input.as_os_str() == "-" {
                commands::import(&store, io::stdin().lock()).await?
            } else {
                let file = File::open(&input)
                    .with_context(|| format!("Cannot open {}", input.display()))?;
                commands::import(&store, BufReader::new(file)).await?
            };
            log::info!("Imported {} item(s)", count);
        }
        Command::Truncate { yes } => {
            let removed = commands::truncate(&store, yes).await?;
            log::info!("Removed {} item(s)", removed);
        }
        Command::Stats => commands::stats(&store, io::stdout().lock()).await?,
    }

    Ok(())
}
