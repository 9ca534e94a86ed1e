use anyhow::Context;
use clap::{Parser, Subcommand};

use folio_app::modules::reviews::fetcher::{self, BookFetcher};
use folio_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Book catalog and review service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Fetch one book from the remote catalog, bypassing the cache
    Lookup {
        /// Catalog id of the book
        book_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load Folio settings")?;
    folio_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => folio_app::serve(settings).await,
        Command::Migrate => {
            let applied = folio_app::migrate(&settings).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Lookup { book_id } => lookup(&settings, &book_id).await,
    }
}

async fn lookup(settings: &Settings, book_id: &str) -> anyhow::Result<()> {
    let fetcher = fetcher::from_settings(&settings.catalog).context("invalid catalog settings")?;

    match fetcher.fetch(book_id).await {
        Ok(book) => {
            println!("found: {} by {} ({}) [id {}]", book.title, book.author, book.year, book.id);
            Ok(())
        }
        Err(err) => {
            tracing::debug!(book_id, transport = fetcher.transport(), error = %err, "lookup failed");
            anyhow::bail!("{}: {err}", err.outcome())
        }
    }
}
