//! pkb: search your personal knowledge base from one place.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pkb::auth::{self, AccessTokenProvider, Flow, OAuthConfig, TokenSource};
use pkb::connectors::gdrive::DriveApiClient;
use pkb::connectors::gmail::GmailApiClient;
use pkb::connectors::{Connector, DriveConnector, GmailConnector, SearchHit};
use pkb::server::{self, AppState};
use pkb::{ApiClient, SearchEngine, Settings};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkb", version, about = "Search your personal knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search across connected sources
    Search {
        /// Query terms
        query: Vec<String>,
        /// Restrict the search to these sources (e.g. google-drive, gmail)
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
    },
    /// Run the HTTP API server
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(long)]
        addr: Option<String>,
    },
    /// Interactive terminal UI
    #[command(alias = "tui")]
    Interactive,
    /// Authorize access to your Google account
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pkb=info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Command::Search { query, sources } => {
            let query = query.join(" ");
            if query.trim().is_empty() {
                bail!("usage: pkb search <query>");
            }

            let engine = build_engine(&settings)?;
            let (addr, server) = server::spawn_ephemeral(AppState::new(engine)).await?;
            let client = ApiClient::new(format!("http://{addr}"))?;

            let sources = if sources.is_empty() {
                None
            } else {
                Some(sources.as_slice())
            };
            let results = client.search(&query, sources).await;
            server.abort();
            print_results(&results?);
        }
        Command::Serve { addr } => {
            let engine = build_engine(&settings)?;
            let addr = addr.unwrap_or_else(|| settings.server.addr.clone());
            server::serve(&addr, AppState::new(engine)).await?;
        }
        Command::Interactive => {
            let engine = build_engine(&settings)?;
            let (addr, server) = server::spawn_ephemeral(AppState::new(engine)).await?;
            let client = ApiClient::new(format!("http://{addr}"))?;

            let result = pkb::tui::run(client).await;
            server.abort();
            result?;
        }
        Command::Auth => authorize(&settings).await?,
    }

    Ok(())
}

/// Wire up the Drive and Gmail connectors from saved credentials.
fn build_engine(settings: &Settings) -> Result<SearchEngine> {
    if !settings.google.is_configured() {
        bail!(
            "Google credentials are not configured; set PKB_GOOGLE_CLIENT_ID and \
             PKB_GOOGLE_CLIENT_SECRET or add them to the config file"
        );
    }

    let token = auth::load_token(&settings.token_path).with_context(|| {
        format!(
            "no usable token at {}; run `pkb auth` first",
            settings.token_path.display()
        )
    })?;

    let config = OAuthConfig::google(
        settings.google.client_id.clone(),
        settings.google.client_secret.clone(),
    );
    let tokens: Arc<dyn AccessTokenProvider> =
        Arc::new(TokenSource::new(config, settings.token_path.clone(), token));

    let connectors = vec![
        Arc::new(DriveConnector::new(DriveApiClient::new(tokens.clone()))) as Arc<dyn Connector>,
        Arc::new(GmailConnector::new(GmailApiClient::new(tokens))),
    ];
    Ok(SearchEngine::new(connectors))
}

async fn authorize(settings: &Settings) -> Result<()> {
    if !settings.google.is_configured() {
        bail!(
            "Google credentials are not configured; set PKB_GOOGLE_CLIENT_ID and \
             PKB_GOOGLE_CLIENT_SECRET or add them to the config file"
        );
    }

    let flow = Flow {
        config: OAuthConfig::google(
            settings.google.client_id.clone(),
            settings.google.client_secret.clone(),
        ),
        open_url: Box::new(open_in_browser),
        listen_addr: None,
    };

    println!("Opening your browser to authorize access...");
    let token = flow.run().await?;
    auth::save_token(&settings.token_path, &token)?;
    println!(
        "Authorization complete. Token saved to {}",
        settings.token_path.display()
    );
    Ok(())
}

fn open_in_browser(url: &str) -> Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    match std::process::Command::new(program).arg(url).status() {
        Ok(status) if status.success() => {}
        _ => println!("Could not open a browser. Visit this URL to authorize:\n\n  {url}\n"),
    }
    Ok(())
}

fn print_results(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, hit.title, hit.source);
        if !hit.snippet.is_empty() {
            println!("   {}", truncate_snippet(&hit.snippet, 80));
        }
        println!("   {}", hit.url);
    }
}

fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    if snippet.chars().count() <= max_chars {
        snippet.to_string()
    } else {
        let cut: String = snippet.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
