use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagebridge_config::Config;
use pagebridge_engine::{
    Document, FileStore, HttpTransport, PageRef, SiteCredentials, TranscodeLog, Transcoder,
    compile, extract_rules,
};

#[derive(Parser)]
#[command(
    name = "pagebridge",
    version,
    about = "Move pages between a block editor and theme shortcode markup"
)]
struct Cli {
    /// Config file to use instead of ~/.config/pagebridge/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a stored document JSON file and print the markup
    Compile {
        document: PathBuf,
        /// Print the diagnostics report to stderr
        #[arg(long)]
        log: bool,
    },
    /// Print the background rules found in a stylesheet as JSON
    Styles { stylesheet: PathBuf },
    /// Fetch a remote page and save it to the local store
    Import {
        page_id: u64,
        /// Public URL of the page, for the scrape fallback
        #[arg(long)]
        url: Option<String>,
        /// The page is a post rather than a page
        #[arg(long)]
        post: bool,
        /// Local id to store under; defaults to the remote id
        #[arg(long)]
        save_as: Option<String>,
    },
    /// Compile a stored page and publish it to the remote site
    Publish {
        page_id: String,
        #[arg(long)]
        title: String,
        /// Remote page to update; a new page is created when absent
        #[arg(long)]
        remote_id: Option<u64>,
    },
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile { document, log } => compile_file(&document, log),
        Command::Styles { stylesheet } => {
            let css = std::fs::read_to_string(&stylesheet)
                .with_context(|| format!("Failed to read {}", stylesheet.display()))?;
            println!("{}", serde_json::to_string_pretty(&extract_rules(&css))?);
            Ok(())
        }
        Command::Import {
            page_id,
            url,
            post,
            save_as,
        } => {
            let config = load_config(cli.config)?;
            let page = if post {
                PageRef::post(page_id)
            } else {
                PageRef::page(page_id)
            };
            let page = match url {
                Some(url) => page.with_url(url),
                None => page,
            };
            let local_id = save_as.unwrap_or_else(|| page_id.to_string());

            let site = site_transport(&config)?;
            let transcoder = Transcoder::new(&site, &site, FileStore::new(&config.store_path));
            let mut log = TranscodeLog::with_payload_limit(config.log_payload_limit);
            match transcoder.import_page(&page, &local_id, &mut log) {
                Ok(outcome) => {
                    log::info!(
                        "Imported {} nodes from the {} source into {}",
                        outcome.node_count,
                        outcome.strategy,
                        local_id
                    );
                    Ok(())
                }
                Err(e) => fail_with_report(&log, e.into()),
            }
        }
        Command::Publish {
            page_id,
            title,
            remote_id,
        } => {
            let config = load_config(cli.config)?;
            let site = site_transport(&config)?;
            let transcoder = Transcoder::new(&site, &site, FileStore::new(&config.store_path));
            let mut log = TranscodeLog::with_payload_limit(config.log_payload_limit);
            match transcoder.export_page(&page_id, remote_id, &title, &mut log) {
                Ok(outcome) => {
                    println!(
                        "Published {} as {} {} ({} bytes)",
                        page_id,
                        outcome.published.post_type,
                        outcome.published.id,
                        outcome.markup_bytes
                    );
                    Ok(())
                }
                Err(e) => fail_with_report(&log, e.into()),
            }
        }
    }
}

fn compile_file(path: &Path, print_log: bool) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = Document::from_json_bytes(&bytes)
        .with_context(|| format!("{} is not a block document", path.display()))?;

    let mut log = TranscodeLog::new();
    let markup = compile(&document, &mut log);
    println!("{markup}");
    if print_log {
        eprintln!("{}", serde_json::to_string_pretty(&log.export())?);
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = path.unwrap_or_else(Config::config_path);
    log::info!("Config path: {}", config_path.display());
    Config::load_from_path(&config_path)?.with_context(|| {
        format!(
            "No config file found; create one at {}",
            config_path.display()
        )
    })
}

fn site_transport(config: &Config) -> Result<HttpTransport> {
    let transport = HttpTransport::new(
        &config.site.base_url,
        Duration::from_secs(config.site.timeout_secs),
    )?;
    Ok(match config.site.credentials()? {
        Some((username, password)) => {
            transport.with_credentials(SiteCredentials::new(username, password))
        }
        None => {
            log::warn!("No site credentials configured; only public pages can be read");
            transport
        }
    })
}

/// Print the run's diagnostics report to stderr, then fail with `error`.
fn fail_with_report(log: &TranscodeLog, error: anyhow::Error) -> Result<()> {
    match serde_json::to_string_pretty(&log.export()) {
        Ok(report) => eprintln!("{report}"),
        Err(e) => log::error!("Could not serialize diagnostics report: {e}"),
    }
    Err(error)
}
