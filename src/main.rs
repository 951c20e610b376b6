mod cli;
mod config;
mod domain;
mod infra;
mod workflows;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::io;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use infra::cache::FsCache;
use infra::catalog::CatalogClient;
use infra::lister::FsLister;
use infra::tvdb::{TvdbClient, TVDB_API_BASE};
use workflows::reconciler::Reconciler;
use workflows::report::{self, SEPARATOR};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    // RUST_LOG wins over the --debug flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { "epi=debug" } else { "epi=info" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if !cli.no_logo {
        print_logo();
    }

    let settings = config::load_settings(&cli)?;
    let scan_config = config::scan_config(&cli, &settings)?;
    let report_config = config::report_config(&cli);

    println!("Scanning directory: {}", scan_config.root.display());
    println!("Language: {}", scan_config.language);
    debug!(min_size = scan_config.min_size, ignore = ?scan_config.ignore, "Scan settings");

    // Without a reachable mirror there is nothing to compare against
    let service = match &settings.mirror {
        Some(mirror) => TvdbClient::new(settings.api_key.clone(), mirror),
        None => TvdbClient::discover(settings.api_key.clone(), TVDB_API_BASE)?,
    };
    debug!(mirror = service.mirror(), "Catalog mirror");

    let catalog = CatalogClient::new(service, FsCache::new(settings.cache_dir.clone()));

    println!("{SEPARATOR}");

    let episodes = Reconciler::new(&scan_config, &FsLister, &catalog).run();
    let selected = report::select(episodes.as_slice(), &report_config, Utc::now());

    report::write_report(&mut io::stdout().lock(), episodes.as_slice(), &selected)?;
    Ok(())
}

fn print_logo() {
    println!("███████╗██████╗ ██╗");
    println!("██╔════╝██╔══██╗╚═╝");
    println!("█████╗  ██████╔╝██╗");
    println!("██╔══╝  ██╔═══╝ ██║");
    println!("███████╗██║     ██║  Find Missing");
    println!("╚══════╝╚═╝     ╚═╝   TV Episodes");
    println!();
}
