//! `cornerstone` - CLI and server for the cornerstone content backend
//!
//! This binary runs the HTTP API and offers offline access to the same
//! document store for content, passcode, analytics and gallery chores.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;

use cornerstone::analytics::{render_chart, Report};
use cornerstone::auth::check_passcode;
use cornerstone::cli::{
    Cli, Command, ConfigCommand, ContentCommand, GalleryCommand, PasscodeCommand, ServeCommand,
    StatsCommand,
};
use cornerstone::gallery::{sync_album, HttpAlbumSource};
use cornerstone::model::{SiteSettings, Visit, SETTINGS_ID};
use cornerstone::server::{self, AppState};
use cornerstone::{init_logging, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd).await,
        Command::Content(cmd) => handle_content(&config, cmd),
        Command::Passcode(cmd) => handle_passcode(&config, cmd),
        Command::Stats(cmd) => handle_stats(&config, cmd),
        Command::Gallery(cmd) => handle_gallery(&config, cmd).await,
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening database {}", path.display()))
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let storage = open_storage(&config)?;
    let state = AppState::new(storage, config)?;
    server::serve(state).await?;
    Ok(())
}

fn handle_content(config: &Config, cmd: ContentCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        ContentCommand::List { collection } => {
            for doc in storage.list_documents(collection)? {
                println!(
                    "{}\tcreated {}\tupdated {}",
                    doc.id,
                    doc.created_at.to_rfc3339(),
                    doc.updated_at.to_rfc3339()
                );
            }
        }
        ContentCommand::Get { collection, id } => {
            let Some(doc) = storage.get_document(collection, &id)? else {
                bail!("{collection}/{id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&doc.body)?);
        }
        ContentCommand::Put {
            collection,
            id,
            file,
        } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let body: serde_json::Value =
                serde_json::from_str(&text).context("document is not valid JSON")?;
            let updated_at = storage.save_json(collection, &id, body)?;
            println!("Saved {collection}/{id} at {}", updated_at.to_rfc3339());
        }
        ContentCommand::Delete { collection, id } => {
            if storage.delete_document(collection, &id)? {
                println!("Deleted {collection}/{id}");
            } else {
                bail!("{collection}/{id} not found");
            }
        }
    }
    Ok(())
}

fn handle_passcode(config: &Config, cmd: PasscodeCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let current = storage.load::<SiteSettings>(SETTINGS_ID)?;

    match cmd {
        PasscodeCommand::Set { value } => {
            let mut settings = current.unwrap_or_default();
            settings.admin_passcode = value;
            storage.save(&settings)?;
            if settings.admin_passcode.is_empty() {
                println!("Admin passcode cleared; admin login is disabled.");
            } else {
                println!("Admin passcode updated.");
            }
        }
        PasscodeCommand::Check { value } => {
            let stored = current.map(|s| s.admin_passcode).unwrap_or_default();
            if check_passcode(&stored, &value) {
                println!("Passcode matches.");
            } else {
                bail!("passcode does not match");
            }
        }
    }
    Ok(())
}

fn handle_stats(config: &Config, cmd: StatsCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let defaults = &config.analytics;

    match cmd {
        StatsCommand::Rollup {
            period,
            last,
            top,
            json,
        } => {
            let records = storage.daily_stats(None, None)?;
            let report = Report::build(
                &records,
                period.unwrap_or(defaults.default_period),
                Some(last.unwrap_or(defaults.default_buckets)),
                top.unwrap_or(defaults.top_pages),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        StatsCommand::Chart {
            period,
            last,
            output,
        } => {
            let records = storage.daily_stats(None, None)?;
            let report = Report::build(
                &records,
                period.unwrap_or(defaults.default_period),
                Some(last.unwrap_or(defaults.default_buckets)),
                defaults.top_pages,
            );
            let svg = render_chart(&report.buckets, &config.chart_options());
            std::fs::write(&output, svg)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Wrote {} {} buckets to {}",
                report.buckets.len(),
                report.period,
                output.display()
            );
        }
        StatsCommand::Record {
            path,
            date,
            new_visitor,
            new_session,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let visit = Visit {
                path,
                new_visitor,
                new_session,
            };
            let stats = storage.record_visit(date, &visit, defaults.max_paths_per_day)?;
            println!(
                "{}: {} views, {} visitors, {} sessions",
                stats.date, stats.views, stats.visitors, stats.sessions
            );
        }
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!("Analytics ({})", report.period);
    println!("{}", "=".repeat(44));
    println!("{:<12} {:>10} {:>10} {:>10}", "Period", "Views", "Visitors", "Sessions");
    for bucket in &report.buckets {
        println!(
            "{:<12} {:>10} {:>10} {:>10}",
            bucket.label, bucket.views, bucket.visitors, bucket.sessions
        );
    }
    println!("{}", "-".repeat(44));
    println!(
        "{:<12} {:>10} {:>10} {:>10}",
        "Total", report.summary.views, report.summary.visitors, report.summary.sessions
    );

    if !report.summary.top_pages.is_empty() {
        println!();
        println!("Top pages");
        for page in &report.summary.top_pages {
            println!("  {:>8}  {}", page.views, page.path);
        }
    }
}

async fn handle_gallery(config: &Config, cmd: GalleryCommand) -> anyhow::Result<()> {
    match cmd {
        GalleryCommand::Sync { album_url } => {
            let Some(endpoint) = &config.gallery.sync_endpoint else {
                bail!("gallery.sync_endpoint is not configured");
            };
            let source = HttpAlbumSource::new(endpoint.clone(), config.request_timeout())?;
            let storage = std::sync::Mutex::new(open_storage(config)?);

            let report = sync_album(&source, &storage, &album_url).await?;
            println!(
                "Fetched {}: {} created, {} updated, {} unchanged, {} removed",
                report.fetched, report.created, report.updated, report.unchanged, report.removed
            );
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "upload_dir": config.upload_dir(),
            "bind_address": config.bind_address(),
            "gallery_sync": config.gallery.sync_endpoint.is_some(),
            "storage": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("cornerstone status");
        println!("------------------");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Uploads:       {}", config.upload_dir().display());
        println!("Listen:        {}", config.bind_address());
        println!(
            "Gallery sync:  {}",
            config.gallery.sync_endpoint.as_deref().unwrap_or("not configured")
        );
        println!();
        for count in &stats.collections {
            println!("  {:<12} {:>6}", count.collection, count.documents);
        }
        println!("  {:<12} {:>6}", "total", stats.total_documents);
        if let Some(last) = stats.last_updated {
            println!();
            println!("Last write:    {}", last.to_rfc3339());
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_address());
                println!(
                    "  Allowed origins:    {}",
                    if config.server.allowed_origins.is_empty() {
                        "any".to_string()
                    } else {
                        config.server.allowed_origins.join(", ")
                    }
                );
                println!();
                println!("[Uploads]");
                println!("  Directory:          {}", config.upload_dir().display());
                println!("  Max bytes:          {}", config.uploads.max_upload_bytes);
                println!("  Public path:        {}", config.uploads.public_path);
                println!();
                println!("[Admin]");
                println!("  Session TTL (min):  {}", config.admin.session_ttl_minutes);
                println!();
                println!("[Analytics]");
                println!("  Default period:     {}", config.analytics.default_period);
                println!("  Default buckets:    {}", config.analytics.default_buckets);
                println!("  Top pages:          {}", config.analytics.top_pages);
                println!();
                println!("[Gallery]");
                println!(
                    "  Sync endpoint:      {}",
                    config.gallery.sync_endpoint.as_deref().unwrap_or("(none)")
                );
                println!("  Timeout (s):        {}", config.gallery.request_timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
