use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use stashcode::api::HttpShareApi;
use stashcode::config::{format_config, Config};
use stashcode::logging::{init_logging, LogConfig, Verbosity};
use stashcode::registry::{
    format_file_size, toggle_select_all, ShareDuration, ShareId, ShareRegistry,
    SharedFolder, Selection,
};
use stashcode::storage::SqliteStore;
use stashcode::transfer::{AccessOutcome, ShareOptions, TransferService, UploadSelection};

#[derive(Parser)]
#[command(name = "stashcode")]
#[command(version)]
#[command(about = "Share files and text behind short access codes")]
#[command(
    long_about = "Upload files or a text snippet to a share service, get an access code back, and open shares by code. Shares expire after a chosen lifetime and can burn after the first read."
)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Share service base URL (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local state database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files and/or text and print the access code
    Create {
        /// File or directory to share (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Text to share alongside or instead of files
        #[arg(short, long)]
        text: Option<String>,

        /// Use this access code instead of a generated one
        #[arg(short, long)]
        code: Option<String>,

        /// Delete the share after its first access
        #[arg(long)]
        burn: bool,

        /// Lifetime: 1h, 6h, 12h, 24h, 48h, 72h, 7d or 30d
        #[arg(short, long)]
        expire: Option<ShareDuration>,

        /// Copy the access code to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Open a share by access code
    Open {
        /// Access code
        code: String,

        /// Directory to download into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Download every file (offline copies only)
        #[arg(long)]
        all: bool,

        /// Download the numbered file rows printed for an offline copy
        #[arg(short, long = "select", value_name = "N")]
        select: Vec<usize>,

        /// Download every file under this folder (offline copies only)
        #[arg(long)]
        folder: Option<String>,

        /// Open a resolved download link in the browser
        #[arg(long)]
        browser: bool,

        /// Copy the share's text to the clipboard (offline copies only)
        #[arg(long)]
        copy: bool,
    },
    /// Resolve an access code and download its content
    Download {
        /// Access code
        code: String,

        /// Target file (default: ./<code>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the download link in the browser instead
        #[arg(long)]
        browser: bool,
    },
    /// List shares created from this machine
    List,
    /// Mark a share as deleted without removing its record
    Revoke {
        /// Share ID
        id: ShareId,
    },
    /// Remove a share record entirely
    Delete {
        /// Share ID
        id: ShareId,
    },
    /// Remove expired and deleted share records
    Purge,
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Clear a configuration value
    Unset { key: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _guard = init_logging(&LogConfig {
        verbosity: Verbosity::from_occurrences(cli.verbose),
        log_file: config.log_file.clone(),
    });

    if let Some(e) = config_error {
        warn!(error = %e, "Ignoring unreadable config file");
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, mut config: Config) -> Result<()> {
    let db_path = config.effective_db_path(cli.db.as_deref());
    let api_url = config.effective_api_url(cli.api_url.as_deref());
    debug!(db = %db_path.display(), api = %api_url, "Resolved settings");

    match cli.command {
        Commands::Create {
            files,
            text,
            code,
            burn,
            expire,
            copy,
        } => {
            let mut selection = UploadSelection::new();
            for path in &files {
                selection
                    .add_path(path)
                    .with_context(|| format!("Failed to add {}", path.display()))?;
            }
            if let Some(text) = text {
                selection.set_text(text);
            }

            let duration = config.effective_duration(expire);
            let mut service = open_service(&db_path, &api_url)?;
            let folder = service
                .create_share(
                    &selection,
                    ShareOptions {
                        custom_code: code,
                        burn_after_reading: burn,
                        duration,
                    },
                )
                .await
                .context("Failed to create share")?;

            println!(
                "✓ Shared {} for {}{}",
                selection.content_kind(),
                duration.describe(),
                if burn { " (burn after reading)" } else { "" }
            );
            println!("  Access code: {}", folder.access_code);
            println!("  Expires:     {}", folder.expires_at.format("%Y-%m-%d %H:%M UTC"));
            println!("  Share ID:    {}", folder.id);

            if copy {
                copy_to_clipboard(&folder.access_code);
            }
        }
        Commands::Open {
            code,
            output,
            all,
            select,
            folder,
            browser,
            copy,
        } => {
            let mut service = open_service(&db_path, &api_url)?;
            match service.access(&code).await? {
                AccessOutcome::Remote { url, cached } => {
                    println!(
                        "✓ Share {} resolved{}",
                        code.trim(),
                        if cached { " (cached link)" } else { "" }
                    );
                    println!("  Download: {}", url);

                    let ignored = offline_only_flags(all, &select, folder.as_deref(), copy);
                    if !ignored.is_empty() {
                        eprintln!(
                            "  Ignoring {}: only used when opening an offline copy",
                            ignored.join(", ")
                        );
                    }

                    if browser {
                        webbrowser::open(&url).context("Failed to open browser")?;
                    } else if let Some(dir) = output {
                        let target = dir.join(code.trim());
                        service.download_url(&url, &target).await?;
                        println!("  Saved to {}", target.display());
                    }
                }
                AccessOutcome::Local(shared) => {
                    print_folder(&shared);

                    if copy {
                        match shared.text_content {
                            Some(ref text) => copy_to_clipboard(text),
                            None => eprintln!("  (no text to copy)"),
                        }
                    }

                    let dest = output.unwrap_or_else(|| PathBuf::from("."));
                    if let Some(name) = folder {
                        let written = service.download_folder(&shared, &name, &dest).await?;
                        println!("✓ Downloaded {} file(s) from {}", written.len(), name);
                    } else if all || !select.is_empty() {
                        let selected = build_selection(&shared, all, &select)?;
                        let written = service.download_selected(&shared, &selected, &dest).await?;
                        println!("✓ Downloaded {} file(s)", written.len());
                    }
                }
            }
        }
        Commands::Download {
            code,
            output,
            browser,
        } => {
            let mut service = open_service(&db_path, &api_url)?;
            let url = service.resolve_download(&code).await?;

            if browser {
                webbrowser::open(&url).context("Failed to open browser")?;
                println!("✓ Opened {}", url);
            } else {
                let target = output.unwrap_or_else(|| PathBuf::from(code.trim()));
                service.download_url(&url, &target).await?;
                println!("✓ Saved {} to {}", code.trim(), target.display());
            }
        }
        Commands::List => {
            let registry = open_registry(&db_path)?;
            let listed = registry.list_with_status(Utc::now());
            if listed.is_empty() {
                println!("No shares yet.");
                return Ok(());
            }

            println!(
                "{:<12} {:<8} {:<17} {:>5}  {:<36}  NAME",
                "CODE", "STATUS", "EXPIRES", "FILES", "ID"
            );
            for entry in listed {
                let shared = entry.folder;
                println!(
                    "{:<12} {:<8} {:<17} {:>5}  {:<36}  {}{}",
                    shared.access_code,
                    entry.status,
                    shared.expires_at.format("%Y-%m-%d %H:%M"),
                    shared.file_rows().count(),
                    shared.id,
                    shared.name,
                    if shared.burn_after_reading { " 🔥" } else { "" }
                );
            }
        }
        Commands::Revoke { id } => {
            let mut registry = open_registry(&db_path)?;
            if registry.get(id).is_none() {
                anyhow::bail!("Share not found: {}", id);
            }
            if registry.mark_deleted(id) {
                println!("✓ Share {} marked deleted", id);
            } else {
                println!("Share {} was already deleted", id);
            }
        }
        Commands::Delete { id } => {
            let mut registry = open_registry(&db_path)?;
            match registry.remove(id) {
                Some(removed) => println!("✓ Removed share {} ({})", id, removed.access_code),
                None => anyhow::bail!("Share not found: {}", id),
            }
        }
        Commands::Purge => {
            let mut registry = open_registry(&db_path)?;
            let removed = registry.purge_inactive(Utc::now());
            println!("✓ Removed {} inactive share(s)", removed);
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => println!("{}", format_config(&config)),
            ConfigAction::Set { key, value } => {
                config.set(&key, Some(&value))?;
                config.save().context("Failed to save config")?;
                println!("✓ {} = {}", key, value);
            }
            ConfigAction::Unset { key } => {
                config.set(&key, None)?;
                config.save().context("Failed to save config")?;
                println!("✓ {} unset", key);
            }
        },
    }

    Ok(())
}

fn open_store(db_path: &Path) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(db_path)
        .with_context(|| format!("Failed to open state database {}", db_path.display()))?;
    Ok(Arc::new(store))
}

fn open_registry(db_path: &Path) -> Result<ShareRegistry<Arc<SqliteStore>>> {
    Ok(ShareRegistry::load(open_store(db_path)?))
}

fn open_service(
    db_path: &Path,
    api_url: &str,
) -> Result<TransferService<Arc<SqliteStore>, HttpShareApi>> {
    Ok(TransferService::new(
        open_store(db_path)?,
        HttpShareApi::new(api_url),
    ))
}

/// Translate `--all` / `--select N` into a selection of file rows.
fn build_selection(shared: &SharedFolder, all: bool, rows: &[usize]) -> Result<Selection> {
    let mut selected = Selection::new();
    if all {
        toggle_select_all(&mut selected, shared);
        return Ok(selected);
    }

    let files: Vec<_> = shared.file_rows().collect();
    for &n in rows {
        let file = n
            .checked_sub(1)
            .and_then(|i| files.get(i))
            .with_context(|| format!("No file row {} (share has {})", n, files.len()))?;
        selected.insert(file.id);
    }
    Ok(selected)
}

/// Names of the given flags that only act on an offline copy.
fn offline_only_flags(
    all: bool,
    select: &[usize],
    folder: Option<&str>,
    copy: bool,
) -> Vec<&'static str> {
    [
        (all, "--all"),
        (!select.is_empty(), "--select"),
        (folder.is_some(), "--folder"),
        (copy, "--copy"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

fn print_folder(shared: &SharedFolder) {
    println!("✓ {} (offline copy)", shared.name);
    println!("  Access code: {}", shared.access_code);
    if shared.burn_after_reading {
        println!("  Burn after reading: this share is now deleted");
    }

    if let Some(ref text) = shared.text_content {
        println!();
        println!("{}", text);
    }

    if shared.files.is_empty() {
        return;
    }

    println!();
    let mut n = 0;
    for item in &shared.files {
        if item.is_folder() {
            println!("      {}/  ({})", item.name, format_file_size(item.size));
        } else {
            n += 1;
            let indent = if item.path.contains('/') { "  " } else { "" };
            println!(
                "  [{}] {}{}  ({})",
                n,
                indent,
                item.name,
                format_file_size(item.size)
            );
        }
    }
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string())) {
        Ok(()) => println!("  Copied to clipboard"),
        Err(e) => {
            warn!(error = %e, "Clipboard unavailable");
            eprintln!("  Could not copy to clipboard: {}", e);
        }
    }
}
