//! CLI entry point for `mailsift`.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsift::config::{self, Config};
use mailsift::extract::{self, Progress};
use mailsift::filter::{pattern, presets, AttachmentFilter};
use mailsift::model::report::RunReport;
use mailsift::parser::MailParserDecoder;
use mailsift::providers;
use mailsift::storage::{DryRunStorage, FsStorage, Storage};
use mailsift::transport::imap::ImapTransport;
use mailsift::transport::Transport;

#[derive(Parser)]
#[command(
    name = "mailsift",
    version,
    about = "Download email attachments over IMAP, filtered by filename pattern"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: $MAILSIFT_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract attachments from a mailbox
    Extract(ExtractArgs),
    /// List the folders of the account
    Folders {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show which filenames the include/exclude patterns would keep
    Check {
        /// Filenames to classify
        #[arg(required = true)]
        filenames: Vec<String>,
        #[command(flatten)]
        patterns: PatternArgs,
        #[arg(long)]
        json: bool,
    },
    /// List the built-in provider presets
    Providers {
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args)]
struct ConnectionArgs {
    /// IMAP server host name
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(short, long, env = "MAILSIFT_USERNAME")]
    username: Option<String>,
    /// Connect without TLS
    #[arg(long)]
    no_tls: bool,
    /// Provider preset (see `mailsift providers`)
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Args)]
struct PatternArgs {
    /// Patterns to keep (`pdf`, `*.doc*`, `@images`, ...)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    include: Option<Vec<String>>,
    /// Patterns to skip; exclusions always win
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    exclude: Option<Vec<String>>,
}

#[derive(Args)]
struct ExtractArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(flatten)]
    patterns: PatternArgs,
    /// Folder to extract from (root folder with --recursive)
    #[arg(short, long)]
    mailbox: Option<String>,
    /// IMAP search criteria, e.g. "SINCE 1-Jan-2024"
    #[arg(short, long)]
    search: Option<String>,
    /// Also process every folder below the mailbox
    #[arg(short, long)]
    recursive: bool,
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Group files by sender address
    #[arg(long)]
    organize_by_sender: bool,
    /// Group files by message date (default on)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    organize_by_date: Option<bool>,
    /// Do not write attachments_metadata*.json
    #[arg(long)]
    no_metadata: bool,
    /// Maximum messages (per folder, or overall with --recursive)
    #[arg(long)]
    limit: Option<u64>,
    /// Maximum messages per folder (--recursive only)
    #[arg(long)]
    limit_per_folder: Option<u64>,
    /// Maximum messages overall (--recursive only)
    #[arg(long)]
    total_limit: Option<u64>,
    /// Show what would be saved without writing anything
    #[arg(long)]
    dry_run: bool,
    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config(),
    };

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Extract(args) => cmd_extract(config, &args),
        Commands::Folders { connection, json } => cmd_folders(config, &connection, json),
        Commands::Check {
            filenames,
            patterns,
            json,
        } => cmd_check(config, &filenames, &patterns, json),
        Commands::Providers { json } => cmd_providers(json),
        Commands::Config => cmd_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

// ── Flag overrides ──────────────────────────────────────────────

fn apply_connection_args(config: &mut Config, args: &ConnectionArgs) {
    let conn = &mut config.connection;
    if let Some(ref provider) = args.provider {
        conn.provider = Some(provider.clone());
    }
    if let Some(ref server) = args.server {
        conn.server = Some(server.clone());
    }
    if let Some(port) = args.port {
        conn.port = Some(port);
    }
    if let Some(ref username) = args.username {
        conn.username = Some(username.clone());
    }
    if args.no_tls {
        conn.use_tls = Some(false);
    }
    config.apply_detected_provider();
}

fn apply_pattern_args(config: &mut Config, args: &PatternArgs) {
    if args.include.is_some() {
        config.filter.include = args.include.clone();
    }
    if args.exclude.is_some() {
        config.filter.exclude = args.exclude.clone();
    }
}

fn apply_extract_args(config: &mut Config, args: &ExtractArgs) {
    apply_connection_args(config, &args.connection);
    apply_pattern_args(config, &args.patterns);

    if let Some(ref mailbox) = args.mailbox {
        config.mailbox.name = mailbox.clone();
    }
    if let Some(ref search) = args.search {
        config.mailbox.search_criteria = search.clone();
    }
    if args.recursive {
        config.mailbox.recursive = true;
    }
    if let Some(ref output) = args.output {
        config.output.save_path = Some(output.clone());
    }
    if args.organize_by_sender {
        config.output.organize_by_sender = true;
    }
    if let Some(by_date) = args.organize_by_date {
        config.output.organize_by_date = by_date;
    }
    if args.no_metadata {
        config.output.save_metadata = false;
    }
    if args.limit.is_some() {
        config.limits.limit = args.limit;
    }
    if args.limit_per_folder.is_some() {
        config.limits.limit_per_folder = args.limit_per_folder;
    }
    if args.total_limit.is_some() {
        config.limits.total_limit = args.total_limit;
    }
}

/// Connect and log in with the effective configuration.
fn connect(config: &Config) -> anyhow::Result<ImapTransport> {
    let options = config.connect_options()?;
    let creds = config.credentials()?;
    eprintln!(
        "  Connecting to {}:{} as {}",
        options.server, options.port, creds.username
    );
    Ok(ImapTransport::connect(&options, &creds.username, &creds.password)?)
}

// ── Commands ────────────────────────────────────────────────────

/// Run the extraction pipeline.
fn cmd_extract(mut config: Config, args: &ExtractArgs) -> anyhow::Result<()> {
    apply_extract_args(&mut config, args);

    let options = config.run_options(args.dry_run);
    options.validate()?;
    let output = config.output_dir();

    let mut transport = connect(&config)?;
    let decoder = MailParserDecoder::new();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    let progress = |p: &Progress| {
        if pb.length() != Some(p.total as u64) {
            pb.set_length(p.total as u64);
            pb.set_message(p.folder.clone());
        }
        pb.set_position(p.position as u64);
        true
    };

    let start = Instant::now();
    let (report, location) = if args.dry_run {
        let mut storage = DryRunStorage::new();
        let report = extract::run(&mut transport, &decoder, &mut storage, &options, &progress)?;
        (report, storage.describe())
    } else {
        std::fs::create_dir_all(&output)?;
        let mut storage = FsStorage::new(&output);
        let report = extract::run(&mut transport, &decoder, &mut storage, &options, &progress)?;
        (report, storage.describe())
    };
    pb.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_table(&report, &location, start.elapsed());
    }
    Ok(())
}

/// List selectable folders.
fn cmd_folders(mut config: Config, args: &ConnectionArgs, json: bool) -> anyhow::Result<()> {
    apply_connection_args(&mut config, args);
    let mut transport = connect(&config)?;
    let folders = transport.list_folders()?;

    if json {
        let output = serde_json::json!({
            "folder_count": folders.len(),
            "folders": folders,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        for folder in &folders {
            println!("  {folder}");
        }
        println!();
        println!("  {} folder(s) on {}", folders.len(), transport.server());
    }
    Ok(())
}

/// Classify filenames offline.
fn cmd_check(
    mut config: Config,
    filenames: &[String],
    args: &PatternArgs,
    json: bool,
) -> anyhow::Result<()> {
    apply_pattern_args(&mut config, args);
    let include = config.filter.include.as_deref().map(presets::expand).transpose()?;
    let exclude = config.filter.exclude.as_deref().map(presets::expand).transpose()?;
    let filter = AttachmentFilter::new(include.as_deref(), exclude.as_deref());

    let decisions: Vec<_> = filenames
        .iter()
        .map(|name| (name, filter.classify(&extract::layout::sanitize_file_name(name))))
        .collect();

    if json {
        let items: Vec<serde_json::Value> = decisions
            .iter()
            .map(|(name, d)| {
                serde_json::json!({
                    "filename": name,
                    "accepted": d.is_accepted(),
                    "reason": d.reason(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "include": include,
            "exclude": exclude,
            "results": items,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    match &include {
        None => println!("  {:<10} {}", "Include", pattern::describe("*")),
        Some(list) if list.is_empty() => println!("  {:<10} nothing", "Include"),
        Some(list) => {
            for p in list {
                println!("  {:<10} {}", "Include", pattern::describe(p));
            }
        }
    }
    for p in exclude.iter().flatten() {
        println!("  {:<10} {}", "Exclude", pattern::describe(p));
    }
    println!();
    println!("  {:<40} {:<6} {}", "File", "Keep", "Reason");
    println!("  {}", "-".repeat(78));
    for (name, decision) in &decisions {
        let name_trunc: String = name.chars().take(39).collect();
        let keep = if decision.is_accepted() { "yes" } else { "no" };
        println!("  {:<40} {:<6} {}", name_trunc, keep, decision.reason());
    }
    println!();
    Ok(())
}

/// List provider presets.
fn cmd_providers(json: bool) -> anyhow::Result<()> {
    if json {
        let items: Vec<serde_json::Value> = providers::PROVIDERS
            .iter()
            .map(|p| {
                serde_json::json!({
                    "key": p.key,
                    "name": p.name,
                    "server": p.server,
                    "port": p.port,
                    "tls": p.use_tls,
                    "notes": p.notes,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!();
    println!(
        "  {:<12} {:<20} {:<24} {:>5}  {}",
        "Key", "Name", "Server", "Port", "TLS"
    );
    println!("  {}", "-".repeat(70));
    for p in providers::PROVIDERS {
        println!(
            "  {:<12} {:<20} {:<24} {:>5}  {}",
            p.key,
            p.name,
            p.server,
            p.port,
            if p.use_tls { "yes" } else { "no" }
        );
    }
    println!();
    Ok(())
}

/// Print the effective configuration.
fn cmd_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = config::config_file_path() {
        println!("# {}", path.display());
    }
    println!("# log file: {}", config::log_file_path(config).display());
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print the run summary as a human-readable table.
fn print_run_table(report: &RunReport, location: &str, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<22} {}", "Output", location);
    if report.dry_run {
        println!("  Dry run: nothing was written.");
    }

    if !report.folders.is_empty() {
        println!();
        println!(
            "  {:<30} {:>9} {:>9} {:>9} {:>10}",
            "Folder", "Messages", "Saved", "Skipped", "Size"
        );
        println!("  {}", "-".repeat(72));
        for f in &report.folders {
            let name: String = f.mailbox.chars().take(29).collect();
            println!(
                "  {:<30} {:>9} {:>9} {:>9} {:>10}",
                name,
                f.messages_processed,
                f.attachments_saved,
                f.attachments_rejected,
                format_size(f.bytes_written, BINARY)
            );
        }
    }

    let totals = &report.statistics;
    println!();
    println!("  {:<22} {}", "Messages processed", totals.messages_processed);
    println!("  {:<22} {}", "Attachments saved", totals.attachments_saved);
    println!(
        "  {:<22} {}",
        "Total size",
        format_size(totals.total_bytes, BINARY)
    );
    println!("  {:<22} {:.2?}", "Elapsed", elapsed);

    if !report.skipped_folders.is_empty() {
        println!(
            "  {:<22} {}",
            "Skipped folders",
            report.skipped_folders.join(", ")
        );
    }
    if report.cancelled {
        println!("  Run cancelled; partial results kept.");
    }

    if !totals.errors.is_empty() {
        println!();
        println!("  {} error(s):", totals.errors.len());
        for e in totals.errors.iter().take(20) {
            println!("    {e}");
        }
        if totals.errors.len() > 20 {
            println!("    ... and {} more", totals.errors.len() - 20);
        }
    }
    println!();
}
