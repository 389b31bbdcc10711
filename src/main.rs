//! CLI entry point for `mailpdf`.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailpdf::config::{self, Config};
use mailpdf::error::ExportError;
use mailpdf::export::run;
use mailpdf::export::walker::WalkProgress;
use mailpdf::render::office::OfficeBackend;
use mailpdf::store::directory::DirectoryProvider;

#[derive(Parser)]
#[command(
    name = "mailpdf",
    version,
    about = "Export every message of a mail archive to its own folder of PDFs",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Archive to export
    #[arg(value_name = "ARCHIVE")]
    archive: Option<PathBuf>,

    /// Output directory (created if absent)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Only report what would be exported
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Maximum length of generated file and folder names
    #[arg(long, value_name = "N")]
    max_name_length: Option<usize>,

    /// Conversion attempts per document
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// LibreOffice executable
    #[arg(long, value_name = "PATH", env = "MAILPDF_OFFICE")]
    office_binary: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config();
    apply_overrides(&mut config, &cli);

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => {
            let (Some(archive), Some(output)) = (cli.archive.as_deref(), cli.output.as_deref())
            else {
                anyhow::bail!("Both ARCHIVE and OUTPUT are required (see --help)");
            };
            if cli.dry_run {
                cmd_dry_run(archive, &config, cli.json)
            } else {
                cmd_export(archive, output, &config, cli.yes, cli.json)
            }
        }
    }
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(n) = cli.max_name_length {
        config.naming.max_name_length = n.max(1);
    }
    if let Some(n) = cli.retries {
        config.converter.max_attempts = n;
    }
    if let Some(ref bin) = cli.office_binary {
        config.converter.office_binary = bin.clone();
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_default();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_name = log_path.file_name().unwrap_or_default();
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
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

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailpdf", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

fn check_archive(archive: &Path) -> anyhow::Result<()> {
    if !archive.exists() {
        return Err(ExportError::ArchiveNotFound(archive.to_path_buf()).into());
    }
    if let Err(e) = std::fs::read_dir(archive) {
        anyhow::bail!("Archive is not readable: {}: {e}", archive.display());
    }
    Ok(())
}

/// Survey the archive without writing anything.
fn cmd_dry_run(archive: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    check_archive(archive)?;
    let survey = run::dry_run(&DirectoryProvider, archive, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&survey)?);
        return Ok(());
    }

    println!();
    println!("  Dry run, nothing written:");
    println!("  {:<25} {}", "Folders", survey.folders);
    println!("  {:<25} {}", "Messages", survey.messages);
    println!("  {:<25} {}", "Attachments", survey.attachments);
    println!("  {:<25} {}", "Other items", survey.other_items);
    if survey.unreadable_folders > 0 || survey.unreadable_messages > 0 {
        println!(
            "  {:<25} {} folder(s), {} message(s)",
            "Unreadable", survey.unreadable_folders, survey.unreadable_messages
        );
    }
    println!();
    Ok(())
}

/// Export the archive.
fn cmd_export(
    archive: &Path,
    output: &Path,
    config: &Config,
    assume_yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    check_archive(archive)?;

    if !assume_yes && !confirm(archive, output)? {
        println!("  Aborted.");
        return Ok(());
    }

    let scratch = config::cache_dir(config).join(format!("office-{}", std::process::id()));
    let backend = OfficeBackend::new(&config.converter, scratch);
    backend.probe()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Exporting {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let summary = run::run(
        &DirectoryProvider,
        &backend,
        archive,
        output,
        config,
        &|p: &WalkProgress<'_>| {
            pb.set_message(format!("{} [{}/{}] {}", p.folder, p.index, p.total, p.item));
        },
    );
    pb.finish_and_clear();
    let summary = summary?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
        println!();
    }
    Ok(())
}

/// Ask before writing anything.
fn confirm(archive: &Path, output: &Path) -> anyhow::Result<bool> {
    println!("  {:<10} {}", "Archive", archive.display());
    println!("  {:<10} {}", "Output", output.display());
    print!("  Proceed? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
