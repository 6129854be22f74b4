//! CLI entry point for `process-pst`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use process_pst::config::{self, Config};
use process_pst::run::{self, RunHooks};
use process_pst::source::pst::PstMailbox;
use process_pst::source::snapshot::SnapshotMailbox;
use process_pst::source::{self, MailboxFormat};

/// Convert a mailbox into an EDRM XML loadfile plus exported files.
#[derive(Parser)]
#[command(
    name = "process-pst",
    version,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Mailbox to convert
    #[arg(value_name = "MAILBOX", required = true)]
    mailbox: Option<PathBuf>,

    /// Output directory (must not exist)
    #[arg(value_name = "OUTPUT_DIR", required = true)]
    output_dir: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (overrides $PROCESS_PST_CONFIG)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a mailbox into an output directory
    Convert {
        mailbox: PathBuf,
        output_dir: PathBuf,
    },
    /// Print folders, messages, attachments and raw properties
    Inspect { mailbox: PathBuf },
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

    let config = match &cli.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Convert {
            mailbox,
            output_dir,
        }) => cmd_convert(&mailbox, &output_dir, &config),
        Some(Commands::Inspect { mailbox }) => cmd_inspect(&mailbox),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match (cli.mailbox, cli.output_dir) {
            (Some(mailbox), Some(output_dir)) => cmd_convert(&mailbox, &output_dir, &config),
            _ => {
                Cli::command().print_help()?;
                anyhow::bail!("MAILBOX and OUTPUT_DIR are required");
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "process-pst.log");
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

/// Convert `mailbox` into `output_dir` and print a summary.
fn cmd_convert(mailbox: &Path, output_dir: &Path, config: &Config) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Reading mailbox: {pos} document(s)")
            .expect("valid template"),
    );

    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Exporting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let on_document = |count: u64| spinner.set_position(count);
    let on_export = |current: usize, total: usize| {
        if bar.is_hidden() {
            spinner.finish_and_clear();
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        bar.set_length(total as u64);
        bar.set_position(current as u64);
    };
    let hooks = RunHooks {
        on_document: Some(&on_document),
        on_export: Some(&on_export),
    };

    let start = Instant::now();
    let result = run::run_with_hooks(mailbox, output_dir, config, hooks);
    spinner.finish_and_clear();
    bar.finish_and_clear();
    let summary =
        result.with_context(|| format!("Failed to convert {}", mailbox.display()))?;

    use humansize::{format_size, BINARY};
    println!();
    println!("  Conversion complete:");
    println!("  {:<25} {}", "Documents", summary.documents);
    println!("  {:<25} {}", "Relationships", summary.relationships);
    println!("  {:<25} {}", "Files exported", summary.files);
    println!("  {:<25} {}", "Exported size", format_size(summary.bytes, BINARY));
    println!("  {:<25} {}", "Loadfile", summary.loadfile.display());
    println!("  {:<25} {:.2?}", "Elapsed", start.elapsed());
    println!();

    Ok(())
}

/// Dump the mailbox structure to stdout.
fn cmd_inspect(mailbox: &Path) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    match source::detect_format(mailbox)? {
        MailboxFormat::Pst => {
            process_pst::inspect::inspect(&PstMailbox::open(mailbox)?, &mut out)?
        }
        MailboxFormat::Snapshot => {
            process_pst::inspect::inspect(&SnapshotMailbox::open(mailbox)?, &mut out)?
        }
    }
    std::io::Write::flush(&mut out)?;
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "process-pst", &mut std::io::stdout());
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
