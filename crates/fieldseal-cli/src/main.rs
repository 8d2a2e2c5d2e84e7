//! `fieldseal` CLI: encode and decode the secure fields of JSON documents.
//!
//! Loads settings, builds the configured cipher backend once, and runs a
//! single command through it. A cipher module that fails to load is a hard
//! error: the process exits non-zero before touching any file.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use fieldseal_core::settings::DEFAULT_CONFIG_FILE;
use fieldseal_core::transform::Transformed;
use fieldseal_core::{CipherBackend, CipherError, ResourceType, Settings, cipher_from_settings};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

// ── CLI structure ────────────────────────────────────────────────────

/// fieldseal: secure-field encoding for JSON documents.
#[derive(Parser)]
#[command(
    name = "fieldseal",
    version,
    about = "fieldseal CLI: encode and decode secure fields with a sandboxed cipher module",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         FIELDSEAL_CONFIG             Settings file (default: {DEFAULT_CONFIG_FILE})\n  \
         FIELDSEAL_LOG_LEVEL          Log filter when RUST_LOG is unset (default: warn)\n  \
         FIELDSEAL_PLUGINS_DISABLED   Force the pass-through cipher (true/1)\n\n\
         {DIM}Examples:{RESET}\n  \
         fieldseal cipher encode --value 's3cr3t'\n  \
         fieldseal cipher decode --file secrets/auth.txt\n  \
         fieldseal document encode --resource alerting --file contact-points.json\n  \
         fieldseal patterns --resource alerting"
    ),
)]
struct Cli {
    /// Settings file. A missing default file means default settings.
    #[arg(long, short = 'c', env = "FIELDSEAL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "FIELDSEAL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode or decode a single value or a whole file.
    Cipher {
        #[command(subcommand)]
        action: CipherCommands,
    },
    /// Encode or decode the secure fields of a JSON document.
    Document {
        #[command(subcommand)]
        action: DocumentCommands,
    },
    /// List the registered secure-field patterns.
    Patterns {
        /// Only show patterns for this resource type.
        #[arg(long)]
        resource: Option<ResourceType>,
        /// Print as JSON.
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CipherCommands {
    /// Encode a value, or a file in place.
    Encode(ValueArgs),
    /// Decode a value, or a file in place.
    Decode(ValueArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ValueArgs {
    /// Value to transform; the result is printed.
    #[arg(long)]
    value: Option<String>,
    /// File whose contents to transform; rewritten in place with mode 0600.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// Encode every secure field of a document.
    Encode(DocumentArgs),
    /// Decode every secure field of a document.
    Decode(DocumentArgs),
}

#[derive(Args)]
struct DocumentArgs {
    /// Resource type of the document (e.g. `alerting`, `connection`).
    #[arg(long)]
    resource: ResourceType,
    /// Input JSON document.
    #[arg(long)]
    file: PathBuf,
    /// Write the result here instead of stdout (mode 0600).
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Exit non-zero if any field could not be transformed.
    #[arg(long, default_value = "false")]
    strict: bool,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }

    fn past(self) -> &'static str {
        match self {
            Self::Encode => "Encoded",
            Self::Decode => "Decoded",
        }
    }

    fn value(self, cipher: &mut dyn CipherBackend, value: &str) -> Result<String, CipherError> {
        match self {
            Self::Encode => cipher.encode_value(value),
            Self::Decode => cipher.decode_value(value),
        }
    }

    fn document(
        self,
        cipher: &mut dyn CipherBackend,
        resource: ResourceType,
        raw: &[u8],
    ) -> Result<Transformed, CipherError> {
        match self {
            Self::Encode => cipher.encode_document(resource, raw),
            Self::Decode => cipher.decode_document(resource, raw),
        }
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Cipher { action } => {
            let mut cipher = build_cipher(&settings)?;
            match action {
                CipherCommands::Encode(args) => cmd_cipher(cipher.as_mut(), Direction::Encode, args),
                CipherCommands::Decode(args) => cmd_cipher(cipher.as_mut(), Direction::Decode, args),
            }
        }
        Commands::Document { action } => {
            let mut cipher = build_cipher(&settings)?;
            match action {
                DocumentCommands::Encode(args) => cmd_document(cipher.as_mut(), Direction::Encode, &args),
                DocumentCommands::Decode(args) => cmd_document(cipher.as_mut(), Direction::Decode, &args),
            }
        }
        Commands::Patterns { resource, json } => cmd_patterns(&settings, resource, json),
    }
}

// ── Setup ────────────────────────────────────────────────────────────

fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let settings = match explicit {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("failed to load settings from {DEFAULT_CONFIG_FILE}"))?,
    };
    Ok(settings.with_env_overrides())
}

fn build_cipher(settings: &Settings) -> Result<Box<dyn CipherBackend>> {
    let registry = settings.registry().context("invalid secure_config")?;
    let cipher = cipher_from_settings(&settings.plugins, registry)
        .context("failed to initialize cipher module")?;
    info!(cipher = %cipher.name(), "cipher ready");
    Ok(cipher)
}

// ── Cipher commands ──────────────────────────────────────────────────

fn cmd_cipher(cipher: &mut dyn CipherBackend, direction: Direction, args: ValueArgs) -> Result<()> {
    match (args.value, args.file) {
        (Some(value), None) => {
            let out = direction
                .value(cipher, &value)
                .with_context(|| format!("failed to {} value", direction.verb()))?;
            println!("{out}");
        }
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let out = direction
                .value(cipher, &contents)
                .with_context(|| format!("failed to {} {}", direction.verb(), path.display()))?;
            write_private(&path, out.as_bytes())?;
            println!("  {GREEN}✓{RESET} {} {}", direction.past(), path.display());
        }
        _ => bail!("exactly one of --value or --file is required"),
    }
    Ok(())
}

// ── Document commands ────────────────────────────────────────────────

fn cmd_document(cipher: &mut dyn CipherBackend, direction: Direction, args: &DocumentArgs) -> Result<()> {
    let raw = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let report = direction
        .document(cipher, args.resource, &raw)
        .with_context(|| format!("failed to {} {}", direction.verb(), args.file.display()))?;

    debug!(
        resource = %args.resource,
        transformed = report.transformed,
        failed = report.failures.len(),
        "document processed"
    );

    for failure in &report.failures {
        eprintln!("  {YELLOW}!{RESET} {} {DIM}({}){RESET}: {}", failure.path, failure.pattern, failure.reason);
    }

    match &args.output {
        Some(output) => {
            write_private(output, &report.document)?;
            println!(
                "  {GREEN}✓{RESET} {} {} field(s) of {} → {}",
                direction.past(),
                report.transformed,
                args.file.display(),
                output.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&report.document)
                .and_then(|()| stdout.flush())
                .context("failed to write document to stdout")?;
        }
    }

    if args.strict && !report.is_complete() {
        bail!(
            "{} field(s) could not be {}d",
            report.failures.len(),
            direction.verb()
        );
    }
    Ok(())
}

// ── Pattern listing ──────────────────────────────────────────────────

fn cmd_patterns(settings: &Settings, only: Option<ResourceType>, json: bool) -> Result<()> {
    let registry = settings.registry().context("invalid secure_config")?;

    let listing: BTreeMap<String, Vec<String>> = registry
        .iter()
        .filter(|(resource, _)| only.is_none_or(|wanted| wanted == *resource))
        .map(|(resource, patterns)| {
            let patterns = patterns.iter().map(ToString::to_string).collect();
            (resource.to_string(), patterns)
        })
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&listing).context("failed to format JSON")?;
        println!("{text}");
        return Ok(());
    }

    if listing.is_empty() {
        match only {
            Some(resource) => println!("  {DIM}No secure fields registered for {resource}.{RESET}"),
            None => println!("  {DIM}No secure fields registered.{RESET}"),
        }
        return Ok(());
    }

    for (resource, patterns) in &listing {
        println!("  {BOLD}{resource}{RESET}");
        for pattern in patterns {
            println!("    {pattern}");
        }
    }
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────

/// Write `bytes` to `path` and restrict it to the owner.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
