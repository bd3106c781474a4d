mod config;
mod display;
mod error;
mod interrupt;
mod key;
mod logging;
mod prompt;
mod qr;
mod store;
#[cfg(test)]
mod testing;
mod totp;
mod uri;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::Config;
use crate::display::{Clock, CountdownSleeper, Mode, Sleeper, SystemClock};
use crate::error::{GauthError, QrError};
use crate::key::TotpKey;
use crate::prompt::{Console, Style, UserInteraction};
use crate::store::KeyStore;

const USAGE: &str =
    "Usage: gauthy generate [--key/-k Authenticator_Key | --qr/-q Path_To_Qr_Image | --file/-f Storage_File] [--current/-c]";

#[derive(Parser, Debug)]
#[command(
    name = "gauthy",
    version,
    about = "CLI tool to generate Google Authenticator TOTP"
)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save an authenticator key to a store file, then optionally show codes
    ///
    /// Examples:
    ///   gauthy save keys.txt --key JBSWY3DPEHPK3PXP
    ///   gauthy save keys.yml --qr github.png
    Save {
        /// Store file (.txt, .yml or .yaml)
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Base32 secret or otpauth:// URI
        #[arg(short, long, value_name = "AUTHENTICATOR_KEY", conflicts_with = "qr")]
        key: Option<String>,
        /// Image containing a key QR code
        #[arg(short, long, value_name = "IMAGE")]
        qr: Option<PathBuf>,
    },

    /// Generate TOTP codes from exactly one key source
    ///
    /// Examples:
    ///   gauthy generate --key JBSWY3DPEHPK3PXP
    ///   gauthy generate --file keys.txt --current
    Generate {
        /// Base32 secret or otpauth:// URI
        #[arg(short, long, value_name = "AUTHENTICATOR_KEY")]
        key: Option<String>,
        /// Image containing a key QR code
        #[arg(short, long, value_name = "IMAGE")]
        qr: Option<PathBuf>,
        /// Store file (.txt, .yml or .yaml)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
        /// Print the current codes once instead of refreshing
        #[arg(short, long)]
        current: bool,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum KeySource {
    Key(String),
    Qr(PathBuf),
    File(PathBuf),
}

impl KeySource {
    fn from_flags(
        key: Option<String>,
        qr: Option<PathBuf>,
        file: Option<PathBuf>,
    ) -> Result<Self, GauthError> {
        match (key, qr, file) {
            (Some(key), None, None) => Ok(KeySource::Key(key)),
            (None, Some(qr), None) => Ok(KeySource::Qr(qr)),
            (None, None, Some(file)) => Ok(KeySource::File(file)),
            _ => Err(GauthError::Usage(
                "Error: Requires command line option either ['--key' / '-k'] or ['--qr' / '-q'] or ['--file' / '-f']"
                    .to_string(),
            )),
        }
    }
}

fn main() -> ExitCode {
    run(std::env::args_os())
}

fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match parse_args(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = interrupt::install() {
        warn!("cannot install interrupt handler: {e}");
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut console = Console::new(config.color);
    execute(
        cli.command,
        &config,
        &SystemClock,
        &mut console,
        &mut CountdownSleeper,
    )
}

/// Usage errors exit with 1 rather than clap's 2; help and version exit 0.
fn parse_args<I, T>(args: I) -> Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

fn execute<C, U, S>(
    command: Commands,
    config: &Config,
    clock: &C,
    ui: &mut U,
    sleeper: &mut S,
) -> ExitCode
where
    C: Clock,
    U: UserInteraction,
    S: Sleeper,
{
    let result = match command {
        Commands::Save { file, key, qr } => cmd_save(
            &file,
            key.as_deref(),
            qr.as_deref(),
            config,
            clock,
            ui,
            sleeper,
        ),
        Commands::Generate {
            key,
            qr,
            file,
            current,
        } => KeySource::from_flags(key, qr, file)
            .map_err(anyhow::Error::from)
            .and_then(|source| {
                let mode = if current { Mode::Snapshot } else { Mode::Live };
                cmd_generate(source, mode, config, clock, ui, sleeper)
            }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(ui, &e);
            ExitCode::FAILURE
        }
    }
}

/// gauthy save FILE [--key KEY | --qr IMAGE]
fn cmd_save<C, U, S>(
    file: &Path,
    key: Option<&str>,
    qr: Option<&Path>,
    config: &Config,
    clock: &C,
    ui: &mut U,
    sleeper: &mut S,
) -> anyhow::Result<()>
where
    C: Clock,
    U: UserInteraction,
    S: Sleeper,
{
    let mut store = KeyStore::load(file)?;

    let fresh = match (key, qr) {
        (Some(raw), _) => Some(TotpKey::from_input(
            raw,
            config.default_digits,
            config.default_period,
        )?),
        (None, Some(image)) => Some(qr::key_from_image(image)?),
        (None, None) => None,
    };

    if let Some(fresh) = fresh {
        if store.contains_secret(&fresh.secret) {
            ui.print_styled("Authenticator key already exists", Style::Notice);
        } else {
            let label = ui.prompt_text("Please provide a name/label for the Key", &fresh.name)?;
            let named = uri::parse(&uri::serialize(&fresh, Some(&label)))?;
            store.add(named);
            store.save(file)?;
            ui.print_styled("Added Authenticator Key to file", Style::Success);
        }
    }

    if ui.confirm("Do you want to generate TOTP from file?", true)? {
        display::run(&store, Mode::Live, clock, ui, sleeper)?;
    } else {
        ui.print_line("Goodbye...");
    }

    Ok(())
}

/// gauthy generate [--key KEY | --qr IMAGE | --file FILE] [--current]
fn cmd_generate<C, U, S>(
    source: KeySource,
    mode: Mode,
    config: &Config,
    clock: &C,
    ui: &mut U,
    sleeper: &mut S,
) -> anyhow::Result<()>
where
    C: Clock,
    U: UserInteraction,
    S: Sleeper,
{
    let store = match source {
        KeySource::File(path) => KeyStore::load(&path)?,
        KeySource::Key(raw) => KeyStore::single(TotpKey::from_input(
            &raw,
            config.default_digits,
            config.default_period,
        )?),
        KeySource::Qr(path) => KeyStore::single(qr::key_from_image(&path)?),
    };

    display::run(&store, mode, clock, ui, sleeper)?;
    Ok(())
}

fn report_error<U: UserInteraction>(ui: &mut U, err: &anyhow::Error) {
    match err.downcast_ref::<GauthError>() {
        Some(GauthError::InvalidSecret(reason)) => {
            ui.print_styled("Error - Unable to generate TOTP", Style::Failure);
            ui.print_line(&format!("Could not decode provided Auth Key - {reason}"));
        }
        Some(GauthError::Qr(qr_err)) => {
            ui.print_styled("Error: Could not decode provided QR code image", Style::Failure);
            match qr_err {
                QrError::NotFound => ui.print_line("Image does not contain QR code"),
                other => ui.print_line(&other.to_string()),
            }
        }
        Some(GauthError::UnsupportedFileExtension { .. }) => {
            ui.print_styled(
                "Supported file formats are - \n1. txt\n2. yml or yaml",
                Style::Notice,
            );
        }
        Some(GauthError::Usage(message)) => {
            ui.print_line(message);
            ui.print_line(USAGE);
        }
        Some(GauthError::Io { .. }) => {
            ui.print_styled("Error accessing key store file", Style::Failure);
            ui.print_line(&format!("{err:#}"));
        }
        _ => ui.print_styled(&format!("Error: {err:#}"), Style::Failure),
    }
}
