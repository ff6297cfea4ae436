//! `pkgdeck` runs package-manager commands behind one shared busy indicator.
//!
//! ```bash
//! pkgdeck run --title "Upgrading" "choco upgrade all -y"
//! pkgdeck run "winget upgrade --all" "choco outdated" --transcript run.json
//! pkgdeck settings --debug-logging true
//! ```

mod app;
mod error;
mod logging;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand};
use pkgdeck_core::VersionNumberProvider;

use crate::app::{Pkgdeck, RunOptions};
use crate::error::AppError;
use crate::settings::AppSettings;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "pkgdeck", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    /// Write debug output to the log file for this run
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run package-manager commands under one busy indicator
    Run(RunArgs),
    /// Show or change persisted settings
    Settings(SettingsArgs),
    /// Print the version label
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Command lines to run concurrently through the platform shell
    #[arg(required = true)]
    commands: Vec<String>,

    /// Title shown on the busy indicator
    #[arg(long)]
    title: Option<String>,

    /// Allow Ctrl-C to cancel the batch (defaults to the saved setting)
    #[arg(long, conflicts_with = "no_cancel")]
    cancelable: bool,

    /// Do not allow the batch to be cancelled
    #[arg(long)]
    no_cancel: bool,

    /// Ask this question before running; a negative answer aborts
    #[arg(long)]
    confirm: Option<String>,

    /// Use native message boxes and no terminal progress display
    #[arg(long)]
    native_dialogs: bool,

    /// Hide the progress display and the transcript
    #[arg(long, short)]
    quiet: bool,

    /// Write the status transcript as JSON to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

impl RunArgs {
    fn into_options(self) -> RunOptions {
        let cancelable = if self.cancelable {
            Some(true)
        } else if self.no_cancel {
            Some(false)
        } else {
            None
        };
        RunOptions {
            commands: self.commands,
            title: self.title,
            cancelable,
            confirm: self.confirm,
            native_dialogs: self.native_dialogs,
            quiet: self.quiet,
            transcript: self.transcript,
        }
    }
}

#[derive(Args, Debug)]
struct SettingsArgs {
    #[arg(long)]
    debug_logging: Option<bool>,

    #[arg(long)]
    status_log_capacity: Option<usize>,

    #[arg(long)]
    command_timeout_secs: Option<u64>,

    #[arg(long)]
    default_cancelable: Option<bool>,
}

impl SettingsArgs {
    /// Applies the given overrides. Returns whether anything changed.
    fn apply(&self, settings: &mut AppSettings) -> bool {
        let mut changed = false;
        if let Some(value) = self.debug_logging {
            settings.debug_logging = value;
            changed = true;
        }
        if let Some(value) = self.status_log_capacity {
            settings.status_log_capacity = value;
            changed = true;
        }
        if let Some(value) = self.command_timeout_secs {
            settings.command_timeout_secs = value;
            changed = true;
        }
        if let Some(value) = self.default_cancelable {
            settings.default_cancelable = value;
            changed = true;
        }
        changed
    }
}

fn show_settings(mut settings: AppSettings, args: &SettingsArgs) -> Result<(), AppError> {
    if args.apply(&mut settings) {
        settings.save()?;
        log::info!("Settings saved");
    }
    let content = serde_json::to_string_pretty(&settings)
        .map_err(|e| AppError::operation_failed("render settings", e))?;
    println!("{content}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = AppSettings::load();
    logging::init_logging(
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );

    let result = match cli.command {
        Command::Run(args) => {
            let app = Pkgdeck::new(settings);
            app.run(&args.into_options())
                .await
                .map(|succeeded| if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Settings(args) => show_settings(settings, &args).map(|()| ExitCode::SUCCESS),
        Command::Version => {
            let provider = VersionNumberProvider::new(env!("CARGO_PKG_VERSION"));
            println!("{}", provider.version());
            Ok(ExitCode::SUCCESS)
        }
    };

    result.unwrap_or_else(|error| {
        eprintln!("{error}");
        if error.is_cancelled() {
            ExitCode::from(130)
        } else {
            ExitCode::FAILURE
        }
    })
}
