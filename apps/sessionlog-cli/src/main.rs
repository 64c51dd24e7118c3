mod commands;
mod host;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use sessionlog_delivery::{sweep_unsent, DeliveryPipeline, SessionLogger, SessionLoggerDeps};
use sessionlog_network::{HttpUploader, SnapshotUploader};
use sessionlog_ops::{
    diagnostic_channel, init_tracing, install_panic_capture, resolve_storage_dir, DiagnosticLayer,
    LocalStore,
};
use sessionlog_types::config::{
    AppInfo, ModeConfig, ModesConfig, OpsConfig, RunMode, ServerConfig, SessionConfig,
    SessionLoggerConfig, ShutdownConfig,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver},
};
use tracing::{info, warn};

use crate::{
    commands::{Command, EventTarget, USAGE},
    host::{ChannelExit, SimulatedFrames},
};

const DEFAULT_CONFIG_PATH: &str = "configs/sessionlog.toml";

#[derive(Debug, Parser)]
#[command(name = "sessionlog", about = "Session telemetry logger host")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, global = true, default_value_t = ModeArg::Build)]
    mode: ModeArg,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Editor,
    Build,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Editor => RunMode::Editor,
            ModeArg::Build => RunMode::Build,
        }
    }
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Drive an interactive session from stdin.
    Run,
    /// Resubmit snapshots left by earlier sessions, then exit.
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config);
    let run_mode = RunMode::from(cli.mode);

    match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => run(config, run_mode).await,
        CliCommand::Sweep => sweep(config, run_mode).await,
    }
}

async fn run(config: SessionLoggerConfig, run_mode: RunMode) -> Result<()> {
    let (diag_tx, diag_rx) = diagnostic_channel();
    init_tracing(&config.ops, Some(DiagnosticLayer::new(diag_tx.clone())))?;
    install_panic_capture(diag_tx);

    let store = LocalStore::open(resolve_storage_dir(&config.ops, &config.app))?;
    info!("Storing session logs in {:?}", store.dir());

    let (exit_tx, exit_rx) = mpsc::unbounded_channel();
    let logger = SessionLogger::start(
        &config,
        run_mode,
        SessionLoggerDeps {
            store,
            uploader: build_uploader(&config.server),
            frame_probe: Some(Arc::new(SimulatedFrames::default())),
            exit: Arc::new(ChannelExit::new(exit_tx)),
            diagnostics: Some(diag_rx),
        },
    );

    command_loop(&logger, exit_rx).await?;
    logger.shutdown();
    Ok(())
}

async fn command_loop(logger: &SessionLogger, mut retry_exit: UnboundedReceiver<()>) -> Result<()> {
    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    if logger.handle_exit_request() {
                        break;
                    }
                    continue;
                };
                match commands::parse(&line) {
                    Ok(Some(Command::Quit)) => {
                        if logger.handle_exit_request() {
                            break;
                        }
                        println!("Waiting for the session log to be delivered...");
                    }
                    Ok(Some(command)) => apply(logger, command),
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if logger.handle_exit_request() {
                    break;
                }
            }
            Some(()) = retry_exit.recv() => {
                if logger.handle_exit_request() {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn apply(logger: &SessionLogger, command: Command) {
    match command {
        Command::Event(EventTarget::Name(name)) => logger.record_event(&name),
        Command::Event(EventTarget::Index(index)) => match logger.action_at(index) {
            Some(name) => logger.record_event(&name),
            None => warn!("No predefined action at index {index}"),
        },
        Command::Custom {
            name,
            value,
            overwrite,
        } => logger.record_custom_event(&name, &value, overwrite),
        Command::Log { kind, message } => logger.record_log(&kind, &message),
        Command::Save => logger.save_and_send_with_callback(|ok| {
            info!("Save and send {}", if ok { "succeeded" } else { "failed" });
        }),
        Command::Help => println!("{USAGE}"),
        Command::Quit => {}
    }
}

async fn sweep(config: SessionLoggerConfig, run_mode: RunMode) -> Result<()> {
    init_tracing(&config.ops, None)?;
    let store = LocalStore::open(resolve_storage_dir(&config.ops, &config.app))?;
    let pipeline = DeliveryPipeline::new(
        config.mode(run_mode),
        store,
        build_uploader(&config.server),
    );
    let report = sweep_unsent(&pipeline, "").await;
    println!(
        "found {} | delivered {} | deferred {} | unreadable {}",
        report.found, report.delivered, report.deferred, report.unreadable
    );
    Ok(())
}

fn build_uploader(server: &ServerConfig) -> Option<Arc<dyn SnapshotUploader>> {
    server.url()?;
    match HttpUploader::new(server) {
        Ok(uploader) => Some(Arc::new(uploader)),
        Err(err) => {
            warn!("Uploads disabled: {err}");
            None
        }
    }
}

fn load_config(from_args: Option<PathBuf>) -> SessionLoggerConfig {
    let from_env = env::var("SESSIONLOG_CONFIG").ok().map(PathBuf::from);
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    match SessionLoggerConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            default_config()
        }
    }
}

/// Local-only defaults; nothing leaves the machine without a config file.
fn default_config() -> SessionLoggerConfig {
    let local_only = ModeConfig {
        save_local_json: true,
        send_to_server: false,
    };
    let config = SessionLoggerConfig {
        app: AppInfo::default(),
        modes: ModesConfig {
            editor: local_only,
            build: local_only,
        },
        server: ServerConfig::default(),
        session: SessionConfig {
            action_names: vec!["Start".into(), "Checkpoint".into(), "Finish".into()],
            periodic_save_interval_secs: 0.0,
        },
        shutdown: ShutdownConfig::default(),
        ops: OpsConfig::default(),
    };
    debug_assert!(config.validate().is_ok());
    config
}
