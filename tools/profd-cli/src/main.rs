//! profd CLI: drive the capture engine from the command line.
//!
//! Usage:
//!   profd simulate [OPTIONS]   Run one capture against simulated backends
//!   profd config               Show the effective daemon configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "profd",
    about = "On-device profiler daemon: capture orchestration tools",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/profd/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TechnologyArg {
    Art,
    Atrace,
    Simpleperf,
    Perfetto,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProfilerArg {
    Cpu,
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Start and stop one capture on simulated backends, printing every event
    Simulate {
        /// Application to profile
        #[arg(short, long, default_value = "com.example.app")]
        app: String,

        /// Process id reported on events
        #[arg(long, default_value = "1000")]
        pid: i32,

        /// Tracing technology
        #[arg(short, long, value_enum, default_value = "art")]
        technology: TechnologyArg,

        /// Profiler the commands target
        #[arg(long, value_enum, default_value = "cpu")]
        profiler: ProfilerArg,

        /// How long the capture runs (milliseconds)
        #[arg(long, default_value = "250")]
        duration_ms: u64,

        /// Do not request trace bytes on stop
        #[arg(long)]
        no_response: bool,

        /// Make the backend fail to start with this message
        #[arg(long)]
        fail_start: Option<String>,
    },

    /// Show the effective daemon configuration
    Config {
        /// Write the configuration to the standard location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => profd_common::config::DaemonConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => profd_common::config::DaemonConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    profd_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Simulate {
            app,
            pid,
            technology,
            profiler,
            duration_ms,
            no_response,
            fail_start,
        } => {
            commands::simulate::run(
                config,
                commands::simulate::SimulateOptions {
                    app,
                    pid,
                    technology,
                    profiler,
                    duration_ms,
                    need_trace_response: !no_response,
                    fail_start,
                },
            )
            .await
        }
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
