//! Run one capture end to end against simulated backends.

use std::sync::Arc;
use std::time::Duration;

use profd_common::clock::SteadyClock;
use profd_common::config::DaemonConfig;
use profd_trace_engine::backend::Backends;
use profd_trace_engine::{dispatch, Daemon, SessionControl, SessionsManager, Technology, TraceManager};
use profd_trace_model::command::{Command, StartTraceCommand, StopTraceCommand};
use profd_trace_model::configuration::{
    ArtOptions, AtraceOptions, PerfettoOptions, ProfilerType, SimpleperfOptions,
    TraceConfiguration, TraceOptions,
};

use crate::{ProfilerArg, TechnologyArg};

pub struct SimulateOptions {
    pub app: String,
    pub pid: i32,
    pub technology: TechnologyArg,
    pub profiler: ProfilerArg,
    pub duration_ms: u64,
    pub need_trace_response: bool,
    pub fail_start: Option<String>,
}

fn trace_options(technology: TechnologyArg) -> (Technology, TraceOptions) {
    match technology {
        TechnologyArg::Art => (Technology::Art, TraceOptions::Art(ArtOptions::default())),
        TechnologyArg::Atrace => (
            Technology::Atrace,
            TraceOptions::Atrace(AtraceOptions::default()),
        ),
        TechnologyArg::Simpleperf => (
            Technology::Simpleperf,
            TraceOptions::Simpleperf(SimpleperfOptions::default()),
        ),
        TechnologyArg::Perfetto => (
            Technology::Perfetto,
            TraceOptions::Perfetto(PerfettoOptions {
                buffer_size_kb: 4096,
                data_sources: vec!["linux.ftrace".to_string()],
            }),
        ),
    }
}

pub async fn run(config: DaemonConfig, options: SimulateOptions) -> anyhow::Result<()> {
    let (technology, trace_options) = trace_options(options.technology);
    let profiler_type = match options.profiler {
        ProfilerArg::Cpu => ProfilerType::Cpu,
        ProfilerArg::Memory => ProfilerType::Memory,
    };

    let staging_dir = config.cache_dir.join("staging");
    std::fs::create_dir_all(&staging_dir)?;
    let mut configuration = TraceConfiguration::new(options.app.clone(), trace_options);
    configuration.temp_path = staging_dir
        .join(format!("{}.trace", options.app))
        .to_string_lossy()
        .into_owned();

    let clock = Arc::new(SteadyClock::start());
    tracing::info!(epoch = clock.epoch_wall(), "Clock started");

    let (backends, handles) = Backends::simulated();
    if let Some(message) = &options.fail_start {
        handles.get(technology).fail_start(message.clone());
    }
    let trace_manager = Arc::new(TraceManager::new(clock.clone(), config.cpu.clone(), backends));
    let (daemon, mut stream) = Daemon::new(clock, config);
    let daemon = Arc::new(daemon);
    let sessions = Arc::new(SessionsManager::new());
    let session = sessions.begin_session(&daemon, options.pid, &options.app);
    let sessions: Arc<dyn SessionControl> = sessions;

    let start = Command::start_trace(
        1,
        options.pid,
        session.session_id,
        StartTraceCommand {
            configuration: configuration.clone(),
            profiler_type,
            api_start_metadata: None,
        },
    );
    dispatch(&daemon, &trace_manager, &sessions, start)
        .map_err(|e| anyhow::anyhow!("START_TRACE failed: {e}"))?;

    tokio::time::sleep(Duration::from_millis(options.duration_ms)).await;

    let stop = Command::stop_trace(
        2,
        options.pid,
        session.session_id,
        StopTraceCommand {
            configuration,
            profiler_type,
            api_stop_metadata: None,
            need_trace_response: options.need_trace_response,
        },
    );
    if let Some(handle) = dispatch(&daemon, &trace_manager, &sessions, stop)
        .map_err(|e| anyhow::anyhow!("STOP_TRACE failed: {e}"))?
    {
        handle.await?;
    }

    while let Ok(event) = stream.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }

    let captures = trace_manager.get_captures(&options.app, i64::MIN, i64::MAX);
    println!();
    println!("Captures for {}: {}", options.app, captures.len());
    for capture in &captures {
        let stop_status = capture
            .stop_status
            .as_ref()
            .map_or_else(|| "open".to_string(), |s| format!("{:?}", s.status));
        println!(
            "  trace {} [{} .. {}] {} ({})",
            capture.trace_id,
            capture.start_timestamp,
            capture
                .end_timestamp
                .map_or_else(|| "-".to_string(), |t| t.to_string()),
            technology.name(),
            stop_status
        );
    }
    if options.need_trace_response {
        println!("Completed traces: {}", daemon.file_cache().complete_dir().display());
    }

    Ok(())
}
