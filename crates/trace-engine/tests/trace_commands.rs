use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use profd_common::clock::FakeClock;
use profd_common::config::DaemonConfig;
use profd_common::error::ProfdError;
use profd_trace_engine::backend::{Backends, SimulatedHandles};
use profd_trace_engine::{dispatch, Daemon, EventStream, SessionControl, SessionsManager, TraceManager};
use profd_trace_model::command::{
    ApiStartMetadata, ApiStopMetadata, Command, CommandKind, StartTraceCommand, StopTraceCommand,
};
use profd_trace_model::configuration::{
    ArtOptions, LegacyOptions, ProfilerType, SimpleperfOptions, TraceConfiguration,
    TraceInitiationType, TraceOptions, TraceType,
};
use profd_trace_model::event::{Event, EventKind};
use profd_trace_model::status::{StartErrorCode, StartStatusCode, StopStatusCode};

const APP: &str = "com.example.app";
const PID: i32 = 4242;

struct Harness {
    daemon: Arc<Daemon>,
    manager: Arc<TraceManager>,
    sessions: Arc<SessionsManager>,
    handles: SimulatedHandles,
    clock: Arc<FakeClock>,
    stream: EventStream,
    dir: PathBuf,
}

impl Harness {
    fn new(name: &str) -> Self {
        Self::with_config(name, |_| {})
    }

    fn with_config(name: &str, tweak: impl FnOnce(&mut DaemonConfig)) -> Self {
        let dir = std::env::temp_dir().join(format!("profd_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = DaemonConfig {
            cache_dir: dir.join("cache"),
            ..DaemonConfig::default()
        };
        tweak(&mut config);

        let clock = Arc::new(FakeClock::new(1_000));
        let (backends, handles) = Backends::simulated();
        let manager = Arc::new(TraceManager::new(clock.clone(), config.cpu.clone(), backends));
        let (daemon, stream) = Daemon::new(clock.clone(), config);
        Self {
            daemon: Arc::new(daemon),
            manager,
            sessions: Arc::new(SessionsManager::new()),
            handles,
            clock,
            stream,
            dir,
        }
    }

    fn session_control(&self) -> Arc<dyn SessionControl> {
        self.sessions.clone()
    }

    fn begin_session(&mut self) -> i64 {
        let session = self.sessions.begin_session(&self.daemon, PID, APP);
        self.drain();
        session.session_id
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join("staging.trace")
    }

    fn art_configuration(&self) -> TraceConfiguration {
        let mut configuration = TraceConfiguration::new(
            APP,
            TraceOptions::Art(ArtOptions {
                sampling_interval_us: 500,
                buffer_size_in_mb: 8,
                ..ArtOptions::default()
            }),
        );
        configuration.temp_path = self.staging_path().to_string_lossy().into_owned();
        configuration
    }

    async fn run(&self, command: Command) {
        let handle = dispatch(&self.daemon, &self.manager, &self.session_control(), command)
            .unwrap();
        if let Some(handle) = handle {
            handle.await.unwrap();
        }
    }

    fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.stream.try_recv().ok()).collect()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn start(configuration: TraceConfiguration, profiler_type: ProfilerType) -> Command {
    Command::start_trace(
        1,
        PID,
        1,
        StartTraceCommand {
            configuration,
            profiler_type,
            api_start_metadata: None,
        },
    )
}

fn stop(
    configuration: TraceConfiguration,
    profiler_type: ProfilerType,
    need_trace_response: bool,
) -> Command {
    Command::stop_trace(
        2,
        PID,
        1,
        StopTraceCommand {
            configuration,
            profiler_type,
            api_stop_metadata: None,
            need_trace_response,
        },
    )
}

fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

#[tokio::test]
async fn start_without_profiler_type_fails_without_backend_calls() {
    let mut h = Harness::new("cmd_start_unspecified");
    h.begin_session();

    h.run(start(h.art_configuration(), ProfilerType::Unspecified)).await;

    let events = h.drain();
    assert_eq!(events.len(), 1);
    let status = events[0].start_status().unwrap();
    assert_eq!(status.status, StartStatusCode::Failure);
    assert_eq!(status.error_code, StartErrorCode::NoTraceTypeSpecified);
    assert_eq!(events[0].group_id, 0);
    assert_eq!(events[0].command_id, 1);
    assert_eq!(h.handles.total_calls(), 0);
    assert!(h.manager.get_ongoing_capture(APP).is_none());
}

#[tokio::test]
async fn cpu_start_then_stop_publishes_full_lifecycle() {
    let mut h = Harness::new("cmd_cpu_lifecycle");
    h.begin_session();

    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;
    h.clock.set(5_000);
    h.run(stop(h.art_configuration(), ProfilerType::Cpu, true)).await;

    let events = h.drain();
    assert_eq!(
        kinds(&events),
        vec![
            EventKind::TraceStatus,
            EventKind::CpuTrace,
            EventKind::TraceStatus,
            EventKind::CpuTrace
        ]
    );
    assert!(events[0].start_status().unwrap().is_success());
    assert!(events[1].is_trace_started());
    assert!(events[2].stop_status().unwrap().is_success());
    assert!(events[3].is_trace_ended());

    // CPU events are grouped by trace id.
    let trace_id = events[1].trace_info().unwrap().trace_id;
    assert!(events.iter().all(|e| e.group_id == trace_id));

    let info = events[3].trace_info().unwrap();
    assert_eq!(info.to_timestamp, Some(5_000));
    assert!(h.manager.get_ongoing_capture(APP).is_none());

    let stored = h.daemon.file_cache().complete_path(&trace_id.to_string());
    assert!(stored.is_file());
    assert!(!h.staging_path().exists());
}

#[tokio::test]
async fn memory_events_are_grouped_by_start_timestamp() {
    let mut h = Harness::new("cmd_memory_group");
    h.begin_session();

    let mut configuration = h.art_configuration();
    configuration.initiation_type = TraceInitiationType::InitiatedByApi;
    let mut command = start(configuration, ProfilerType::Memory);
    if let CommandKind::StartTrace(start) = &mut command.kind {
        start.api_start_metadata = Some(ApiStartMetadata { start_timestamp: 700 });
    }
    h.run(command).await;

    let events = h.drain();
    assert_eq!(kinds(&events), vec![EventKind::TraceStatus, EventKind::MemoryTrace]);
    assert_eq!(events[1].group_id, 700);
    assert_eq!(events[0].group_id, 700);
    assert_eq!(h.handles.total_calls(), 0);
}

#[tokio::test]
async fn stop_without_profiler_type_leaves_capture_open() {
    let mut h = Harness::new("cmd_stop_unspecified");
    h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;
    h.drain();

    h.run(stop(h.art_configuration(), ProfilerType::Unspecified, true)).await;

    let events = h.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].stop_status().unwrap().status,
        StopStatusCode::NoTraceTypeSpecifiedStop
    );
    assert!(h.manager.get_ongoing_capture(APP).is_some());
    assert!(h.handles.art.stop_calls().is_empty());
}

#[tokio::test]
async fn stop_without_capture_reports_no_ongoing_profiling() {
    let mut h = Harness::new("cmd_stop_nothing");
    h.begin_session();

    h.run(stop(h.art_configuration(), ProfilerType::Cpu, true)).await;

    let events = h.drain();
    assert_eq!(events.len(), 1);
    let status = events[0].stop_status().unwrap();
    assert_eq!(status.status, StopStatusCode::NoOngoingProfiling);
    assert_eq!(status.error_message, "No ongoing capture exists");
    assert_eq!(events[0].group_id, 0);
}

#[tokio::test]
async fn backend_start_failure_is_reported_verbatim() {
    let mut h = Harness::new("cmd_start_failure");
    h.begin_session();
    h.handles.art.fail_start("Unable to attach agent.");

    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;

    let events = h.drain();
    assert_eq!(events.len(), 1);
    let status = events[0].start_status().unwrap();
    assert_eq!(status.status, StartStatusCode::Failure);
    assert_eq!(status.error_message, "Unable to attach agent.");
    assert!(h.manager.get_captures(APP, i64::MIN, i64::MAX).is_empty());
}

#[tokio::test]
async fn backend_stop_failure_skips_relocation() {
    let mut h = Harness::new("cmd_stop_failure");
    h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;
    h.handles
        .art
        .fail_stop(StopStatusCode::WaitTimeout, "Timed out waiting for trace file.");

    h.run(stop(h.art_configuration(), ProfilerType::Cpu, true)).await;

    let events = h.drain();
    let ended = events.last().unwrap().trace_info().unwrap();
    let status = ended.stop_status.as_ref().unwrap();
    assert_eq!(status.status, StopStatusCode::WaitTimeout);
    assert_eq!(status.error_message, "Timed out waiting for trace file.");
    assert!(!h.daemon.file_cache().complete_dir().exists());
}

#[tokio::test]
async fn relocation_failure_downgrades_stored_status() {
    let mut h = Harness::with_config("cmd_relocation_failure", |config| {
        // A regular file where the cache directory should be.
        config.cache_dir = std::env::temp_dir().join("profd_test_cmd_relocation_blocker");
    });
    std::fs::write(&h.daemon.config().cache_dir, b"not a directory").unwrap();
    h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;

    h.run(stop(h.art_configuration(), ProfilerType::Cpu, true)).await;

    let events = h.drain();
    assert!(events[2].stop_status().unwrap().is_success());
    let ended = events[3].trace_info().unwrap();
    assert_eq!(
        ended.stop_status.as_ref().unwrap().status,
        StopStatusCode::CannotReadFile
    );

    let stored = h.manager.get_captures(APP, i64::MIN, i64::MAX);
    assert_eq!(
        stored[0].stop_status.as_ref().unwrap().status,
        StopStatusCode::CannotReadFile
    );
    std::fs::remove_file(&h.daemon.config().cache_dir).ok();
}

#[tokio::test]
async fn api_initiated_capture_never_touches_backends() {
    let mut h = Harness::new("cmd_api_initiated");
    h.begin_session();
    let mut configuration = h.art_configuration();
    configuration.initiation_type = TraceInitiationType::InitiatedByApi;

    let mut start_command = start(configuration.clone(), ProfilerType::Cpu);
    if let CommandKind::StartTrace(start) = &mut start_command.kind {
        start.api_start_metadata = Some(ApiStartMetadata { start_timestamp: 300 });
    }
    h.run(start_command).await;

    let mut stop_command = stop(configuration, ProfilerType::Cpu, true);
    if let CommandKind::StopTrace(stop) = &mut stop_command.kind {
        stop.api_stop_metadata = Some(ApiStopMetadata {
            stop_timestamp: 900,
            payload_name: "app-trace".to_string(),
        });
    }
    h.run(stop_command).await;

    let events = h.drain();
    assert_eq!(events.len(), 4);
    let info = events[3].trace_info().unwrap();
    assert_eq!(info.from_timestamp, 300);
    assert_eq!(info.to_timestamp, Some(900));
    assert!(info.stop_status.as_ref().unwrap().is_success());
    assert_eq!(h.handles.total_calls(), 0);
    assert!(!h.daemon.file_cache().complete_dir().exists());
}

#[tokio::test]
async fn task_based_ux_ends_session_after_stop() {
    let mut h = Harness::with_config("cmd_task_based", |config| config.task_based_ux = true);
    let session_id = h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;

    let mut command = stop(h.art_configuration(), ProfilerType::Cpu, false);
    command.session_id = session_id;
    h.run(command).await;

    let events = h.drain();
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Session);
    assert!(last.is_ended);
    assert_eq!(last.group_id, session_id);
    assert_eq!(events[events.len() - 2].kind, EventKind::CpuTrace);
    assert!(h.sessions.active_session().is_none());
}

#[tokio::test]
async fn task_based_ux_ends_session_on_rejected_stop() {
    let mut h = Harness::with_config("cmd_task_based_reject", |config| {
        config.task_based_ux = true;
    });
    let session_id = h.begin_session();

    let mut command = stop(h.art_configuration(), ProfilerType::Cpu, false);
    command.session_id = session_id;
    h.run(command).await;

    let events = h.drain();
    assert_eq!(kinds(&events), vec![EventKind::TraceStatus, EventKind::Session]);
    assert!(h.sessions.active_session().is_none());
}

#[tokio::test]
async fn start_events_wait_for_session() {
    let mut h = Harness::new("cmd_queued_start");
    let mut configuration = h.art_configuration();
    configuration.initiation_type = TraceInitiationType::InitiatedByStartup;

    h.run(start(configuration, ProfilerType::Cpu)).await;
    assert!(h.drain().is_empty());
    assert_eq!(h.sessions.queued_events(APP), 2);
    assert!(h.handles.art.start_calls()[0].startup);

    h.sessions.begin_session(&h.daemon, PID, APP);
    let events = h.drain();
    assert_eq!(
        kinds(&events),
        vec![EventKind::Session, EventKind::TraceStatus, EventKind::CpuTrace]
    );
}

#[tokio::test]
async fn stop_without_trace_response_leaves_staging_untouched() {
    let mut h = Harness::new("cmd_no_response");
    h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;

    h.run(stop(h.art_configuration(), ProfilerType::Cpu, false)).await;

    let events = h.drain();
    assert!(events[3].trace_info().unwrap().stop_status.as_ref().unwrap().is_success());
    assert!(!h.staging_path().exists());
    assert!(!h.daemon.file_cache().complete_dir().exists());
    assert!(!h.handles.art.stop_calls()[0].need_trace_response);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_admit_one_capture() {
    let h = Harness::new("cmd_concurrent_starts");
    let configuration = h.art_configuration();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&h.manager);
            let configuration = configuration.clone();
            tokio::task::spawn_blocking(move || manager.start_capture(0, &configuration).is_ok())
        })
        .collect();

    let mut started = 0;
    for task in tasks {
        if task.await.unwrap() {
            started += 1;
        }
    }
    assert_eq!(started, 1);
    assert_eq!(h.handles.art.start_calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_backend_stop_does_not_block_dispatch() {
    let mut h = Harness::new("cmd_slow_stop");
    h.begin_session();
    h.run(start(h.art_configuration(), ProfilerType::Cpu)).await;
    h.handles.art.set_stop_delay(Duration::from_millis(800));

    let dispatched = Instant::now();
    let handle = dispatch(
        &h.daemon,
        &h.manager,
        &h.session_control(),
        stop(h.art_configuration(), ProfilerType::Cpu, false),
    )
    .unwrap()
    .unwrap();
    assert!(dispatched.elapsed() < Duration::from_millis(200));
    assert!(!handle.is_finished());

    // Wait until the backend stop is running under the manager lock.
    while h.handles.art.stop_calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Another app's start queues behind the lock, not behind dispatch.
    let mut other = h.art_configuration();
    other.app_name = "com.example.other".to_string();
    let manager = Arc::clone(&h.manager);
    let requested = Instant::now();
    let blocked_for = tokio::task::spawn_blocking(move || {
        manager
            .start_capture(0, &other)
            .map(|_| requested.elapsed())
    })
    .await
    .unwrap()
    .unwrap();
    assert!(blocked_for >= Duration::from_millis(300));

    handle.await.unwrap();
    let events = h.drain();
    assert!(events.last().unwrap().is_trace_ended());
    assert!(h.manager.get_ongoing_capture("com.example.other").is_some());
}

#[tokio::test]
async fn stop_uses_the_backend_the_capture_started_on() {
    let mut h = Harness::new("cmd_stop_routing");
    h.begin_session();
    let legacy_atrace = TraceConfiguration {
        app_name: APP.to_string(),
        temp_path: h.staging_path().to_string_lossy().into_owned(),
        legacy_options: Some(LegacyOptions {
            trace_type: TraceType::Atrace,
            ..LegacyOptions::default()
        }),
        ..TraceConfiguration::default()
    };

    // Stop request names a different technology.
    h.run(start(legacy_atrace.clone(), ProfilerType::Cpu)).await;
    let simpleperf = TraceConfiguration::new(
        APP,
        TraceOptions::Simpleperf(SimpleperfOptions::default()),
    );
    h.run(stop(simpleperf, ProfilerType::Cpu, false)).await;

    // Stop request carries no options at all.
    h.run(start(legacy_atrace, ProfilerType::Cpu)).await;
    let bare = TraceConfiguration {
        app_name: APP.to_string(),
        ..TraceConfiguration::default()
    };
    h.run(stop(bare, ProfilerType::Cpu, false)).await;

    let ended: Vec<_> = h
        .drain()
        .into_iter()
        .filter(|e| e.is_trace_ended())
        .collect();
    assert_eq!(ended.len(), 2);
    for event in &ended {
        let info = event.trace_info().unwrap();
        assert!(info.stop_status.as_ref().unwrap().is_success());
    }
    assert_eq!(h.handles.atrace.stop_calls().len(), 2);
    assert!(h.handles.simpleperf.stop_calls().is_empty());
    assert_eq!(h.handles.total_calls(), 4);
}

#[test]
fn stop_outside_runtime_is_rejected() {
    let h = Harness::new("cmd_no_runtime");

    let err = dispatch(
        &h.daemon,
        &h.manager,
        &h.session_control(),
        stop(h.art_configuration(), ProfilerType::Cpu, false),
    )
    .unwrap_err();
    assert!(matches!(err, ProfdError::Runtime { .. }));

    // Starts complete inline and need no runtime.
    let started = dispatch(
        &h.daemon,
        &h.manager,
        &h.session_control(),
        start(h.art_configuration(), ProfilerType::Cpu),
    )
    .unwrap();
    assert!(started.is_none());
    assert!(h.manager.get_ongoing_capture(APP).is_some());
}
