//! Handlers for trace commands.

use std::sync::Arc;

use profd_common::error::{ProfdError, ProfdResult};
use profd_trace_model::command::{Command, CommandKind};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::daemon::Daemon;
use crate::manager::TraceManager;
use crate::session::SessionControl;

pub mod start_trace;
pub mod stop_trace;

pub use start_trace::StartTrace;
pub use stop_trace::StopTrace;

/// Route a decoded command to its handler.
///
/// START_TRACE completes before this returns. STOP_TRACE runs on the
/// blocking pool of the current tokio runtime; the returned handle may be
/// awaited or dropped. Dispatching STOP_TRACE outside a runtime fails with
/// [`ProfdError::Runtime`] before anything is stopped.
pub fn dispatch(
    daemon: &Arc<Daemon>,
    trace_manager: &Arc<TraceManager>,
    sessions: &Arc<dyn SessionControl>,
    command: Command,
) -> ProfdResult<Option<JoinHandle<()>>> {
    tracing::debug!(
        command_id = command.command_id,
        app = command.app_name(),
        "Dispatching command"
    );
    match command.kind {
        CommandKind::StartTrace(_) => {
            StartTrace::create(command, Arc::clone(trace_manager), Arc::clone(sessions))?
                .execute_on(daemon);
            Ok(None)
        }
        CommandKind::StopTrace(_) => {
            let runtime = Handle::try_current().map_err(|e| {
                ProfdError::runtime(format!("STOP_TRACE needs a tokio runtime: {e}"))
            })?;
            let task_based_ux = daemon.config().task_based_ux;
            let handler = StopTrace::create(
                command,
                Arc::clone(trace_manager),
                Arc::clone(sessions),
                task_based_ux,
            )?;
            Ok(Some(handler.execute_on(Arc::clone(daemon), &runtime)))
        }
    }
}
