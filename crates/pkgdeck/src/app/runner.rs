//! Runs package-manager commands as operations of the loading coordinator.
//!
//! Every command joins the current batch, streams stdout/stderr into the
//! status log, and is killed when the batch is cancelled.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, info, warn};
use pkgdeck_core::{LineKind, LoadingCoordinator};
use pkgdeck_platform::shell_command;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use super::async_helpers::run_with_timeout;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub command_line: String,
    pub status: ExitStatus,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub title: Option<&'a str>,
    pub cancelable: bool,
    pub timeout: Duration,
}

/// Runs one command line as one operation of the current batch.
///
/// Dropping the returned future kills the child and stops loading.
pub async fn run_command(
    coordinator: &Arc<LoadingCoordinator>,
    command_line: &str,
    request: &RunRequest<'_>,
) -> Result<CommandOutcome, AppError> {
    let guard = coordinator
        .begin(request.title, request.cancelable)
        .await
        .map_err(|e| AppError::operation_failed("start loading", e))?;

    let result = execute(coordinator, command_line, guard.token(), request.timeout).await;

    let stopped = guard
        .finish()
        .await
        .map_err(|e| AppError::operation_failed("stop loading", e));

    let status = result?;
    stopped?;

    Ok(CommandOutcome {
        command_line: command_line.to_string(),
        status,
    })
}

/// Runs all command lines concurrently under one shared busy indicator.
///
/// When more than one command runs, batch progress advances as commands
/// complete. Results are returned in input order.
pub async fn run_commands(
    coordinator: &Arc<LoadingCoordinator>,
    command_lines: &[String],
    request: &RunRequest<'_>,
) -> Vec<Result<CommandOutcome, AppError>> {
    let total = command_lines.len();
    let completed = AtomicUsize::new(0);

    let runs = command_lines.iter().map(|line| {
        let completed = &completed;
        async move {
            let result = run_command(coordinator, line, request).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if total > 1 && coordinator.is_loading() {
                coordinator.report(percent(done, total));
            }
            result
        }
    });

    join_all(runs).await
}

#[allow(clippy::cast_precision_loss)]
fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done as f64 * 100.0 / total as f64
}

async fn execute(
    coordinator: &LoadingCoordinator,
    command_line: &str,
    token: &CancellationToken,
    timeout: Duration,
) -> Result<ExitStatus, AppError> {
    info!("Running: {command_line}");
    coordinator.write_message(format!("> {command_line}"), LineKind::Verbose, true);

    let mut child = shell_command(command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::operation_failed("spawn command", e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let outcome = tokio::select! {
        () = token.cancelled() => None,
        result = run_with_timeout(
            timeout,
            "Command",
            async {
                let (status, (), ()) = tokio::join!(
                    child.wait(),
                    pump_lines(coordinator, stdout, LineKind::Output),
                    pump_lines(coordinator, stderr, LineKind::Error),
                );
                status
            },
            |e| AppError::operation_failed("wait for command", e),
        ) => Some(result),
    };

    match outcome {
        Some(Ok(status)) => {
            debug!("{command_line} exited with {status}");
            if !status.success() {
                coordinator.write_message(
                    format!("{command_line} exited with {status}"),
                    LineKind::Error,
                    true,
                );
            }
            Ok(status)
        }
        Some(Err(error)) => {
            warn!("{command_line}: {error}");
            let _ = child.kill().await;
            Err(error)
        }
        None => {
            info!("Cancelled: {command_line}");
            let _ = child.kill().await;
            coordinator.write_message(
                format!("{command_line} was cancelled"),
                LineKind::Warning,
                true,
            );
            Err(AppError::operation_cancelled("Command"))
        }
    }
}

async fn pump_lines<R>(coordinator: &LoadingCoordinator, reader: Option<R>, kind: LineKind)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => coordinator.write_message(line, kind, true),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading command output: {e}");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pkgdeck_core::{
        HostError, LineKind, LoadingCoordinator, ModalResult, OutputLine, SystemMessageBox,
    };

    use super::{RunRequest, percent, run_command, run_commands};
    use crate::error::AppError;

    struct DeclineMessageBox;

    impl SystemMessageBox for DeclineMessageBox {
        fn show(&self, _title: &str, _message: &str) -> Result<ModalResult, HostError> {
            Ok(ModalResult::Negative)
        }
    }

    fn coordinator() -> Arc<LoadingCoordinator> {
        Arc::new(LoadingCoordinator::new(100, Arc::new(DeclineMessageBox)))
    }

    fn request(timeout: Duration) -> RunRequest<'static> {
        RunRequest {
            title: Some("Test"),
            cancelable: true,
            timeout,
        }
    }

    fn lines_of(coordinator: &LoadingCoordinator, kind: LineKind) -> Vec<String> {
        coordinator
            .output()
            .snapshot()
            .into_iter()
            .filter(|line: &OutputLine| line.kind == kind)
            .map(|line| line.text)
            .collect()
    }

    #[test]
    fn percent_divides_completed_by_total() {
        assert!((percent(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((percent(0, 0) - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn command_output_is_streamed_into_status_log() {
        let coordinator = coordinator();

        let outcome = run_command(
            &coordinator,
            "echo installing; echo 'not signed' 1>&2",
            &request(Duration::from_secs(10)),
        )
        .await
        .expect("command should run");

        assert!(outcome.success());
        assert_eq!(lines_of(&coordinator, LineKind::Output), vec!["installing"]);
        assert_eq!(lines_of(&coordinator, LineKind::Error), vec!["not signed"]);
        assert!(!coordinator.is_loading());
    }

    #[tokio::test]
    async fn failing_command_reports_exit_status() {
        let coordinator = coordinator();

        let outcome = run_command(&coordinator, "exit 3", &request(Duration::from_secs(10)))
            .await
            .expect("command should run");

        assert_eq!(outcome.status.code(), Some(3));
        assert!(!coordinator.is_loading());
        assert_eq!(lines_of(&coordinator, LineKind::Error).len(), 1);
    }

    #[tokio::test]
    async fn cancelling_the_batch_kills_the_command() {
        let coordinator = coordinator();
        coordinator
            .start_loading(Some("Outer"), true)
            .await
            .expect("outer start");
        let token = coordinator.cancellation_token().expect("token");

        let running = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                run_command(&coordinator, "sleep 30", &request(Duration::from_secs(60))).await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let result = running.await.expect("task should not panic");
        assert_eq!(result.err(), Some(AppError::operation_cancelled("Command")));

        coordinator.stop_loading().await.expect("outer stop");
        assert!(!coordinator.is_loading());
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let coordinator = coordinator();

        let result =
            run_command(&coordinator, "sleep 30", &request(Duration::from_millis(100))).await;

        assert_eq!(result.err(), Some(AppError::timeout("Command", 0)));
        assert_eq!(coordinator.active_operations(), 0);
    }

    #[tokio::test]
    async fn commands_share_one_batch_and_reset_progress() {
        let coordinator = coordinator();
        let commands = vec!["echo one".to_string(), "echo two".to_string()];

        let results =
            run_commands(&coordinator, &commands, &request(Duration::from_secs(10))).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.as_ref().is_ok_and(super::CommandOutcome::success)));
        assert!(!coordinator.is_loading());
        assert!(coordinator.progress().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn abandoned_command_stops_loading() {
        let coordinator = coordinator();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            run_command(&coordinator, "sleep 30", &request(Duration::from_secs(60))),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::timeout(Duration::from_secs(1), async {
            while coordinator.is_loading() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loading should stop after the command is dropped");
        assert_eq!(coordinator.active_operations(), 0);
    }
}
