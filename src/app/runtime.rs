use super::orchestrator::Shared;
use super::types::{CoordinatorState, ShutdownOutcome, ShutdownReason, ShutdownSignal};
use crate::error::PhaseFailure;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Log every reported phase failure for the life of the process
pub(super) async fn accompaniment(
    application: String,
    mut failures: mpsc::UnboundedReceiver<PhaseFailure>,
) {
    while let Some(failure) = failures.recv().await {
        error!(
            application = %application,
            group = %failure.group,
            module = %failure.component,
            phase = %failure.phase,
            error = %failure.cause,
            "Module error"
        );
    }
}

/// Register every configured signal, then spawn one task per signal that
/// forwards it to the coordinator.
///
/// Registration happens before this returns, so a signal delivered while the
/// listener tasks are still unscheduled is not lost to the default handler.
pub(super) fn spawn_signal_listeners(
    application: &str,
    signals: &[ShutdownSignal],
    triggers: mpsc::Sender<ShutdownReason>,
) -> Vec<JoinHandle<()>> {
    signals
        .iter()
        .copied()
        .filter_map(|signal| {
            let listener = match SignalListener::register(signal) {
                Ok(listener) => listener,
                Err(err) => {
                    error!(
                        application = %application,
                        signal = %signal,
                        error = %err,
                        "Failed to register signal handler"
                    );
                    return None;
                }
            };

            let triggers = triggers.clone();
            let application = application.to_string();
            Some(tokio::spawn(async move {
                listener.recv().await;
                info!(application = %application, signal = %signal, "Received shutdown signal");
                let _ = triggers.try_send(ShutdownReason::Signal(signal));
            }))
        })
        .collect()
}

#[cfg(unix)]
struct SignalListener(tokio::signal::unix::Signal);

#[cfg(unix)]
impl SignalListener {
    fn register(signal: ShutdownSignal) -> io::Result<Self> {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        let kind = match signal {
            ShutdownSignal::Terminate => SignalKind::terminate(),
            ShutdownSignal::Interrupt => SignalKind::interrupt(),
            ShutdownSignal::Hangup => SignalKind::hangup(),
            ShutdownSignal::Quit => SignalKind::quit(),
            ShutdownSignal::User1 => SignalKind::user_defined1(),
            ShutdownSignal::User2 => SignalKind::user_defined2(),
        };
        Ok(Self(unix_signal(kind)?))
    }

    async fn recv(mut self) {
        self.0.recv().await;
    }
}

// Only Ctrl-C exists here; other signals never fire
#[cfg(not(unix))]
struct SignalListener(ShutdownSignal);

#[cfg(not(unix))]
impl SignalListener {
    fn register(signal: ShutdownSignal) -> io::Result<Self> {
        if !matches!(signal, ShutdownSignal::Interrupt) {
            warn!(signal = %signal, "Signal not supported on this platform");
        }
        Ok(Self(signal))
    }

    async fn recv(self) {
        if matches!(self.0, ShutdownSignal::Interrupt) {
            match tokio::signal::ctrl_c().await {
                Ok(()) => return,
                Err(err) => error!(error = %err, "Failed to listen for Ctrl-C"),
            }
        }
        std::future::pending::<()>().await;
    }
}

impl Shared {
    /// Wait for the first shutdown trigger, then run the graceful sweep
    pub(super) async fn coordinate(
        self: Arc<Self>,
        mut triggers: mpsc::Receiver<ShutdownReason>,
        execution: CancellationToken,
        listeners: Vec<JoinHandle<()>>,
    ) {
        let application = self.config.name.clone();

        let reason = tokio::select! {
            Some(reason) = triggers.recv() => reason,
            _ = self.execution_done.cancelled() => ShutdownReason::ExecutionFinished,
        };
        self.set_coordinator_state(CoordinatorState::Triggered);

        match &reason {
            ShutdownReason::ExecutionFinished => {
                debug!(application = %application, "Execution finished, starting graceful shutdown")
            }
            other => info!(application = %application, reason = %other, "Graceful shutdown started"),
        }

        // Later signals are no longer observed
        for listener in listeners {
            listener.abort();
        }
        execution.cancel();

        let exit_code = match reason {
            ShutdownReason::Triggered { exit_code } => exit_code,
            _ => self.config.exit_code,
        };

        self.set_coordinator_state(CoordinatorState::Sweeping);
        let unfinished = self.graceful_shutdown().await;
        if !self.execution_done.is_cancelled() {
            warn!(application = %application, "Groups still executing at shutdown deadline");
        }

        self.set_coordinator_state(CoordinatorState::Finished);
        self.finished.send_replace(Some(ShutdownOutcome {
            exit_code,
            reason,
            unfinished,
        }));
    }
}
