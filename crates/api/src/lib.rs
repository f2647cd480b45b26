pub mod anniversary;
mod job_schedulers;
pub mod reminder;
mod shared;

use anniv_scheduler_infra::AnnivContext;
pub use job_schedulers::{drain_due_reminders, get_start_delay, start_fire_reminders_job};
pub use shared::usecase::{execute, UseCase};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The reminder scanner process: owns the context and the shutdown signal
/// of every background job
pub struct Application {
    context: AnnivContext,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(context: AnnivContext) -> Self {
        Self {
            context,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the jobs after their in-flight batch
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels the shutdown token on SIGTERM or SIGINT. The handlers are
    /// registered before this returns.
    #[cfg(unix)]
    pub fn listen_for_shutdown_signals(&self) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let shutdown = self.shutdown.clone();
        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
            info!("Shutdown requested, finishing in-flight reminders");
            shutdown.cancel();
        }))
    }

    #[cfg(not(unix))]
    pub fn listen_for_shutdown_signals(&self) -> std::io::Result<JoinHandle<()>> {
        let shutdown = self.shutdown.clone();
        Ok(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, finishing in-flight reminders");
                shutdown.cancel();
            }
        }))
    }

    /// Runs until the shutdown token is cancelled
    pub async fn start(self) -> Result<(), JoinError> {
        start_fire_reminders_job(self.context, self.shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_cancels_the_shutdown_token() {
        let app = Application::new(AnnivContext::create_inmemory());
        let shutdown = app.shutdown_token();
        let listener = app.listen_for_shutdown_signals().unwrap();
        assert!(!shutdown.is_cancelled());

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled())
            .await
            .expect("SIGTERM to cancel the shutdown token");
        assert!(listener.await.is_ok());
    }
}
