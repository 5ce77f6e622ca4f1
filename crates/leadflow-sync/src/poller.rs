use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running poller task and its shutdown signal.
#[derive(Debug)]
pub(crate) struct PollerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub(crate) fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = oneshot::channel();
        let task = tokio::spawn(run(rx));
        Self { shutdown, task }
    }

    /// Asks the loop to exit before its next tick.
    pub(crate) fn stop(self) {
        // the loop may already have exited
        let _ = self.shutdown.send(());
    }

    pub(crate) fn abort(self) {
        self.task.abort();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
