//! Polling watcher base shared by the four trigger types.
//!
//! One watcher owns one singleton trigger path. Every poll interval it asks
//! its handler to claim a pending trigger and dispatches it. Handler failures
//! are logged and the loop keeps running; a single bad trigger must not kill
//! the watcher.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handler errors cross module boundaries (trigger files, store, git,
/// changelog), so the loop treats them uniformly as boxed errors to log.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// One trigger type's accept/handle capability pair.
///
/// The four watchers share the loop below and differ only in this handler,
/// instantiated per trigger type.
pub trait TriggerHandler: Send + Sync + 'static {
    type Trigger: Send + std::fmt::Debug;

    /// Watcher name for log lines.
    fn kind(&self) -> &'static str;

    /// Claim the pending trigger, if any. Claiming consumes it: a second
    /// call (or a concurrent iteration) must observe nothing.
    fn check_and_clear(&self) -> HandlerResult<Option<Self::Trigger>>;

    /// Process one claimed trigger.
    fn handle(&self, trigger: Self::Trigger) -> HandlerResult<()>;
}

/// A long-lived background task polling one trigger path.
///
/// Lifecycle is `Stopped -> Running -> Stopped`; `start` and `stop` are both
/// idempotent.
pub struct Watcher<H: TriggerHandler> {
    handler: Arc<H>,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<H: TriggerHandler> Watcher<H> {
    pub fn new(handler: H, poll_interval: Duration) -> Self {
        Self {
            handler: Arc::new(handler),
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn the polling task. A second call while running is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!(watcher = self.handler.kind(), "start ignored: already running");
            return;
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        self.shutdown = Arc::clone(&shutdown);
        let handler = Arc::clone(&self.handler);
        let poll_interval = self.poll_interval;
        info!(
            watcher = handler.kind(),
            poll_ms = poll_interval.as_millis() as u64,
            "watcher started"
        );
        self.task = Some(tokio::spawn(async move {
            while !shutdown.load(Ordering::SeqCst) {
                Self::tick(&handler);
                tokio::time::sleep(poll_interval).await;
            }
            debug!(watcher = handler.kind(), "watcher loop exited");
        }));
    }

    /// One poll iteration: claim a trigger if present and dispatch it.
    fn tick(handler: &H) {
        let trigger = match handler.check_and_clear() {
            Ok(Some(trigger)) => trigger,
            Ok(None) => return,
            Err(e) => {
                warn!(watcher = handler.kind(), error = %e, "trigger check failed");
                return;
            }
        };
        debug!(watcher = handler.kind(), trigger = ?trigger, "trigger accepted");
        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(trigger)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(watcher = handler.kind(), error = %e, "handler failed");
            }
            Err(_) => {
                error!(watcher = handler.kind(), "handler panicked");
            }
        }
    }

    /// Signal the loop to exit and join it with a bounded timeout.
    ///
    /// The loop honors shutdown within one poll interval plus handler
    /// completion time; a task overrunning twice the interval (plus grace) is
    /// aborted. Idempotent.
    pub async fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let Some(task) = self.task.take() else {
            return;
        };
        let limit = self.poll_interval * 2 + Duration::from_millis(250);
        let abort = task.abort_handle();
        match tokio::time::timeout(limit, task).await {
            Ok(_) => {}
            Err(_) => {
                warn!(
                    watcher = self.handler.kind(),
                    "watcher did not stop in time, aborting"
                );
                abort.abort();
            }
        }
        info!(watcher = self.handler.kind(), "watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Queue-backed stub: each queued number is one pending trigger.
    struct StubHandler {
        pending: Mutex<VecDeque<u32>>,
        handled: AtomicUsize,
        fail_on: Option<u32>,
        panic_on: Option<u32>,
    }

    impl StubHandler {
        fn new() -> Self {
            Self {
                pending: Mutex::new(VecDeque::new()),
                handled: AtomicUsize::new(0),
                fail_on: None,
                panic_on: None,
            }
        }

        fn push(&self, value: u32) {
            self.pending.lock().unwrap().push_back(value);
        }

        fn handled(&self) -> usize {
            self.handled.load(Ordering::SeqCst)
        }
    }

    impl TriggerHandler for StubHandler {
        type Trigger = u32;

        fn kind(&self) -> &'static str {
            "stub"
        }

        fn check_and_clear(&self) -> HandlerResult<Option<u32>> {
            Ok(self.pending.lock().unwrap().pop_front())
        }

        fn handle(&self, trigger: u32) -> HandlerResult<()> {
            if self.fail_on == Some(trigger) {
                return Err("handler failure".into());
            }
            if self.panic_on == Some(trigger) {
                panic!("handler panic");
            }
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn trigger_is_dispatched_to_handler() {
        let mut watcher = Watcher::new(StubHandler::new(), Duration::from_millis(20));
        watcher.start();
        watcher.handler().push(1);

        assert!(
            wait_until(|| watcher.handler().handled() == 1, Duration::from_secs(2)).await
        );
        watcher.stop().await;
    }

    #[tokio::test]
    async fn start_is_idempotent_while_running() {
        let mut watcher = Watcher::new(StubHandler::new(), Duration::from_millis(20));
        watcher.start();
        watcher.start();
        assert!(watcher.is_running());
        watcher.handler().push(1);
        assert!(
            wait_until(|| watcher.handler().handled() == 1, Duration::from_secs(2)).await
        );
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut watcher = Watcher::new(StubHandler::new(), Duration::from_millis(20));
        watcher.start();
        watcher.stop().await;
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn handler_failure_keeps_watcher_alive() {
        let mut handler = StubHandler::new();
        handler.fail_on = Some(1);
        let mut watcher = Watcher::new(handler, Duration::from_millis(20));
        watcher.start();

        watcher.handler().push(1);
        watcher.handler().push(2);
        assert!(
            wait_until(|| watcher.handler().handled() == 1, Duration::from_secs(2)).await,
            "trigger after the failing one must still be processed"
        );
        assert!(watcher.is_running());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn handler_panic_keeps_watcher_alive() {
        let mut handler = StubHandler::new();
        handler.panic_on = Some(1);
        let mut watcher = Watcher::new(handler, Duration::from_millis(20));
        watcher.start();

        watcher.handler().push(1);
        watcher.handler().push(2);
        assert!(
            wait_until(|| watcher.handler().handled() == 1, Duration::from_secs(2)).await
        );
        assert!(watcher.is_running());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn trigger_queued_while_stopped_is_consumed_after_restart() {
        let mut watcher = Watcher::new(StubHandler::new(), Duration::from_millis(20));
        watcher.start();
        watcher.stop().await;

        watcher.handler().push(7);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(watcher.handler().handled(), 0, "stopped watcher must not poll");

        watcher.start();
        assert!(
            wait_until(|| watcher.handler().handled() == 1, Duration::from_secs(2)).await
        );
        watcher.stop().await;
    }

    #[tokio::test]
    async fn no_trigger_means_no_dispatch() {
        let mut watcher = Watcher::new(StubHandler::new(), Duration::from_millis(20));
        watcher.start();
        // Several poll intervals with nothing queued.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(watcher.handler().handled(), 0);
        watcher.stop().await;
    }
}
