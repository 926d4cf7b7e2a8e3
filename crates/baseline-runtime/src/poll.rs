//! Exit polling and run-wide cancellation.
//!
//! Containers are inspected at a fixed interval until they exit. Waiting
//! is interruptible: once a sibling test fails, the coordinator flips a
//! shared flag and every waiter returns [`PollOutcome::Cancelled`] at its
//! next wake-up instead of sleeping out the interval.

use std::time::Duration;

use baseline_common::error::Result;
use baseline_common::types::ContainerId;
use baseline_engine::ContainerEngine;
use tokio::sync::watch;

/// Sender side of the run-wide cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Sets the flag. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send_replace(true);
    }

    /// Returns whether the flag is set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a receiver observing this flag.
    #[must_use]
    pub fn subscribe(&self) -> Cancellation {
        Cancellation {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of the cancellation flag.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A cancellation that never fires.
    #[must_use]
    pub const fn never() -> Self {
        Self { rx: None }
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested.
    ///
    /// Pends forever if the flag can no longer be set.
    pub async fn cancelled(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.wait_for(|flag| *flag).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The container exited with this code.
    Exited(i64),
    /// Cancellation was requested first.
    Cancelled,
}

/// Inspects a container at a fixed interval until it exits.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
}

impl Poller {
    /// Creates a poller inspecting every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Waits until `id` exits or `cancel` fires.
    ///
    /// A non-zero exit code is reported as soon as it is observed, even if
    /// the engine still flags the container as running.
    ///
    /// # Errors
    ///
    /// Returns an error if an inspection fails.
    pub async fn wait_for_exit(
        &self,
        engine: &dyn ContainerEngine,
        id: &ContainerId,
        cancel: &mut Cancellation,
    ) -> Result<PollOutcome> {
        loop {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled);
            }
            let status = engine.inspect_container(id).await?;
            if let Some(code) = status.exit() {
                return Ok(PollOutcome::Exited(code));
            }
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_engine::ContainerSpec;
    use baseline_engine::fake::{Call, FakeEngine, Script};

    async fn started(engine: &FakeEngine, name: &str) -> ContainerId {
        let spec = ContainerSpec {
            name: name.to_string(),
            image: "img".to_string(),
            command: vec!["true".to_string()],
            tty: true,
            volume: None,
        };
        let id = engine.create_container(&spec).await.unwrap();
        engine.start_container(&id).await.unwrap();
        id
    }

    fn poller() -> Poller {
        Poller::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn returns_exit_code_after_polls() {
        let engine = FakeEngine::new()
            .with_image("img")
            .with_script("unit", Script::exits(3).after_polls(2));
        let id = started(&engine, "unit-s1").await;
        let outcome = poller()
            .wait_for_exit(&engine, &id, &mut Cancellation::never())
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Exited(3));
    }

    #[tokio::test]
    async fn nonzero_code_wins_over_running_flag() {
        let engine = FakeEngine::new()
            .with_image("img")
            .with_script("unit", Script::exits(5).still_reported_running());
        let id = started(&engine, "unit-s1").await;
        let outcome = poller()
            .wait_for_exit(&engine, &id, &mut Cancellation::never())
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Exited(5));
    }

    #[tokio::test]
    async fn cancel_interrupts_hanging_container() {
        let engine = FakeEngine::new()
            .with_image("img")
            .with_script("unit", Script::hangs());
        let id = started(&engine, "unit-s1").await;
        let handle = CancelHandle::new();
        let mut cancel = handle.subscribe();
        let slow = Poller::new(Duration::from_secs(3600));

        let (outcome, ()) = tokio::join!(slow.wait_for_exit(&engine, &id, &mut cancel), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        assert_eq!(outcome.unwrap(), PollOutcome::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_skips_inspection() {
        let engine = FakeEngine::new().with_image("img");
        let id = started(&engine, "unit-s1").await;
        let handle = CancelHandle::new();
        handle.cancel();
        let outcome = poller()
            .wait_for_exit(&engine, &id, &mut handle.subscribe())
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(engine.count(|c| matches!(c, Call::Inspect(_))), 0);
    }

    #[test]
    fn never_is_not_cancelled() {
        assert!(!Cancellation::never().is_cancelled());
        let handle = CancelHandle::default();
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
