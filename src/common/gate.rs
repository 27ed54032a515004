//! One-shot completion gate
//!
//! A gate bridges an asynchronous completion to any number of waiters.
//! Exactly one value is ever published: the first `signal` wins and every
//! later one is ignored, so a late callback can never change what waiters
//! already observed. If every signal handle is dropped before a value is
//! published the gate is closed and waiters are released with
//! [`GateError::Closed`].

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("gate closed before a value was published")]
    Closed,

    #[error("gate not opened within {0:?}")]
    TimedOut(Duration),
}

/// Create a connected signal/waiter pair
pub fn gate<T: Clone>() -> (GateSignal<T>, CompletionGate<T>) {
    let (tx, rx) = watch::channel(None);
    (GateSignal { tx: Arc::new(tx) }, CompletionGate { rx })
}

/// Publishing side of a gate. Cheap to clone; may be moved to any thread.
#[derive(Debug)]
pub struct GateSignal<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for GateSignal<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> GateSignal<T> {
    /// Open the gate with `value`. Returns false if it was already open.
    pub fn signal(&self, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn is_open(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

/// Waiting side of a gate
#[derive(Debug, Clone)]
pub struct CompletionGate<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> CompletionGate<T> {
    /// Wait without a deadline
    pub async fn wait(&self) -> Result<T, GateError> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| GateError::Closed)?;
        slot.as_ref().cloned().ok_or(GateError::Closed)
    }

    /// Wait at most `timeout` for the gate to open
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<T, GateError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| GateError::TimedOut(timeout))?
    }

    /// Current value, if the gate is already open
    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_signal_wins() {
        let (signal, gate) = gate();
        assert!(signal.signal(1u32));
        assert!(!signal.signal(2));
        assert_eq!(gate.wait().await, Ok(1));
        assert_eq!(gate.peek(), Some(1));
    }

    #[tokio::test]
    async fn test_all_waiters_see_same_value() {
        let (signal, gate) = gate::<&'static str>();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        std::thread::spawn(move || {
            signal.signal("done");
        });

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Ok("done"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout() {
        let (_signal, gate) = gate::<bool>();
        let result = gate.wait_timeout(Duration::from_millis(250)).await;
        assert_eq!(result, Err(GateError::TimedOut(Duration::from_millis(250))));
        assert!(!gate.is_open());
    }

    #[tokio::test]
    async fn test_dropped_signal_closes_gate() {
        let (signal, gate) = gate::<bool>();
        drop(signal);
        assert_eq!(gate.wait().await, Err(GateError::Closed));
    }

    #[tokio::test]
    async fn test_value_survives_signal_drop() {
        let (signal, gate) = gate();
        signal.signal(true);
        drop(signal);
        assert_eq!(gate.wait().await, Ok(true));
    }

    #[test]
    fn test_waiter_pending_until_signaled() {
        let (signal, gate) = gate::<u8>();
        let mut waiter = tokio_test::task::spawn(gate.wait());
        tokio_test::assert_pending!(waiter.poll());

        signal.signal(7);
        assert!(waiter.is_woken());
        tokio_test::assert_ready_eq!(waiter.poll(), Ok(7));
    }
}
