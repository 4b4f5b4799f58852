//! Single-resolution results
//!
//! Long-running backend queries (session requests, world maps, detection
//! images, backend shutdown) settle exactly once with success or failure.
//! A [`Resolver`] is handed to whoever produces the value; the caller keeps
//! the [`Pending`] and polls it from the frame loop, so nothing ever blocks a
//! tick.
//!
//! ```rust
//! use xrspace_core::pending::pending;
//!
//! let (resolver, mut result) = pending::<u32>();
//! assert!(result.try_take().is_none());
//! resolver.resolve(7);
//! assert_eq!(result.try_take().unwrap().unwrap(), 7);
//! ```

use std::fmt;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{XrError, XrResult};

/// Settlement state of a [`Pending`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// No outcome yet
    Waiting,
    /// Outcome available and not yet taken
    Ready,
    /// Outcome already taken
    Taken,
}

/// Producer side of a single-resolution result
pub struct Resolver<T> {
    tx: Sender<XrResult<T>>,
}

/// Consumer side of a single-resolution result
pub struct Pending<T> {
    rx: Receiver<XrResult<T>>,
    buffered: Option<XrResult<T>>,
    taken: bool,
}

/// Create a connected resolver / pending pair
pub fn pending<T>() -> (Resolver<T>, Pending<T>) {
    let (tx, rx) = bounded(1);
    (
        Resolver { tx },
        Pending {
            rx,
            buffered: None,
            taken: false,
        },
    )
}

impl<T> Resolver<T> {
    /// Settle with a value
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Settle with an error
    pub fn reject(self, error: XrError) {
        self.settle(Err(error));
    }

    /// Settle with a ready-made result
    pub fn settle(self, result: XrResult<T>) {
        // The receiver may already be gone; nobody is waiting for the outcome then.
        let _ = self.tx.send(result);
    }
}

impl<T> Pending<T> {
    /// Already-resolved result
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Already-rejected result
    pub fn rejected(error: XrError) -> Self {
        Self::settled(Err(error))
    }

    /// Already-settled result
    pub fn settled(result: XrResult<T>) -> Self {
        let (resolver, pending) = pending();
        resolver.settle(result);
        pending
    }

    /// Current state, without consuming the outcome
    pub fn state(&mut self) -> PendingState {
        if self.taken {
            return PendingState::Taken;
        }
        if self.buffered.is_none() {
            self.buffered = self.poll_channel();
        }
        if self.buffered.is_some() {
            PendingState::Ready
        } else {
            PendingState::Waiting
        }
    }

    /// True once an outcome is available or was taken
    pub fn is_settled(&mut self) -> bool {
        self.state() != PendingState::Waiting
    }

    /// Take the outcome if available. Returns `Some` exactly once.
    ///
    /// A resolver dropped without settling yields `Err(XrError::Canceled)`.
    pub fn try_take(&mut self) -> Option<XrResult<T>> {
        if self.taken {
            return None;
        }
        let outcome = self.buffered.take().or_else(|| self.poll_channel());
        if outcome.is_some() {
            self.taken = true;
        }
        outcome
    }

    /// Block until the outcome arrives or the timeout elapses
    pub fn wait_timeout(mut self, timeout: Duration) -> XrResult<T> {
        if self.taken {
            return Err(XrError::Canceled("result already taken".to_string()));
        }
        if let Some(outcome) = self.buffered.take() {
            return outcome;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(XrError::Timeout(format!(
                "no result after {} ms",
                timeout.as_millis()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(dropped_resolver()),
        }
    }

    fn poll_channel(&self) -> Option<XrResult<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(dropped_resolver())),
        }
    }
}

fn dropped_resolver() -> XrError {
    XrError::Canceled("resolver dropped before settling".to_string())
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("buffered", &self.buffered.is_some())
            .field("taken", &self.taken)
            .finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_exactly_once() {
        let (resolver, mut result) = pending::<&'static str>();
        assert_eq!(result.state(), PendingState::Waiting);
        resolver.resolve("device-1");
        assert_eq!(result.state(), PendingState::Ready);
        assert_eq!(result.try_take().unwrap().unwrap(), "device-1");
        assert_eq!(result.state(), PendingState::Taken);
        assert!(result.try_take().is_none());
    }

    #[test]
    fn test_rejection_carries_error() {
        let mut result: Pending<()> = Pending::rejected(XrError::unsupported("world map"));
        let err = result.try_take().unwrap().unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_dropped_resolver_cancels() {
        let (resolver, mut result) = pending::<u8>();
        drop(resolver);
        assert!(matches!(
            result.try_take(),
            Some(Err(XrError::Canceled(_)))
        ));
    }

    #[test]
    fn test_wait_timeout() {
        let (_resolver, result) = pending::<u8>();
        let err = result.wait_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, XrError::Timeout(_)));

        let ready = Pending::resolved(3u8);
        assert_eq!(ready.wait_timeout(Duration::from_millis(5)).unwrap(), 3);
    }

    #[test]
    fn test_state_peek_does_not_consume() {
        let mut result = Pending::resolved(11u32);
        assert!(result.is_settled());
        assert!(result.is_settled());
        assert_eq!(result.try_take().unwrap().unwrap(), 11);
    }
}
