//! Write-once, read-many result cell shared between a promise and its futures.
//!
//! A [`ParameterPromise`] is consumed by [`fulfill`](ParameterPromise::fulfill),
//! so a single promise can only write once. Every [`ParameterFuture`] clone
//! observes the same outcome, through polling ([`try_get`](ParameterFuture::try_get)),
//! a bounded blocking wait, or `.await`.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

use crate::Result;

enum State<T> {
    Pending(Vec<Waker>),
    Ready(Result<T>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    cv: Condvar,
}

impl<T> Shared<T> {
    fn set(&self, outcome: Result<T>) {
        let wakers = {
            let mut state = self.state.lock();
            if let State::Ready(_) = &*state {
                panic!("parameter future fulfilled twice");
            }
            match std::mem::replace(&mut *state, State::Ready(outcome)) {
                State::Pending(wakers) => wakers,
                State::Ready(_) => unreachable!(),
            }
        };
        self.cv.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }
}

/// Writing side of a [`ParameterFuture`].
pub struct ParameterPromise<T> {
    shared: Arc<Shared<T>>,
}

/// Shared handle over the outcome of one parameter call.
pub struct ParameterFuture<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected promise/future pair.
pub fn promise<T>() -> (ParameterPromise<T>, ParameterFuture<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending(Vec::new())),
        cv: Condvar::new(),
    });
    (
        ParameterPromise {
            shared: shared.clone(),
        },
        ParameterFuture { shared },
    )
}

impl<T> ParameterPromise<T> {
    /// Store the outcome and wake every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the underlying cell already holds a result.
    pub fn fulfill(self, outcome: Result<T>) {
        self.shared.set(outcome);
    }

    /// A future reading from this promise's cell.
    pub fn future(&self) -> ParameterFuture<T> {
        ParameterFuture {
            shared: self.shared.clone(),
        }
    }
}

impl<T> ParameterFuture<T> {
    /// A future that is already resolved.
    pub fn ready(outcome: Result<T>) -> Self {
        let (promise, future) = promise();
        promise.fulfill(outcome);
        future
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Ready(_))
    }
}

impl<T: Clone> ParameterFuture<T> {
    /// The outcome if the call has completed, without blocking.
    pub fn try_get(&self) -> Option<Result<T>> {
        match &*self.shared.state.lock() {
            State::Ready(outcome) => Some(outcome.clone()),
            State::Pending(_) => None,
        }
    }

    /// Block the current thread until the outcome is available or `timeout` elapses.
    ///
    /// Only useful when another thread drives the reactor; waiting on the
    /// driving thread itself never completes.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let mut state = self.shared.state.lock();
        if let State::Pending(_) = &*state {
            let _ = self.shared.cv.wait_for(&mut state, timeout);
        }
        match &*state {
            State::Ready(outcome) => Some(outcome.clone()),
            State::Pending(_) => None,
        }
    }
}

impl<T> Clone for ParameterFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for ParameterFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T: Clone> Future for ParameterFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        match &mut *state {
            State::Ready(outcome) => Poll::Ready(outcome.clone()),
            State::Pending(wakers) => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamError;

    #[test]
    fn test_every_clone_sees_the_same_outcome() {
        let (promise, future) = promise::<Vec<i64>>();
        let other = future.clone();
        assert!(!future.is_ready());
        assert_eq!(future.try_get(), None);

        promise.fulfill(Ok(vec![1, 2]));
        assert!(other.is_ready());
        assert_eq!(future.try_get(), Some(Ok(vec![1, 2])));
        assert_eq!(other.try_get(), Some(Ok(vec![1, 2])));
    }

    #[test]
    fn test_failure_is_shared_too() {
        let future = ParameterFuture::<u8>::ready(Err(ParamError::Shutdown));
        assert_eq!(future.try_get(), Some(Err(ParamError::Shutdown)));
        assert_eq!(future.clone().try_get(), Some(Err(ParamError::Shutdown)));
    }

    #[test]
    #[should_panic(expected = "fulfilled twice")]
    fn test_second_fulfillment_panics() {
        let (promise, _future) = promise::<u8>();
        let shared = promise.shared.clone();
        promise.fulfill(Ok(1));
        shared.set(Ok(2));
    }

    #[test]
    fn test_wait_timeout_without_writer_stays_pending() {
        let (_promise, future) = promise::<u8>();
        assert_eq!(future.wait_timeout(Duration::from_millis(20)), None);
        assert!(!future.is_ready());
    }

    #[test]
    fn test_wait_timeout_wakes_on_fulfillment_from_another_thread() {
        let (promise, future) = promise::<u8>();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            promise.fulfill(Ok(5));
        });
        assert_eq!(future.wait_timeout(Duration::from_secs(5)), Some(Ok(5)));
        writer.join().unwrap();
    }

    #[tokio::test]
    async fn test_await_resolves_after_fulfillment() {
        let (promise, future) = promise::<String>();
        let waiter = tokio::spawn(future.clone());
        tokio::task::yield_now().await;
        promise.fulfill(Ok("done".to_string()));
        assert_eq!(waiter.await.unwrap(), Ok("done".to_string()));
        assert_eq!(future.await, Ok("done".to_string()));
    }
}
