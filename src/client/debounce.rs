use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::lock;

type Action<T> = Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Runs an action once, `wait` after the last call of a burst, with that call's argument.
///
/// The pending timer sits in a single slot: scheduling aborts whatever timer was there.
/// Once the timer fires the action runs as its own task, so later calls never cancel it.
pub struct Debouncer<T> {
    wait: Duration,
    action: Action<T>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            wait: self.wait,
            action: Arc::clone(&self.action),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(wait: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let action: Action<T> = Arc::new(
            move |arg: T| -> Pin<Box<dyn Future<Output = ()> + Send>> { Box::pin(action(arg)) },
        );
        Self {
            wait,
            action,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Must be called from within a tokio runtime.
    pub fn call(&self, arg: T) {
        let action = Arc::clone(&self.action);
        let wait = self.wait;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            tokio::spawn(action(arg));
        });

        if let Some(previous) = lock(&self.pending).replace(timer) {
            previous.abort();
        }
    }

    /// Drops the scheduled call, if any.
    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }
}
