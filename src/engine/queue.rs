//! Bounded FIFO queues between the engine's loops.
//!
//! Both ends are cloneable, so the same type serves the single-producer feed
//! queue and the multi-producer item queue. Every wait races the run signal.

use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError};

use crate::engine::config::Backpressure;
use crate::engine::lifecycle::RunSignal;

#[derive(Debug, PartialEq, Eq)]
pub enum Pushed {
    Queued,
    /// The queue was full and the policy is [`Backpressure::Drop`].
    Dropped,
    /// The engine is stopping or the queue has been closed.
    Stopped,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Popped<T> {
    Item(T),
    TimedOut,
    Stopped,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    policy: Backpressure,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            policy: self.policy,
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn bounded(capacity: usize, policy: Backpressure) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx, policy }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn close(&self) {
        self.tx.close();
    }

    pub async fn push(&self, value: T, signal: &RunSignal) -> Pushed {
        match self.policy {
            Backpressure::Block => tokio::select! {
                biased;
                _ = signal.stopped() => Pushed::Stopped,
                sent = self.tx.send(value) => match sent {
                    Ok(()) => Pushed::Queued,
                    Err(_) => Pushed::Stopped,
                },
            },
            Backpressure::Drop => match self.tx.try_send(value) {
                Ok(()) => Pushed::Queued,
                Err(TrySendError::Full(_)) => Pushed::Dropped,
                Err(TrySendError::Closed(_)) => Pushed::Stopped,
            },
        }
    }

    /// Wait at most `timeout` for the next value.
    pub async fn pop(&self, timeout: Duration, signal: &RunSignal) -> Popped<T> {
        tokio::select! {
            biased;
            _ = signal.stopped() => Popped::Stopped,
            next = tokio::time::timeout(timeout, self.rx.recv()) => match next {
                Ok(Ok(value)) => Popped::Item(value),
                Ok(Err(_)) => Popped::Stopped,
                Err(_) => Popped::TimedOut,
            },
        }
    }
}
