//! Observable state cells.
//!
//! An `Observable<T>` holds the latest value of some piece of state and
//! pushes every change to its subscribers. New subscribers receive the current
//! value first, so a late-binding surface never misses the state it needs to
//! render. Setting a value equal to the current one is not a change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

struct Inner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Replace the value. Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value;
        let snapshot = inner.value.clone();
        // Dropped receivers unsubscribe themselves.
        inner.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        true
    }

    /// Subscribe to changes; the current value is delivered immediately.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        let mut inner = self.lock();
        if tx.send(inner.value.clone()).is_ok() {
            inner.subscribers.push(tx);
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_get_current_value_then_changes() {
        let obs = Observable::new(1u32);
        let rx = obs.subscribe();
        assert!(obs.set(2));
        assert!(obs.set(3));

        let seen: Vec<u32> = rx.try_iter().collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn setting_equal_value_does_not_notify() {
        let obs = Observable::new(Some(4usize));
        let rx = obs.subscribe();
        assert!(!obs.set(Some(4)));

        let seen: Vec<Option<usize>> = rx.try_iter().collect();
        assert_eq!(seen, vec![Some(4)]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let obs = Observable::new(0i32);
        let rx = obs.subscribe();
        drop(rx);
        obs.set(1);
        assert!(obs.lock().subscribers.is_empty());
        assert_eq!(obs.get(), 1);
    }
}
