//! Audio focus arbitration.
//!
//! Clients that want the output ask an arbiter for focus. The arbiter keeps a
//! stack of holders; a new request interrupts the holder on top, telling it
//! whether the loss is permanent, temporary, or merely asks it to duck. When
//! a temporary holder abandons focus, the client underneath regains it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Sender;

use super::types::{EngineEvent, FocusChange, FocusKind};

pub type FocusClientId = u64;

static NEXT_CLIENT: AtomicU64 = AtomicU64::new(1);

pub fn next_client_id() -> FocusClientId {
    NEXT_CLIENT.fetch_add(1, Ordering::Relaxed)
}

pub trait FocusArbiter: Send + Sync {
    /// Ask for the output on behalf of `client`. Focus changes for that client
    /// are delivered on `listener`. Returns `false` when denied.
    fn request(&self, client: FocusClientId, kind: FocusKind, listener: Sender<EngineEvent>) -> bool;

    fn abandon(&self, client: FocusClientId);
}

struct Holder {
    client: FocusClientId,
    kind: FocusKind,
    listener: Sender<EngineEvent>,
}

impl Holder {
    fn notify(&self, change: FocusChange) {
        log::debug!("focus client {} <- {change:?}", self.client);
        let _ = self.listener.send(EngineEvent::Focus(change));
    }
}

/// In-process arbiter shared by every output client of this process.
#[derive(Default)]
pub struct SharedFocus {
    stack: Mutex<Vec<Holder>>,
}

impl SharedFocus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Holder>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn holder(&self) -> Option<FocusClientId> {
        self.lock().last().map(|h| h.client)
    }
}

impl FocusArbiter for SharedFocus {
    fn request(&self, client: FocusClientId, kind: FocusKind, listener: Sender<EngineEvent>) -> bool {
        let mut stack = self.lock();

        if let Some(top) = stack.last() {
            if top.client != client && top.kind == FocusKind::TransientExclusive {
                log::debug!("focus request from {client} denied: exclusive holder {}", top.client);
                return false;
            }
        }

        stack.retain(|h| h.client != client);

        match kind {
            FocusKind::Gain => {
                // Permanent: everybody else is out for good.
                for h in stack.drain(..) {
                    h.notify(FocusChange::Loss);
                }
            }
            FocusKind::Transient | FocusKind::TransientExclusive => {
                if let Some(top) = stack.last() {
                    top.notify(FocusChange::LossTransient);
                }
            }
            FocusKind::TransientMayDuck => {
                if let Some(top) = stack.last() {
                    top.notify(FocusChange::LossTransientCanDuck);
                }
            }
        }

        stack.push(Holder {
            client,
            kind,
            listener,
        });
        true
    }

    fn abandon(&self, client: FocusClientId) {
        let mut stack = self.lock();
        let was_top = stack.last().is_some_and(|h| h.client == client);
        stack.retain(|h| h.client != client);
        if was_top {
            if let Some(top) = stack.last() {
                top.notify(FocusChange::Gain);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, unbounded};

    fn listener() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
        unbounded()
    }

    fn changes(rx: &Receiver<EngineEvent>) -> Vec<FocusChange> {
        rx.try_iter()
            .filter_map(|e| match e {
                EngineEvent::Focus(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_request_is_granted_silently() {
        let focus = SharedFocus::new();
        let (tx, rx) = listener();
        assert!(focus.request(1, FocusKind::Gain, tx));
        assert_eq!(focus.holder(), Some(1));
        assert!(changes(&rx).is_empty());
    }

    #[test]
    fn duck_then_gain_back() {
        let focus = SharedFocus::new();
        let (music_tx, music_rx) = listener();
        let (nav_tx, _nav_rx) = listener();

        focus.request(1, FocusKind::Gain, music_tx);
        focus.request(2, FocusKind::TransientMayDuck, nav_tx);
        focus.abandon(2);

        assert_eq!(
            changes(&music_rx),
            vec![FocusChange::LossTransientCanDuck, FocusChange::Gain]
        );
        assert_eq!(focus.holder(), Some(1));
    }

    #[test]
    fn permanent_gain_by_other_client_is_a_loss() {
        let focus = SharedFocus::new();
        let (a_tx, a_rx) = listener();
        let (b_tx, _b_rx) = listener();

        focus.request(1, FocusKind::Gain, a_tx);
        focus.request(2, FocusKind::Gain, b_tx);
        focus.abandon(2);

        // Client 1 was dropped from the stack, so it does not regain focus.
        assert_eq!(changes(&a_rx), vec![FocusChange::Loss]);
        assert_eq!(focus.holder(), None);
    }

    #[test]
    fn exclusive_holder_denies_other_requests() {
        let focus = SharedFocus::new();
        let (call_tx, _call_rx) = listener();
        let (music_tx, music_rx) = listener();

        focus.request(9, FocusKind::TransientExclusive, call_tx);
        assert!(!focus.request(1, FocusKind::Gain, music_tx));
        assert_eq!(focus.holder(), Some(9));
        assert!(changes(&music_rx).is_empty());
    }

    #[test]
    fn re_request_by_holder_does_not_notify_anyone() {
        let focus = SharedFocus::new();
        let (tx, rx) = listener();
        focus.request(1, FocusKind::Gain, tx.clone());
        focus.request(1, FocusKind::Gain, tx);
        assert!(changes(&rx).is_empty());
    }
}
