use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded, unbounded};

type Job = Box<dyn FnOnce() + Send>;

enum Msg {
    Run(Job),
    Flush(Sender<()>),
}

/// Single background thread for I/O the caller must not wait on.
/// Jobs run in submission order.
pub(crate) struct BackgroundWorker {
    tx: Mutex<Option<Sender<Msg>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackgroundWorker {
    pub fn spawn(name: &str) -> Self {
        let (tx, rx) = unbounded::<Msg>();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for msg in rx {
                    match msg {
                        Msg::Run(job) => job(),
                        Msg::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            });

        let (tx, join) = match join {
            Ok(h) => (Some(tx), Some(h)),
            Err(e) => {
                log::warn!("could not start {name} thread, running its jobs inline: {e}");
                (None, None)
            }
        };
        Self {
            tx: Mutex::new(tx),
            join: Mutex::new(join),
        }
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let job: Job = Box::new(job);
        let rejected = match lock(&self.tx).as_ref() {
            Some(tx) => tx.send(Msg::Run(job)).err().map(|e| e.0),
            None => Some(Msg::Run(job)),
        };
        if let Some(Msg::Run(job)) = rejected {
            job();
        }
    }

    /// Wait until every job submitted so far has run.
    pub fn flush(&self) {
        let (done_tx, done_rx) = bounded(1);
        let sent = lock(&self.tx)
            .as_ref()
            .is_some_and(|tx| tx.send(Msg::Flush(done_tx)).is_ok());
        if sent {
            let _ = done_rx.recv();
        }
    }

    /// Run what is queued, then stop the thread.
    pub fn shutdown(&self) {
        lock(&self.tx).take();
        if let Some(h) = lock(&self.join).take() {
            let _ = h.join();
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
