// SPDX-License-Identifier: MIT
//! Single-flight task slots with preemptive cancellation.
//!
//! A slot holds at most one outstanding asynchronous operation per logical
//! key. Starting a new operation cancels whatever currently occupies the key
//! and replaces it atomically; the replacement waits for the prior flight's
//! acknowledgment *inside its own task*, so the caller never blocks on the
//! handover. Cancellation is cooperative — operations receive a
//! `CancellationToken` and must check it after every suspension point.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One in-flight operation occupying a slot.
struct Flight {
    token: CancellationToken,
    /// Resolves (with `Err`, sender dropped) when the task finishes — whether
    /// it completed normally or bailed out after noticing cancellation.
    done: oneshot::Receiver<()>,
}

/// Keyed registry of single-flight slots.
///
/// The map is the only shared mutable state here; it is locked briefly to
/// swap flights and never held across an await.
pub struct TaskSlots {
    slots: Mutex<HashMap<String, Flight>>,
    closed: AtomicBool,
    drain_timeout: Duration,
}

impl TaskSlots {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            drain_timeout,
        }
    }

    /// Start `op` under `key`, superseding any current occupant.
    ///
    /// The previous flight (if any) is cancelled immediately; the new task
    /// first awaits its acknowledgment, then re-checks its own token (it may
    /// itself have been superseded during the wait) before running `op`.
    pub fn start<F, Fut>(&self, key: &str, op: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        // The closed check must happen under the same lock as the insert:
        // checked before it, a start racing `drain` could slip an
        // un-cancelled flight in after drain's snapshot.
        let prior = {
            let mut slots = self.slots.lock().expect("slot map poisoned");
            if self.closed.load(Ordering::SeqCst) {
                // Quitting — the operation launches pre-cancelled and bails
                // at its first checkpoint without producing a reply.
                token.cancel();
            }
            slots.insert(
                key.to_string(),
                Flight {
                    token: token.clone(),
                    done: done_rx,
                },
            )
        };

        if let Some(prior) = &prior {
            prior.token.cancel();
        }

        let key = key.to_string();
        let fut = op(token.clone());
        tokio::spawn(async move {
            // Dropped on every exit path — this is the completion signal.
            let _done = done_tx;

            if let Some(prior) = prior {
                // Wait for the superseded flight to acknowledge. Safe when it
                // already finished (the receiver resolves immediately).
                let _ = prior.done.await;
                debug!(key = %key, "superseded prior flight");
            }
            if token.is_cancelled() {
                return;
            }
            fut.await;
        });
    }

    /// Signal cancellation to every in-flight operation without starting
    /// replacements. Used for dispatcher-wide transitions such as a settings
    /// toggle. Does not wait for acknowledgments.
    pub fn cancel_all(&self) {
        let slots = self.slots.lock().expect("slot map poisoned");
        for flight in slots.values() {
            flight.token.cancel();
        }
    }

    /// Cancel everything and wait (bounded) for the acknowledgments.
    ///
    /// After this returns, no previously started operation will produce
    /// further side effects, and new starts launch pre-cancelled. A flight
    /// that fails to acknowledge within the drain timeout is logged as a
    /// leak warning; shutdown proceeds regardless.
    pub async fn drain(&self) {
        // Close and snapshot in one critical section, so every flight is
        // either in the snapshot (cancelled and awaited below) or was started
        // after the close and launched pre-cancelled.
        let flights: Vec<(String, Flight)> = {
            let mut slots = self.slots.lock().expect("slot map poisoned");
            self.closed.store(true, Ordering::SeqCst);
            slots.drain().collect()
        };

        for (key, flight) in flights {
            flight.token.cancel();
            if tokio::time::timeout(self.drain_timeout, flight.done)
                .await
                .is_err()
            {
                warn!(key = %key, "flight did not acknowledge cancellation before drain timeout — leaking");
            }
        }
    }

    /// Whether `drain` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn slots() -> TaskSlots {
        TaskSlots::new(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn runs_a_single_operation() {
        let slots = slots();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        slots.start("k", move |_token| async move {
            ran2.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn newer_start_cancels_older() {
        let slots = slots();
        let finished = Arc::new(AtomicUsize::new(0));

        let f1 = finished.clone();
        slots.start("k", move |token| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if token.is_cancelled() {
                return;
            }
            f1.fetch_add(1, Ordering::SeqCst);
        });

        let f2 = finished.clone();
        slots.start("k", move |token| async move {
            if token.is_cancelled() {
                return;
            }
            f2.fetch_add(100, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(400)).await;
        // Only the replacement ran to completion.
        assert_eq!(finished.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn cancel_after_completion_is_harmless() {
        let slots = slots();
        slots.start("k", |_token| async {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        slots.cancel_all();
        slots.cancel_all();
    }

    #[tokio::test]
    async fn drain_blocks_new_work() {
        let slots = slots();
        slots.drain().await;

        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        slots.start("k", move |token| async move {
            if token.is_cancelled() {
                return;
            }
            ran2.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!ran.load(Ordering::SeqCst));
        assert!(slots.is_closed());
    }

    #[tokio::test]
    async fn drain_racing_starts_never_leaks_an_uncancelled_flight() {
        // A start racing drain must land either in drain's snapshot (then it
        // is cancelled and awaited before drain returns) or after the close
        // (then it launches pre-cancelled). Flights in the snapshot finish
        // before drain returns, so any body that observes `drained == true`
        // without a cancelled token slipped through the closed check.
        for _ in 0..50 {
            let slots = Arc::new(slots());
            let drained = Arc::new(AtomicBool::new(false));
            let leaked = Arc::new(AtomicBool::new(false));

            let s = slots.clone();
            let d = drained.clone();
            let l = leaked.clone();
            let starter = tokio::spawn(async move {
                for _ in 0..20 {
                    let d = d.clone();
                    let l = l.clone();
                    s.start("k", move |token| async move {
                        if token.is_cancelled() {
                            return;
                        }
                        if d.load(Ordering::SeqCst) {
                            l.store(true, Ordering::SeqCst);
                        }
                    });
                    tokio::task::yield_now().await;
                }
            });

            slots.drain().await;
            drained.store(true, Ordering::SeqCst);
            starter.await.unwrap();

            // Give post-close (pre-cancelled) flights a chance to run.
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(
                !leaked.load(Ordering::SeqCst),
                "flight ran un-cancelled after drain() returned"
            );
        }
    }

    #[tokio::test]
    async fn distinct_keys_do_not_interfere() {
        let slots = slots();
        let count = Arc::new(AtomicUsize::new(0));

        for key in ["a", "b"] {
            let count = count.clone();
            slots.start(key, move |token| async move {
                if token.is_cancelled() {
                    return;
                }
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
