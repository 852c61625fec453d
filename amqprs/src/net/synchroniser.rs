//! Per-actor request/response correlator.
//!
//! A `Synchroniser` belongs to exactly one actor (the connection, or a
//! single channel) and is mutated only from that actor's event-loop task —
//! there is no locking here, by the same single-task-owns-state argument
//! that keeps the rest of the core data-race-free. Calling code elsewhere
//! registers an `await` through the actor's request channel and gets back a
//! `oneshot::Receiver` it can poll independently; the actor task itself
//! calls `notify`/`killall` as frames arrive or the connection dies.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::frame::{Method, MethodKind};

pub(crate) type Completion = oneshot::Receiver<Result<Method, Error>>;

struct Waiter {
    accepts: Vec<MethodKind>,
    tx: oneshot::Sender<Result<Method, Error>>,
}

#[derive(Default)]
pub(crate) struct Synchroniser {
    queues: HashMap<MethodKind, VecDeque<u64>>,
    waiters: HashMap<u64, Waiter>,
    next_id: u64,
    failure: Option<Arc<Error>>,
}

impl Synchroniser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter that resolves on the first frame matching any of
    /// `accepts` (e.g. `{BasicGetOk, BasicGetEmpty}`). Panics if `accepts`
    /// is empty — that would be a caller bug, not a runtime condition.
    pub fn await_methods(&mut self, accepts: Vec<MethodKind>) -> Completion {
        assert!(!accepts.is_empty(), "await_methods requires at least one accepted method");
        let (tx, rx) = oneshot::channel();
        if let Some(failure) = &self.failure {
            let _ = tx.send(Err(Error::Sticky(failure.clone())));
            return rx;
        }
        let id = self.next_id;
        self.next_id += 1;
        for kind in &accepts {
            self.queues.entry(*kind).or_default().push_back(id);
        }
        self.waiters.insert(id, Waiter { accepts, tx });
        rx
    }

    pub fn await_one(&mut self, kind: MethodKind) -> Completion {
        self.await_methods(vec![kind])
    }

    /// Resolve the head waiter of `kind`'s queue with `method`. An inbound
    /// method nobody is waiting for is a protocol violation: the caller
    /// should treat the returned error as fatal to the connection.
    pub fn notify(&mut self, kind: MethodKind, method: Method) -> Result<(), Error> {
        let id = self
            .queues
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::Protocol(format!("unexpected method with no registered waiter: {kind:?}")))?;

        let waiter = self.waiters.remove(&id).expect("queue and waiter table must stay in sync");
        for other in &waiter.accepts {
            if *other == kind {
                continue;
            }
            let popped = self.queues.get_mut(other).and_then(VecDeque::pop_front);
            debug_assert_eq!(popped, Some(id), "a multi-method waiter must be the head of every queue it registered in");
        }
        // `send` returning `Err` means the awaiting task dropped its
        // receiver (cancellation). The frame is still consumed above, so
        // ordering for every waiter still behind it in the queue holds.
        let _ = waiter.tx.send(Ok(method));
        Ok(())
    }

    /// Fail every outstanding waiter with `exc`, and every future `await`
    /// until this synchroniser is replaced. Idempotent: a second call is a
    /// no-op other than dropping `exc`, matching "close on an already
    /// closed connection must not raise".
    pub fn killall(&mut self, exc: Error) {
        let failure = self.failure.get_or_insert_with(|| Arc::new(exc)).clone();
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.tx.send(Err(Error::Sticky(failure.clone())));
        }
        self.queues.clear();
    }

    pub fn is_killed(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::connection::OpenOk;

    #[tokio::test]
    async fn awaits_on_the_same_method_resolve_in_registration_order() {
        let mut sync = Synchroniser::new();
        let rx1 = sync.await_one(MethodKind::ConnectionOpenOk);
        let rx2 = sync.await_one(MethodKind::ConnectionOpenOk);
        let rx3 = sync.await_one(MethodKind::ConnectionOpenOk);

        sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new("a"))).unwrap();
        sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new("b"))).unwrap();
        sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new("c"))).unwrap();

        let Method::ConnectionOpenOk(a) = rx1.await.unwrap().unwrap() else { panic!() };
        let Method::ConnectionOpenOk(b) = rx2.await.unwrap().unwrap() else { panic!() };
        let Method::ConnectionOpenOk(c) = rx3.await.unwrap().unwrap() else { panic!() };
        assert_eq!(format!("{a:?}{b:?}{c:?}"), format!("{:?}{:?}{:?}", OpenOk::new("a"), OpenOk::new("b"), OpenOk::new("c")));
    }

    #[tokio::test]
    async fn cancelling_a_waiter_skips_it_without_disturbing_order() {
        let mut sync = Synchroniser::new();
        let rx1 = sync.await_one(MethodKind::ConnectionOpenOk);
        let rx2 = sync.await_one(MethodKind::ConnectionOpenOk);
        drop(rx1); // cancel the first waiter

        sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new("first"))).unwrap();
        sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new("second"))).unwrap();

        let Method::ConnectionOpenOk(second) = rx2.await.unwrap().unwrap() else { panic!() };
        assert_eq!(second, OpenOk::new("second"));
    }

    #[tokio::test]
    async fn notify_with_no_waiter_is_a_protocol_error() {
        let mut sync = Synchroniser::new();
        let err = sync.notify(MethodKind::ConnectionOpenOk, Method::ConnectionOpenOk(OpenOk::new(""))).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn killall_fails_outstanding_and_future_awaits() {
        let mut sync = Synchroniser::new();
        let rx1 = sync.await_one(MethodKind::ConnectionOpenOk);
        sync.killall(Error::ClientConnectionClosed);
        let rx2 = sync.await_one(MethodKind::ConnectionOpenOk);

        assert!(rx1.await.unwrap().is_err());
        assert!(rx2.await.unwrap().is_err());
    }
}
