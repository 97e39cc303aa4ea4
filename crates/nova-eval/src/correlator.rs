//! Pairs in-flight stepping/breakpoint operations with the suspend events that
//! report a method's return value or thrown exception.
//!
//! Each operation registers an expectation and gets a [`CorrelationToken`]
//! back. Events are matched on thread, call-stack depth and method; the token
//! keeps two operations that happen to expect the same depth on different
//! threads (or nested on one thread) apart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use nova_jdi::{JdiValue, MethodRef, SuspendCause, SuspendEvent, ThreadId};
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(u64);

impl CorrelationToken {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// What kind of operation is waiting for a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectationKind {
    /// User step-over or step-return.
    Step,
    /// Method-exit or exception instrumentation (breakpoints, or a method
    /// invoked by an evaluation).
    MethodExit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    /// Value returned after a step operation.
    Returned,
    /// Exception thrown after a step operation.
    Threw,
    /// Value being returned at a method-exit breakpoint.
    Returning,
    /// Exception being thrown at an exception breakpoint.
    Throwing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodResult {
    /// Method the value originates from.
    pub method: MethodRef,
    /// Stack depth the value was expected at.
    pub target_depth: usize,
    /// Return value or exception object.
    pub value: JdiValue,
    pub kind: ResultKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Correlation {
    Captured {
        token: CorrelationToken,
        result: MethodResult,
    },
    /// The event did not belong to any registered operation.
    Unmatched,
}

#[derive(Clone, Debug)]
struct Expectation {
    thread: ThreadId,
    method: MethodRef,
    depth: usize,
    kind: ExpectationKind,
}

#[derive(Default)]
struct Tables {
    pending: HashMap<CorrelationToken, Expectation>,
    captured: HashMap<CorrelationToken, (ThreadId, MethodResult)>,
}

#[derive(Default)]
pub struct MethodResultCorrelator {
    next_token: AtomicU64,
    tables: Mutex<Tables>,
}

impl MethodResultCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation waiting for `method` to return or throw at
    /// `depth` on `thread`.
    ///
    /// A thread has at most one live step expectation: registering a new
    /// `Step` drops the previous one together with any result it captured.
    pub fn expect(
        &self,
        thread: ThreadId,
        method: MethodRef,
        depth: usize,
        kind: ExpectationKind,
    ) -> CorrelationToken {
        let token = CorrelationToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        let mut tables = self.tables.lock();
        if kind == ExpectationKind::Step {
            let stale: Vec<_> = tables
                .pending
                .iter()
                .filter(|(_, e)| e.thread == thread && e.kind == ExpectationKind::Step)
                .map(|(token, _)| *token)
                .collect();
            for old in stale {
                tables.pending.remove(&old);
                tables.captured.remove(&old);
            }
        }
        tracing::debug!(
            target = "nova.eval",
            token = token.0,
            thread,
            depth,
            method = %method,
            ?kind,
            "expecting method result"
        );
        tables.pending.insert(
            token,
            Expectation {
                thread,
                method,
                depth,
                kind,
            },
        );
        token
    }

    /// Match a suspend event against the registered expectations.
    ///
    /// Only method-exit and exception events carry a result. When several
    /// expectations match, the most recently registered one (the innermost
    /// operation) wins. Unmatched events leave every expectation untouched.
    pub fn dispatch(&self, event: &SuspendEvent) -> Correlation {
        let (value, returned) = match &event.cause {
            SuspendCause::MethodExit { return_value } => (return_value.clone(), true),
            SuspendCause::Exception { exception, .. } => {
                (JdiValue::Object(exception.clone()), false)
            }
            SuspendCause::Step | SuspendCause::Breakpoint | SuspendCause::Watchpoint => {
                return Correlation::Unmatched
            }
        };

        let mut tables = self.tables.lock();
        let matched = tables
            .pending
            .iter()
            .filter(|(_, e)| {
                e.thread == event.thread && e.depth == event.depth && e.method == event.method
            })
            .map(|(token, _)| *token)
            .max();
        let Some(token) = matched else {
            tracing::trace!(
                target = "nova.eval",
                thread = event.thread,
                depth = event.depth,
                "suspend event matched no pending method result"
            );
            return Correlation::Unmatched;
        };
        let Some(expectation) = tables.pending.remove(&token) else {
            return Correlation::Unmatched;
        };
        let thread = expectation.thread;

        let kind = match (expectation.kind, returned) {
            (ExpectationKind::Step, true) => ResultKind::Returned,
            (ExpectationKind::Step, false) => ResultKind::Threw,
            (ExpectationKind::MethodExit, true) => ResultKind::Returning,
            (ExpectationKind::MethodExit, false) => ResultKind::Throwing,
        };
        let result = MethodResult {
            method: expectation.method,
            target_depth: expectation.depth,
            value,
            kind,
        };
        tracing::debug!(
            target = "nova.eval",
            token = token.0,
            thread = event.thread,
            ?kind,
            "captured method result"
        );
        tables.captured.insert(token, (thread, result.clone()));
        Correlation::Captured { token, result }
    }

    /// Consume the result captured for `token`, if any.
    pub fn take(&self, token: CorrelationToken) -> Option<MethodResult> {
        self.tables
            .lock()
            .captured
            .remove(&token)
            .map(|(_, result)| result)
    }

    pub fn is_pending(&self, token: CorrelationToken) -> bool {
        self.tables.lock().pending.contains_key(&token)
    }

    /// Drop everything associated with `token`. Returns whether anything was
    /// still registered.
    pub fn abandon(&self, token: CorrelationToken) -> bool {
        let mut tables = self.tables.lock();
        let pending = tables.pending.remove(&token).is_some();
        let captured = tables.captured.remove(&token).is_some();
        pending || captured
    }

    /// Drop every expectation and captured result of `thread`, e.g. when the
    /// user resumes it manually.
    pub fn abandon_thread(&self, thread: ThreadId) -> usize {
        let mut tables = self.tables.lock();
        let before = tables.pending.len() + tables.captured.len();
        tables.pending.retain(|_, e| e.thread != thread);
        tables.captured.retain(|_, (owner, _)| *owner != thread);
        before - (tables.pending.len() + tables.captured.len())
    }
}
