//! Evaluation sessions: one interpreter run per suspended thread, executed on
//! tokio's blocking pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use nova_jdi::{JdiValue, ThreadId};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::EvalConfig;
use crate::context::RuntimeContext;
use crate::correlator::MethodResultCorrelator;
use crate::error::{EvalError, EvalResult};
use crate::instruction::InstructionSequence;
use crate::interpreter::Interpreter;
use crate::options::EvalOptions;

/// Entry point for running expressions.
///
/// Cheap to clone; clones share the set of threads that currently run an
/// evaluation, so at most one session per debuggee thread exists across all
/// of them.
#[derive(Clone)]
pub struct Evaluator {
    config: Arc<EvalConfig>,
    leases: Arc<Mutex<HashSet<ThreadId>>>,
    correlator: Option<Arc<MethodResultCorrelator>>,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config: Arc::new(config),
            leases: Arc::new(Mutex::new(HashSet::new())),
            correlator: None,
        }
    }

    /// Report method exits and exceptions raised inside invoked methods to
    /// `correlator`.
    pub fn with_correlator(mut self, correlator: Arc<MethodResultCorrelator>) -> Self {
        self.correlator = Some(correlator);
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Whether `thread` currently runs a session.
    pub fn is_busy(&self, thread: ThreadId) -> bool {
        self.leases.lock().contains(&thread)
    }

    /// Start evaluating `sequence` on the context's thread.
    ///
    /// Fails immediately with [`EvalError::ThreadBusy`] when that thread
    /// already runs a session; nothing is queued.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn evaluate(
        &self,
        sequence: InstructionSequence,
        context: Arc<dyn RuntimeContext>,
        options: EvalOptions,
    ) -> EvalResult<EvaluationSession> {
        let thread = context.thread();
        let lease = self.acquire(thread)?;
        let token = CancellationToken::new();
        let deadline = self.deadline();
        let (tx, rx) = oneshot::channel();

        let evaluator = self.clone();
        let token_for_job = token.clone();
        tokio::task::spawn_blocking(move || {
            // The lease is held until the interpreter has fully stopped, even
            // if the caller already gave up on the session.
            let _lease = lease;
            let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                evaluator.run(&sequence, context.as_ref(), options, token_for_job, deadline)
            })) {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(target = "nova.eval", thread, "evaluation panicked");
                    Err(EvalError::Panicked)
                }
            };
            let _ = tx.send(result);
        });

        Ok(EvaluationSession { token, thread, rx })
    }

    /// Evaluate on the calling thread, with the same thread exclusivity as
    /// [`Evaluator::evaluate`].
    pub fn evaluate_blocking(
        &self,
        sequence: &InstructionSequence,
        context: &dyn RuntimeContext,
        options: EvalOptions,
    ) -> EvalResult<JdiValue> {
        let _lease = self.acquire(context.thread())?;
        self.run(
            sequence,
            context,
            options,
            CancellationToken::new(),
            self.deadline(),
        )
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.timeout().map(|timeout| Instant::now() + timeout)
    }

    fn acquire(&self, thread: ThreadId) -> EvalResult<ThreadLease> {
        if !self.leases.lock().insert(thread) {
            tracing::debug!(target = "nova.eval", thread, "thread already evaluating");
            return Err(EvalError::ThreadBusy(thread));
        }
        Ok(ThreadLease {
            leases: self.leases.clone(),
            thread,
        })
    }

    fn run(
        &self,
        sequence: &InstructionSequence,
        context: &dyn RuntimeContext,
        options: EvalOptions,
        token: CancellationToken,
        deadline: Option<Instant>,
    ) -> EvalResult<JdiValue> {
        let thread = context.thread();
        tracing::debug!(
            target = "nova.eval",
            thread,
            source = sequence.source(),
            instructions = sequence.len(),
            "evaluation started"
        );
        let result = Interpreter::new(context, options)
            .with_correlator(self.correlator.clone())
            .with_cancellation(token)
            .with_deadline(deadline)
            .with_max_stack(self.config.max_operand_stack)
            .run(sequence);
        match &result {
            Ok(value) => tracing::debug!(
                target = "nova.eval",
                thread,
                value_type = value.type_name(),
                "evaluation finished"
            ),
            Err(err) => tracing::debug!(
                target = "nova.eval",
                thread,
                error = %err,
                "evaluation failed"
            ),
        }
        result
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

struct ThreadLease {
    leases: Arc<Mutex<HashSet<ThreadId>>>,
    thread: ThreadId,
}

impl Drop for ThreadLease {
    fn drop(&mut self) {
        self.leases.lock().remove(&self.thread);
    }
}

/// Handle to a running evaluation.
///
/// Dropping the handle does not stop the evaluation; call
/// [`EvaluationSession::cancel`] for that.
pub struct EvaluationSession {
    token: CancellationToken,
    thread: ThreadId,
    rx: oneshot::Receiver<EvalResult<JdiValue>>,
}

impl EvaluationSession {
    /// Request cancellation. The interpreter stops before its next
    /// instruction; a remote call already in flight completes and its effects
    /// stay in the debuggee.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Wait for the single outcome of the evaluation.
    pub async fn join(self) -> EvalResult<JdiValue> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(EvalError::Panicked),
        }
    }
}
