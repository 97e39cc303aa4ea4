use nova_jdi::{JdiError, ThreadId};
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Outcome of a failed evaluation.
///
/// Callers usually care about which bucket a failure falls in:
/// [`EvalError::Evaluation`] is an ordinary answer to a user expression,
/// [`EvalError::Communication`] means the debuggee state is gone and the
/// expression should be re-evaluated once the thread is suspended again, and
/// [`EvalError::Malformed`] is a front-end bug.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("invalid instruction sequence: {0}")]
    Malformed(#[from] MalformedSequence),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("communication with the target VM failed ({0}); re-evaluate once the thread is suspended")]
    Communication(JdiError),
    #[error("evaluation was cancelled")]
    Cancelled,
    #[error("evaluation timed out")]
    TimedOut,
    #[error("thread {0} is already running an evaluation")]
    ThreadBusy(ThreadId),
    #[error("evaluation task panicked")]
    Panicked,
}

impl EvalError {
    pub fn is_communication_failure(&self) -> bool {
        matches!(self, EvalError::Communication(_))
    }
}

/// Broken contract between the compiling front end and the interpreter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedSequence {
    #[error("stack underflow at instruction {pc} (`{instruction}`)")]
    StackUnderflow { pc: usize, instruction: String },
    #[error("operand stack exceeded {limit} entries at instruction {pc}")]
    StackOverflow { pc: usize, limit: usize },
    #[error("instruction {pc} (`{instruction}`) expected a {expected} operand")]
    UnexpectedOperand {
        pc: usize,
        instruction: String,
        expected: &'static str,
    },
    #[error("jump at instruction {pc} targets {target}, only forward jumps within {len} instructions are allowed")]
    InvalidJump { pc: usize, target: usize, len: usize },
    #[error("evaluation finished with {0} values on the stack, expected exactly one")]
    ResultCount(usize),
}

/// Language-level failure of a user expression.
#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("/ by zero")]
    DivisionByZero,
    #[error("{from} cannot be cast to {to}")]
    ClassCast { from: String, to: String },
    #[error("no applicable constructor {signature} in {type_name}")]
    NoSuchConstructor { type_name: String, signature: String },
    #[error("no applicable method {name}{signature} in {type_name}")]
    NoSuchMethod {
        type_name: String,
        name: String,
        signature: String,
    },
    #[error("{type_name} has no field `{name}`")]
    NoSuchField { type_name: String, name: String },
    #[error("`{0}` cannot be resolved to a variable")]
    UnresolvedName(String),
    #[error("type {0} is not loaded in the target VM")]
    UnknownType(String),
    #[error("`this` is not available in a static context")]
    NoReceiver,
    #[error("null pointer: cannot {0}")]
    NullPointer(String),
    #[error("index {index} out of bounds for length {length}")]
    ArrayIndexOutOfBounds { index: i64, length: usize },
    #[error("negative array size {0}")]
    NegativeArraySize(i32),
    #[error("operator {operator} is undefined for {operands}")]
    InvalidOperand { operator: String, operands: String },
    #[error("{0}")]
    InvalidType(String),
    #[error("method invocation threw {exception_type}")]
    Exception { exception_type: String },
    #[error("thread {0} must be suspended by an event to invoke methods")]
    IncompatibleThread(ThreadId),
    #[error("expression has side effects, which are not allowed in this context")]
    SideEffectsNotAllowed,
}

impl From<JdiError> for EvalError {
    fn from(err: JdiError) -> Self {
        if err.is_communication_failure() {
            tracing::warn!(target = "nova.eval", error = %err, "lost contact with the debuggee");
            return EvalError::Communication(err);
        }
        let evaluation = match err {
            JdiError::NoSuchMethod {
                type_name,
                name,
                signature,
            } if name == "<init>" => EvaluationError::NoSuchConstructor {
                type_name,
                signature,
            },
            JdiError::NoSuchMethod {
                type_name,
                name,
                signature,
            } => EvaluationError::NoSuchMethod {
                type_name,
                name,
                signature,
            },
            JdiError::NoSuchField { type_name, name } => {
                EvaluationError::NoSuchField { type_name, name }
            }
            JdiError::ClassNotLoaded(name) => EvaluationError::UnknownType(name),
            JdiError::InvalidType(message) => EvaluationError::InvalidType(message),
            JdiError::InvalidIndex { index, length } => {
                EvaluationError::ArrayIndexOutOfBounds { index, length }
            }
            JdiError::InvocationException { exception } => EvaluationError::Exception {
                exception_type: exception.runtime_type,
            },
            JdiError::IncompatibleThreadState(thread) => {
                EvaluationError::IncompatibleThread(thread)
            }
            other => return EvalError::Communication(other),
        };
        EvalError::Evaluation(evaluation)
    }
}
