//! Expression evaluation for Nova's Java debugger.
//!
//! A front end compiles an expression typed in a watch, hover or REPL into an
//! [`InstructionSequence`]. The [`Evaluator`] runs it on an operand stack,
//! turning each instruction into synchronous calls against the suspended
//! debuggee through [`nova_jdi::VirtualMachine`]. Sessions are exclusive per
//! debuggee thread and cooperatively cancellable.
//!
//! [`MethodResultCorrelator`] pairs step and method-exit operations with the
//! suspend events that carry a method's return value or thrown exception, so
//! results can be shown after a step or at a breakpoint.

pub mod arith;
pub mod config;
pub mod context;
pub mod correlator;
pub mod display;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod logging;
pub mod options;
pub mod session;

pub use arith::{BinaryOp, UnaryOp};
pub use config::{ConfigError, EvalConfig, LoggingConfig};
pub use context::{LocalVariable, RuntimeContext, StackFrameContext};
pub use correlator::{
    Correlation, CorrelationToken, ExpectationKind, MethodResult, MethodResultCorrelator,
    ResultKind,
};
pub use error::{EvalError, EvalResult, EvaluationError, MalformedSequence};
pub use instruction::{Instruction, InstructionSequence, TypeSpec};
pub use interpreter::{Interpreter, Operand};
pub use options::{EvalKind, EvalOptions};
pub use session::{EvaluationSession, Evaluator};
