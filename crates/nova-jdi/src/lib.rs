//! Mirror-level façade over a suspended JVM for Nova's expression evaluator.
//!
//! Everything in this crate is a *handle*: values, types and methods refer to
//! state that physically lives in the debuggee. The wire encoding is someone
//! else's problem; [`VirtualMachine`] only describes the synchronous
//! request/response operations the evaluator needs, and [`SuspendEvent`]
//! describes the asynchronous notifications it correlates against.

mod event;
mod value;

#[cfg(any(test, feature = "test-support"))]
mod mock;

use thiserror::Error;

pub use event::{SuspendCause, SuspendEvent};
pub use value::{JdiValue, MethodRef, ObjectRef, PrimitiveKind, ReferenceType, TypeKind};

#[cfg(any(test, feature = "test-support"))]
pub use mock::{MethodBehavior, MockClass, MockFrame, MockVm};

pub type ThreadId = u64;
pub type ObjectId = u64;
pub type ReferenceTypeId = u64;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JdiError {
    #[error("VM disconnected")]
    VmDisconnected,
    #[error("VM terminated")]
    VmDied,
    #[error("thread {0} is not suspended")]
    ThreadNotSuspended(ThreadId),
    #[error("thread {0} was not suspended by an event")]
    IncompatibleThreadState(ThreadId),
    #[error("invalid object id {0}")]
    InvalidObjectId(ObjectId),
    #[error("timed out waiting for the VM to reply")]
    Timeout,
    #[error("command failed with error code {error_code}")]
    CommandFailed { error_code: u16 },
    #[error("no method `{name}{signature}` in {type_name}")]
    NoSuchMethod {
        type_name: String,
        name: String,
        signature: String,
    },
    #[error("no field `{name}` in {type_name}")]
    NoSuchField { type_name: String, name: String },
    #[error("class {0} is not loaded")]
    ClassNotLoaded(String),
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("index {index} out of bounds for length {length}")]
    InvalidIndex { index: i64, length: usize },
    #[error("invocation threw {}", .exception.runtime_type)]
    InvocationException { exception: ObjectRef },
    #[error("{0}")]
    Other(String),
}

impl JdiError {
    /// True when the debuggee state can no longer be trusted for the rest of
    /// the evaluation.
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            JdiError::VmDisconnected
                | JdiError::VmDied
                | JdiError::ThreadNotSuspended(_)
                | JdiError::Timeout
                | JdiError::CommandFailed { .. }
        )
    }
}

pub type Result<T, E = JdiError> = std::result::Result<T, E>;

/// Synchronous mirror operations against a suspended VM.
///
/// Every call is a blocking round trip. Implementations are shared between
/// evaluations running on different debuggee threads, so they take `&self` and
/// synchronize internally. None of the operations are retried by callers.
pub trait VirtualMachine: Send + Sync {
    /// Materialize a `java.lang.String` in the debuggee heap.
    fn mirror_of_string(&self, value: &str) -> Result<ObjectRef>;

    fn class_by_name(&self, name: &str) -> Result<ReferenceType>;

    fn reference_type(&self, object: &ObjectRef) -> Result<ReferenceType>;

    /// `object instanceof target`, answered by the debuggee's type hierarchy.
    fn is_assignable(&self, object: &ObjectRef, target: &ReferenceType) -> Result<bool>;

    fn new_instance(
        &self,
        class: &ReferenceType,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue>;

    fn invoke_method(
        &self,
        receiver: &ObjectRef,
        name: &str,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue>;

    fn invoke_static_method(
        &self,
        class: &ReferenceType,
        name: &str,
        signature: &str,
        args: &[JdiValue],
        thread: ThreadId,
    ) -> Result<JdiValue>;

    /// Type that declares the method `name` + `signature` as seen from
    /// `class`, i.e. the first match walking up its supertypes. Method-exit
    /// and exception events report methods by their declaring type.
    fn method_declaring_type(
        &self,
        class: &ReferenceType,
        name: &str,
        signature: &str,
    ) -> Result<ReferenceType>;

    fn get_field(&self, object: &ObjectRef, name: &str) -> Result<JdiValue>;
    fn set_field(&self, object: &ObjectRef, name: &str, value: JdiValue) -> Result<()>;

    fn get_static_field(&self, class: &ReferenceType, name: &str) -> Result<JdiValue>;
    fn set_static_field(&self, class: &ReferenceType, name: &str, value: JdiValue) -> Result<()>;

    fn array_length(&self, array: &ObjectRef) -> Result<usize>;
    fn array_element(&self, array: &ObjectRef, index: usize) -> Result<JdiValue>;
    fn set_array_element(&self, array: &ObjectRef, index: usize, value: JdiValue) -> Result<()>;
    fn new_array(&self, array_type: &ReferenceType, length: usize) -> Result<ObjectRef>;

    /// Contents of a `java.lang.String` object.
    fn string_value(&self, string: &ObjectRef) -> Result<String>;

    fn local_value(&self, thread: ThreadId, frame: usize, name: &str) -> Result<JdiValue>;
    fn set_local_value(
        &self,
        thread: ThreadId,
        frame: usize,
        name: &str,
        value: JdiValue,
    ) -> Result<()>;

    /// Number of active frames on `thread`.
    fn frame_count(&self, thread: ThreadId) -> Result<usize>;

    fn is_suspended(&self, thread: ThreadId) -> Result<bool>;
}
