use crate::{JdiValue, MethodRef, ObjectRef, ThreadId};

/// Why a thread stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum SuspendCause {
    Step,
    Breakpoint,
    Watchpoint,
    /// A method is returning `return_value` (`Void` for `void` methods).
    MethodExit { return_value: JdiValue },
    /// `exception` is in flight; `caught` tells whether a handler exists.
    Exception { exception: ObjectRef, caught: bool },
}

/// Asynchronous notification that a debuggee thread suspended.
///
/// `depth` is the number of active frames on `thread` at the point of
/// suspension and `method` is the method executing in the top frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SuspendEvent {
    pub thread: ThreadId,
    pub depth: usize,
    pub method: MethodRef,
    pub cause: SuspendCause,
}

impl SuspendEvent {
    pub fn method_exit(
        thread: ThreadId,
        depth: usize,
        method: MethodRef,
        return_value: JdiValue,
    ) -> Self {
        Self {
            thread,
            depth,
            method,
            cause: SuspendCause::MethodExit { return_value },
        }
    }

    pub fn exception(
        thread: ThreadId,
        depth: usize,
        method: MethodRef,
        exception: ObjectRef,
        caught: bool,
    ) -> Self {
        Self {
            thread,
            depth,
            method,
            cause: SuspendCause::Exception { exception, caught },
        }
    }
}
