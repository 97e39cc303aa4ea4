use std::sync::Arc;

use nova_jdi::{JdiError, ObjectRef, ReferenceType, ThreadId, VirtualMachine};

/// A local variable visible at the evaluation's frame.
///
/// Only the declaration is carried; the current value always comes from the
/// debuggee so a write earlier in the same expression is observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub declared_type: String,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Environment an expression is evaluated in.
///
/// An evaluation happens in the context of an object (`this`) or, for static
/// code, a class. The interpreter only reads the context; fallible accessors
/// fail with a communication error once the thread has resumed or the VM is
/// gone.
pub trait RuntimeContext: Send + Sync {
    fn vm(&self) -> &Arc<dyn VirtualMachine>;

    /// `this`, or `None` in a static context.
    fn this(&self) -> Result<Option<ObjectRef>, JdiError>;

    /// Type of `this`, or the class declaring the static method.
    fn receiving_type(&self) -> Result<ReferenceType, JdiError>;

    /// Locals visible at the frame, including method arguments.
    fn locals(&self) -> Result<Vec<LocalVariable>, JdiError>;

    /// Project (module) the expression was compiled for.
    fn project(&self) -> &str;

    /// Thread that runs method invocations.
    fn thread(&self) -> ThreadId;

    /// Frame index the expression is evaluated in, `0` being the top frame.
    fn frame(&self) -> usize {
        0
    }

    fn is_constructor(&self) -> Result<bool, JdiError>;

    fn local(&self, name: &str) -> Result<Option<LocalVariable>, JdiError> {
        Ok(self.locals()?.into_iter().find(|local| local.name == name))
    }
}

/// [`RuntimeContext`] snapshot of one suspended stack frame.
pub struct StackFrameContext {
    vm: Arc<dyn VirtualMachine>,
    thread: ThreadId,
    frame: usize,
    this: Option<ObjectRef>,
    receiving_type: ReferenceType,
    locals: Vec<LocalVariable>,
    project: String,
    is_constructor: bool,
}

impl StackFrameContext {
    pub fn new(
        vm: Arc<dyn VirtualMachine>,
        thread: ThreadId,
        receiving_type: ReferenceType,
    ) -> Self {
        Self {
            vm,
            thread,
            frame: 0,
            this: None,
            receiving_type,
            locals: Vec::new(),
            project: String::new(),
            is_constructor: false,
        }
    }

    pub fn with_this(mut self, this: ObjectRef) -> Self {
        self.this = Some(this);
        self
    }

    pub fn with_frame(mut self, frame: usize) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_local(mut self, local: LocalVariable) -> Self {
        self.locals.push(local);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn in_constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    fn ensure_suspended(&self) -> Result<(), JdiError> {
        if self.vm.is_suspended(self.thread)? {
            Ok(())
        } else {
            Err(JdiError::ThreadNotSuspended(self.thread))
        }
    }
}

impl RuntimeContext for StackFrameContext {
    fn vm(&self) -> &Arc<dyn VirtualMachine> {
        &self.vm
    }

    fn this(&self) -> Result<Option<ObjectRef>, JdiError> {
        self.ensure_suspended()?;
        Ok(self.this.clone())
    }

    fn receiving_type(&self) -> Result<ReferenceType, JdiError> {
        self.ensure_suspended()?;
        Ok(self.receiving_type.clone())
    }

    fn locals(&self) -> Result<Vec<LocalVariable>, JdiError> {
        self.ensure_suspended()?;
        Ok(self.locals.clone())
    }

    fn project(&self) -> &str {
        &self.project
    }

    fn thread(&self) -> ThreadId {
        self.thread
    }

    fn frame(&self) -> usize {
        self.frame
    }

    fn is_constructor(&self) -> Result<bool, JdiError> {
        self.ensure_suspended()?;
        Ok(self.is_constructor)
    }
}
