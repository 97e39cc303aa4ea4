//! Operand-stack machine executing an [`InstructionSequence`] against a
//! suspended thread.
//!
//! The interpreter is strictly sequential: every remote call blocks until the
//! debuggee answers, and nothing read from the debuggee is cached between
//! instructions. Cancellation and the deadline are only observed between
//! instructions, so a remote call that has started always runs to completion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use nova_jdi::{JdiError, JdiValue, MethodRef, ObjectRef, ReferenceType, VirtualMachine};
use tokio_util::sync::CancellationToken;

use crate::arith::{self, BinaryOp};
use crate::context::RuntimeContext;
use crate::correlator::{ExpectationKind, MethodResultCorrelator};
use crate::display::display_string;
use crate::error::{EvalError, EvalResult, EvaluationError, MalformedSequence};
use crate::instruction::{Instruction, InstructionSequence, TypeSpec};
use crate::options::EvalOptions;

/// Entry of the operand stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(JdiValue),
    /// Type operand consumed by `Construct`, static `Invoke` and friends.
    Type(ReferenceType),
}

pub struct Interpreter<'a> {
    context: &'a dyn RuntimeContext,
    options: EvalOptions,
    correlator: Option<Arc<MethodResultCorrelator>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    max_stack: usize,
    stack: Vec<Operand>,
    /// Names bound by `instanceof` patterns; they shadow everything else.
    temporaries: HashMap<String, JdiValue>,
    pc: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a dyn RuntimeContext, options: EvalOptions) -> Self {
        Self {
            context,
            options,
            correlator: None,
            cancel: CancellationToken::new(),
            deadline: None,
            max_stack: 1024,
            stack: Vec::new(),
            temporaries: HashMap::new(),
            pc: 0,
        }
    }

    pub fn with_correlator(mut self, correlator: Option<Arc<MethodResultCorrelator>>) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_max_stack(mut self, max_stack: usize) -> Self {
        self.max_stack = max_stack;
        self
    }

    /// Run the sequence to completion and return the single value it leaves
    /// on the stack.
    pub fn run(mut self, sequence: &InstructionSequence) -> EvalResult<JdiValue> {
        if !self.options.allow_side_effects && sequence.has_side_effects() {
            return Err(EvaluationError::SideEffectsNotAllowed.into());
        }

        let instructions = sequence.instructions();
        while let Some(instruction) = instructions.get(self.pc) {
            self.checkpoint()?;
            tracing::trace!(
                target = "nova.eval",
                pc = self.pc,
                depth = self.stack.len(),
                %instruction,
                "execute"
            );
            let next = self.execute(instruction)?;
            self.pc = next.unwrap_or(self.pc + 1);
        }

        match self.stack.len() {
            1 => match self.stack.pop() {
                Some(Operand::Value(value)) => Ok(value),
                _ => Err(MalformedSequence::UnexpectedOperand {
                    pc: self.pc,
                    instruction: "end of sequence".to_owned(),
                    expected: "value",
                }
                .into()),
            },
            n => Err(MalformedSequence::ResultCount(n).into()),
        }
    }

    fn checkpoint(&self) -> EvalResult<()> {
        if self.cancel.is_cancelled() {
            tracing::debug!(target = "nova.eval", pc = self.pc, "evaluation cancelled");
            return Err(EvalError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            tracing::debug!(target = "nova.eval", pc = self.pc, "evaluation deadline passed");
            return Err(EvalError::TimedOut);
        }
        Ok(())
    }

    fn vm(&self) -> &dyn VirtualMachine {
        self.context.vm().as_ref()
    }

    /// Execute one instruction; `Some(target)` transfers control.
    fn execute(&mut self, instruction: &Instruction) -> EvalResult<Option<usize>> {
        match instruction {
            Instruction::PushPrimitive(value) => self.push_value(instruction, value.clone())?,
            Instruction::PushString(text) => {
                let string = self.vm().mirror_of_string(text)?;
                self.push_value(instruction, JdiValue::Object(string))?;
            }
            Instruction::PushNull => self.push_value(instruction, JdiValue::Null)?,
            Instruction::PushThis => {
                let this = self.context.this()?.ok_or(EvaluationError::NoReceiver)?;
                self.push_value(instruction, JdiValue::Object(this))?;
            }
            Instruction::PushType(name) => {
                let ty = self.vm().class_by_name(name)?;
                self.push(instruction, Operand::Type(ty))?;
            }
            Instruction::PushVariable(name) => {
                let value = self.read_variable(name)?;
                self.push_value(instruction, value)?;
            }
            Instruction::PushField(name) => {
                let target = self.pop_value(instruction)?;
                let object = self.receiver(&target, name, || format!("read field `{name}`"))?;
                let value = self.vm().get_field(object, name)?;
                self.push_value(instruction, value)?;
            }
            Instruction::PushStaticField { type_name, name } => {
                let class = self.vm().class_by_name(type_name)?;
                let value = self.vm().get_static_field(&class, name)?;
                self.push_value(instruction, value)?;
            }
            Instruction::ArrayAccess => {
                let index = self.pop_value(instruction)?;
                let array = self.pop_value(instruction)?;
                let (array, index) = self.array_slot(&array, &index, "load from")?;
                let element = self.vm().array_element(array, index)?;
                self.push_value(instruction, element)?;
            }
            Instruction::ArrayLength => {
                let array = self.pop_value(instruction)?;
                let array = self.array(&array, "read the length of")?;
                let length = self.vm().array_length(array)?;
                self.push_value(instruction, JdiValue::Int(length_to_int(length)))?;
            }
            Instruction::StoreVariable(name) => {
                let value = self.pop_value(instruction)?;
                self.write_variable(name, value.clone())?;
                self.push_value(instruction, value)?;
            }
            Instruction::StoreField(name) => {
                let value = self.pop_value(instruction)?;
                let target = self.pop_value(instruction)?;
                let object = self.receiver(&target, name, || format!("assign field `{name}`"))?;
                self.vm().set_field(object, name, value.clone())?;
                self.push_value(instruction, value)?;
            }
            Instruction::StoreStaticField { type_name, name } => {
                let value = self.pop_value(instruction)?;
                let class = self.vm().class_by_name(type_name)?;
                self.vm().set_static_field(&class, name, value.clone())?;
                self.push_value(instruction, value)?;
            }
            Instruction::StoreArrayElement => {
                let value = self.pop_value(instruction)?;
                let index = self.pop_value(instruction)?;
                let array = self.pop_value(instruction)?;
                let (array, index) = self.array_slot(&array, &index, "store into")?;
                self.vm().set_array_element(array, index, value.clone())?;
                self.push_value(instruction, value)?;
            }
            Instruction::Unary(op) => {
                let operand = self.pop_value(instruction)?;
                let result = arith::apply_unary(*op, &operand)?;
                self.push_value(instruction, result)?;
            }
            Instruction::Binary(op) => {
                let rhs = self.pop_value(instruction)?;
                let lhs = self.pop_value(instruction)?;
                let result = if *op == BinaryOp::Add && (is_string(&lhs) || is_string(&rhs)) {
                    self.concat(&lhs, &rhs)?
                } else {
                    arith::apply_binary(*op, &lhs, &rhs)?
                };
                self.push_value(instruction, result)?;
            }
            Instruction::Cast(target) => {
                let value = self.pop_value(instruction)?;
                let cast = self.cast(value, target)?;
                self.push_value(instruction, cast)?;
            }
            Instruction::InstanceOf(type_name) => {
                let value = self.pop_value(instruction)?;
                let matches = self.instance_of(&value, type_name)?;
                self.push_value(instruction, JdiValue::Boolean(matches))?;
            }
            Instruction::InstanceOfPattern { type_name, binding } => {
                let value = self.pop_value(instruction)?;
                let matches = self.instance_of(&value, type_name)?;
                if matches {
                    self.temporaries.insert(binding.clone(), value);
                }
                self.push_value(instruction, JdiValue::Boolean(matches))?;
            }
            Instruction::Construct {
                signature,
                arg_count,
            } => {
                let args = self.pop_args(instruction, *arg_count)?;
                let class = self.pop_type(instruction)?;
                let object =
                    self.vm()
                        .new_instance(&class, signature, &args, self.context.thread())?;
                self.push_value(instruction, object)?;
            }
            Instruction::Invoke {
                name,
                signature,
                arg_count,
            } => {
                let args = self.pop_args(instruction, *arg_count)?;
                let receiver = self.pop(instruction)?;
                let result = self.invoke(receiver, name, signature, &args)?;
                self.push_value(instruction, result)?;
            }
            Instruction::NewArray { array_type } => {
                let length = self.pop_value(instruction)?;
                let length = match index_value(&length) {
                    Some(length) if length < 0 => {
                        return Err(EvaluationError::NegativeArraySize(length).into())
                    }
                    Some(length) => length as usize,
                    None => {
                        return Err(EvaluationError::InvalidType(format!(
                            "array size must be an int, found {}",
                            length.type_name()
                        ))
                        .into())
                    }
                };
                let ty = self.vm().class_by_name(array_type)?;
                let array = self.vm().new_array(&ty, length)?;
                self.push_value(instruction, JdiValue::Object(array))?;
            }
            Instruction::Dup => {
                let top = self.pop(instruction)?;
                self.push(instruction, top.clone())?;
                self.push(instruction, top)?;
            }
            Instruction::Pop => {
                self.pop(instruction)?;
            }
            Instruction::Jump(target) => return Ok(Some(*target)),
            Instruction::JumpIfTrue(target) | Instruction::JumpIfFalse(target) => {
                let condition = self.pop_value(instruction)?;
                let Some(condition) = condition.as_bool() else {
                    return Err(self.unexpected(instruction, "boolean"));
                };
                let jump_on = matches!(instruction, Instruction::JumpIfTrue(_));
                if condition == jump_on {
                    return Ok(Some(*target));
                }
            }
        }
        Ok(None)
    }

    fn push(&mut self, instruction: &Instruction, operand: Operand) -> EvalResult<()> {
        if self.stack.len() >= self.max_stack {
            tracing::debug!(target = "nova.eval", %instruction, "operand stack overflow");
            return Err(MalformedSequence::StackOverflow {
                pc: self.pc,
                limit: self.max_stack,
            }
            .into());
        }
        self.stack.push(operand);
        Ok(())
    }

    fn push_value(&mut self, instruction: &Instruction, value: JdiValue) -> EvalResult<()> {
        self.push(instruction, Operand::Value(value))
    }

    fn pop(&mut self, instruction: &Instruction) -> EvalResult<Operand> {
        self.stack.pop().ok_or_else(|| {
            MalformedSequence::StackUnderflow {
                pc: self.pc,
                instruction: instruction.to_string(),
            }
            .into()
        })
    }

    fn pop_value(&mut self, instruction: &Instruction) -> EvalResult<JdiValue> {
        match self.pop(instruction)? {
            Operand::Value(value) => Ok(value),
            Operand::Type(_) => Err(self.unexpected(instruction, "value")),
        }
    }

    fn pop_type(&mut self, instruction: &Instruction) -> EvalResult<ReferenceType> {
        match self.pop(instruction)? {
            Operand::Type(ty) => Ok(ty),
            Operand::Value(_) => Err(self.unexpected(instruction, "type")),
        }
    }

    /// Arguments were pushed in source order, so they come off reversed.
    fn pop_args(&mut self, instruction: &Instruction, count: usize) -> EvalResult<Vec<JdiValue>> {
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop_value(instruction)?);
        }
        args.reverse();
        Ok(args)
    }

    fn unexpected(&self, instruction: &Instruction, expected: &'static str) -> EvalError {
        MalformedSequence::UnexpectedOperand {
            pc: self.pc,
            instruction: instruction.to_string(),
            expected,
        }
        .into()
    }

    fn read_variable(&self, name: &str) -> EvalResult<JdiValue> {
        if let Some(value) = self.temporaries.get(name) {
            return Ok(value.clone());
        }
        if self.context.local(name)?.is_some() {
            return Ok(self
                .vm()
                .local_value(self.context.thread(), self.context.frame(), name)?);
        }
        if let Some(this) = self.context.this()? {
            match self.vm().get_field(&this, name) {
                Err(JdiError::NoSuchField { .. }) => {}
                other => return Ok(other?),
            }
        }
        let receiving_type = self.context.receiving_type()?;
        match self.vm().get_static_field(&receiving_type, name) {
            Err(JdiError::NoSuchField { .. }) => {
                Err(EvaluationError::UnresolvedName(name.to_owned()).into())
            }
            other => Ok(other?),
        }
    }

    fn write_variable(&mut self, name: &str, value: JdiValue) -> EvalResult<()> {
        if let Some(slot) = self.temporaries.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        if self.context.local(name)?.is_some() {
            return Ok(self.vm().set_local_value(
                self.context.thread(),
                self.context.frame(),
                name,
                value,
            )?);
        }
        if let Some(this) = self.context.this()? {
            match self.vm().set_field(&this, name, value.clone()) {
                Err(JdiError::NoSuchField { .. }) => {}
                other => return Ok(other?),
            }
        }
        let receiving_type = self.context.receiving_type()?;
        match self.vm().set_static_field(&receiving_type, name, value) {
            Err(JdiError::NoSuchField { .. }) => {
                Err(EvaluationError::UnresolvedName(name.to_owned()).into())
            }
            other => Ok(other?),
        }
    }

    fn receiver<'v>(
        &self,
        target: &'v JdiValue,
        member: &str,
        action: impl FnOnce() -> String,
    ) -> EvalResult<&'v ObjectRef> {
        match target {
            JdiValue::Object(object) => Ok(object),
            JdiValue::Null => Err(EvaluationError::NullPointer(action()).into()),
            other => Err(EvaluationError::NoSuchField {
                type_name: other.type_name().to_owned(),
                name: member.to_owned(),
            }
            .into()),
        }
    }

    fn array<'v>(&self, array: &'v JdiValue, action: &str) -> EvalResult<&'v ObjectRef> {
        match array {
            JdiValue::Object(object) if object.is_array() => Ok(object),
            JdiValue::Null => Err(EvaluationError::NullPointer(format!("{action} a null array")).into()),
            other => Err(EvaluationError::InvalidType(format!(
                "the type of the expression must be an array type but it resolved to {}",
                other.type_name()
            ))
            .into()),
        }
    }

    fn array_slot<'v>(
        &self,
        array: &'v JdiValue,
        index: &JdiValue,
        action: &str,
    ) -> EvalResult<(&'v ObjectRef, usize)> {
        let array = self.array(array, action)?;
        let Some(index) = index_value(index) else {
            return Err(EvaluationError::InvalidType(format!(
                "array index must be an int, found {}",
                index.type_name()
            ))
            .into());
        };
        let length = self.vm().array_length(array)?;
        match usize::try_from(index) {
            Ok(slot) if slot < length => Ok((array, slot)),
            _ => Err(EvaluationError::ArrayIndexOutOfBounds {
                index: i64::from(index),
                length,
            }
            .into()),
        }
    }

    fn concat(&self, lhs: &JdiValue, rhs: &JdiValue) -> EvalResult<JdiValue> {
        let thread = self.context.thread();
        let mut text = display_string(self.vm(), thread, lhs)?;
        text.push_str(&display_string(self.vm(), thread, rhs)?);
        Ok(JdiValue::Object(self.vm().mirror_of_string(&text)?))
    }

    fn cast(&self, value: JdiValue, target: &TypeSpec) -> EvalResult<JdiValue> {
        match target {
            TypeSpec::Primitive(kind) => Ok(arith::convert(&value, *kind)?),
            TypeSpec::Reference(type_name) => match &value {
                JdiValue::Null => Ok(value),
                JdiValue::Object(object) => {
                    let ty = self.vm().class_by_name(type_name)?;
                    if self.vm().is_assignable(object, &ty)? {
                        Ok(value)
                    } else {
                        Err(EvaluationError::ClassCast {
                            from: object.runtime_type.clone(),
                            to: type_name.clone(),
                        }
                        .into())
                    }
                }
                other => Err(EvaluationError::ClassCast {
                    from: other.type_name().to_owned(),
                    to: type_name.clone(),
                }
                .into()),
            },
        }
    }

    fn instance_of(&self, value: &JdiValue, type_name: &str) -> EvalResult<bool> {
        match value {
            JdiValue::Null => Ok(false),
            JdiValue::Object(object) => {
                let ty = self.vm().class_by_name(type_name)?;
                Ok(self.vm().is_assignable(object, &ty)?)
            }
            other => Err(EvaluationError::InvalidOperand {
                operator: "instanceof".to_owned(),
                operands: other.type_name().to_owned(),
            }
            .into()),
        }
    }

    fn invoke(
        &self,
        receiver: Operand,
        name: &str,
        signature: &str,
        args: &[JdiValue],
    ) -> EvalResult<JdiValue> {
        let thread = self.context.thread();
        let target = match receiver {
            Operand::Type(class) => CallTarget::Static(class),
            Operand::Value(JdiValue::Object(object)) => CallTarget::Instance(object),
            Operand::Value(JdiValue::Null) => {
                return Err(EvaluationError::NullPointer(format!("invoke `{name}`")).into())
            }
            Operand::Value(other) => {
                return Err(EvaluationError::InvalidType(format!(
                    "cannot invoke {name}{signature} on the primitive type {}",
                    other.type_name()
                ))
                .into())
            }
        };

        // A method-exit or exception stop inside the call happens one frame
        // above the current top.
        let expectation = match &self.correlator {
            Some(correlator) => {
                let depth = self.vm().frame_count(thread)? + 1;
                // Events name the declaring type, which for inherited methods
                // is a supertype of the receiver.
                let declaring = self.vm().method_declaring_type(
                    &target.reference_type(self.vm())?,
                    name,
                    signature,
                )?;
                let method = MethodRef::new(declaring.name, name, signature);
                let token = correlator.expect(thread, method, depth, ExpectationKind::MethodExit);
                Some((correlator, token))
            }
            None => None,
        };

        let result = match &target {
            CallTarget::Static(class) => {
                self.vm()
                    .invoke_static_method(class, name, signature, args, thread)
            }
            CallTarget::Instance(object) => {
                self.vm().invoke_method(object, name, signature, args, thread)
            }
        };

        if let Some((correlator, token)) = expectation {
            correlator.abandon(token);
        }
        Ok(result?)
    }
}

enum CallTarget {
    Static(ReferenceType),
    Instance(ObjectRef),
}

impl CallTarget {
    fn reference_type(&self, vm: &dyn VirtualMachine) -> Result<ReferenceType, JdiError> {
        match self {
            CallTarget::Static(class) => Ok(class.clone()),
            CallTarget::Instance(object) => vm.reference_type(object),
        }
    }
}

fn is_string(value: &JdiValue) -> bool {
    value.as_object().is_some_and(ObjectRef::is_string)
}

/// Value of an array index or size after unary promotion to `int`.
fn index_value(value: &JdiValue) -> Option<i32> {
    match value {
        JdiValue::Byte(v) => Some(i32::from(*v)),
        JdiValue::Short(v) => Some(i32::from(*v)),
        JdiValue::Char(v) => Some(i32::from(*v)),
        JdiValue::Int(v) => Some(*v),
        _ => None,
    }
}

fn length_to_int(length: usize) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}
