use std::fmt;

use nova_jdi::{JdiValue, PrimitiveKind};

use crate::arith::{BinaryOp, UnaryOp};
use crate::error::MalformedSequence;

/// Target of a cast.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeSpec {
    Primitive(PrimitiveKind),
    /// Fully qualified reference type name (`java.lang.String`, `int[]`).
    Reference(String),
}

impl TypeSpec {
    pub fn parse(name: &str) -> Self {
        match PrimitiveKind::from_name(name) {
            Some(kind) => TypeSpec::Primitive(kind),
            None => TypeSpec::Reference(name.to_string()),
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Primitive(kind) => f.write_str(kind.name()),
            TypeSpec::Reference(name) => f.write_str(name),
        }
    }
}

/// One unit of work for the interpreter.
///
/// Stack effects are written `before -> after`, top of stack on the right.
/// Arguments of `Construct` and `Invoke` are pushed in source order, so the
/// last argument is on top.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// `-> value`
    PushPrimitive(JdiValue),
    /// `-> string`, materialized in the debuggee.
    PushString(String),
    /// `-> null`
    PushNull,
    /// `-> this`
    PushThis,
    /// `-> type`
    PushType(String),
    /// `-> value`; temporaries, then locals, then fields of `this`, then
    /// static fields of the receiving type.
    PushVariable(String),
    /// `object -> value`
    PushField(String),
    /// `-> value`
    PushStaticField { type_name: String, name: String },
    /// `array index -> element`
    ArrayAccess,
    /// `array -> length`
    ArrayLength,
    /// `value -> value`; same resolution order as `PushVariable`.
    StoreVariable(String),
    /// `object value -> value`
    StoreField(String),
    /// `value -> value`
    StoreStaticField { type_name: String, name: String },
    /// `array index value -> value`
    StoreArrayElement,
    /// `operand -> result`
    Unary(UnaryOp),
    /// `lhs rhs -> result`
    Binary(BinaryOp),
    /// `value -> converted`
    Cast(TypeSpec),
    /// `value -> boolean`
    InstanceOf(String),
    /// `value -> boolean`; binds `binding` to the value when the test passes.
    InstanceOfPattern { type_name: String, binding: String },
    /// `type arg1 .. argN -> object`
    Construct { signature: String, arg_count: usize },
    /// `receiver arg1 .. argN -> result`; a type receiver makes a static call.
    Invoke {
        name: String,
        signature: String,
        arg_count: usize,
    },
    /// `length -> array`
    NewArray { array_type: String },
    /// `value -> value value`
    Dup,
    /// `value ->`
    Pop,
    /// Continue at the target index.
    Jump(usize),
    /// `boolean ->`; jump when the condition is true.
    JumpIfTrue(usize),
    /// `boolean ->`; jump when the condition is false.
    JumpIfFalse(usize),
}

impl Instruction {
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Instruction::Jump(target)
            | Instruction::JumpIfTrue(target)
            | Instruction::JumpIfFalse(target) => Some(*target),
            _ => None,
        }
    }

    /// Whether executing the instruction may change debuggee state.
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Instruction::Construct { .. }
                | Instruction::Invoke { .. }
                | Instruction::NewArray { .. }
                | Instruction::StoreVariable(_)
                | Instruction::StoreField(_)
                | Instruction::StoreStaticField { .. }
                | Instruction::StoreArrayElement
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushPrimitive(value) => write!(f, "push {value:?}"),
            Instruction::PushString(value) => write!(f, "push {value:?}"),
            Instruction::PushNull => f.write_str("push null"),
            Instruction::PushThis => f.write_str("push this"),
            Instruction::PushType(name) => write!(f, "push type {name}"),
            Instruction::PushVariable(name) => write!(f, "push variable {name}"),
            Instruction::PushField(name) => write!(f, "push field {name}"),
            Instruction::PushStaticField { type_name, name } => {
                write!(f, "push static field {type_name}.{name}")
            }
            Instruction::ArrayAccess => f.write_str("array access"),
            Instruction::ArrayLength => f.write_str("array length"),
            Instruction::StoreVariable(name) => write!(f, "store variable {name}"),
            Instruction::StoreField(name) => write!(f, "store field {name}"),
            Instruction::StoreStaticField { type_name, name } => {
                write!(f, "store static field {type_name}.{name}")
            }
            Instruction::StoreArrayElement => f.write_str("store array element"),
            Instruction::Unary(op) => write!(f, "'{op}' operator"),
            Instruction::Binary(op) => write!(f, "'{op}' operator"),
            Instruction::Cast(ty) => write!(f, "cast to {ty}"),
            Instruction::InstanceOf(ty) => write!(f, "instanceof {ty}"),
            Instruction::InstanceOfPattern { type_name, binding } => {
                write!(f, "instanceof {type_name} {binding}")
            }
            Instruction::Construct { signature, .. } => write!(f, "constructor {signature}"),
            Instruction::Invoke {
                name, signature, ..
            } => write!(f, "send message {name}{signature}"),
            Instruction::NewArray { array_type } => write!(f, "new array {array_type}"),
            Instruction::Dup => f.write_str("dup"),
            Instruction::Pop => f.write_str("pop"),
            Instruction::Jump(target) => write!(f, "jump {target}"),
            Instruction::JumpIfTrue(target) => write!(f, "jump if true {target}"),
            Instruction::JumpIfFalse(target) => write!(f, "jump if false {target}"),
        }
    }
}

/// A compiled expression, validated once and executed by one evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct InstructionSequence {
    source: String,
    instructions: Vec<Instruction>,
}

impl InstructionSequence {
    /// Every jump must move strictly forward; jumping to `len` ends the
    /// program. Expressions never loop, so backward jumps are rejected here
    /// rather than guarded at run time.
    pub fn new(
        source: impl Into<String>,
        instructions: Vec<Instruction>,
    ) -> Result<Self, MalformedSequence> {
        let len = instructions.len();
        for (pc, instruction) in instructions.iter().enumerate() {
            if let Some(target) = instruction.jump_target() {
                if target <= pc || target > len {
                    return Err(MalformedSequence::InvalidJump { pc, target, len });
                }
            }
        }
        Ok(Self {
            source: source.into(),
            instructions,
        })
    }

    /// Source text the sequence was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn has_side_effects(&self) -> bool {
        self.instructions.iter().any(Instruction::has_side_effects)
    }
}
