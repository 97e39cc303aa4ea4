use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{ObjectId, ReferenceTypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => PrimitiveKind::Boolean,
            "byte" => PrimitiveKind::Byte,
            "char" => PrimitiveKind::Char,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// JNI signature character (`I` for `int`, `Z` for `boolean`, ...).
    pub fn signature(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to an object in the debuggee heap.
///
/// Equality and hashing only look at the remote id: two handles naming the
/// same remote object are the same value even if their cached type names
/// differ.
#[derive(Clone, Debug)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub runtime_type: String,
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ObjectRef {
    pub fn is_string(&self) -> bool {
        self.runtime_type == "java.lang.String"
    }

    pub fn is_array(&self) -> bool {
        self.runtime_type.ends_with("[]")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum JdiValue {
    Null,
    Void,
    Boolean(bool),
    Byte(i8),
    /// UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(ObjectRef),
}

impl JdiValue {
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            JdiValue::Boolean(_) => PrimitiveKind::Boolean,
            JdiValue::Byte(_) => PrimitiveKind::Byte,
            JdiValue::Char(_) => PrimitiveKind::Char,
            JdiValue::Short(_) => PrimitiveKind::Short,
            JdiValue::Int(_) => PrimitiveKind::Int,
            JdiValue::Long(_) => PrimitiveKind::Long,
            JdiValue::Float(_) => PrimitiveKind::Float,
            JdiValue::Double(_) => PrimitiveKind::Double,
            JdiValue::Null | JdiValue::Void | JdiValue::Object(_) => return None,
        })
    }

    /// Language-level type name of the value.
    pub fn type_name(&self) -> &str {
        match self {
            JdiValue::Null => "null",
            JdiValue::Void => "void",
            JdiValue::Object(obj) => &obj.runtime_type,
            other => other
                .primitive_kind()
                .map(PrimitiveKind::name)
                .unwrap_or("<unknown>"),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JdiValue::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            JdiValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JdiValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        self.as_object().map(|obj| obj.id)
    }
}

// Floats hash by bit pattern with both zeros folded together, which keeps
// `Hash` consistent with `==` for every value that is equal to itself.
fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    if value == 0.0 {
        0u64.hash(state);
    } else {
        value.to_bits().hash(state);
    }
}

impl Hash for JdiValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            JdiValue::Null | JdiValue::Void => {}
            JdiValue::Boolean(v) => v.hash(state),
            JdiValue::Byte(v) => v.hash(state),
            JdiValue::Char(v) => v.hash(state),
            JdiValue::Short(v) => v.hash(state),
            JdiValue::Int(v) => v.hash(state),
            JdiValue::Long(v) => v.hash(state),
            JdiValue::Float(v) => hash_f64(f64::from(*v), state),
            JdiValue::Double(v) => hash_f64(*v, state),
            JdiValue::Object(obj) => obj.hash(state),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Array,
}

/// Handle to a loaded reference type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceType {
    pub id: ReferenceTypeId,
    pub name: String,
    pub kind: TypeKind,
}

impl ReferenceType {
    /// Component type name for array types (`int[][]` -> `int[]`).
    pub fn component_type_name(&self) -> Option<&str> {
        self.name.strip_suffix("[]")
    }
}

/// Identity of a method: declaring type, name and JNI signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    pub signature: String,
}

impl MethodRef {
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.declaring_type, self.name, self.signature)
    }
}
