//! Numeric promotion and primitive operators.
//!
//! Everything here is local computation on values that were already fetched
//! from the debuggee; results are new primitive values. The rules follow the
//! Java Language Specification: unary promotion widens `byte`, `short` and
//! `char` to `int`, binary promotion picks the widest of `int < long < float <
//! double`, integral arithmetic wraps, and floating point follows IEEE 754.

use std::fmt;

use nova_jdi::{JdiValue, PrimitiveKind};

use crate::error::EvaluationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    /// Bitwise complement (`~`).
    Twiddle,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::Twiddle => "~",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    /// `&`: bitwise on integral operands, logical (non short-circuit) on booleans.
    And,
    Or,
    Xor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A promoted numeric operand.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Num {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Num {
    fn kind(self) -> PrimitiveKind {
        match self {
            Num::Int(_) => PrimitiveKind::Int,
            Num::Long(_) => PrimitiveKind::Long,
            Num::Float(_) => PrimitiveKind::Float,
            Num::Double(_) => PrimitiveKind::Double,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Num::Int(v) => i64::from(v),
            Num::Long(v) => v,
            Num::Float(v) => v as i64,
            Num::Double(v) => v as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => f64::from(v),
            Num::Long(v) => v as f64,
            Num::Float(v) => f64::from(v),
            Num::Double(v) => v,
        }
    }

    /// Widen to `kind`, which must be at least as wide as `self`.
    fn widen(self, kind: PrimitiveKind) -> Num {
        match kind {
            PrimitiveKind::Long => Num::Long(self.as_i64()),
            PrimitiveKind::Float => Num::Float(match self {
                Num::Int(v) => v as f32,
                Num::Long(v) => v as f32,
                Num::Float(v) => v,
                Num::Double(v) => v as f32,
            }),
            PrimitiveKind::Double => Num::Double(self.as_f64()),
            _ => self,
        }
    }
}

/// Unary numeric promotion of a single operand. `None` for non-numeric values.
fn promoted(value: &JdiValue) -> Option<Num> {
    Some(match *value {
        JdiValue::Byte(v) => Num::Int(i32::from(v)),
        JdiValue::Char(v) => Num::Int(i32::from(v)),
        JdiValue::Short(v) => Num::Int(i32::from(v)),
        JdiValue::Int(v) => Num::Int(v),
        JdiValue::Long(v) => Num::Long(v),
        JdiValue::Float(v) => Num::Float(v),
        JdiValue::Double(v) => Num::Double(v),
        _ => return None,
    })
}

/// Result type of unary numeric promotion.
pub fn unary_promotion(kind: PrimitiveKind) -> PrimitiveKind {
    match kind {
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
        other => other,
    }
}

/// Result type of binary numeric promotion, or `None` unless both operands are
/// numeric.
pub fn binary_promotion(lhs: PrimitiveKind, rhs: PrimitiveKind) -> Option<PrimitiveKind> {
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return None;
    }
    let rank = |kind: PrimitiveKind| match unary_promotion(kind) {
        PrimitiveKind::Int => 0,
        PrimitiveKind::Long => 1,
        PrimitiveKind::Float => 2,
        _ => 3,
    };
    Some(if rank(lhs) >= rank(rhs) {
        unary_promotion(lhs)
    } else {
        unary_promotion(rhs)
    })
}

fn promoted_pair(lhs: &JdiValue, rhs: &JdiValue) -> Option<(Num, Num)> {
    let (l, r) = (promoted(lhs)?, promoted(rhs)?);
    let kind = binary_promotion(l.kind(), r.kind())?;
    Some((l.widen(kind), r.widen(kind)))
}

fn invalid_unary(op: UnaryOp, value: &JdiValue) -> EvaluationError {
    EvaluationError::InvalidOperand {
        operator: op.symbol().to_string(),
        operands: value.type_name().to_string(),
    }
}

fn invalid_binary(op: BinaryOp, lhs: &JdiValue, rhs: &JdiValue) -> EvaluationError {
    EvaluationError::InvalidOperand {
        operator: op.symbol().to_string(),
        operands: format!("{}, {}", lhs.type_name(), rhs.type_name()),
    }
}

pub fn apply_unary(op: UnaryOp, value: &JdiValue) -> Result<JdiValue, EvaluationError> {
    if op == UnaryOp::Not {
        return value
            .as_bool()
            .map(|b| JdiValue::Boolean(!b))
            .ok_or_else(|| invalid_unary(op, value));
    }
    let num = promoted(value).ok_or_else(|| invalid_unary(op, value))?;
    Ok(match (op, num) {
        (UnaryOp::Plus, n) => from_num(n),
        (UnaryOp::Minus, Num::Int(v)) => JdiValue::Int(v.wrapping_neg()),
        (UnaryOp::Minus, Num::Long(v)) => JdiValue::Long(v.wrapping_neg()),
        (UnaryOp::Minus, Num::Float(v)) => JdiValue::Float(-v),
        (UnaryOp::Minus, Num::Double(v)) => JdiValue::Double(-v),
        (UnaryOp::Twiddle, Num::Int(v)) => JdiValue::Int(!v),
        (UnaryOp::Twiddle, Num::Long(v)) => JdiValue::Long(!v),
        _ => return Err(invalid_unary(op, value)),
    })
}

fn from_num(num: Num) -> JdiValue {
    match num {
        Num::Int(v) => JdiValue::Int(v),
        Num::Long(v) => JdiValue::Long(v),
        Num::Float(v) => JdiValue::Float(v),
        Num::Double(v) => JdiValue::Double(v),
    }
}

/// Apply a binary operator to two already-evaluated operands.
///
/// String concatenation needs the debuggee and is handled by the interpreter
/// before it gets here.
pub fn apply_binary(
    op: BinaryOp,
    lhs: &JdiValue,
    rhs: &JdiValue,
) -> Result<JdiValue, EvaluationError> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = equals(op, lhs, rhs)?;
            Ok(JdiValue::Boolean(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            if let (Some(l), Some(r)) = (lhs.as_bool(), rhs.as_bool()) {
                return Ok(JdiValue::Boolean(match op {
                    BinaryOp::And => l & r,
                    BinaryOp::Or => l | r,
                    _ => l ^ r,
                }));
            }
            match integral_pair(lhs, rhs) {
                Some((Num::Int(l), Num::Int(r))) => Ok(JdiValue::Int(match op {
                    BinaryOp::And => l & r,
                    BinaryOp::Or => l | r,
                    _ => l ^ r,
                })),
                Some((l, r)) => {
                    let (l, r) = (l.as_i64(), r.as_i64());
                    Ok(JdiValue::Long(match op {
                        BinaryOp::And => l & r,
                        BinaryOp::Or => l | r,
                        _ => l ^ r,
                    }))
                }
                None => Err(invalid_binary(op, lhs, rhs)),
            }
        }
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => shift(op, lhs, rhs),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (l, r) = promoted_pair(lhs, rhs).ok_or_else(|| invalid_binary(op, lhs, rhs))?;
            let ordering = match (l, r) {
                (Num::Int(l), Num::Int(r)) => l.partial_cmp(&r),
                (Num::Long(l), Num::Long(r)) => l.partial_cmp(&r),
                (l, r) => l.as_f64().partial_cmp(&r.as_f64()),
            };
            // NaN compares false against everything.
            let result = ordering.is_some_and(|ordering| match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            });
            Ok(JdiValue::Boolean(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (l, r) = promoted_pair(lhs, rhs).ok_or_else(|| invalid_binary(op, lhs, rhs))?;
            arithmetic(op, l, r)
        }
    }
}

fn integral_pair(lhs: &JdiValue, rhs: &JdiValue) -> Option<(Num, Num)> {
    let both_integral = lhs.primitive_kind().is_some_and(PrimitiveKind::is_integral)
        && rhs.primitive_kind().is_some_and(PrimitiveKind::is_integral);
    if !both_integral {
        return None;
    }
    promoted_pair(lhs, rhs)
}

fn equals(op: BinaryOp, lhs: &JdiValue, rhs: &JdiValue) -> Result<bool, EvaluationError> {
    if let Some((l, r)) = promoted_pair(lhs, rhs) {
        return Ok(match (l, r) {
            (Num::Int(l), Num::Int(r)) => l == r,
            (Num::Long(l), Num::Long(r)) => l == r,
            (Num::Float(l), Num::Float(r)) => l == r,
            (l, r) => l.as_f64() == r.as_f64(),
        });
    }
    match (lhs, rhs) {
        (JdiValue::Boolean(l), JdiValue::Boolean(r)) => Ok(l == r),
        (JdiValue::Null, JdiValue::Null) => Ok(true),
        (JdiValue::Null, JdiValue::Object(_)) | (JdiValue::Object(_), JdiValue::Null) => Ok(false),
        (JdiValue::Object(l), JdiValue::Object(r)) => Ok(l.id == r.id),
        _ => Err(invalid_binary(op, lhs, rhs)),
    }
}

fn shift(op: BinaryOp, lhs: &JdiValue, rhs: &JdiValue) -> Result<JdiValue, EvaluationError> {
    let integral = |value: &JdiValue| {
        value
            .primitive_kind()
            .is_some_and(PrimitiveKind::is_integral)
            .then(|| promoted(value))
            .flatten()
    };
    let (Some(l), Some(r)) = (integral(lhs), integral(rhs)) else {
        return Err(invalid_binary(op, lhs, rhs));
    };
    let distance = r.as_i64();
    // The result type is the promoted left operand; the distance is masked
    // to the width of that type.
    Ok(match l {
        Num::Int(v) => {
            let d = (distance & 0x1f) as u32;
            JdiValue::Int(match op {
                BinaryOp::Shl => v.wrapping_shl(d),
                BinaryOp::Shr => v >> d,
                _ => ((v as u32) >> d) as i32,
            })
        }
        Num::Long(v) => {
            let d = (distance & 0x3f) as u32;
            JdiValue::Long(match op {
                BinaryOp::Shl => v.wrapping_shl(d),
                BinaryOp::Shr => v >> d,
                _ => ((v as u64) >> d) as i64,
            })
        }
        _ => return Err(invalid_binary(op, lhs, rhs)),
    })
}

fn arithmetic(op: BinaryOp, l: Num, r: Num) -> Result<JdiValue, EvaluationError> {
    Ok(match (l, r) {
        (Num::Int(l), Num::Int(r)) => JdiValue::Int(match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div if r == 0 => return Err(EvaluationError::DivisionByZero),
            BinaryOp::Div => l.wrapping_div(r),
            BinaryOp::Rem if r == 0 => return Err(EvaluationError::DivisionByZero),
            _ => l.wrapping_rem(r),
        }),
        (Num::Long(l), Num::Long(r)) => JdiValue::Long(match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div if r == 0 => return Err(EvaluationError::DivisionByZero),
            BinaryOp::Div => l.wrapping_div(r),
            BinaryOp::Rem if r == 0 => return Err(EvaluationError::DivisionByZero),
            _ => l.wrapping_rem(r),
        }),
        (Num::Float(l), Num::Float(r)) => JdiValue::Float(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            _ => l % r,
        }),
        (l, r) => {
            let (l, r) = (l.as_f64(), r.as_f64());
            JdiValue::Double(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                _ => l % r,
            })
        }
    })
}

/// Primitive conversion for a cast expression (`(byte) x`, `(double) y`).
///
/// Narrowing from floating point to `byte`, `short` or `char` goes through
/// `int` first, so `(byte) 1e10` is `-1`.
pub fn convert(value: &JdiValue, target: PrimitiveKind) -> Result<JdiValue, EvaluationError> {
    let cast_error = || EvaluationError::ClassCast {
        from: value.type_name().to_string(),
        to: target.name().to_string(),
    };
    if target == PrimitiveKind::Boolean {
        return value
            .as_bool()
            .map(JdiValue::Boolean)
            .ok_or_else(cast_error);
    }
    let num = promoted(value).ok_or_else(cast_error)?;
    let integral = match num {
        Num::Int(v) => i64::from(v),
        Num::Long(v) => v,
        Num::Float(_) | Num::Double(_) => match target {
            PrimitiveKind::Long => num.as_f64() as i64,
            _ => i64::from(num.as_f64() as i32),
        },
    };
    Ok(match target {
        PrimitiveKind::Byte => JdiValue::Byte(integral as i8),
        PrimitiveKind::Char => JdiValue::Char(integral as u16),
        PrimitiveKind::Short => JdiValue::Short(integral as i16),
        PrimitiveKind::Int => JdiValue::Int(integral as i32),
        PrimitiveKind::Long => JdiValue::Long(integral),
        PrimitiveKind::Float => JdiValue::Float(match num {
            Num::Double(v) => v as f32,
            Num::Float(v) => v,
            _ => integral as f32,
        }),
        PrimitiveKind::Double => JdiValue::Double(match num {
            Num::Double(v) => v,
            Num::Float(v) => f64::from(v),
            _ => integral as f64,
        }),
        PrimitiveKind::Boolean => return Err(cast_error()),
    })
}
