use nova_eval::{BinaryOp, EvalError, EvaluationError, Instruction, UnaryOp};
use nova_jdi::JdiValue;

use crate::harness::{int, invoke, var, Fixture};

#[test]
fn precedence_is_encoded_by_the_sequence() {
    // 3 + 4 * 2
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            int(3),
            int(4),
            int(2),
            Instruction::Binary(BinaryOp::Mul),
            Instruction::Binary(BinaryOp::Add),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Int(11));
    assert!(fixture.vm.calls().is_empty());
}

#[test]
fn integral_division_by_zero_is_an_evaluation_error() {
    let fixture = Fixture::new();
    let err = fixture
        .eval(vec![var("x"), int(0), Instruction::Binary(BinaryOp::Div)])
        .unwrap_err();
    assert_eq!(err, EvalError::Evaluation(EvaluationError::DivisionByZero));
    assert_eq!(err.to_string(), "/ by zero");

    let value = fixture
        .eval(vec![
            Instruction::PushPrimitive(JdiValue::Double(1.0)),
            Instruction::PushPrimitive(JdiValue::Double(0.0)),
            Instruction::Binary(BinaryOp::Div),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Double(f64::INFINITY));
}

#[test]
fn twiddle_promotes_small_integrals_to_int() {
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            Instruction::PushPrimitive(JdiValue::Short(5)),
            Instruction::Unary(UnaryOp::Twiddle),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Int(-6));

    let value = fixture
        .eval(vec![
            Instruction::PushPrimitive(JdiValue::Long(0)),
            Instruction::Unary(UnaryOp::Twiddle),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Long(-1));
}

#[test]
fn string_concatenation_renders_both_operands() {
    // "x=" + x + ", s=" + s + ", d=" + 1.0
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            Instruction::PushString("x=".into()),
            var("x"),
            Instruction::Binary(BinaryOp::Add),
            Instruction::PushString(", s=".into()),
            Instruction::Binary(BinaryOp::Add),
            var("s"),
            Instruction::Binary(BinaryOp::Add),
            Instruction::PushString(", d=".into()),
            Instruction::Binary(BinaryOp::Add),
            Instruction::PushPrimitive(JdiValue::Double(1.0)),
            Instruction::Binary(BinaryOp::Add),
        ])
        .unwrap();
    assert_eq!(fixture.string(&value), "x=3, s=hi, d=1.0");
}

#[test]
fn concatenating_an_object_calls_its_to_string() {
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            Instruction::PushNull,
            Instruction::PushString(" / ".into()),
            Instruction::Binary(BinaryOp::Add),
            var("p"),
            Instruction::Binary(BinaryOp::Add),
        ])
        .unwrap();
    let text = fixture.string(&value);
    assert!(text.starts_with("null / Point@"), "{text}");
    assert!(fixture
        .vm
        .calls()
        .iter()
        .any(|call| call.starts_with("invoke Point.toString()Ljava/lang/String;")));
}

#[test]
fn conditional_and_skips_the_right_operand() {
    // false && this.reset()
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            Instruction::PushPrimitive(JdiValue::Boolean(false)),
            Instruction::Dup,
            Instruction::JumpIfFalse(6),
            Instruction::Pop,
            Instruction::PushThis,
            invoke("reset", "()V", 0),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Boolean(false));
    assert!(fixture.vm.calls().is_empty());
}

#[test]
fn conditional_branches_need_a_boolean() {
    let fixture = Fixture::new();
    let err = fixture
        .eval(vec![int(1), Instruction::JumpIfTrue(2), int(2)])
        .unwrap_err();
    assert!(matches!(err, EvalError::Malformed(_)), "{err:?}");
}

#[test]
fn reference_equality_compares_identity() {
    let fixture = Fixture::new();
    let same = fixture
        .eval(vec![var("p"), var("p"), Instruction::Binary(BinaryOp::Eq)])
        .unwrap();
    assert_eq!(same, JdiValue::Boolean(true));

    let different = fixture
        .eval(vec![
            Instruction::PushString("hi".into()),
            var("s"),
            Instruction::Binary(BinaryOp::Eq),
        ])
        .unwrap();
    assert_eq!(different, JdiValue::Boolean(false));
}
