use nova_eval::{EvalError, EvaluationError, Instruction, TypeSpec};
use nova_jdi::{JdiValue, PrimitiveKind};

use crate::harness::{eval_in, int, var, Fixture, THREAD};

#[test]
fn names_resolve_through_locals_then_fields_then_statics() {
    let fixture = Fixture::new();
    assert_eq!(fixture.eval(vec![var("x")]).unwrap(), JdiValue::Int(3));
    assert_eq!(fixture.eval(vec![var("count")]).unwrap(), JdiValue::Int(2));
    assert_eq!(fixture.eval(vec![var("LIMIT")]).unwrap(), JdiValue::Int(10));
    assert_eq!(
        fixture.eval(vec![var("nope")]).unwrap_err(),
        EvalError::Evaluation(EvaluationError::UnresolvedName("nope".into()))
    );
}

#[test]
fn static_context_has_no_receiver() {
    let fixture = Fixture::new();
    let context = fixture.static_context();
    assert_eq!(
        eval_in(&context, vec![Instruction::PushThis]).unwrap_err(),
        EvalError::Evaluation(EvaluationError::NoReceiver)
    );
    // Instance fields are out of reach, statics are not.
    assert_eq!(
        eval_in(&context, vec![var("count")]).unwrap_err(),
        EvalError::Evaluation(EvaluationError::UnresolvedName("count".into()))
    );
    assert_eq!(eval_in(&context, vec![var("LIMIT")]).unwrap(), JdiValue::Int(10));
}

#[test]
fn assignments_write_through_to_the_debuggee() {
    let fixture = Fixture::new();

    // x = 5
    assert_eq!(
        fixture
            .eval(vec![int(5), Instruction::StoreVariable("x".into())])
            .unwrap(),
        JdiValue::Int(5)
    );
    assert_eq!(fixture.vm.local(THREAD, "x"), Some(JdiValue::Int(5)));

    // count = count + 1, read back in the same expression
    let value = fixture
        .eval(vec![
            var("count"),
            int(1),
            Instruction::Binary(nova_eval::BinaryOp::Add),
            Instruction::StoreVariable("count".into()),
            Instruction::Pop,
            var("count"),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Int(3));
    assert_eq!(fixture.vm.field_value(&fixture.this, "count"), Some(JdiValue::Int(3)));

    // p.y = 9
    fixture
        .eval(vec![var("p"), int(9), Instruction::StoreField("y".into())])
        .unwrap();
    assert_eq!(fixture.vm.field_value(&fixture.point, "y"), Some(JdiValue::Int(9)));

    // Main.LIMIT = 1
    fixture
        .eval(vec![
            int(1),
            Instruction::StoreStaticField {
                type_name: "Main".into(),
                name: "LIMIT".into(),
            },
        ])
        .unwrap();
    assert_eq!(
        fixture
            .eval(vec![Instruction::PushStaticField {
                type_name: "Main".into(),
                name: "LIMIT".into(),
            }])
            .unwrap(),
        JdiValue::Int(1)
    );
}

#[test]
fn field_access_on_null_is_a_null_pointer() {
    let fixture = Fixture::new();
    let err = fixture
        .eval(vec![Instruction::PushNull, Instruction::PushField("x".into())])
        .unwrap_err();
    assert!(
        matches!(err, EvalError::Evaluation(EvaluationError::NullPointer(_))),
        "{err:?}"
    );
}

#[test]
fn arrays_are_indexed_and_bounds_checked() {
    let fixture = Fixture::new();
    assert_eq!(
        fixture
            .eval(vec![var("arr"), int(1), Instruction::ArrayAccess])
            .unwrap(),
        JdiValue::Int(2)
    );
    assert_eq!(
        fixture
            .eval(vec![var("arr"), Instruction::ArrayLength])
            .unwrap(),
        JdiValue::Int(3)
    );
    assert_eq!(
        fixture
            .eval(vec![var("arr"), int(3), Instruction::ArrayAccess])
            .unwrap_err(),
        EvalError::Evaluation(EvaluationError::ArrayIndexOutOfBounds {
            index: 3,
            length: 3
        })
    );
    assert_eq!(
        fixture
            .eval(vec![var("arr"), int(-1), Instruction::ArrayAccess])
            .unwrap_err(),
        EvalError::Evaluation(EvaluationError::ArrayIndexOutOfBounds {
            index: -1,
            length: 3
        })
    );

    // arr[0] = 9
    fixture
        .eval(vec![var("arr"), int(0), int(9), Instruction::StoreArrayElement])
        .unwrap();
    assert_eq!(
        fixture
            .eval(vec![var("arr"), int(0), Instruction::ArrayAccess])
            .unwrap(),
        JdiValue::Int(9)
    );
}

#[test]
fn new_arrays_are_zeroed_and_sizes_checked() {
    let fixture = Fixture::new();
    let new_array = Instruction::NewArray {
        array_type: "int[]".into(),
    };
    let array = fixture.eval(vec![int(2), new_array.clone()]).unwrap();
    assert_eq!(array.type_name(), "int[]");

    let err = fixture.eval(vec![int(-1), new_array]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Evaluation(EvaluationError::NegativeArraySize(-1))
    );
}

#[test]
fn casts_convert_primitives_and_check_references() {
    let fixture = Fixture::new();
    assert_eq!(
        fixture
            .eval(vec![
                int(300),
                Instruction::Cast(TypeSpec::Primitive(PrimitiveKind::Byte)),
            ])
            .unwrap(),
        JdiValue::Byte(44)
    );
    assert_eq!(
        fixture
            .eval(vec![var("p"), Instruction::Cast(TypeSpec::parse("java.lang.Object"))])
            .unwrap(),
        JdiValue::Object(fixture.point.clone())
    );
    assert_eq!(
        fixture
            .eval(vec![var("p"), Instruction::Cast(TypeSpec::parse("java.lang.String"))])
            .unwrap_err(),
        EvalError::Evaluation(EvaluationError::ClassCast {
            from: "Point".into(),
            to: "java.lang.String".into(),
        })
    );
}

#[test]
fn instanceof_tests_the_runtime_type() {
    let fixture = Fixture::new();
    let check = |value: Instruction, ty: &str| {
        fixture
            .eval(vec![value, Instruction::InstanceOf(ty.into())])
            .unwrap()
    };
    assert_eq!(check(var("p"), "Point"), JdiValue::Boolean(true));
    assert_eq!(check(var("s"), "Point"), JdiValue::Boolean(false));
    assert_eq!(check(Instruction::PushNull, "Point"), JdiValue::Boolean(false));
}

#[test]
fn instanceof_pattern_binds_a_temporary() {
    // p instanceof Point q ? q.x : -1
    let fixture = Fixture::new();
    let value = fixture
        .eval(vec![
            var("p"),
            Instruction::InstanceOfPattern {
                type_name: "Point".into(),
                binding: "q".into(),
            },
            Instruction::JumpIfFalse(6),
            var("q"),
            Instruction::PushField("x".into()),
            Instruction::Jump(7),
            int(-1),
        ])
        .unwrap();
    assert_eq!(value, JdiValue::Int(7));
}
