use nova_eval::{Correlation, ExpectationKind, MethodResultCorrelator, ResultKind};
use nova_jdi::{JdiValue, MethodRef, ObjectRef, SuspendEvent};

fn fib() -> MethodRef {
    MethodRef::new("Math", "fib", "(I)I")
}

#[test]
fn recursive_frames_do_not_steal_a_step_result() {
    // Step-over of `fib(3)` issued at depth 4: the recursive calls exit at
    // deeper frames first.
    let correlator = MethodResultCorrelator::new();
    let token = correlator.expect(1, fib(), 4, ExpectationKind::Step);

    for depth in [6, 5, 5] {
        let event = SuspendEvent::method_exit(1, depth, fib(), JdiValue::Int(1));
        assert_eq!(correlator.dispatch(&event), Correlation::Unmatched);
    }
    assert!(correlator.is_pending(token));

    let event = SuspendEvent::method_exit(1, 4, fib(), JdiValue::Int(2));
    assert!(matches!(
        correlator.dispatch(&event),
        Correlation::Captured { token: got, .. } if got == token
    ));
    let result = correlator.take(token).unwrap();
    assert_eq!(result.kind, ResultKind::Returned);
    assert_eq!(result.value, JdiValue::Int(2));
    assert_eq!(result.method, fib());
}

#[test]
fn concurrent_threads_are_kept_apart() {
    let correlator = MethodResultCorrelator::new();
    let first = correlator.expect(1, fib(), 3, ExpectationKind::Step);
    let second = correlator.expect(2, fib(), 3, ExpectationKind::Step);

    let thrown = ObjectRef {
        id: 99,
        runtime_type: "java.lang.StackOverflowError".into(),
    };
    correlator.dispatch(&SuspendEvent::exception(2, 3, fib(), thrown.clone(), false));

    assert!(correlator.is_pending(first));
    let result = correlator.take(second).unwrap();
    assert_eq!(result.kind, ResultKind::Threw);
    assert_eq!(result.value, JdiValue::Object(thrown));
}

#[test]
fn manual_resume_clears_the_thread() {
    let correlator = MethodResultCorrelator::new();
    let token = correlator.expect(7, fib(), 2, ExpectationKind::Step);
    correlator.dispatch(&SuspendEvent::method_exit(7, 2, fib(), JdiValue::Int(1)));

    assert_eq!(correlator.abandon_thread(7), 1);
    assert_eq!(correlator.take(token), None);
}
