use std::sync::{Arc, Barrier};

use nova_eval::{
    Correlation, EvalConfig, EvalError, EvalKind, EvalOptions, EvaluationError, Evaluator,
    Instruction, MethodResultCorrelator, ResultKind, RuntimeContext,
};
use nova_jdi::{
    JdiError, JdiValue, MethodBehavior, MethodRef, MockClass, MockFrame, SuspendEvent,
};
use parking_lot::Mutex;

use crate::harness::{int, invoke, sequence, var, Fixture, THREAD};

/// Hook that parks inside the remote call until the test lets it go.
struct Gate {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Arc::new(Barrier::new(2)),
            release: Arc::new(Barrier::new(2)),
        }
    }

    fn behavior(&self, result: JdiValue) -> MethodBehavior {
        let (entered, release) = (self.entered.clone(), self.release.clone());
        MethodBehavior::hook(move |_| {
            entered.wait();
            release.wait();
            Ok(result.clone())
        })
    }

    async fn wait_entered(&self) {
        let entered = self.entered.clone();
        tokio::task::spawn_blocking(move || entered.wait())
            .await
            .unwrap();
    }

    async fn release(&self) {
        let release = self.release.clone();
        tokio::task::spawn_blocking(move || release.wait())
            .await
            .unwrap();
    }
}

fn context(fixture: &Fixture) -> Arc<dyn RuntimeContext> {
    Arc::new(fixture.context())
}

#[tokio::test]
async fn evaluation_runs_in_the_background() {
    let fixture = Fixture::new();
    let evaluator = Evaluator::default();
    let session = evaluator
        .evaluate(
            sequence(vec![var("x"), int(4), Instruction::Binary(nova_eval::BinaryOp::Mul)]),
            context(&fixture),
            EvalOptions::default(),
        )
        .unwrap();
    assert_eq!(session.thread(), THREAD);
    assert_eq!(session.join().await, Ok(JdiValue::Int(12)));
    assert!(!evaluator.is_busy(THREAD));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_session_per_thread() {
    let gate = Gate::new();
    let fixture = Fixture::with_main(|main| main.method("slow", "()I", gate.behavior(JdiValue::Int(1))));
    fixture
        .vm
        .add_thread(2, vec![MockFrame::new(MethodRef::new("Main", "other", "()V"))]);
    let evaluator = Evaluator::default();
    let slow = vec![Instruction::PushThis, invoke("slow", "()I", 0)];

    let first = evaluator
        .evaluate(sequence(slow.clone()), context(&fixture), EvalOptions::default())
        .unwrap();
    gate.wait_entered().await;

    let err = evaluator
        .evaluate(sequence(vec![int(1)]), context(&fixture), EvalOptions::default())
        .err();
    assert_eq!(err, Some(EvalError::ThreadBusy(THREAD)));
    // Clones share the lease table.
    assert!(evaluator.clone().is_busy(THREAD));

    // Another debuggee thread is unaffected.
    let other_context: Arc<dyn RuntimeContext> = Arc::new(nova_eval::StackFrameContext::new(
        fixture.vm.clone(),
        2,
        fixture.main.clone(),
    ));
    let other = evaluator
        .evaluate(sequence(vec![int(5)]), other_context, EvalOptions::default())
        .unwrap();
    assert_eq!(other.join().await, Ok(JdiValue::Int(5)));

    gate.release().await;
    assert_eq!(first.join().await, Ok(JdiValue::Int(1)));
    assert!(!evaluator.is_busy(THREAD));

    let again = evaluator
        .evaluate(sequence(vec![int(2)]), context(&fixture), EvalOptions::default())
        .unwrap();
    assert_eq!(again.join().await, Ok(JdiValue::Int(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_lets_the_current_call_finish_and_stops_before_the_next() {
    let gate = Gate::new();
    let fixture = Fixture::with_main(|main| {
        main.method("first", "()I", gate.behavior(JdiValue::Int(1)))
            .method("second", "()I", MethodBehavior::Return(JdiValue::Int(2)))
    });
    let session = Evaluator::default()
        .evaluate(
            sequence(vec![
                Instruction::PushThis,
                invoke("first", "()I", 0),
                Instruction::Pop,
                Instruction::PushThis,
                invoke("second", "()I", 0),
            ]),
            context(&fixture),
            EvalOptions::default(),
        )
        .unwrap();

    gate.wait_entered().await;
    session.cancel();
    assert!(session.token().is_cancelled());
    gate.release().await;

    assert_eq!(session.join().await, Err(EvalError::Cancelled));
    assert_eq!(fixture.vm.calls(), vec!["invoke Main.first()I []".to_string()]);
}

#[test]
fn disconnect_during_a_call_is_a_communication_failure() {
    let vm_slot = Arc::new(Mutex::new(None::<std::sync::Weak<nova_jdi::MockVm>>));
    let slot = vm_slot.clone();
    let fixture = Fixture::with_main(|main| {
        main.method(
            "shutdown",
            "()V",
            MethodBehavior::hook(move |_| {
                if let Some(vm) = slot.lock().as_ref().and_then(std::sync::Weak::upgrade) {
                    vm.disconnect();
                }
                Ok(JdiValue::Void)
            }),
        )
    });
    *vm_slot.lock() = Some(Arc::downgrade(&fixture.vm));

    let err = fixture
        .eval(vec![
            Instruction::PushThis,
            invoke("shutdown", "()V", 0),
            Instruction::Pop,
            var("x"),
        ])
        .unwrap_err();
    assert_eq!(err, EvalError::Communication(JdiError::VmDisconnected));
    assert!(err.is_communication_failure());
    assert!(err.to_string().contains("re-evaluate"));
}

#[test]
fn resumed_thread_fails_the_evaluation() {
    let fixture = Fixture::new();
    fixture.vm.resume_thread(THREAD);
    let err = fixture.eval(vec![var("x")]).unwrap_err();
    assert_eq!(err, EvalError::Communication(JdiError::ThreadNotSuspended(THREAD)));
}

#[test]
fn invocation_needs_a_thread_suspended_by_an_event() {
    let fixture = Fixture::new();
    fixture.vm.suspend_thread(THREAD, false);

    // Reads are fine on a paused thread.
    assert_eq!(fixture.eval(vec![var("x")]).unwrap(), JdiValue::Int(3));

    let err = fixture
        .eval(vec![Instruction::PushThis, invoke("reset", "()V", 0)])
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::Evaluation(EvaluationError::IncompatibleThread(THREAD))
    );
}

#[test]
fn watch_expressions_may_not_have_side_effects() {
    let fixture = Fixture::new();
    let evaluator = Evaluator::default();
    let watch = EvalOptions::for_kind(EvalKind::Watch);

    let err = evaluator
        .evaluate_blocking(
            &sequence(vec![Instruction::PushThis, invoke("reset", "()V", 0)]),
            &fixture.context(),
            watch,
        )
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::Evaluation(EvaluationError::SideEffectsNotAllowed)
    );
    assert!(fixture.vm.calls().is_empty());

    let value = evaluator
        .evaluate_blocking(&sequence(vec![var("count")]), &fixture.context(), watch)
        .unwrap();
    assert_eq!(value, JdiValue::Int(2));
}

#[test]
fn expired_deadline_times_out() {
    let fixture = Fixture::new();
    let evaluator = Evaluator::new(EvalConfig {
        timeout_ms: Some(0),
        ..EvalConfig::default()
    });
    let err = evaluator
        .evaluate_blocking(&sequence(vec![int(1)]), &fixture.context(), EvalOptions::default())
        .unwrap_err();
    assert_eq!(err, EvalError::TimedOut);
}

#[test]
fn operand_stack_limit_comes_from_the_config() {
    let fixture = Fixture::new();
    let evaluator = Evaluator::new(EvalConfig {
        max_operand_stack: 1,
        ..EvalConfig::default()
    });
    let err = evaluator
        .evaluate_blocking(
            &sequence(vec![int(1), int(2), Instruction::Binary(nova_eval::BinaryOp::Add)]),
            &fixture.context(),
            EvalOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EvalError::Malformed(_)), "{err:?}");
}

#[test]
fn breakpoint_results_inside_invoked_methods_are_correlated() {
    let correlator = Arc::new(MethodResultCorrelator::new());
    let observed = Arc::new(Mutex::new(None));

    let (hook_correlator, hook_observed) = (correlator.clone(), observed.clone());
    let fixture = Fixture::with_main(|main| {
        main.method(
            "compute",
            "()I",
            MethodBehavior::hook(move |_| {
                // The debuggee stops at a method-exit breakpoint one frame
                // above the evaluation frame.
                let event = SuspendEvent::method_exit(
                    THREAD,
                    2,
                    MethodRef::new("Main", "compute", "()I"),
                    JdiValue::Int(42),
                );
                *hook_observed.lock() = Some(hook_correlator.dispatch(&event));
                Ok(JdiValue::Int(42))
            }),
        )
    });

    let evaluator = Evaluator::default().with_correlator(correlator.clone());
    let value = evaluator
        .evaluate_blocking(
            &sequence(vec![Instruction::PushThis, invoke("compute", "()I", 0)]),
            &fixture.context(),
            EvalOptions::default(),
        )
        .unwrap();
    assert_eq!(value, JdiValue::Int(42));

    let Some(Correlation::Captured { token, result }) = observed.lock().clone() else {
        panic!("method exit was not correlated");
    };
    assert_eq!(result.kind, ResultKind::Returning);
    assert_eq!(result.value, JdiValue::Int(42));
    assert_eq!(result.target_depth, 2);
    // The expectation ends with the invocation.
    assert_eq!(correlator.take(token), None);
}

#[test]
fn exits_of_inherited_methods_are_correlated_by_declaring_type() {
    let correlator = Arc::new(MethodResultCorrelator::new());
    let observed = Arc::new(Mutex::new(None));

    let fixture = Fixture::with_main(|main| main.extends("Base"));
    let (hook_correlator, hook_observed) = (correlator.clone(), observed.clone());
    fixture.vm.add_class(MockClass::new("Base").method(
        "size",
        "()I",
        MethodBehavior::hook(move |_| {
            let event = SuspendEvent::method_exit(
                THREAD,
                2,
                MethodRef::new("Base", "size", "()I"),
                JdiValue::Int(3),
            );
            *hook_observed.lock() = Some(hook_correlator.dispatch(&event));
            Ok(JdiValue::Int(3))
        }),
    ));

    let evaluator = Evaluator::default().with_correlator(correlator);
    let value = evaluator
        .evaluate_blocking(
            &sequence(vec![Instruction::PushThis, invoke("size", "()I", 0)]),
            &fixture.context(),
            EvalOptions::default(),
        )
        .unwrap();
    assert_eq!(value, JdiValue::Int(3));

    let Some(Correlation::Captured { result, .. }) = observed.lock().clone() else {
        panic!("exit of an inherited method was not correlated");
    };
    assert_eq!(result.kind, ResultKind::Returning);
    assert_eq!(result.method, MethodRef::new("Base", "size", "()I"));
    assert_eq!(result.value, JdiValue::Int(3));
}
