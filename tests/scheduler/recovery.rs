//! Recovery tests

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use autarch_foundation::{Error, ErrorKind, Result};
use autarch_scheduler::{
    ActionActor, ActionList, ActionSequence, Recovering, TaskOutcome, Tick,
};

#[derive(Clone, Debug)]
enum Act {
    Ok(&'static str),
    Throws(&'static str),
}

fn drive(actor: &mut ActionActor<Act>, log: &Rc<RefCell<Vec<String>>>) {
    for number in 0..20 {
        let log = Rc::clone(log);
        let mut sink = move |step: &Act| -> Result<()> {
            match step {
                Act::Ok(name) => {
                    log.borrow_mut().push((*name).to_string());
                    Ok(())
                }
                Act::Throws(name) => {
                    log.borrow_mut().push(format!("{name}(fails)"));
                    Err(Error::action_failed(*name))
                }
            }
        };
        actor.tick(&Tick::every(number, Duration::from_millis(100)), &mut sink);
        if actor.is_idle() {
            return;
        }
    }
}

fn abort() -> impl FnMut(&Error) -> Result<Box<dyn ActionSequence<Act>>> {
    |_| Ok(Box::new(ActionList::new([Act::Ok("R")])) as Box<dyn ActionSequence<Act>>)
}

#[test]
fn failure_switches_to_the_recovery_sequence() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut actor = ActionActor::new(Duration::ZERO);
    let sequence = Recovering::new(
        ActionList::new([Act::Ok("A"), Act::Throws("B"), Act::Ok("C")]),
        abort(),
    );
    let pending = actor.enqueue(sequence);

    drive(&mut actor, &log);

    assert_eq!(*log.borrow(), vec!["A", "B(fails)", "R"]);
    match pending.outcome() {
        Some(TaskOutcome::Completed(summary)) => {
            assert_eq!(summary.executed, 3);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.recoveries, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn failure_inside_recovery_faults() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut actor = ActionActor::new(Duration::ZERO);
    let sequence = Recovering::new(ActionList::new([Act::Throws("B")]), |_: &Error| {
        Ok(Box::new(ActionList::new([Act::Throws("R")])) as Box<dyn ActionSequence<Act>>)
    });
    let pending = actor.enqueue(sequence);

    drive(&mut actor, &log);

    assert_eq!(*log.borrow(), vec!["B(fails)", "R(fails)"]);
    match pending.outcome() {
        Some(TaskOutcome::Faulted(error)) => {
            assert!(matches!(error.kind, ErrorKind::RecoveryFailed(_)), "{error}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn failing_handler_faults_without_retrying() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let mut actor = ActionActor::new(Duration::ZERO);
    let sequence = Recovering::new(
        ActionList::new([Act::Throws("B"), Act::Ok("C")]),
        move |_: &Error| -> Result<Box<dyn ActionSequence<Act>>> {
            *counter.borrow_mut() += 1;
            Err(Error::configuration("no abort path"))
        },
    );
    let pending = actor.enqueue(sequence);

    drive(&mut actor, &log);

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(log.borrow().iter().map(String::as_str).collect::<Vec<_>>(), vec!["B(fails)"]);
    let Some(TaskOutcome::Faulted(error)) = pending.outcome() else {
        panic!("expected a fault");
    };
    assert!(error.to_string().contains("recovery handler failed"), "{error}");
}
