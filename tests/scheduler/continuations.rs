//! Continuation queue tests

use std::thread;

use autarch_scheduler::ContinuationQueue;

#[test]
fn each_sender_keeps_its_own_order() {
    let queue: ContinuationQueue<Vec<(u32, u32)>> = ContinuationQueue::new();
    let workers: Vec<_> = (0..3)
        .map(|worker| {
            let sender = queue.sender();
            thread::spawn(move || {
                for n in 0..10 {
                    sender
                        .send(move |state: &mut Vec<(u32, u32)>| state.push((worker, n)))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut state = Vec::new();
    assert_eq!(queue.drain(&mut state), 30);
    for worker in 0..3 {
        let seen: Vec<u32> = state
            .iter()
            .filter(|(w, _)| *w == worker)
            .map(|(_, n)| *n)
            .collect();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}

#[test]
fn continuation_sent_while_draining_waits_for_next_drain() {
    struct State {
        queue: ContinuationQueue<State>,
        log: Vec<&'static str>,
    }

    let queue = ContinuationQueue::new();
    let mut state = State {
        queue: queue.clone(),
        log: Vec::new(),
    };
    queue
        .sender()
        .send(|s: &mut State| {
            s.log.push("first");
            s.queue.sender().send(|s: &mut State| s.log.push("second")).unwrap();
        })
        .unwrap();

    assert_eq!(queue.drain(&mut state), 1);
    assert_eq!(state.log, vec!["first"]);
    assert_eq!(queue.drain(&mut state), 1);
    assert_eq!(state.log, vec!["first", "second"]);
}

#[test]
fn nothing_runs_before_drain() {
    let queue: ContinuationQueue<u32> = ContinuationQueue::new();
    queue.sender().send(|state: &mut u32| *state += 1).unwrap();

    let mut state = 0;
    queue.drain(&mut state);
    assert_eq!(state, 1);
}
