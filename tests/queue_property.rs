// tests/queue_property.rs

use proptest::prelude::*;

use assetpipe::engine::{DispatchQueue, DispatchState};

#[derive(Debug, Clone, Copy)]
enum Op {
    /// A change routed to task `n`.
    Trigger(usize),
    /// The in-flight run of task `n` finished (ignored when none is).
    Finish(usize),
}

fn op_strategy(tasks: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..tasks).prop_map(Op::Trigger),
        (0..tasks).prop_map(Op::Finish),
    ]
}

proptest! {
    #[test]
    fn at_most_one_run_in_flight_and_bursts_coalesce(
        ops in proptest::collection::vec(op_strategy(3), 1..60)
    ) {
        let names = ["styles", "scripts", "markup-copy"];
        let mut queue = DispatchQueue::new();
        let mut in_flight = [false; 3];
        let mut runs = [0usize; 3];
        // Triggers seen since the current run started.
        let mut pending = [0usize; 3];

        for op in ops {
            match op {
                Op::Trigger(i) => {
                    if queue.request(names[i]) {
                        prop_assert!(!in_flight[i], "dispatched {} while running", names[i]);
                        in_flight[i] = true;
                        runs[i] += 1;
                    } else {
                        prop_assert!(in_flight[i]);
                        pending[i] += 1;
                    }
                }
                Op::Finish(i) if in_flight[i] => {
                    let rerun = queue.complete(names[i]);
                    // Any number of queued triggers turns into exactly one run.
                    prop_assert_eq!(rerun, pending[i] > 0);
                    pending[i] = 0;
                    if rerun {
                        runs[i] += 1;
                    } else {
                        in_flight[i] = false;
                    }
                }
                Op::Finish(_) => {}
            }
        }

        for (i, name) in names.iter().enumerate() {
            let expected = if in_flight[i] {
                DispatchState::Dispatching { rerun: pending[i] > 0 }
            } else {
                DispatchState::Idle
            };
            prop_assert_eq!(queue.state(name), expected);
        }
        prop_assert_eq!(queue.is_idle(), in_flight.iter().all(|f| !f));
    }
}
