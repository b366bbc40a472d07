//! Parallel Scheduler — a topological executor over a [`Plan`].
//!
//! Honours plan edges, a concurrency cap, "disabled" (already up-to-date)
//! short-circuiting, and fail-fast with a clean drain of in-flight work.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{ForgeError, Result};
use crate::plan::Plan;
use crate::process;

struct Shared {
    ready: Mutex<VecDeque<usize>>,
    ready_cv: Condvar,
    in_degree: Vec<AtomicUsize>,
    remaining: AtomicUsize,
    stop: AtomicBool,
    failure: Mutex<Option<(String, i32)>>,
}

/// Execute `plan` with at most `max_parallel` commands running concurrently.
/// `max_parallel` of 0 is treated as hardware concurrency (minimum 1).
pub fn execute(plan: &Plan, max_parallel: usize) -> Result<()> {
    let max_parallel = if max_parallel == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        max_parallel.max(1)
    };

    let n = plan.len();
    let in_degree: Vec<AtomicUsize> = (0..n)
        .map(|i| {
            let node = plan.node(i).unwrap();
            AtomicUsize::new(if node.enabled { plan.in_degree(i) } else { 0 })
        })
        .collect();

    let shared = Arc::new(Shared {
        ready: Mutex::new(VecDeque::new()),
        ready_cv: Condvar::new(),
        in_degree,
        remaining: AtomicUsize::new(plan.nodes().iter().filter(|n| n.enabled).count()),
        stop: AtomicBool::new(false),
        failure: Mutex::new(None),
    });

    // Seed: a single forward pass over ids works because every edge src->dst
    // satisfies src < dst (post-order numbering), so by the time we reach a
    // node all its predecessors' seed-time decrements have landed. `pushed`
    // guards against double-seeding a node that reaches zero in-degree via a
    // disabled predecessor and also has zero original in-degree on its own.
    {
        let mut pushed = vec![false; n];
        let mut ready = shared.ready.lock().unwrap();
        for i in 0..n {
            let node = plan.node(i).unwrap();
            if node.enabled {
                if !pushed[i] && shared.in_degree[i].load(Ordering::Acquire) == 0 {
                    pushed[i] = true;
                    ready.push_back(i);
                }
            } else {
                for &succ in plan.out_edges(i) {
                    let prev = shared.in_degree[succ].fetch_sub(1, Ordering::AcqRel);
                    if prev == 1 && plan.node(succ).unwrap().enabled && !pushed[succ] {
                        pushed[succ] = true;
                        ready.push_back(succ);
                    }
                }
            }
        }
    }
    shared.ready_cv.notify_all();

    let start = Instant::now();
    let n_workers = max_parallel.min(n.max(1));
    std::thread::scope(|scope| {
        for _ in 0..n_workers {
            let shared = &shared;
            scope.spawn(move || worker_loop(shared, plan));
        }
    });
    info!("Compilation finished in: {:?}", start.elapsed());

    let failure = shared.failure.lock().unwrap().clone();
    match failure {
        Some((command, exit_code)) => Err(ForgeError::CommandFailed { command, exit_code }),
        None => Ok(()),
    }
}

fn worker_loop(shared: &Shared, plan: &Plan) {
    loop {
        if shared.stop.load(Ordering::Acquire) {
            return;
        }

        let id = {
            let mut ready = shared.ready.lock().unwrap();
            loop {
                if let Some(id) = ready.pop_front() {
                    break Some(id);
                }
                if shared.remaining.load(Ordering::Acquire) == 0 || shared.stop.load(Ordering::Acquire) {
                    break None;
                }
                ready = shared.ready_cv.wait(ready).unwrap();
            }
        };

        let Some(id) = id else { return };

        let node = plan.node(id).unwrap();
        info!("Running: {}", node.command_line());
        let result = process::run(&node.command, &node.args);

        let exit_code = match result {
            Ok(r) => {
                if !r.stdout.is_empty() {
                    print!("{}", r.stdout);
                }
                if !r.stderr.is_empty() {
                    eprint!("{}", r.stderr);
                }
                r.exit_code
            }
            Err(e) => {
                warn!("command errored before it could run: {e}");
                -1
            }
        };

        if exit_code != 0 {
            let mut failure = shared.failure.lock().unwrap();
            if failure.is_none() {
                *failure = Some((node.command_line(), exit_code));
            }
            shared.stop.store(true, Ordering::Release);
            shared.ready_cv.notify_all();
            return;
        }

        {
            let mut ready = shared.ready.lock().unwrap();
            for &succ in plan.out_edges(id) {
                let prev = shared.in_degree[succ].fetch_sub(1, Ordering::AcqRel);
                if prev == 1 && plan.node(succ).unwrap().enabled {
                    ready.push_back(succ);
                }
            }
        }

        let prev_remaining = shared.remaining.fetch_sub(1, Ordering::AcqRel);
        shared.ready_cv.notify_all();
        if prev_remaining == 1 {
            return;
        }
    }
}
