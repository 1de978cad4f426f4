//! Job Scheduler
//!
//! Component re-renders do not run synchronously on every write. A render
//! effect's scheduler queues a job here, and the queue is flushed in one
//! batch on the next microtask.
//!
//! # Algorithm
//!
//! 1. [`queue_job`] inserts the job keyed by its owner's identity. A job
//!    that is already queued is not queued again, so N writes in one tick
//!    cause at most one re-render per component.
//!
//! 2. The first job queued in a tick also queues a flush microtask.
//!
//! 3. The flush takes the whole queue and runs each job in insertion
//!    order. A job queued while flushing lands in a fresh queue with its own
//!    flush microtask, so it runs on the next tick rather than this one.
//!
//! # Microtasks
//!
//! There is no event loop here. The host calls [`run_microtasks`] after
//! each synchronous task (an event handler, a mount), which drains the
//! microtask queue until it is empty.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::SubscriberId;

/// A queued unit of work.
pub type Job = Rc<dyn Fn()>;

type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<IndexMap<SubscriberId, Job>> = RefCell::new(IndexMap::new());
    static FLUSH_PENDING: Cell<bool> = const { Cell::new(false) };
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Queue `job` under `id` unless a job with that id is already queued.
pub fn queue_job(id: SubscriberId, job: Job) {
    let inserted = QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if queue.contains_key(&id) {
            false
        } else {
            queue.insert(id, job);
            true
        }
    });

    if inserted {
        tracing::trace!(job = id.raw(), "job queued");
        queue_flush();
    }
}

/// Drop a queued job that has not run yet.
pub fn invalidate_job(id: SubscriberId) {
    QUEUE.with(|queue| {
        queue.borrow_mut().shift_remove(&id);
    });
}

/// Run `callback` after the jobs queued so far have been flushed.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    MICROTASKS.with(|tasks| tasks.borrow_mut().push_back(Box::new(callback)));
}

/// Whether a job is waiting for a flush.
pub fn has_pending_jobs() -> bool {
    QUEUE.with(|queue| !queue.borrow().is_empty())
}

/// Drain the microtask queue, including microtasks queued while draining.
///
/// Returns the number of microtasks run.
pub fn run_microtasks() -> usize {
    let mut ran = 0;

    loop {
        let task = MICROTASKS.with(|tasks| tasks.borrow_mut().pop_front());
        match task {
            Some(task) => {
                task();
                ran += 1;
            }
            None => break,
        }
    }

    ran
}

fn queue_flush() {
    if FLUSH_PENDING.with(|pending| pending.replace(true)) {
        return;
    }
    next_tick(flush_jobs);
}

fn flush_jobs() {
    FLUSH_PENDING.with(|pending| pending.set(false));

    let jobs = QUEUE.with(|queue| std::mem::take(&mut *queue.borrow_mut()));
    tracing::debug!(jobs = jobs.len(), "flushing job queue");

    for job in jobs.into_values() {
        job();
    }
}
