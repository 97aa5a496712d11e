//! Page: a DOM tree plus its event loop

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use domwatch_dom::{DomTree, MutationRecord, NodeId, ObserveOptions, ObserverId};

use crate::error::{RuntimeError, RuntimeResult};
use crate::scheduler::{Scheduler, TimerId};

type ObserverCallback = Rc<RefCell<Box<dyn FnMut(&Page, Vec<MutationRecord>)>>>;

struct PageInner {
    dom: RefCell<DomTree>,
    scheduler: RefCell<Scheduler>,
    callbacks: RefCell<FxHashMap<ObserverId, ObserverCallback>>,
    running: Cell<bool>,
}

/// Shared handle to a document and its event loop.
///
/// Cloning is cheap and yields another handle to the same page. No
/// internal borrow is held while callbacks run, so callbacks may mutate
/// the DOM, schedule timers or disconnect observers.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

/// Non-owning page handle, for state reachable from the page's own callbacks
#[derive(Clone)]
pub struct WeakPage {
    inner: Weak<PageInner>,
}

impl WeakPage {
    pub fn upgrade(&self) -> Option<Page> {
        self.inner.upgrade().map(|inner| Page { inner })
    }
}

/// Resets the re-entrancy flag when a drive call ends
struct RunGuard<'a>(&'a Cell<bool>);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Page {
    /// Create a page around an existing tree
    pub fn new(tree: DomTree) -> Self {
        Self {
            inner: Rc::new(PageInner {
                dom: RefCell::new(tree),
                scheduler: RefCell::new(Scheduler::default()),
                callbacks: RefCell::new(FxHashMap::default()),
                running: Cell::new(false),
            }),
        }
    }

    /// Limit the number of tasks a single drive call may run
    pub fn with_step_limit(self, limit: usize) -> Self {
        self.inner.scheduler.borrow_mut().step_limit = limit;
        self
    }

    pub fn downgrade(&self) -> WeakPage {
        WeakPage {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Borrow the DOM tree
    pub fn dom(&self) -> Ref<'_, DomTree> {
        self.inner.dom.borrow()
    }

    /// Mutably borrow the DOM tree; mutations are recorded for observers
    pub fn dom_mut(&self) -> RefMut<'_, DomTree> {
        self.inner.dom.borrow_mut()
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.inner.scheduler.borrow().now_ms
    }

    // ---- Mutation observers ----

    /// Register a callback for mutations matching `options` under `target`.
    ///
    /// Records are delivered in batches at the next microtask checkpoint.
    pub fn observe<F>(&self, target: NodeId, options: ObserveOptions, callback: F) -> RuntimeResult<ObserverId>
    where
        F: FnMut(&Page, Vec<MutationRecord>) + 'static,
    {
        let id = {
            let mut dom = self.inner.dom.borrow_mut();
            let id = dom.create_observer();
            if let Err(e) = dom.observe(id, target, options) {
                dom.remove_observer(id);
                return Err(e.into());
            }
            id
        };

        self.inner
            .callbacks
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(Box::new(callback))));
        Ok(id)
    }

    /// Stop an observer and discard its undelivered records.
    ///
    /// Returns whether the observer was still registered.
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        let removed_callback = self.inner.callbacks.borrow_mut().remove(&observer).is_some();
        let removed_registration = self.inner.dom.borrow_mut().remove_observer(observer);
        if removed_callback || removed_registration {
            log::debug!("{} disconnected", observer);
        }
        removed_callback || removed_registration
    }

    /// Take an observer's undelivered records (`takeRecords()`)
    pub fn take_records(&self, observer: ObserverId) -> RuntimeResult<Vec<MutationRecord>> {
        Ok(self.inner.dom.borrow_mut().take_records(observer)?)
    }

    // ---- Timers and microtasks ----

    /// Run `task` once `delay_ms` of virtual time has passed
    pub fn set_timeout<F>(&self, delay_ms: u64, task: F) -> TimerId
    where
        F: FnOnce(&Page) + 'static,
    {
        self.inner
            .scheduler
            .borrow_mut()
            .schedule_timeout(delay_ms, Box::new(task))
    }

    /// Cancel a timer; returns whether it was still pending
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.scheduler.borrow_mut().clear_timeout(id)
    }

    /// Run `task` at the next microtask checkpoint
    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce(&Page) + 'static,
    {
        self.inner.scheduler.borrow_mut().queue_microtask(Box::new(task));
    }

    /// Number of timers not yet run
    pub fn pending_timers(&self) -> usize {
        self.inner.scheduler.borrow().pending_timers()
    }

    // ---- Driving the loop ----

    fn enter(&self) -> RuntimeResult<RunGuard<'_>> {
        if self.inner.running.replace(true) {
            return Err(RuntimeError::Reentrant);
        }
        Ok(RunGuard(&self.inner.running))
    }

    fn step_limit_error(&self) -> RuntimeError {
        let scheduler = self.inner.scheduler.borrow();
        RuntimeError::StepLimit {
            limit: scheduler.step_limit,
            now_ms: scheduler.now_ms,
            pending_timers: scheduler.pending_timers(),
        }
    }

    /// Run queued microtasks and deliver pending mutation records until
    /// both queues are empty. Returns the number of callbacks run.
    pub fn run_microtasks(&self) -> RuntimeResult<usize> {
        let _guard = self.enter()?;
        self.checkpoint()
    }

    fn checkpoint(&self) -> RuntimeResult<usize> {
        let limit = self.inner.scheduler.borrow().step_limit;
        let mut steps = 0usize;

        loop {
            let microtask = self.inner.scheduler.borrow_mut().pop_microtask();
            if let Some(task) = microtask {
                steps += 1;
                if steps > limit {
                    return Err(self.step_limit_error());
                }
                task(self);
                continue;
            }

            let pending = self.inner.dom.borrow_mut().take_pending_records();
            if pending.is_empty() {
                break;
            }

            for (id, records) in pending {
                // An earlier callback in this round may have disconnected it
                let callback = self.inner.callbacks.borrow().get(&id).cloned();
                let Some(callback) = callback else {
                    log::trace!("Dropping {} records for disconnected {}", records.len(), id);
                    continue;
                };

                steps += 1;
                if steps > limit {
                    return Err(self.step_limit_error());
                }
                log::trace!("Delivering {} records to {}", records.len(), id);
                let mut f = callback.borrow_mut();
                (&mut *f)(self, records);
            }
        }

        Ok(steps)
    }

    fn run_timers(&self, due_limit: Option<u64>, max_tasks: Option<usize>) -> RuntimeResult<usize> {
        let limit = self.inner.scheduler.borrow().step_limit;
        let mut ran = 0usize;

        self.checkpoint()?;

        while max_tasks.map(|max| ran < max).unwrap_or(true) {
            let next = self.inner.scheduler.borrow_mut().pop_next_task(due_limit);
            let Some(task) = next else {
                break;
            };

            ran += 1;
            if ran > limit {
                return Err(self.step_limit_error());
            }

            {
                let mut scheduler = self.inner.scheduler.borrow_mut();
                scheduler.now_ms = scheduler.now_ms.max(task.due_at);
            }
            log::trace!("[timer] run id={} due_at={}", task.id.0, task.due_at);
            (task.task)(self);
            self.checkpoint()?;
        }

        Ok(ran)
    }

    /// Run timers that are due at the current time
    pub fn run_due_timers(&self) -> RuntimeResult<usize> {
        let _guard = self.enter()?;
        let now = self.now_ms();
        self.run_timers(Some(now), None)
    }

    /// Move the clock forward by `delta_ms`, running timers that come due
    pub fn advance_time(&self, delta_ms: u64) -> RuntimeResult<()> {
        let target = self.now_ms().saturating_add(delta_ms);
        self.advance_time_to(target)
    }

    /// Move the clock to `target_ms`, running timers that come due
    pub fn advance_time_to(&self, target_ms: u64) -> RuntimeResult<()> {
        let _guard = self.enter()?;
        let from = self.now_ms();
        if target_ms < from {
            return Err(RuntimeError::TimeTravel { target: target_ms, now_ms: from });
        }

        let ran = self.run_timers(Some(target_ms), None)?;
        self.inner.scheduler.borrow_mut().now_ms = target_ms;
        log::trace!("[timer] advance from={} to={} ran_due={}", from, target_ms, ran);
        Ok(())
    }

    /// Run the next timer regardless of its due time, advancing the clock
    pub fn run_next_timer(&self) -> RuntimeResult<bool> {
        let _guard = self.enter()?;
        Ok(self.run_timers(None, Some(1))? == 1)
    }

    /// Run every timer, advancing the clock, until none remain
    pub fn flush(&self) -> RuntimeResult<usize> {
        let _guard = self.enter()?;
        self.run_timers(None, None)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DomTree::new())
    }
}
