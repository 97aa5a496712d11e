//! Content change observation
//!
//! Collects mutation records for an element's content and hands them to
//! the caller in batches, either as soon as they are delivered or after a
//! quiet period (trailing-edge debounce).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use domwatch_dom::{DomError, MutationRecord, NodeId, ObserverId};
use domwatch_runtime::{Page, TimerId, WeakPage};

use crate::config::ContentWatchConfig;
use crate::error::{WatchError, WatchResult};
use crate::handle::{WatchHandle, Watcher};
use crate::summary::ChangeSummary;

/// One delivered batch of changes
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeBatch {
    /// The watched element
    pub element: NodeId,
    /// Records in the order they were observed
    pub mutations: Vec<MutationRecord>,
    pub summary: ChangeSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Watching,
    /// `once` watcher after its first batch
    Finished,
    Disposed,
}

type Callback = Box<dyn FnMut(ChangeBatch)>;

struct ContentWatcher {
    page: WeakPage,
    element: NodeId,
    debounce_ms: u64,
    once: bool,
    phase: Cell<Phase>,
    observer: Cell<Option<ObserverId>>,
    timer: Cell<Option<TimerId>>,
    pending: RefCell<Vec<MutationRecord>>,
    callback: RefCell<Option<Callback>>,
}

/// Call `callback` with batches of changes under `element`.
///
/// What counts as a change, the debounce delay and one-shot behaviour
/// come from `config`. Fails if `element` is unknown, is not an element,
/// or if `config` enables no kind of change.
pub fn watch_for_content_change<F>(
    page: &Page,
    element: NodeId,
    callback: F,
    config: ContentWatchConfig,
) -> WatchResult<WatchHandle>
where
    F: FnMut(ChangeBatch) + 'static,
{
    {
        let dom = page.dom();
        let node = dom.get(element).ok_or(DomError::NodeNotFound(element.0))?;
        if !node.is_element() {
            return Err(WatchError::NotAnElement(element));
        }
    }

    let watcher = Rc::new(ContentWatcher {
        page: page.downgrade(),
        element,
        debounce_ms: config.debounce_ms,
        once: config.once,
        phase: Cell::new(Phase::Watching),
        observer: Cell::new(None),
        timer: Cell::new(None),
        pending: RefCell::new(Vec::new()),
        callback: RefCell::new(Some(Box::new(callback))),
    });

    let target = watcher.clone();
    let observer = page.observe(element, config.observe_options(), move |page, records| {
        target.on_records(page, records);
    })?;
    watcher.observer.set(Some(observer));
    log::debug!(
        "Watching {} for content changes (debounce={}ms, once={})",
        element,
        config.debounce_ms,
        config.once
    );

    Ok(WatchHandle::new(watcher))
}

impl ContentWatcher {
    fn on_records(self: &Rc<Self>, page: &Page, records: Vec<MutationRecord>) {
        if self.phase.get() != Phase::Watching {
            return;
        }
        self.pending.borrow_mut().extend(records);

        if self.debounce_ms == 0 {
            self.flush(page);
            return;
        }

        if let Some(timer) = self.timer.take() {
            page.clear_timeout(timer);
        }
        let this = self.clone();
        let timer = page.set_timeout(self.debounce_ms, move |page| {
            this.timer.set(None);
            this.flush(page);
        });
        self.timer.set(Some(timer));
    }

    fn flush(&self, page: &Page) {
        if self.phase.get() != Phase::Watching {
            return;
        }
        let mutations = std::mem::take(&mut *self.pending.borrow_mut());
        if mutations.is_empty() {
            return;
        }

        let summary = ChangeSummary::from_records(&page.dom(), &mutations);
        if self.once {
            self.phase.set(Phase::Finished);
            self.detach(page);
        }
        log::debug!("{} content batch of {} records", self.element, mutations.len());

        // Taken out for the call so the callback may dispose its own handle
        let callback = self.callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(ChangeBatch {
                element: self.element,
                mutations,
                summary,
            });
            if self.phase.get() == Phase::Watching {
                *self.callback.borrow_mut() = Some(callback);
            }
        }
    }

    fn detach(&self, page: &Page) {
        if let Some(observer) = self.observer.take() {
            page.disconnect(observer);
        }
        if let Some(timer) = self.timer.take() {
            page.clear_timeout(timer);
        }
    }
}

impl Watcher for ContentWatcher {
    fn dispose(&self) {
        if self.phase.replace(Phase::Disposed) == Phase::Disposed {
            return;
        }
        self.pending.borrow_mut().clear();
        let callback = self.callback.borrow_mut().take();
        drop(callback);

        if let Some(page) = self.page.upgrade() {
            self.detach(&page);
        }
        log::debug!("Stopped watching {} for content changes", self.element);
    }

    fn is_active(&self) -> bool {
        self.phase.get() == Phase::Watching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domwatch_dom::MutationKind;
    use crate::test_util::{fixture, recorder};

    #[test]
    fn test_immediate_batches() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, ContentWatchConfig::default()).unwrap();

        let p = {
            let mut dom = fx.page.dom_mut();
            let p = dom.create_element("p");
            dom.append_child(fx.target, p).unwrap();
            p
        };
        fx.page.run_microtasks().unwrap();

        let text = {
            let mut dom = fx.page.dom_mut();
            let text = dom.create_text("hi");
            dom.append_child(p, text).unwrap();
            dom.set_text(text, "hello").unwrap();
            text
        };
        fx.page.run_microtasks().unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].element, fx.target);
        assert_eq!(batches[0].mutations.len(), 1);
        assert_eq!(batches[0].summary.added_elements, vec![p]);

        assert_eq!(batches[1].mutations.len(), 2);
        assert_eq!(batches[1].mutations[0].added_nodes.as_slice(), &[text]);
        assert!(batches[1].summary.added_elements.is_empty());
        assert_eq!(batches[1].summary.text_change_count, 1);
    }

    #[test]
    fn test_nothing_delivered_without_changes() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, ContentWatchConfig::default()).unwrap();

        fx.page.run_microtasks().unwrap();
        fx.page.advance_time(1000).unwrap();

        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_debounce_collapses_rapid_changes() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_debounce_ms(50);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        for _ in 0..5 {
            {
                let mut dom = fx.page.dom_mut();
                let child = dom.create_element("li");
                dom.append_child(fx.target, child).unwrap();
            }
            fx.page.advance_time(10).unwrap();
        }
        assert!(batches.borrow().is_empty());
        assert_eq!(fx.page.pending_timers(), 1);

        // Last change was delivered at t=40
        fx.page.advance_time_to(89).unwrap();
        assert!(batches.borrow().is_empty());
        fx.page.advance_time_to(90).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].mutations.len(), 5);
        assert_eq!(batches[0].summary.added_elements.len(), 5);
        assert_eq!(fx.page.pending_timers(), 0);
    }

    #[test]
    fn test_debounce_separate_bursts() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_debounce_ms(20);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        fx.page.dom_mut().set_attribute(fx.target, "title", "ignored").unwrap();
        let child = fx.page.dom_mut().create_element("span");
        fx.page.dom_mut().append_child(fx.target, child).unwrap();
        fx.page.advance_time(100).unwrap();
        fx.page.dom_mut().remove_child(fx.target, child).unwrap();
        fx.page.advance_time(100).unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].summary.added_elements, vec![child]);
        assert_eq!(batches[1].summary.removed_elements, vec![child]);
    }

    #[test]
    fn test_once_stops_after_first_batch() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_once(true);
        let handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        for _ in 0..3 {
            {
                let mut dom = fx.page.dom_mut();
                let child = dom.create_element("p");
                dom.append_child(fx.target, child).unwrap();
            }
            fx.page.run_microtasks().unwrap();
        }

        assert_eq!(batches.borrow().len(), 1);
        assert!(!handle.is_active());
        handle.dispose();
    }

    #[test]
    fn test_once_with_debounce() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_once(true).with_debounce_ms(30);
        let handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        fx.page.dom_mut().set_text_content(fx.target, "one").unwrap();
        fx.page.advance_time(30).unwrap();
        fx.page.dom_mut().set_text_content(fx.target, "two").unwrap();
        fx.page.flush().unwrap();

        assert_eq!(batches.borrow().len(), 1);
        assert!(!handle.is_active());
        assert_eq!(fx.page.pending_timers(), 0);
    }

    #[test]
    fn test_attribute_only_config() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new()
            .with_children(false)
            .with_text(false)
            .with_attributes(true);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        {
            let mut dom = fx.page.dom_mut();
            let child = dom.create_element("p");
            let text = dom.create_text("a");
            dom.append_child(fx.target, child).unwrap();
            dom.append_child(child, text).unwrap();
            dom.set_text(text, "b").unwrap();
            dom.set_attribute(fx.target, "title", "x").unwrap();
            dom.set_attribute(child, "class", "y").unwrap();
        }
        fx.page.run_microtasks().unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert!(batch.mutations.iter().all(|r| r.kind == MutationKind::Attributes));
        assert!(batch.summary.added_elements.is_empty());
        assert!(batch.summary.removed_elements.is_empty());
        assert_eq!(batch.summary.text_change_count, 0);
        assert_eq!(batch.summary.attribute_changes("title"), 1);
        assert_eq!(batch.summary.attribute_changes("class"), 1);
    }

    #[test]
    fn test_attribute_filter_implies_attributes() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new()
            .with_children(false)
            .with_text(false)
            .with_attribute_filter(["data-state"]);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        fx.page.dom_mut().set_attribute(fx.target, "title", "x").unwrap();
        fx.page.dom_mut().set_attribute(fx.target, "data-state", "open").unwrap();
        fx.page.run_microtasks().unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].mutations.len(), 1);
        assert_eq!(batches[0].summary.attribute_changes("data-state"), 1);
        assert_eq!(batches[0].summary.attribute_changes("title"), 0);
    }

    #[test]
    fn test_text_changes_counted() {
        let fx = fixture();
        let text = fx.page.dom_mut().create_text("0");
        fx.page.dom_mut().append_child(fx.target, text).unwrap();

        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_children(false);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        {
            let mut dom = fx.page.dom_mut();
            dom.set_text(text, "1").unwrap();
            dom.set_text(text, "2").unwrap();
            dom.set_text(text, "3").unwrap();
        }
        fx.page.run_microtasks().unwrap();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].summary.text_change_count, 3);
    }

    #[test]
    fn test_without_subtree_ignores_descendants() {
        let fx = fixture();
        let child = fx.page.dom_mut().create_element("p");
        fx.page.dom_mut().append_child(fx.target, child).unwrap();

        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_subtree(false);
        let _handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        {
            let mut dom = fx.page.dom_mut();
            let grandchild = dom.create_element("b");
            dom.append_child(child, grandchild).unwrap();
        }
        fx.page.run_microtasks().unwrap();
        assert!(batches.borrow().is_empty());

        {
            let mut dom = fx.page.dom_mut();
            let sibling = dom.create_element("p");
            dom.append_child(fx.target, sibling).unwrap();
        }
        fx.page.run_microtasks().unwrap();
        assert_eq!(batches.borrow().len(), 1);
    }

    #[test]
    fn test_dispose_cancels_pending_batch() {
        let fx = fixture();
        let (batches, callback) = recorder();
        let config = ContentWatchConfig::new().with_debounce_ms(50);
        let handle = watch_for_content_change(&fx.page, fx.target, callback, config).unwrap();

        fx.page.dom_mut().set_text_content(fx.target, "pending").unwrap();
        fx.page.run_microtasks().unwrap();
        assert_eq!(fx.page.pending_timers(), 1);

        handle.dispose();
        handle.dispose();
        assert!(!handle.is_active());
        assert_eq!(fx.page.pending_timers(), 0);

        fx.page.dom_mut().set_text_content(fx.target, "later").unwrap();
        fx.page.flush().unwrap();
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_dispose_from_inside_callback() {
        let fx = fixture();
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<WatchHandle>>> = Rc::new(RefCell::new(None));

        let inner_count = count.clone();
        let inner_slot = slot.clone();
        let handle = watch_for_content_change(
            &fx.page,
            fx.target,
            move |_| {
                inner_count.set(inner_count.get() + 1);
                if let Some(handle) = inner_slot.borrow().as_ref() {
                    handle.dispose();
                }
            },
            ContentWatchConfig::default(),
        )
        .unwrap();
        *slot.borrow_mut() = Some(handle.clone());

        fx.page.dom_mut().set_text_content(fx.target, "a").unwrap();
        fx.page.run_microtasks().unwrap();
        fx.page.dom_mut().set_text_content(fx.target, "b").unwrap();
        fx.page.run_microtasks().unwrap();

        assert_eq!(count.get(), 1);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_callback_may_mutate_watched_content() {
        let fx = fixture();
        let page = fx.page.clone();
        let target = fx.target;
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sink = sizes.clone();

        let _handle = watch_for_content_change(
            &fx.page,
            fx.target,
            move |batch| {
                sink.borrow_mut().push(batch.mutations.len());
                if sink.borrow().len() == 1 {
                    page.dom_mut().set_attribute(target, "data-seen", "1").unwrap();
                    let marker = page.dom_mut().create_element("hr");
                    page.dom_mut().append_child(target, marker).unwrap();
                }
            },
            ContentWatchConfig::default(),
        )
        .unwrap();

        fx.page.dom_mut().set_text_content(fx.target, "go").unwrap();
        fx.page.run_microtasks().unwrap();

        // The follow-up append is delivered in the same checkpoint
        assert_eq!(*sizes.borrow(), vec![1, 1]);
    }

    #[test]
    fn test_invalid_configuration() {
        let fx = fixture();
        let config = ContentWatchConfig::new()
            .with_children(false)
            .with_text(false)
            .with_attributes(false);

        let err = watch_for_content_change(&fx.page, fx.target, |_| {}, config).unwrap_err();
        assert_eq!(err, WatchError::Dom(DomError::InvalidObserveOptions));
    }

    #[test]
    fn test_rejects_non_elements() {
        let fx = fixture();
        let text = fx.page.dom_mut().create_text("x");

        assert_eq!(
            watch_for_content_change(&fx.page, text, |_| {}, ContentWatchConfig::default()).unwrap_err(),
            WatchError::NotAnElement(text)
        );
        assert_eq!(
            watch_for_content_change(&fx.page, NodeId(4242), |_| {}, ContentWatchConfig::default()).unwrap_err(),
            WatchError::Dom(DomError::NodeNotFound(4242))
        );
    }

    #[test]
    fn test_page_dropped_before_dispose() {
        let fx = fixture();
        let handle =
            watch_for_content_change(&fx.page, fx.target, |_| {}, ContentWatchConfig::new().with_debounce_ms(5)).unwrap();

        drop(fx);
        handle.dispose();
        assert!(!handle.is_active());
    }
}
