//! Element replacement detection
//!
//! Watches the whole document for the removal of one element and reports
//! it exactly once, together with a best guess at the element that took
//! its place.

use std::cell::RefCell;
use std::rc::Rc;

use domwatch_dom::{DomError, DomTree, MutationKind, MutationRecord, NodeId, ObserveOptions, ObserverId};
use domwatch_runtime::{Page, TimerId, WeakPage};

use crate::error::{WatchError, WatchResult};
use crate::handle::{WatchHandle, Watcher};

/// Reported when the watched element leaves the document
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementEvent {
    /// The watched element
    pub old_element: NodeId,
    /// Element inserted by the same mutation, if any
    pub new_element: Option<NodeId>,
    /// Node the element (or its removed ancestor) was removed from
    pub parent: Option<NodeId>,
    /// The record that revealed the removal
    pub record: Option<MutationRecord>,
}

enum State {
    Armed { observer: ObserverId },
    /// Terminal. `deferred` is the timer reporting an element that was
    /// already detached when watching started.
    Fired { deferred: Option<TimerId> },
    Disposed,
}

type Callback = Box<dyn FnOnce(ReplacementEvent)>;

struct ReplacementWatcher {
    page: WeakPage,
    element: NodeId,
    state: RefCell<State>,
    callback: RefCell<Option<Callback>>,
}

/// Call `callback` once when `element` is removed from the document.
///
/// An element that is already detached is reported asynchronously on the
/// next timer turn with no replacement. Fails if `element` is unknown or
/// not an element.
pub fn watch_for_replacement<F>(page: &Page, element: NodeId, callback: F) -> WatchResult<WatchHandle>
where
    F: FnOnce(ReplacementEvent) + 'static,
{
    let (connected, root) = {
        let dom = page.dom();
        let node = dom.get(element).ok_or(DomError::NodeNotFound(element.0))?;
        if !node.is_element() {
            return Err(WatchError::NotAnElement(element));
        }
        (dom.is_connected(element), dom.document_id())
    };

    let watcher = Rc::new(ReplacementWatcher {
        page: page.downgrade(),
        element,
        state: RefCell::new(State::Disposed),
        callback: RefCell::new(Some(Box::new(callback))),
    });

    if connected {
        let target = watcher.clone();
        let options = ObserveOptions::new().with_child_list(true).with_subtree(true);
        let observer = page.observe(root, options, move |page, records| {
            target.on_records(page, records);
        })?;
        *watcher.state.borrow_mut() = State::Armed { observer };
        log::debug!("Watching {} for replacement", element);
    } else {
        let target = watcher.clone();
        let timer = page.set_timeout(0, move |_| target.fire_deferred());
        *watcher.state.borrow_mut() = State::Fired { deferred: Some(timer) };
        log::debug!("{} already detached; reporting on next turn", element);
    }

    Ok(WatchHandle::new(watcher))
}

/// Guess the replacement among a record's added nodes: the only added
/// element, or the last one in document order when there are several.
///
/// Best effort: a record alone cannot say which insertion was meant to
/// stand in for the removed element.
fn infer_replacement(tree: &DomTree, record: &MutationRecord) -> Option<NodeId> {
    let added: Vec<NodeId> = record
        .added_nodes
        .iter()
        .copied()
        .filter(|id| tree.get(*id).map(|n| n.is_element()).unwrap_or(false))
        .collect();

    match added.as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => added
            .into_iter()
            .max_by(|a, b| tree.tree_position(*a).cmp(&tree.tree_position(*b))),
    }
}

impl ReplacementWatcher {
    fn on_records(&self, page: &Page, records: Vec<MutationRecord>) {
        let observer = match *self.state.borrow() {
            State::Armed { observer } => observer,
            _ => return,
        };

        let (record, new_element) = {
            let dom = page.dom();
            let found = records.into_iter().find(|record| {
                record.kind == MutationKind::ChildList
                    && record.removed_nodes.iter().any(|removed| dom.contains(*removed, self.element))
            });
            let Some(record) = found else {
                return;
            };
            let new_element = infer_replacement(&dom, &record);
            (record, new_element)
        };

        *self.state.borrow_mut() = State::Fired { deferred: None };
        page.disconnect(observer);
        log::debug!("{} replaced by {:?}", self.element, new_element);

        self.invoke(ReplacementEvent {
            old_element: self.element,
            new_element,
            parent: Some(record.target),
            record: Some(record),
        });
    }

    fn fire_deferred(&self) {
        {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, State::Fired { deferred: Some(_) }) {
                return;
            }
            *state = State::Fired { deferred: None };
        }

        self.invoke(ReplacementEvent {
            old_element: self.element,
            new_element: None,
            parent: None,
            record: None,
        });
    }

    fn invoke(&self, event: ReplacementEvent) {
        // Taken out first so the callback may dispose its own handle
        let callback = self.callback.borrow_mut().take();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

impl Watcher for ReplacementWatcher {
    fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.state.borrow_mut(), State::Disposed);
        let callback = self.callback.borrow_mut().take();
        drop(callback);

        let Some(page) = self.page.upgrade() else {
            return;
        };
        match previous {
            State::Armed { observer } => {
                page.disconnect(observer);
                log::debug!("Stopped watching {} for replacement", self.element);
            }
            State::Fired { deferred: Some(timer) } => {
                page.clear_timeout(timer);
            }
            State::Fired { deferred: None } | State::Disposed => {}
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            *self.state.borrow(),
            State::Armed { .. } | State::Fired { deferred: Some(_) }
        )
    }
}
