//! Shared fixtures for watcher tests

use std::cell::RefCell;
use std::rc::Rc;

use domwatch_dom::{DomTree, NodeId};
use domwatch_runtime::Page;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `#document > html > body > div#target`
pub(crate) struct Fixture {
    pub page: Page,
    pub body: NodeId,
    pub target: NodeId,
}

pub(crate) fn fixture() -> Fixture {
    init_logging();
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    let body = tree.create_element("body");
    let target = tree.create_element("div");
    tree.append_child(tree.document_id(), html).unwrap();
    tree.append_child(html, body).unwrap();
    tree.append_child(body, target).unwrap();
    tree.set_attribute(target, "id", "target").unwrap();

    Fixture {
        page: Page::new(tree),
        body,
        target,
    }
}

/// Collects callback arguments
pub(crate) fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T) + 'static) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    (calls, move |value| sink.borrow_mut().push(value))
}
