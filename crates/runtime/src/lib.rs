//! Domwatch Runtime
//!
//! A [`Page`] couples a [`DomTree`](domwatch_dom::DomTree) with a
//! deterministic, single-threaded event loop: a virtual clock, timers,
//! microtasks and mutation-observer delivery. Nothing runs until the
//! caller drives the loop, which keeps observer behaviour reproducible in
//! tests.

mod error;
mod page;
mod scheduler;

pub use error::{RuntimeError, RuntimeResult};
pub use page::{Page, WeakPage};
pub use scheduler::TimerId;
