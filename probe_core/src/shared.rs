//! Register set shared between the timer callback and command handlers.
//!
//! Access goes through `Shared::lock`, which runs the closure inside a
//! critical section (interrupts masked on the controller, a process-wide lock
//! on the host). The borrow cannot outlive the closure, so a handler cannot
//! forget to leave the section or keep a reference across it.

use core::cell::RefCell;

use critical_section::Mutex;

pub struct Shared<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the state with preemption excluded. Keep `f` short.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}
