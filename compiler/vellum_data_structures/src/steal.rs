//! A value that can be read freely but taken (stolen) exactly once.
//!
//! Function-signature optimization (spec §4.9 step 3) moves a typed IR
//! function's body (its block list, ordering, and value counter) into a
//! newly synthesized function and leaves a thunk behind;
//! `vellum_ir::Function::take_body` wraps the moved body in a `Steal` so
//! the transfer is a one-time token rather than a plain tuple: installing
//! it anywhere other than exactly once panics loudly, instead of silently
//! duplicating or dropping the body nobody meant to touch twice.

use crate::sync::Lock;

#[derive(Debug)]
pub struct Steal<T>(Lock<Option<T>>);

impl<T> Steal<T> {
    pub fn new(value: T) -> Self {
        Steal(Lock::new(Some(value)))
    }

    /// Takes the value, leaving the cell empty. Panics if already stolen.
    pub fn steal(&self) -> T {
        self.0.borrow_mut().take().expect("attempted to steal a value twice")
    }

    pub fn is_stolen(&self) -> bool {
        self.0.borrow().is_none()
    }
}

impl<T: Clone> Steal<T> {
    pub fn get(&self) -> T {
        self.0.borrow().as_ref().expect("value already stolen").clone()
    }
}
