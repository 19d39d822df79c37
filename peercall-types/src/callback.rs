/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Framework-agnostic callback type.
//!
//! The session publishes changes and receives broker events through this
//! wrapper so that neither side needs to know about the other's UI framework.

use std::fmt;
use std::rc::Rc;

/// Cloneable, single-threaded callback.
pub struct Callback<IN, OUT = ()> {
    cb: Rc<dyn Fn(IN) -> OUT>,
}

impl<IN, OUT, F: Fn(IN) -> OUT + 'static> From<F> for Callback<IN, OUT> {
    fn from(func: F) -> Self {
        Callback { cb: Rc::new(func) }
    }
}

impl<IN, OUT> Clone for Callback<IN, OUT> {
    fn clone(&self) -> Self {
        Self {
            cb: Rc::clone(&self.cb),
        }
    }
}

#[allow(clippy::vtable_address_comparisons)]
impl<IN, OUT> PartialEq for Callback<IN, OUT> {
    fn eq(&self, other: &Callback<IN, OUT>) -> bool {
        Rc::ptr_eq(&self.cb, &other.cb)
    }
}

impl<IN, OUT> fmt::Debug for Callback<IN, OUT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback<_>")
    }
}

impl<IN, OUT> Callback<IN, OUT> {
    /// Invokes the wrapped function.
    pub fn emit(&self, value: IN) -> OUT {
        (*self.cb)(value)
    }
}

impl<IN> Callback<IN> {
    /// A callback that drops whatever it is given.
    pub fn noop() -> Self {
        Self::from(|_| ())
    }
}

impl<IN> Default for Callback<IN> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<IN: 'static, OUT: 'static> Callback<IN, OUT> {
    /// Builds a callback of another input type by mapping through `func` first.
    ///
    /// The broker adapters use this to tag raw JS events with the connection
    /// they came from before handing them to the session.
    pub fn reform<F, T>(&self, func: F) -> Callback<T, OUT>
    where
        F: Fn(T) -> IN + 'static,
    {
        let this = self.clone();
        Callback::from(move |input| this.emit(func(input)))
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn emit_forwards_the_value() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cb = Callback::from(move |v: u8| sink.borrow_mut().push(v));
        cb.emit(1);
        cb.clone().emit(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn reform_maps_before_emitting() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let cb = Callback::from(move |v: String| sink.borrow_mut().push(v));
        let tagged = cb.reform(|n: u32| format!("conn-{n}"));
        tagged.emit(7);
        assert_eq!(*seen.borrow(), vec!["conn-7".to_string()]);
    }

    #[test]
    fn clones_compare_equal_and_fresh_callbacks_do_not() {
        let a: Callback<()> = Callback::noop();
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Callback::noop());
    }
}
