//! Warning Channel
//!
//! Non-fatal problems (a write to a readonly view, `provide` outside of
//! setup) are reported here instead of failing. Every warning is logged
//! with `tracing::warn!`, and an application may install a handler to
//! observe them as well.

use std::cell::RefCell;
use std::rc::Rc;

type Handler = Rc<dyn Fn(&str)>;

thread_local! {
    static HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
}

/// Report a non-fatal problem.
pub fn warn(message: impl AsRef<str>) {
    let message = message.as_ref();
    tracing::warn!("{message}");

    // Clone out so the handler may itself warn.
    let handler = HANDLER.with(|handler| handler.borrow().clone());
    if let Some(handler) = handler {
        handler(message);
    }
}

/// Install a handler called with every warning on this thread.
pub fn set_handler(handler: impl Fn(&str) + 'static) {
    HANDLER.with(|slot| *slot.borrow_mut() = Some(Rc::new(handler)));
}

/// Swap in `handler`, returning the one it replaces.
pub(crate) fn replace_handler(handler: Option<Handler>) -> Option<Handler> {
    HANDLER.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), handler))
}

pub fn clear_handler() {
    HANDLER.with(|slot| *slot.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn handler_receives_messages() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        set_handler(move |message| sink.borrow_mut().push(message.to_owned()));

        warn("first");
        warn(String::from("second"));

        assert_eq!(*seen.borrow(), vec!["first".to_owned(), "second".to_owned()]);

        clear_handler();
        warn("unobserved");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn replaced_handler_can_be_restored() {
        let outer = Rc::new(Cell::new(0));
        let inner = Rc::new(Cell::new(0));

        let sink = outer.clone();
        set_handler(move |_| sink.set(sink.get() + 1));

        let sink = inner.clone();
        let handler: Handler = Rc::new(move |_| sink.set(sink.get() + 1));
        let previous = replace_handler(Some(handler));
        warn("to inner");

        replace_handler(previous);
        warn("to outer");

        assert_eq!((outer.get(), inner.get()), (1, 1));
        clear_handler();
    }

    #[test]
    fn warn_without_handler_is_fine() {
        clear_handler();
        warn("nobody listening");
    }
}
