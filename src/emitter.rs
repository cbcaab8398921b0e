//! Synchronous multi-listener event emitter
//!
//! Listeners are keyed by an event kind and invoked in registration order,
//! directly on the emitting call stack.
//!
//! # Invariants
//!
//! 1. Listeners of one kind run in the order they were registered.
//! 2. `emit` works on a copy of the matching listeners: a listener added
//!    during an emission is not called by that emission, and a listener
//!    removed during an emission is still called by it.
//! 3. A `once` listener is removed before it is invoked, so a reentrant
//!    emission of the same kind cannot call it twice.
//! 4. No borrow is held while listeners run; listeners may freely call back
//!    into the emitter.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Default per-kind listener count above which a warning is logged
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Handle returned by `on`/`once`, used to unsubscribe with `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

struct Registration<K, E> {
    id: ListenerId,
    kind: K,
    once: bool,
    handler: Handler<E>,
}

pub struct EventEmitter<K, E> {
    registrations: RefCell<Vec<Registration<K, E>>>,
    next_id: Cell<u64>,
    max_listeners: usize,
}

impl<K, E> EventEmitter<K, E>
where
    K: Copy + Eq + fmt::Debug,
{
    pub fn new() -> Self {
        Self::with_max_listeners(DEFAULT_MAX_LISTENERS)
    }

    /// `0` disables the listener-count warning
    pub fn with_max_listeners(max_listeners: usize) -> Self {
        Self {
            registrations: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            max_listeners,
        }
    }

    pub fn on(&self, kind: K, handler: impl Fn(&E) + 'static) -> ListenerId {
        self.register(kind, false, Rc::new(handler))
    }

    pub fn once(&self, kind: K, handler: impl Fn(&E) + 'static) -> ListenerId {
        self.register(kind, true, Rc::new(handler))
    }

    /// Remove a listener. Returns `false` if it was not registered for `kind`.
    pub fn off(&self, kind: K, id: ListenerId) -> bool {
        let mut registrations = self.registrations.borrow_mut();
        match registrations
            .iter()
            .position(|r| r.id == id && r.kind == kind)
        {
            Some(pos) => {
                registrations.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every listener of `kind`. Returns `true` if any
    /// listener was called.
    pub fn emit(&self, kind: K, event: &E) -> bool {
        let handlers: Vec<Handler<E>> = {
            let mut registrations = self.registrations.borrow_mut();
            let handlers = registrations
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| Rc::clone(&r.handler))
                .collect();
            registrations.retain(|r| !(r.once && r.kind == kind));
            handlers
        };

        for handler in &handlers {
            handler(event);
        }
        !handlers.is_empty()
    }

    pub fn listener_count(&self, kind: K) -> usize {
        self.registrations
            .borrow()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    fn register(&self, kind: K, once: bool, handler: Handler<E>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let mut registrations = self.registrations.borrow_mut();
        registrations.push(Registration {
            id,
            kind,
            once,
            handler,
        });

        let count = registrations.iter().filter(|r| r.kind == kind).count();
        if self.max_listeners > 0 && count == self.max_listeners + 1 {
            tracing::warn!(
                kind = ?kind,
                count,
                max_listeners = self.max_listeners,
                "possible listener leak: listener count exceeds max_listeners"
            );
        }
        id
    }
}

impl<K, E> Default for EventEmitter<K, E>
where
    K: Copy + Eq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> fmt::Debug for EventEmitter<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.registrations.borrow().len())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn Fn(&u32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let make = move |tag: &'static str| {
            let log = Rc::clone(&log_clone);
            Box::new(move |v: &u32| log.borrow_mut().push(format!("{}:{}", tag, v))) as Box<dyn Fn(&u32)>
        };
        (log, make)
    }

    #[test]
    fn test_registration_order() {
        let emitter: EventEmitter<Kind, u32> = EventEmitter::new();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        emitter.on(Kind::A, move |v| first(v));
        emitter.on(Kind::A, move |v| second(v));
        assert!(emitter.emit(Kind::A, &1));
        assert_eq!(*log.borrow(), vec!["first:1", "second:1"]);
    }

    #[test]
    fn test_off_only_removes_one_listener() {
        let emitter: EventEmitter<Kind, u32> = EventEmitter::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let kept = make("kept");
        let id = emitter.on(Kind::A, move |v| a(v));
        emitter.on(Kind::A, move |v| kept(v));
        emitter.on(Kind::B, move |v| b(v));

        assert!(!emitter.off(Kind::B, id));
        assert!(emitter.off(Kind::A, id));
        assert!(!emitter.off(Kind::A, id));

        emitter.emit(Kind::A, &2);
        emitter.emit(Kind::B, &3);
        assert_eq!(*log.borrow(), vec!["kept:2", "b:3"]);
    }

    #[test]
    fn test_once_fires_once() {
        let emitter: EventEmitter<Kind, u32> = EventEmitter::new();
        let (log, make) = recorder();
        let once = make("once");
        emitter.once(Kind::A, move |v| once(v));
        emitter.emit(Kind::A, &1);
        emitter.emit(Kind::A, &2);
        assert_eq!(*log.borrow(), vec!["once:1"]);
        assert_eq!(emitter.listener_count(Kind::A), 0);
    }

    #[test]
    fn test_reentrant_emit() {
        let emitter: Rc<EventEmitter<Kind, u32>> = Rc::new(EventEmitter::new());
        let (log, make) = recorder();
        let inner = make("b");
        emitter.on(Kind::B, move |v| inner(v));

        let weak = Rc::downgrade(&emitter);
        emitter.on(Kind::A, move |v| {
            if let Some(emitter) = weak.upgrade() {
                emitter.emit(Kind::B, &(v + 10));
            }
        });

        emitter.emit(Kind::A, &1);
        assert_eq!(*log.borrow(), vec!["b:11"]);
    }

    #[test]
    fn test_listener_added_during_emit_waits_for_next_emit() {
        let emitter: Rc<EventEmitter<Kind, u32>> = Rc::new(EventEmitter::new());
        let calls = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&emitter);
        let calls_clone = Rc::clone(&calls);
        emitter.once(Kind::A, move |_| {
            if let Some(emitter) = weak.upgrade() {
                let calls = Rc::clone(&calls_clone);
                emitter.on(Kind::A, move |_| calls.set(calls.get() + 1));
            }
        });

        emitter.emit(Kind::A, &0);
        assert_eq!(calls.get(), 0);
        emitter.emit(Kind::A, &0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_emit_without_listeners() {
        let emitter: EventEmitter<Kind, u32> = EventEmitter::with_max_listeners(0);
        assert!(!emitter.emit(Kind::B, &0));
    }
}
