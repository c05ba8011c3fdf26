#![forbid(unsafe_code)]

//! Change-notifying value container used to publish the switcher context.
//!
//! # Design
//!
//! [`Observable<T>`] keeps the value, its version and the subscriber list in
//! separate cells behind one `Rc`. A `set` with a value equal to the current
//! one (by `PartialEq`) is dropped entirely; any other `set` bumps the version
//! and delivers the new value to every live subscriber in registration order.
//!
//! The provider relies on this equality short-circuit: its published value
//! compares switcher and key-map *identity* plus status and current theme, so
//! recomputing after a no-op switch leaves the version and the subscribers
//! untouched.
//!
//! # Re-entrancy
//!
//! No borrow is held while subscribers run, so a subscriber may `set` (or
//! switch themes) from inside its callback. The nested `set` delivers its
//! value to every subscriber itself; the outer delivery then stops, so no
//! subscriber ever ends on a value older than the current one.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug_span, trace};
use web_time::Instant;

type Callback<T> = dyn Fn(&T);

struct Shared<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: RefCell<Vec<Weak<Callback<T>>>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates another handle to the same value and the
/// same subscribers.
pub struct Observable<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live = self
            .shared
            .subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count();
        f.debug_struct("Observable")
            .field("value", &*self.shared.value.borrow())
            .field("version", &self.shared.version.get())
            .field("live_subscribers", &live)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Version 0, no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            shared: Rc::new(Shared {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.shared.value.borrow().clone()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version.get()
    }

    /// Replace the value. Returns whether it changed.
    pub fn set(&self, value: T) -> bool {
        if *self.shared.value.borrow() == value {
            return false;
        }
        let version = self.shared.version.get() + 1;
        self.shared.value.replace(value.clone());
        self.shared.version.set(version);
        self.deliver(&value, version);
        true
    }

    /// Register `callback` for future changes. Dropping the returned guard
    /// unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.shared
            .subscribers
            .borrow_mut()
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    fn deliver(&self, value: &T, version: u64) {
        let callbacks: Vec<Rc<Callback<T>>> = {
            let mut subscribers = self.shared.subscribers.borrow_mut();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        if callbacks.is_empty() {
            return;
        }

        let started = Instant::now();
        let _span = debug_span!("themeswap.publish", version, subscribers = callbacks.len()).entered();
        let mut delivered = 0usize;
        for callback in &callbacks {
            if self.shared.version.get() != version {
                trace!(delivered, "superseded by a nested publish");
                break;
            }
            callback(value);
            delivered += 1;
        }
        trace!(
            delivered,
            duration_us = started.elapsed().as_micros() as u64,
            "context subscribers notified"
        );
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it releases the only strong reference to the callback, so the
/// observable's weak entry stops upgrading and is pruned on the next change.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[derive(Clone, Debug, PartialEq)]
    struct Snapshot {
        status: Status,
        theme: Option<&'static str>,
    }

    fn idle() -> Snapshot {
        Snapshot {
            status: Status::Idle,
            theme: None,
        }
    }

    fn loading(theme: &'static str) -> Snapshot {
        Snapshot {
            status: Status::Loading,
            theme: Some(theme),
        }
    }

    #[test]
    fn equal_set_is_dropped() {
        let obs = Observable::new(idle());
        assert!(!obs.set(idle()));
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn changed_set_bumps_version_and_notifies() {
        let obs = Observable::new(idle());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = obs.subscribe(move |snap: &Snapshot| sink.borrow_mut().push(snap.status));

        assert!(obs.set(loading("dark")));
        assert!(obs.set(Snapshot {
            status: Status::Loaded,
            theme: Some("dark"),
        }));
        assert_eq!(obs.version(), 2);
        assert_eq!(*seen.borrow(), vec![Status::Loading, Status::Loaded]);
    }

    #[test]
    fn dropped_subscription_is_not_called() {
        let obs = Observable::new(idle());
        let count = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&count);
        let sub = obs.subscribe(move |_| counter.set(counter.get() + 1));
        let _kept = obs.subscribe(|_| {});
        drop(sub);

        obs.set(loading("dark"));
        assert_eq!(count.get(), 0);
        assert!(format!("{obs:?}").contains("live_subscribers: 1"));
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let obs = Observable::new(0u8);
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&log);
        let b = Rc::clone(&log);
        let _s1 = obs.subscribe(move |_| a.borrow_mut().push('A'));
        let _s2 = obs.subscribe(move |_| b.borrow_mut().push('B'));
        obs.set(1);
        assert_eq!(*log.borrow(), vec!['A', 'B']);
    }

    #[test]
    fn nested_set_supersedes_outer_delivery() {
        let obs = Observable::new(0u8);
        let handle = obs.clone();
        let _first = obs.subscribe(move |value| {
            if *value == 1 {
                handle.set(2);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _second = obs.subscribe(move |value| sink.borrow_mut().push(*value));

        obs.set(1);
        assert_eq!(obs.get(), 2);
        assert_eq!(obs.version(), 2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn clones_share_value() {
        let a = Observable::new(idle());
        let b = a.clone();
        a.set(loading("light"));
        assert_eq!(b.get().theme, Some("light"));
        assert!(format!("{b:?}").contains("version: 1"));
    }
}
