//! Observable values with change listeners
//!
//! An [`Observable`] is a shared cell that notifies listeners after every
//! write. Listeners run synchronously on the writing thread, in
//! registration order, and see a snapshot of the new value. No lock is held
//! while they run, so a listener may read or write any observable,
//! including the one that notified it. Such a nested write notifies every
//! listener with the newer value and ends the outer round, so no listener
//! sees a stale value last.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Handle returned by [`Observable::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
    /// Bumped on every write, under the value lock
    version: AtomicU64,
}

/// A value container that notifies listeners on change
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.inner.value.read())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Clone out the current value
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value and notify
    pub fn set(&self, value: T) {
        let version = {
            let mut guard = self.inner.value.write();
            *guard = value;
            self.bump()
        };
        self.notify(version);
    }

    /// Mutate the value in place and notify
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let version = {
            let mut guard = self.inner.value.write();
            f(&mut guard);
            self.bump()
        };
        self.notify(version);
    }

    /// Register a listener, called after every write
    pub fn on_change(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn bump(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify(&self, version: u64) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }

        let snapshot = self.get();
        for listener in listeners {
            // A later write has notified everyone with a newer value
            if self.inner.version.load(Ordering::SeqCst) != version {
                return;
            }
            listener(&snapshot);
        }
    }
}

/// A value derived from an [`Observable`] by a pure function
///
/// Recomputed on every read; never cached.
pub struct Computed<S, T> {
    source: Observable<S>,
    derive: Arc<dyn Fn(&S) -> T + Send + Sync>,
}

impl<S, T> Clone for Computed<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            derive: self.derive.clone(),
        }
    }
}

impl<S: Clone + Send + Sync + 'static, T: 'static> Computed<S, T> {
    pub fn new(source: &Observable<S>, derive: impl Fn(&S) -> T + Send + Sync + 'static) -> Self {
        Self {
            source: source.clone(),
            derive: Arc::new(derive),
        }
    }

    /// Current derived value
    pub fn get(&self) -> T {
        self.source.with(|s| (self.derive)(s))
    }

    /// Listen for changes of the source, receiving the derived value
    pub fn on_change(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let derive = self.derive.clone();
        self.source.on_change(move |s| listener(&derive(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);
        obs.set(2);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let obs = Observable::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        obs.on_change(move |v| s1.lock().push(format!("a{}", v)));
        let s2 = seen.clone();
        obs.on_change(move |v| s2.lock().push(format!("b{}", v)));

        obs.set(7);
        obs.update(|v| *v += 1);

        assert_eq!(*seen.lock(), vec!["a7", "b7", "a8", "b8"]);
    }

    #[test]
    fn test_remove_listener() {
        let obs = Observable::new(String::new());
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let id = obs.on_change(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        obs.set("x".into());
        assert!(obs.remove_listener(id));
        assert!(!obs.remove_listener(id));
        obs.set("y".into());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(obs.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_write_same_observable() {
        let obs = Observable::new(String::new());
        let inner = obs.clone();
        obs.on_change(move |v| {
            if !v.is_empty() {
                inner.set(String::new());
            }
        });

        obs.set("draft".into());
        assert_eq!(obs.get(), "");
    }

    #[test]
    fn test_nested_write_is_seen_last_by_later_listeners() {
        let obs = Observable::new(String::new());
        let inner = obs.clone();
        obs.on_change(move |v| {
            if !v.is_empty() {
                inner.set(String::new());
            }
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        obs.on_change(move |v: &String| s.lock().push(v.clone()));

        obs.set("draft".into());

        assert_eq!(obs.get(), "");
        assert_eq!(*seen.lock(), vec![String::new()]);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Observable::new(vec![1]);
        let b = a.clone();
        b.update(|v| v.push(2));
        assert_eq!(a.get(), vec![1, 2]);
    }

    #[test]
    fn test_computed_tracks_source() {
        let id: Observable<Option<String>> = Observable::new(None);
        let url = Computed::new(&id, |id| id.as_ref().map(|i| format!("x/{}", i)));
        assert_eq!(url.get(), None);

        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        url.on_change(move |u| *s.lock() = u.clone());

        id.set(Some("abc".into()));
        assert_eq!(url.get().as_deref(), Some("x/abc"));
        assert_eq!(seen.lock().as_deref(), Some("x/abc"));
    }
}
