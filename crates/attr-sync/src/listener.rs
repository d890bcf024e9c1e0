//! Change listeners keyed by path prefix.

use std::fmt;

/// Callback invoked with the path that changed.
pub type ListenerFn = Box<dyn FnMut(&str) + Send>;

/// Handle returned by registration, used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    prefix: Option<String>,
    callback: ListenerFn,
}

/// Listeners in registration order.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for paths starting with `prefix`, or for every
    /// path when `prefix` is `None`.
    pub fn register(&mut self, prefix: Option<&str>, callback: ListenerFn) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener {
            id,
            prefix: prefix.map(str::to_owned),
            callback,
        });
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Invoke every matching listener, in registration order. Returns how
    /// many were called.
    pub fn fire(&mut self, path: &str) -> usize {
        let mut called = 0;
        for listener in &mut self.listeners {
            let matches = listener
                .prefix
                .as_deref()
                .map_or(true, |prefix| path.starts_with(prefix));
            if matches {
                (listener.callback)(path);
                called += 1;
            }
        }
        called
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.listeners.iter().map(|l| (l.id, l.prefix.as_deref())))
            .finish()
    }
}
