use std::cell::RefCell;
use std::rc::Rc;

use folio_core::Dispose;
use slotmap::{DefaultKey, SlotMap};

use crate::query::split_href;

/// How a URL write is recorded in history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavigationMode {
    #[default]
    Push,
    Replace,
}

/// The router as seen by URL-bound state: read the current location, rewrite
/// it, and hear about changes made by anyone else (back/forward, links).
pub trait Navigator {
    fn pathname(&self) -> String;

    /// Current query string, without the leading `?`.
    fn search(&self) -> String;

    fn navigate(&self, href: &str, mode: NavigationMode);

    /// Registers `on_change` for every location change. Running the returned
    /// `Dispose` unregisters it.
    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Dispose;

    fn href(&self) -> String {
        let search = self.search();
        if search.is_empty() {
            self.pathname()
        } else {
            format!("{}?{}", self.pathname(), search)
        }
    }
}

type Listener = Rc<dyn Fn()>;

struct History {
    entries: Vec<String>,
    index: usize,
    navigations: usize,
    listeners: SlotMap<DefaultKey, Listener>,
}

/// In-memory history stack. Used off the browser and in tests; every change
/// (including `back`/`forward`) notifies subscribers.
#[derive(Clone)]
pub struct MemoryNavigator {
    inner: Rc<RefCell<History>>,
}

impl MemoryNavigator {
    pub fn new(initial_href: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(History {
                entries: vec![initial_href.into()],
                index: 0,
                navigations: 0,
                listeners: SlotMap::new(),
            })),
        }
    }

    pub fn current(&self) -> String {
        let h = self.inner.borrow();
        h.entries[h.index].clone()
    }

    pub fn history_len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Number of `navigate` calls made so far (back/forward excluded).
    pub fn navigation_count(&self) -> usize {
        self.inner.borrow().navigations
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn back(&self) -> bool {
        let moved = {
            let mut h = self.inner.borrow_mut();
            if h.index > 0 {
                h.index -= 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.notify();
        }
        moved
    }

    pub fn forward(&self) -> bool {
        let moved = {
            let mut h = self.inner.borrow_mut();
            if h.index + 1 < h.entries.len() {
                h.index += 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.notify();
        }
        moved
    }

    // Listeners may navigate again; never call them under a borrow.
    fn notify(&self) {
        let listeners: Vec<Listener> = self.inner.borrow().listeners.values().cloned().collect();
        for l in listeners {
            l();
        }
    }
}

impl Navigator for MemoryNavigator {
    fn pathname(&self) -> String {
        let current = self.current();
        split_href(&current).0.to_string()
    }

    fn search(&self) -> String {
        let current = self.current();
        split_href(&current).1.to_string()
    }

    fn navigate(&self, href: &str, mode: NavigationMode) {
        {
            let mut h = self.inner.borrow_mut();
            h.navigations += 1;
            match mode {
                NavigationMode::Push => {
                    let keep = h.index + 1;
                    h.entries.truncate(keep);
                    h.entries.push(href.to_string());
                    h.index = keep;
                }
                NavigationMode::Replace => {
                    let i = h.index;
                    h.entries[i] = href.to_string();
                }
            }
        }
        log::debug!("navigate {mode:?} -> {href}");
        self.notify();
    }

    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Dispose {
        let id = self.inner.borrow_mut().listeners.insert(on_change);
        let weak = Rc::downgrade(&self.inner);
        Dispose::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(id);
            }
        })
    }
}
