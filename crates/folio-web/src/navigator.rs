use std::cell::RefCell;
use std::rc::Rc;

use folio_core::Dispose;
use folio_url_state::{NavigationMode, Navigator};
use slotmap::{DefaultKey, SlotMap};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

type Listeners = Rc<RefCell<SlotMap<DefaultKey, Rc<dyn Fn()>>>>;

fn notify(listeners: &Listeners) {
    let ls: Vec<Rc<dyn Fn()>> = listeners.borrow().values().cloned().collect();
    for l in ls {
        l();
    }
}

/// `Navigator` over `window.history`. Our own writes notify subscribers
/// directly; back/forward arrive through `popstate`.
pub struct BrowserNavigator {
    window: web_sys::Window,
    listeners: Listeners,
    popstate: Closure<dyn FnMut(web_sys::Event)>,
}

impl BrowserNavigator {
    pub fn new() -> Result<Self, String> {
        let window = web_sys::window().ok_or("no window")?;
        let listeners: Listeners = Rc::new(RefCell::new(SlotMap::new()));

        let l = listeners.clone();
        let popstate = Closure::wrap(Box::new(move |_e: web_sys::Event| notify(&l))
            as Box<dyn FnMut(web_sys::Event)>);
        window
            .add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())
            .map_err(|e| format!("popstate listener: {e:?}"))?;

        Ok(Self {
            window,
            listeners,
            popstate,
        })
    }
}

impl Navigator for BrowserNavigator {
    fn pathname(&self) -> String {
        self.window.location().pathname().unwrap_or_else(|_| "/".into())
    }

    fn search(&self) -> String {
        let search = self.window.location().search().unwrap_or_default();
        search.strip_prefix('?').unwrap_or(&search).to_string()
    }

    fn navigate(&self, href: &str, mode: NavigationMode) {
        let history = match self.window.history() {
            Ok(h) => h,
            Err(e) => {
                log::warn!("history unavailable: {e:?}");
                return;
            }
        };
        let result = match mode {
            NavigationMode::Push => history.push_state_with_url(&JsValue::NULL, "", Some(href)),
            NavigationMode::Replace => {
                history.replace_state_with_url(&JsValue::NULL, "", Some(href))
            }
        };
        match result {
            Ok(()) => notify(&self.listeners),
            Err(e) => log::warn!("navigation to {href} failed: {e:?}"),
        }
    }

    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Dispose {
        let id = self.listeners.borrow_mut().insert(on_change);
        let weak = Rc::downgrade(&self.listeners);
        Dispose::new(move || {
            if let Some(ls) = weak.upgrade() {
                ls.borrow_mut().remove(id);
            }
        })
    }
}

impl Drop for BrowserNavigator {
    fn drop(&mut self) {
        let cb = self.popstate.as_ref().unchecked_ref();
        let _ = self
            .window
            .remove_event_listener_with_callback("popstate", cb);
    }
}
