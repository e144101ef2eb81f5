use std::cell::Cell;
use std::rc::Rc;

use folio_backdrop::{Host, LocalBoxFuture};
use folio_core::Dispose;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_time::{Duration, Instant};

/// `Host` over the page's event loop.
///
/// Timer and frame callbacks free themselves after running. Cancelling one
/// only marks it dead, so the browser still calls (and frees) it later.
pub struct BrowserHost {
    window: web_sys::Window,
}

impl BrowserHost {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            window: web_sys::window().ok_or("no window")?,
        })
    }
}

fn cancellable() -> (Rc<Cell<bool>>, Dispose) {
    let cancelled = Rc::new(Cell::new(false));
    let c = cancelled.clone();
    (cancelled, Dispose::new(move || c.set(true)))
}

impl Host for BrowserHost {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn set_timeout(&self, delay: Duration, f: Box<dyn FnOnce()>) -> Dispose {
        let (cancelled, dispose) = cancellable();
        let cb = Closure::once_into_js(move || {
            if !cancelled.get() {
                f();
            }
        });
        let ms = delay.as_millis().min(i32::MAX as u128) as i32;
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), ms)
        {
            log::warn!("setTimeout failed: {e:?}");
        }
        dispose
    }

    fn request_frame(&self, f: Box<dyn FnOnce(Instant)>) -> Dispose {
        let (cancelled, dispose) = cancellable();
        let cb = Closure::once_into_js(move |_ts: f64| {
            if !cancelled.get() {
                f(Instant::now());
            }
        });
        if let Err(e) = self.window.request_animation_frame(cb.unchecked_ref()) {
            log::warn!("requestAnimationFrame failed: {e:?}");
        }
        dispose
    }

    fn on_resize(&self, f: Rc<dyn Fn()>) -> Dispose {
        let cb = Closure::wrap(Box::new(move || f()) as Box<dyn FnMut()>);
        if let Err(e) = self
            .window
            .add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
        {
            log::warn!("resize listener failed: {e:?}");
        }
        let window = self.window.clone();
        Dispose::new(move || {
            let _ = window
                .remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
            drop(cb);
        })
    }

    fn spawn_local(&self, fut: LocalBoxFuture<()>) {
        wasm_bindgen_futures::spawn_local(fut);
    }
}
