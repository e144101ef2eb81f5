//! Browser runner (wasm32): History API navigation, `window` probes and
//! timers, and a JS-backed effect loader. Empty on other targets.

#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod loader;
#[cfg(target_arch = "wasm32")]
mod navigator;
#[cfg(target_arch = "wasm32")]
mod probe;

#[cfg(target_arch = "wasm32")]
pub use web::*;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::rc::Rc;

    use folio_backdrop::{BackgroundConfig, BackgroundController, EffectLoader, Phase};
    use wasm_bindgen::prelude::*;

    pub use crate::host::BrowserHost;
    pub use crate::loader::{JsEffectFactory, JsEffectLoader};
    pub use crate::navigator::BrowserNavigator;
    pub use crate::probe::BrowserProbe;

    /// Panic hook and console logger. Safe to call more than once.
    pub fn init_logging() {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        let _ = console_log::init_with_level(log::Level::Info);
    }

    /// Animated background handle for pages that drive it from JS.
    #[wasm_bindgen]
    pub struct WebBackdrop {
        controller: BackgroundController<web_sys::HtmlElement>,
    }

    #[wasm_bindgen]
    impl WebBackdrop {
        /// `import` is called (no arguments) when the effect is needed and
        /// must return a promise of the effect constructor. Pass `undefined`
        /// to keep the static pattern. `config_json` may be empty.
        #[wasm_bindgen(constructor)]
        pub fn new(
            import: Option<js_sys::Function>,
            config_json: &str,
        ) -> Result<WebBackdrop, JsValue> {
            init_logging();
            let config = if config_json.trim().is_empty() {
                BackgroundConfig::default()
            } else {
                BackgroundConfig::from_json(config_json)
                    .map_err(|e| JsValue::from_str(&e.to_string()))?
            };
            let host = BrowserHost::new().map_err(|e| JsValue::from_str(&e))?;
            let probe = BrowserProbe::new().map_err(|e| JsValue::from_str(&e))?;
            let loader = import.map(|f| {
                Rc::new(JsEffectLoader::new(f)) as Rc<dyn EffectLoader<web_sys::HtmlElement>>
            });
            let controller =
                BackgroundController::new(Rc::new(host), Rc::new(probe), loader, config)
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(WebBackdrop { controller })
        }

        pub fn attach(&self, container: web_sys::HtmlElement) {
            self.controller.attach(container);
        }

        pub fn detach(&self) {
            self.controller.detach();
        }

        /// True while the live effect runs; render the static pattern otherwise.
        #[wasm_bindgen(getter)]
        pub fn active(&self) -> bool {
            self.controller.phase() == Phase::Active
        }

        #[wasm_bindgen(getter)]
        pub fn phase(&self) -> String {
            format!("{:?}", self.controller.phase())
        }
    }
}
