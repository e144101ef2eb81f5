use std::rc::Rc;

use folio_backdrop::{
    EffectConfig, EffectFactory, EffectHandle, EffectLoadError, EffectLoader, LocalBoxFuture,
};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Loads the effect library through an injected import function.
///
/// `import()` must return a promise of the effect constructor, e.g.
/// `() => import("vanta/dist/vanta.dots.min").then(m => m.default)`.
pub struct JsEffectLoader {
    import: Function,
}

impl JsEffectLoader {
    pub fn new(import: Function) -> Self {
        Self { import }
    }
}

fn describe(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

impl EffectLoader<web_sys::HtmlElement> for JsEffectLoader {
    fn load(
        &self,
    ) -> LocalBoxFuture<Result<Rc<dyn EffectFactory<web_sys::HtmlElement>>, EffectLoadError>> {
        let import = self.import.clone();
        Box::pin(async move {
            let promise: Promise = import
                .call0(&JsValue::NULL)
                .map_err(|e| EffectLoadError::Import(describe(&e)))?
                .dyn_into()
                .map_err(|_| EffectLoadError::Import("import() did not return a promise".into()))?;
            let ctor: Function = JsFuture::from(promise)
                .await
                .map_err(|e| EffectLoadError::Import(describe(&e)))?
                .dyn_into()
                .map_err(|_| EffectLoadError::Import("module is not a constructor".into()))?;
            let factory: Rc<dyn EffectFactory<web_sys::HtmlElement>> =
                Rc::new(JsEffectFactory { ctor });
            Ok::<_, EffectLoadError>(factory)
        })
    }
}

pub struct JsEffectFactory {
    ctor: Function,
}

impl EffectFactory<web_sys::HtmlElement> for JsEffectFactory {
    fn create(
        &self,
        container: &web_sys::HtmlElement,
        config: &EffectConfig,
    ) -> Result<Box<dyn EffectHandle>, EffectLoadError> {
        let opts = serde_wasm_bindgen::to_value(config)
            .map_err(|e| EffectLoadError::Create(e.to_string()))?;
        Reflect::set(&opts, &"el".into(), container)
            .map_err(|e| EffectLoadError::Create(describe(&e)))?;
        let effect = self
            .ctor
            .call1(&JsValue::NULL, &opts)
            .map_err(|e| EffectLoadError::Create(describe(&e)))?;
        Ok(Box::new(JsEffectHandle { effect }))
    }
}

struct JsEffectHandle {
    effect: JsValue,
}

impl JsEffectHandle {
    fn call(&self, method: &str) {
        let f = Reflect::get(&self.effect, &method.into())
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());
        match f {
            Some(f) => {
                if let Err(e) = f.call0(&self.effect) {
                    log::warn!("effect.{method}() threw: {}", describe(&e));
                }
            }
            None => log::warn!("effect has no {method}()"),
        }
    }
}

impl EffectHandle for JsEffectHandle {
    fn resize(&self) {
        self.call("resize");
    }

    fn destroy(self: Box<Self>) {
        self.call("destroy");
    }
}
