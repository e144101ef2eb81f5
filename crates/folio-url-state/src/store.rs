use std::cell::Cell;
use std::rc::{Rc, Weak};

use folio_core::{Dispose, Signal, SubId, effect};

use crate::codec::{JsonCodec, UrlCodec};
use crate::error::UrlStateError;
use crate::navigator::{NavigationMode, Navigator};
use crate::query::{QueryParams, build_href};

/// Construction options for a [`UrlState`].
pub struct UrlStateOptions<T, C = JsonCodec> {
    pub default_value: T,
    pub codec: C,
    pub mode: NavigationMode,
}

impl<T> UrlStateOptions<T, JsonCodec> {
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            codec: JsonCodec,
            mode: NavigationMode::Push,
        }
    }
}

impl<T, C> UrlStateOptions<T, C> {
    pub fn with_codec<C2>(self, codec: C2) -> UrlStateOptions<T, C2> {
        UrlStateOptions {
            default_value: self.default_value,
            codec,
            mode: self.mode,
        }
    }

    pub fn replace(mut self) -> Self {
        self.mode = NavigationMode::Replace;
        self
    }

    pub fn push(mut self) -> Self {
        self.mode = NavigationMode::Push;
        self
    }
}

struct Shared<T: Clone + 'static, C> {
    key: String,
    value: Signal<T>,
    default_value: T,
    codec: C,
    mode: NavigationMode,
    nav: Rc<dyn Navigator>,
    /// Set while this store's own navigation is in flight.
    writing: Cell<bool>,
}

impl<T, C> Shared<T, C>
where
    T: Clone + PartialEq + 'static,
    C: UrlCodec<T>,
{
    fn decode(&self, query: &str) -> Result<Option<T>, UrlStateError> {
        let params = QueryParams::parse(query);
        let Some(raw) = params.get(&self.key) else {
            return Ok(None);
        };
        self.codec
            .deserialize(raw)
            .map(Some)
            .map_err(|source| UrlStateError::Deserialize {
                key: self.key.clone(),
                source,
            })
    }

    /// Value the given query string stands for; malformed input reads as the default.
    fn read_from(&self, query: &str) -> T {
        match self.decode(query) {
            Ok(Some(v)) => v,
            Ok(None) => self.default_value.clone(),
            Err(e) => {
                log::warn!("{e}; using default");
                self.default_value.clone()
            }
        }
    }

    fn resync(&self) {
        if self.writing.get() {
            return;
        }
        let next = self.read_from(&self.nav.search());
        let changed = self.value.with(|current| *current != next);
        if changed {
            log::debug!("url state `{}` resynced from location", self.key);
            self.value.set(next);
        }
    }

    fn write_url(&self, value: &T) -> Result<(), UrlStateError> {
        let mut params = QueryParams::parse(&self.nav.search());
        if *value == self.default_value || self.codec.is_absent(value) {
            params.remove(&self.key);
        } else {
            let raw = self
                .codec
                .serialize(value)
                .map_err(|source| UrlStateError::Serialize {
                    key: self.key.clone(),
                    source,
                })?;
            params.set(&self.key, raw);
        }
        let href = build_href(&self.nav.pathname(), &params);
        self.writing.set(true);
        self.nav.navigate(&href, self.mode);
        self.writing.set(false);
        Ok(())
    }
}

/// A typed value mirrored into one query parameter.
///
/// The in-memory value is authoritative: `set` updates it first and then
/// rewrites the URL best-effort. A value equal to the default is written as
/// an absent parameter. Location changes made elsewhere (back/forward,
/// links) are read back into the value.
///
/// Dropping the store, or disposing the scope it was mounted in, stops the
/// location subscription.
pub struct UrlState<T: Clone + PartialEq + 'static, C: UrlCodec<T> + 'static = JsonCodec> {
    shared: Rc<Shared<T, C>>,
    listener: Dispose,
}

impl<T, C> UrlState<T, C>
where
    T: Clone + PartialEq + 'static,
    C: UrlCodec<T> + 'static,
{
    pub fn mount(
        nav: Rc<dyn Navigator>,
        key: impl Into<String>,
        options: UrlStateOptions<T, C>,
    ) -> Self {
        let key = key.into();
        let UrlStateOptions {
            default_value,
            codec,
            mode,
        } = options;

        let shared = Rc::new(Shared {
            key,
            value: Signal::new(default_value.clone()),
            default_value,
            codec,
            mode,
            nav: nav.clone(),
            writing: Cell::new(false),
        });
        let initial = shared.read_from(&nav.search());
        shared.value.set(initial);

        let weak: Weak<Shared<T, C>> = Rc::downgrade(&shared);
        let listener = effect(move || {
            nav.subscribe(Rc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.resync();
                }
            }))
        });

        Self { shared, listener }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn get(&self) -> T {
        self.shared.value.get()
    }

    pub fn default_value(&self) -> &T {
        &self.shared.default_value
    }

    pub fn mode(&self) -> NavigationMode {
        self.shared.mode
    }

    /// Updates the value, then the URL. URL failures are logged, not returned.
    pub fn set(&self, value: T) {
        if let Err(e) = self.try_set(value) {
            log::warn!("{e}; URL left unchanged");
        }
    }

    /// Like [`set`](Self::set) but reports a serialization failure. The
    /// in-memory value is updated either way.
    pub fn try_set(&self, value: T) -> Result<(), UrlStateError> {
        self.shared.value.set(value.clone());
        self.shared.write_url(&value)
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut v = self.get();
        f(&mut v);
        self.set(v);
    }

    pub fn reset(&self) {
        self.set(self.shared.default_value.clone());
    }

    /// Observe value changes, whether they come from `set` or from the URL.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.shared.value.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.shared.value.unsubscribe(id)
    }

    /// False once the store was disposed, dropped, or its scope torn down.
    pub fn is_listening(&self) -> bool {
        !self.listener.is_disposed()
    }

    /// Stops following location changes. Also runs on drop.
    pub fn dispose(&self) {
        self.listener.run();
    }
}

impl<T, C> Drop for UrlState<T, C>
where
    T: Clone + PartialEq + 'static,
    C: UrlCodec<T> + 'static,
{
    fn drop(&mut self) {
        self.listener.run();
    }
}

/// Shorthand for [`UrlState::mount`].
pub fn url_state<T, C>(
    nav: Rc<dyn Navigator>,
    key: impl Into<String>,
    options: UrlStateOptions<T, C>,
) -> UrlState<T, C>
where
    T: Clone + PartialEq + 'static,
    C: UrlCodec<T> + 'static,
{
    UrlState::mount(nav, key, options)
}
