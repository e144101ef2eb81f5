//! # Animated background
//!
//! `BackgroundController` manages a decorative effect drawn by an external
//! rendering library. The controller never talks to the platform directly;
//! it goes through three seams:
//!
//! - [`Host`]: timers, frame callbacks, resize notifications, local tasks.
//! - [`DeviceProbe`]: viewport width, user agent, logical core count.
//! - [`EffectLoader`] / [`EffectFactory`] / [`EffectHandle`]: the library.
//!
//! Phases move `Idle -> Probing -> Active | Fallback`, with `Active ->
//! Fallback` when a mobile device keeps rendering below the frame-rate
//! threshold, and back to `Idle` on `detach`. Nothing here ever fails
//! loudly: a missing or broken library, a low-end phone, or a slow frame rate
//! all end in the static [`DotPattern`].
//!
//! With the `testing` feature the whole lifecycle can be driven by hand:
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use folio_backdrop::*;
//! use folio_backdrop::testing::*;
//! use web_time::Duration;
//!
//! let host = ManualHost::new();
//! let loader = Rc::new(ScriptedLoader::new(LoadBehavior::Ready));
//! let ctl = BackgroundController::new(
//!     Rc::new(host.clone()),
//!     Rc::new(StaticProbe::desktop()),
//!     Some(loader.clone() as Rc<dyn EffectLoader<()>>),
//!     BackgroundConfig::default(),
//! )
//! .unwrap();
//!
//! ctl.attach(());
//! host.advance(Duration::from_millis(100));
//! assert_eq!(ctl.phase(), Phase::Active);
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod effect;
pub mod host;
pub mod pattern;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod watchdog;

pub use config::*;
pub use controller::*;
pub use device::*;
pub use effect::*;
pub use host::*;
pub use pattern::*;
pub use watchdog::*;
