//! # Signals, disposers, and scopes
//!
//! Folio's client-side state lives in a handful of small reactive pieces that
//! the URL-bound stores and the animated backdrop are both built on:
//!
//! - `Signal<T>`: cloneable, observable value.
//! - `Dispose`: a cleanup guard that runs at most once.
//! - `Scope`: owns the disposers of a mounted view and runs them on teardown.
//!
//! ## Signals
//!
//! ```rust
//! use folio_core::*;
//!
//! let count = signal(0);
//! count.set(1);
//! count.update(|v| *v += 1);
//! assert_eq!(count.get(), 2);
//! ```
//!
//! Subscribers are called after every write with the new value. The value is
//! not borrowed while subscribers run, so a subscriber may read the signal
//! again or write to another one.
//!
//! ## Scopes and cleanup
//!
//! ```rust
//! use folio_core::*;
//!
//! let scope = Scope::new();
//! let listener = scope.run(|| {
//!     effect(|| {
//!         log::info!("mounted");
//!         Dispose::new(|| log::info!("unmounted"))
//!     })
//! });
//! scope.dispose(); // logs "unmounted"
//! assert!(listener.is_disposed());
//! ```
//!
//! Anything that holds an external subscription (a navigation listener, a
//! resize listener, a frame callback) should hand its cleanup to the current
//! scope so it is released together with the view that owns it.

pub mod color;
pub mod effects;
pub mod geometry;
pub mod scope;
pub mod signal;

pub use color::*;
pub use effects::*;
pub use geometry::*;
pub use scope::*;
pub use signal::*;
