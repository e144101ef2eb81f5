//! # URL-bound state
//!
//! `UrlState<T, C>` keeps a typed value in memory and mirrors it into a single
//! query parameter of the current location:
//!
//! ```rust
//! use std::rc::Rc;
//! use folio_url_state::*;
//!
//! let nav = MemoryNavigator::new("/portfolio");
//! let page = UrlState::mount(Rc::new(nav.clone()), "page", UrlStateOptions::new(1u32));
//!
//! page.set(3);
//! assert_eq!(nav.current(), "/portfolio?page=3");
//!
//! page.set(1); // the default is never written
//! assert_eq!(nav.current(), "/portfolio");
//! ```
//!
//! Values are encoded with a [`UrlCodec`]; JSON is the default. The
//! [`Navigator`] trait is the only contact with the router: the browser build
//! implements it over the History API, [`MemoryNavigator`] keeps an in-memory
//! stack.
//!
//! Encoding and decoding failures never reach the caller. A bad parameter
//! reads as the default; a value that cannot be encoded stays in memory while
//! the URL keeps its previous contents.

pub mod codec;
pub mod error;
pub mod navigator;
pub mod query;
pub mod search;
pub mod store;

pub use codec::*;
pub use error::*;
pub use navigator::*;
pub use query::*;
pub use search::*;
pub use store::*;
