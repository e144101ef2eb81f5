use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use folio_core::Dispose;
use web_time::{Duration, Instant};

pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

/// The single-threaded event loop the controller runs on.
///
/// Every scheduling call returns a `Dispose` that cancels the pending callback
/// or listener. Callbacks are never invoked re-entrantly from inside the call
/// that scheduled them.
pub trait Host {
    fn now(&self) -> Instant;

    fn set_timeout(&self, delay: Duration, f: Box<dyn FnOnce()>) -> Dispose;

    /// Runs `f` once before the next repaint, with the frame timestamp.
    fn request_frame(&self, f: Box<dyn FnOnce(Instant)>) -> Dispose;

    fn on_resize(&self, f: Rc<dyn Fn()>) -> Dispose;

    fn spawn_local(&self, fut: LocalBoxFuture<()>);
}
