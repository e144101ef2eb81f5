//! Deterministic doubles for the host, the device probe and the effect library.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::task::{Poll, Waker};

use folio_core::Dispose;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use slotmap::{DefaultKey, SlotMap};
use web_time::{Duration, Instant};

use crate::device::DeviceProbe;
use crate::effect::{EffectConfig, EffectFactory, EffectHandle, EffectLoadError, EffectLoader};
use crate::host::{Host, LocalBoxFuture};

type FrameCallback = Box<dyn FnOnce(Instant)>;

struct ManualState {
    now: Instant,
    next_id: u64,
    timers: BTreeMap<(Instant, u64), Box<dyn FnOnce()>>,
    frames: BTreeMap<u64, FrameCallback>,
    resize: SlotMap<DefaultKey, Rc<dyn Fn()>>,
}

/// A host whose clock only moves when told to.
///
/// Timers fire from [`advance`](Self::advance), frame callbacks from
/// [`frame`](Self::frame), and spawned futures run on a local pool after each
/// of those until they stall.
#[derive(Clone)]
pub struct ManualHost {
    state: Rc<RefCell<ManualState>>,
    pool: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
    live_tasks: Rc<Cell<usize>>,
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualHost {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            state: Rc::new(RefCell::new(ManualState {
                now: Instant::now(),
                next_id: 0,
                timers: BTreeMap::new(),
                frames: BTreeMap::new(),
                resize: SlotMap::new(),
            })),
            pool: Rc::new(RefCell::new(pool)),
            spawner,
            live_tasks: Rc::new(Cell::new(0)),
        }
    }

    fn next_id(&self) -> u64 {
        let mut st = self.state.borrow_mut();
        st.next_id += 1;
        st.next_id
    }

    /// Moves the clock forward, firing due timers in order.
    pub fn advance(&self, by: Duration) {
        let target = self.state.borrow().now + by;
        loop {
            let due = {
                let mut st = self.state.borrow_mut();
                let next = st.timers.keys().next().copied();
                match next {
                    Some(key) if key.0 <= target => {
                        st.now = st.now.max(key.0);
                        st.timers.remove(&key)
                    }
                    _ => None,
                }
            };
            match due {
                Some(f) => {
                    f();
                    self.run_tasks();
                }
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
        self.run_tasks();
    }

    /// Runs every frame callback requested so far. Callbacks requested while
    /// this runs wait for the next call.
    pub fn frame(&self) {
        let (now, frames) = {
            let mut st = self.state.borrow_mut();
            (st.now, std::mem::take(&mut st.frames))
        };
        for (_, f) in frames {
            f(now);
        }
        self.run_tasks();
    }

    /// `count` frames, each `interval` after the previous one.
    pub fn pump_frames(&self, count: u32, interval: Duration) {
        for _ in 0..count {
            self.advance(interval);
            self.frame();
        }
    }

    pub fn resize(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.state.borrow().resize.values().cloned().collect();
        for l in listeners {
            l();
        }
    }

    /// Polls spawned futures until none of them can make progress.
    pub fn run_tasks(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Spawned futures that have not completed yet.
    pub fn pending_tasks(&self) -> usize {
        self.live_tasks.get()
    }

    pub fn resize_listeners(&self) -> usize {
        self.state.borrow().resize.len()
    }
}

impl Host for ManualHost {
    fn now(&self) -> Instant {
        self.state.borrow().now
    }

    fn set_timeout(&self, delay: Duration, f: Box<dyn FnOnce()>) -> Dispose {
        let id = self.next_id();
        let key = (self.now() + delay, id);
        self.state.borrow_mut().timers.insert(key, f);
        let weak = Rc::downgrade(&self.state);
        Dispose::new(move || {
            if let Some(st) = weak.upgrade() {
                st.borrow_mut().timers.remove(&key);
            }
        })
    }

    fn request_frame(&self, f: Box<dyn FnOnce(Instant)>) -> Dispose {
        let id = self.next_id();
        self.state.borrow_mut().frames.insert(id, f);
        let weak = Rc::downgrade(&self.state);
        Dispose::new(move || {
            if let Some(st) = weak.upgrade() {
                st.borrow_mut().frames.remove(&id);
            }
        })
    }

    fn on_resize(&self, f: Rc<dyn Fn()>) -> Dispose {
        let id = self.state.borrow_mut().resize.insert(f);
        let weak = Rc::downgrade(&self.state);
        Dispose::new(move || {
            if let Some(st) = weak.upgrade() {
                st.borrow_mut().resize.remove(id);
            }
        })
    }

    fn spawn_local(&self, fut: LocalBoxFuture<()>) {
        let live = self.live_tasks.clone();
        live.set(live.get() + 1);
        let task = async move {
            fut.await;
            live.set(live.get() - 1);
        };
        if let Err(e) = self.spawner.spawn_local(task) {
            log::error!("manual host: could not spawn task: {e}");
            self.live_tasks.set(self.live_tasks.get() - 1);
        }
    }
}

/// Probe with adjustable answers.
pub struct StaticProbe {
    pub width: Cell<f32>,
    pub user_agent: RefCell<String>,
    pub cores: Cell<Option<u32>>,
}

impl StaticProbe {
    pub fn new(width: f32, user_agent: &str, cores: Option<u32>) -> Self {
        Self {
            width: Cell::new(width),
            user_agent: RefCell::new(user_agent.to_string()),
            cores: Cell::new(cores),
        }
    }

    pub fn desktop() -> Self {
        Self::new(
            1440.0,
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15",
            Some(8),
        )
    }

    pub fn phone(cores: Option<u32>) -> Self {
        Self::new(
            390.0,
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Mobile Safari/537.36",
            cores,
        )
    }
}

impl DeviceProbe for StaticProbe {
    fn viewport_width(&self) -> Option<f32> {
        Some(self.width.get())
    }

    fn user_agent(&self) -> String {
        self.user_agent.borrow().clone()
    }

    fn hardware_concurrency(&self) -> Option<u32> {
        self.cores.get()
    }
}

/// Shared tallies of what happened to recorded effects.
#[derive(Default)]
pub struct EffectLog {
    pub created: Cell<usize>,
    pub resized: Cell<usize>,
    pub destroyed: Cell<usize>,
    pub configs: RefCell<Vec<EffectConfig>>,
}

impl EffectLog {
    pub fn live(&self) -> usize {
        self.created.get() - self.destroyed.get()
    }
}

struct RecordedHandle {
    log: Rc<EffectLog>,
}

impl EffectHandle for RecordedHandle {
    fn resize(&self) {
        self.log.resized.set(self.log.resized.get() + 1);
    }

    fn destroy(self: Box<Self>) {
        self.log.destroyed.set(self.log.destroyed.get() + 1);
    }
}

pub struct RecordingFactory {
    pub log: Rc<EffectLog>,
    pub fail_create: Cell<bool>,
}

impl<C> EffectFactory<C> for RecordingFactory {
    fn create(
        &self,
        _container: &C,
        config: &EffectConfig,
    ) -> Result<Box<dyn EffectHandle>, EffectLoadError> {
        if self.fail_create.get() {
            return Err(EffectLoadError::Create("scripted failure".into()));
        }
        self.log.created.set(self.log.created.get() + 1);
        self.log.configs.borrow_mut().push(config.clone());
        Ok(Box::new(RecordedHandle {
            log: self.log.clone(),
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Resolves on first poll.
    Ready,
    /// Fails on first poll.
    Fail,
    /// Stays pending until [`ScriptedLoader::release`].
    Gated,
}

/// Loader double that hands out a shared [`RecordingFactory`].
pub struct ScriptedLoader {
    pub factory: Rc<RecordingFactory>,
    pub behavior: LoadBehavior,
    released: Rc<Cell<bool>>,
    waiting: Rc<RefCell<Vec<Waker>>>,
    loads: Cell<usize>,
}

impl ScriptedLoader {
    pub fn new(behavior: LoadBehavior) -> Self {
        Self {
            factory: Rc::new(RecordingFactory {
                log: Rc::new(EffectLog::default()),
                fail_create: Cell::new(false),
            }),
            behavior,
            released: Rc::new(Cell::new(false)),
            waiting: Rc::new(RefCell::new(Vec::new())),
            loads: Cell::new(0),
        }
    }

    pub fn log(&self) -> Rc<EffectLog> {
        self.factory.log.clone()
    }

    /// Lets every gated load resolve the next time the host runs its tasks.
    pub fn release(&self) {
        self.released.set(true);
        for waker in self.waiting.borrow_mut().drain(..) {
            waker.wake();
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl<C: 'static> EffectLoader<C> for ScriptedLoader {
    fn load(&self) -> LocalBoxFuture<Result<Rc<dyn EffectFactory<C>>, EffectLoadError>> {
        self.loads.set(self.loads.get() + 1);
        let factory: Rc<dyn EffectFactory<C>> = self.factory.clone();
        match self.behavior {
            LoadBehavior::Ready => Box::pin(async move { Ok::<_, EffectLoadError>(factory) }),
            LoadBehavior::Fail => Box::pin(async move {
                Err::<Rc<dyn EffectFactory<C>>, _>(EffectLoadError::Import(
                    "scripted failure".into(),
                ))
            }),
            LoadBehavior::Gated => {
                let released = self.released.clone();
                let waiting = self.waiting.clone();
                Box::pin(std::future::poll_fn(move |cx| {
                    if released.get() {
                        Poll::Ready(Ok(factory.clone()))
                    } else {
                        waiting.borrow_mut().push(cx.waker().clone());
                        Poll::Pending
                    }
                }))
            }
        }
    }
}
