use std::cell::RefCell;
use std::rc::{Rc, Weak};

use folio_core::{Dispose, effect};
use smallvec::{SmallVec, smallvec};
use web_time::Instant;

use crate::config::{BackgroundConfig, ConfigError};
use crate::device::{DeviceClassifier, DeviceProbe, DeviceProfile};
use crate::effect::{EffectConfig, EffectFactory, EffectHandle, EffectLoadError, EffectLoader};
use crate::host::Host;
use crate::watchdog::{FpsWatchdog, FrameSampler, Verdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Probing,
    Active,
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// Mobile device with too few cores; the effect was never requested.
    LowEndDevice,
    LoadFailed,
    /// The watchdog saw too many consecutive slow windows.
    LowFrameRate,
}

/// What the view should stack, bottom to top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    StaticPattern,
    LiveEffect,
    Content,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub load_requests: u32,
    pub effects_created: u32,
    pub effects_destroyed: u32,
    pub last_fps: Option<u32>,
}

struct Monitor {
    sampler: FrameSampler,
    watchdog: FpsWatchdog,
}

struct State<C> {
    phase: Phase,
    fallback: Option<FallbackReason>,
    generation: u64,
    profile: DeviceProfile,
    container: Option<C>,
    effect: Option<Box<dyn EffectHandle>>,
    monitor: Option<Monitor>,
    resize_sub: Option<Dispose>,
    pending_timer: Option<Dispose>,
    pending_frame: Option<Dispose>,
    /// Scope registration for the current attachment.
    scope_teardown: Option<Dispose>,
    stats: ControllerStats,
}

struct Shared<C: 'static> {
    host: Rc<dyn Host>,
    probe: Rc<dyn DeviceProbe>,
    loader: Option<Rc<dyn EffectLoader<C>>>,
    config: BackgroundConfig,
    classifier: DeviceClassifier,
    state: RefCell<State<C>>,
}

/// Owns the decorative background effect for one mounted view.
///
/// `attach` classifies the device, then either settles on the static pattern
/// straight away (low-end mobile) or loads the effect library after a short
/// delay. Once the effect runs, a frame-rate watchdog may replace it with the
/// static pattern for the rest of the attachment. `detach` releases
/// everything and is safe to call at any time, any number of times.
///
/// Every asynchronous continuation carries the generation it was scheduled
/// under and does nothing once `detach` or a newer `attach` has moved on.
pub struct BackgroundController<C: Clone + 'static> {
    shared: Rc<Shared<C>>,
}

impl<C: Clone + 'static> BackgroundController<C> {
    pub fn new(
        host: Rc<dyn Host>,
        probe: Rc<dyn DeviceProbe>,
        loader: Option<Rc<dyn EffectLoader<C>>>,
        config: BackgroundConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = DeviceClassifier::new(&config)?;
        let profile = classifier.classify(probe.as_ref());
        Ok(Self {
            shared: Rc::new(Shared {
                host,
                probe,
                loader,
                config,
                classifier,
                state: RefCell::new(State {
                    phase: Phase::Idle,
                    fallback: None,
                    generation: 0,
                    profile,
                    container: None,
                    effect: None,
                    monitor: None,
                    resize_sub: None,
                    pending_timer: None,
                    pending_frame: None,
                    scope_teardown: None,
                    stats: ControllerStats::default(),
                }),
            }),
        })
    }

    pub fn attach(&self, container: C) {
        if self.phase() != Phase::Idle {
            log::debug!("backdrop: attach while attached; detaching first");
            self.detach();
        }
        let generation = Shared::attach(&self.shared, container);

        // Tearing down the scope ends this attachment only, never a later one.
        let weak = Rc::downgrade(&self.shared);
        let teardown = effect(move || {
            Dispose::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.detach_if_current(generation);
                }
            })
        });
        self.shared.state.borrow_mut().scope_teardown = Some(teardown);
    }

    pub fn detach(&self) {
        self.shared.detach();
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.borrow().phase
    }

    pub fn load_state(&self) -> LoadState {
        match self.phase() {
            Phase::Active | Phase::Fallback => LoadState::Loaded,
            Phase::Idle | Phase::Probing => LoadState::Unloaded,
        }
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        self.shared.state.borrow().fallback
    }

    pub fn device_profile(&self) -> DeviceProfile {
        self.shared.state.borrow().profile
    }

    pub fn has_effect(&self) -> bool {
        self.shared.state.borrow().effect.is_some()
    }

    pub fn stats(&self) -> ControllerStats {
        self.shared.state.borrow().stats
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.shared.config
    }

    /// The static pattern covers every phase except a running effect; content
    /// always sits on top.
    pub fn layers(&self) -> SmallVec<[Layer; 2]> {
        match self.phase() {
            Phase::Active => smallvec![Layer::LiveEffect, Layer::Content],
            _ => smallvec![Layer::StaticPattern, Layer::Content],
        }
    }
}

impl<C: Clone + 'static> Drop for BackgroundController<C> {
    fn drop(&mut self) {
        self.shared.detach();
    }
}

impl<C: Clone + 'static> Shared<C> {
    fn attach(this: &Rc<Self>, container: C) -> u64 {
        let profile = this.classifier.classify(this.probe.as_ref());
        let generation = {
            let mut st = this.state.borrow_mut();
            st.generation += 1;
            st.phase = Phase::Probing;
            st.fallback = None;
            st.profile = profile;
            st.container = Some(container);
            st.generation
        };
        log::debug!("backdrop: attach #{generation}, profile {profile:?}");

        let weak = Rc::downgrade(this);
        let resize_sub = this.host.on_resize(Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_resize();
            }
        }));
        this.state.borrow_mut().resize_sub = Some(resize_sub);

        if profile.is_low_end(this.config.min_mobile_cores) {
            log::debug!("backdrop: low-end mobile device, skipping effect");
            this.enter_fallback(FallbackReason::LowEndDevice);
            return generation;
        }

        let weak = Rc::downgrade(this);
        let timer = this.host.set_timeout(
            this.config.load_delay(),
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    Shared::begin_load(&shared, generation);
                }
            }),
        );
        this.state.borrow_mut().pending_timer = Some(timer);
        generation
    }

    fn is_probing(&self, generation: u64) -> bool {
        let st = self.state.borrow();
        st.generation == generation && st.phase == Phase::Probing
    }

    fn begin_load(this: &Rc<Self>, generation: u64) {
        if !this.is_probing(generation) {
            return;
        }
        this.state.borrow_mut().pending_timer = None;

        let Some(loader) = this.loader.clone() else {
            log::warn!("backdrop: {}; using static pattern", EffectLoadError::Unavailable);
            this.enter_fallback(FallbackReason::LoadFailed);
            return;
        };
        this.state.borrow_mut().stats.load_requests += 1;

        let load = loader.load();
        let weak: Weak<Self> = Rc::downgrade(this);
        this.host.spawn_local(Box::pin(async move {
            let result = load.await;
            if let Some(shared) = weak.upgrade() {
                Shared::finish_load(&shared, generation, result);
            }
        }));
    }

    fn finish_load(
        this: &Rc<Self>,
        generation: u64,
        result: Result<Rc<dyn EffectFactory<C>>, EffectLoadError>,
    ) {
        if !this.is_probing(generation) {
            log::debug!("backdrop: dropping effect load for stale attach #{generation}");
            return;
        }
        let factory = match result {
            Ok(factory) => factory,
            Err(e) => {
                log::warn!("backdrop: {e}; using static pattern");
                this.enter_fallback(FallbackReason::LoadFailed);
                return;
            }
        };

        let (profile, container) = {
            let st = this.state.borrow();
            if st.effect.is_some() {
                return;
            }
            (st.profile, st.container.clone())
        };
        let Some(container) = container else {
            return;
        };

        let config = EffectConfig::for_profile(&this.config, profile);
        match factory.create(&container, &config) {
            Ok(handle) => {
                {
                    let mut st = this.state.borrow_mut();
                    st.effect = Some(handle);
                    st.phase = Phase::Active;
                    st.stats.effects_created += 1;
                    st.monitor = Some(Monitor {
                        sampler: FrameSampler::new(this.host.now(), this.config.sample_window()),
                        watchdog: FpsWatchdog::new(
                            this.config.low_fps_threshold,
                            this.config.low_fps_windows,
                        ),
                    });
                }
                log::debug!("backdrop: effect running (mobile: {})", profile.is_mobile);
                Shared::schedule_frame(this, generation);
            }
            Err(e) => {
                log::warn!("backdrop: {e}; using static pattern");
                this.enter_fallback(FallbackReason::LoadFailed);
            }
        }
    }

    fn schedule_frame(this: &Rc<Self>, generation: u64) {
        let weak = Rc::downgrade(this);
        let pending = this.host.request_frame(Box::new(move |now| {
            if let Some(shared) = weak.upgrade() {
                Shared::on_frame(&shared, generation, now);
            }
        }));
        this.state.borrow_mut().pending_frame = Some(pending);
    }

    fn on_frame(this: &Rc<Self>, generation: u64, now: Instant) {
        let verdict = {
            let mut guard = this.state.borrow_mut();
            let st = &mut *guard;
            st.pending_frame = None;
            if st.generation != generation || st.effect.is_none() {
                return;
            }
            let Some(monitor) = st.monitor.as_mut() else {
                return;
            };
            match monitor.sampler.tick(now) {
                Some(fps) => {
                    st.stats.last_fps = Some(fps);
                    monitor.watchdog.observe(fps, st.profile.is_mobile)
                }
                None => Verdict::Keep,
            }
        };

        match verdict {
            Verdict::Keep => Shared::schedule_frame(this, generation),
            Verdict::Disable => {
                log::info!(
                    "backdrop: frame rate below {} fps for {} windows; switching to static pattern",
                    this.config.low_fps_threshold,
                    this.config.low_fps_windows
                );
                this.enter_fallback(FallbackReason::LowFrameRate);
            }
        }
    }

    fn on_resize(&self) {
        let profile = self.classifier.classify(self.probe.as_ref());
        let (generation, effect) = {
            let mut st = self.state.borrow_mut();
            st.profile = profile;
            (st.generation, st.effect.take())
        };
        let Some(effect) = effect else {
            return;
        };
        effect.resize();

        // The handle may have called back into the controller while resizing.
        let mut st = self.state.borrow_mut();
        if st.generation == generation && st.phase == Phase::Active && st.effect.is_none() {
            st.effect = Some(effect);
        } else {
            st.stats.effects_destroyed += 1;
            drop(st);
            effect.destroy();
        }
    }

    /// One-way for the current attachment: nothing reschedules after this.
    fn enter_fallback(&self, reason: FallbackReason) {
        let (effect, frame) = {
            let mut st = self.state.borrow_mut();
            st.phase = Phase::Fallback;
            st.fallback = Some(reason);
            st.monitor = None;
            if st.effect.is_some() {
                st.stats.effects_destroyed += 1;
            }
            (st.effect.take(), st.pending_frame.take())
        };
        log::debug!("backdrop: fallback ({reason:?})");
        if let Some(frame) = frame {
            frame.run();
        }
        if let Some(effect) = effect {
            effect.destroy();
        }
    }

    fn detach_if_current(&self, generation: u64) {
        if self.state.borrow().generation == generation {
            self.detach();
        }
    }

    fn detach(&self) {
        let (effect, cleanups) = {
            let mut st = self.state.borrow_mut();
            st.generation += 1;
            if st.phase == Phase::Idle {
                return;
            }
            st.phase = Phase::Idle;
            st.fallback = None;
            st.monitor = None;
            st.container = None;
            if st.effect.is_some() {
                st.stats.effects_destroyed += 1;
            }
            (
                st.effect.take(),
                [
                    st.resize_sub.take(),
                    st.pending_timer.take(),
                    st.pending_frame.take(),
                    st.scope_teardown.take(),
                ],
            )
        };
        log::debug!("backdrop: detached");
        for cleanup in cleanups.into_iter().flatten() {
            cleanup.run();
        }
        if let Some(effect) = effect {
            effect.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalBoxFuture;
    use crate::testing::{LoadBehavior, ManualHost, ScriptedLoader, StaticProbe};
    use folio_core::Scope;
    use std::cell::{Cell, RefCell};
    use web_time::Duration;

    type Controller = BackgroundController<&'static str>;

    struct Rig {
        host: ManualHost,
        probe: Rc<StaticProbe>,
        loader: Rc<ScriptedLoader>,
        ctl: Controller,
    }

    fn rig(probe: StaticProbe, behavior: LoadBehavior) -> Rig {
        let _ = env_logger::builder().is_test(true).try_init();
        let host = ManualHost::new();
        let probe = Rc::new(probe);
        let loader = Rc::new(ScriptedLoader::new(behavior));
        let dyn_loader: Rc<dyn EffectLoader<&'static str>> = loader.clone();
        let ctl = BackgroundController::new(
            Rc::new(host.clone()),
            probe.clone(),
            Some(dyn_loader),
            BackgroundConfig::default(),
        )
        .unwrap();
        Rig {
            host,
            probe,
            loader,
            ctl,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// One full sampling window at `fps`, exact for divisors of 1000.
    fn window_at(host: &ManualHost, fps: u32) {
        host.pump_frames(fps, ms(1000 / fps as u64));
    }

    #[test]
    fn desktop_loads_after_delay() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        assert_eq!(r.ctl.phase(), Phase::Probing);
        assert_eq!(r.ctl.load_state(), LoadState::Unloaded);

        r.host.advance(ms(99));
        assert_eq!(r.loader.loads(), 0);
        assert_eq!(r.ctl.layers().as_slice(), &[Layer::StaticPattern, Layer::Content]);

        r.host.advance(ms(1));
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.ctl.load_state(), LoadState::Loaded);
        assert_eq!(r.ctl.layers().as_slice(), &[Layer::LiveEffect, Layer::Content]);

        let log = r.loader.log();
        assert_eq!(log.created.get(), 1);
        let cfg = log.configs.borrow()[0].clone();
        assert!(cfg.mouse_controls && !cfg.touch_controls && cfg.show_lines);
    }

    #[test]
    fn low_end_phone_never_requests_the_effect() {
        let r = rig(StaticProbe::phone(Some(2)), LoadBehavior::Ready);
        r.ctl.attach("#hero");

        assert_eq!(r.ctl.phase(), Phase::Fallback);
        assert_eq!(r.ctl.fallback_reason(), Some(FallbackReason::LowEndDevice));
        assert_eq!(r.host.pending_timers(), 0);

        r.host.advance(ms(1000));
        assert_eq!(r.loader.loads(), 0);
        assert_eq!(r.loader.log().created.get(), 0);
        assert_eq!(r.ctl.layers()[0], Layer::StaticPattern);
    }

    #[test]
    fn phone_with_unknown_cores_gets_mobile_tuning() {
        let r = rig(StaticProbe::phone(None), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        assert_eq!(r.ctl.phase(), Phase::Active);
        let log = r.loader.log();
        let cfg = log.configs.borrow()[0].clone();
        assert!(!cfg.mouse_controls && cfg.touch_controls && !cfg.gyro_controls);
        assert!(!cfg.show_lines);
        assert_eq!(cfg.spacing, r.ctl.config().mobile.spacing);
    }

    #[test]
    fn three_slow_windows_on_mobile_fall_back() {
        let r = rig(StaticProbe::phone(Some(8)), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));
        assert_eq!(r.ctl.phase(), Phase::Active);

        window_at(&r.host, 20);
        window_at(&r.host, 20);
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.ctl.stats().last_fps, Some(20));

        window_at(&r.host, 20);
        assert_eq!(r.ctl.phase(), Phase::Fallback);
        assert_eq!(r.ctl.fallback_reason(), Some(FallbackReason::LowFrameRate));
        assert_eq!(r.ctl.load_state(), LoadState::Loaded);
        assert!(!r.ctl.has_effect());
        assert_eq!(r.loader.log().destroyed.get(), 1);
        assert_eq!(r.host.pending_frames(), 0);

        // Never recreated during this attachment.
        r.host.pump_frames(120, ms(16));
        assert_eq!(r.loader.log().created.get(), 1);
    }

    #[test]
    fn a_good_window_resets_the_streak() {
        let r = rig(StaticProbe::phone(Some(8)), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        window_at(&r.host, 20);
        // 46 frames at 45 fps closes the window just past one second.
        r.host.pump_frames(46, Duration::from_secs(1) / 45);
        assert_eq!(r.ctl.stats().last_fps, Some(45));
        window_at(&r.host, 20);
        window_at(&r.host, 20);
        assert_eq!(r.ctl.phase(), Phase::Active);

        window_at(&r.host, 20);
        assert_eq!(r.ctl.phase(), Phase::Fallback);
    }

    #[test]
    fn desktop_ignores_low_frame_rate() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        for _ in 0..5 {
            window_at(&r.host, 10);
        }
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.ctl.stats().last_fps, Some(10));
        assert_eq!(r.host.pending_frames(), 1);
    }

    #[test]
    fn detach_before_delay_cancels_load() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.ctl.detach();

        r.host.advance(ms(1000));
        assert_eq!(r.loader.loads(), 0);
        assert_eq!(r.loader.log().created.get(), 0);
        assert_eq!(r.ctl.phase(), Phase::Idle);
    }

    #[test]
    fn detach_while_load_in_flight_creates_nothing() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Gated);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));
        assert_eq!(r.loader.loads(), 1);
        assert_eq!(r.host.pending_tasks(), 1);

        r.ctl.detach();
        r.loader.release();
        r.host.run_tasks();

        assert_eq!(r.host.pending_tasks(), 0);
        assert_eq!(r.loader.log().created.get(), 0);
        assert_eq!(r.ctl.phase(), Phase::Idle);
    }

    #[test]
    fn stale_load_is_ignored_after_reattach() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Gated);
        r.ctl.attach("#first");
        r.host.advance(ms(100));
        r.ctl.attach("#second");
        r.loader.release();
        r.host.run_tasks();
        // The first load resolved against a dead generation.
        assert_eq!(r.loader.log().created.get(), 0);
        assert_eq!(r.ctl.phase(), Phase::Probing);

        r.host.advance(ms(100));
        assert_eq!(r.loader.log().created.get(), 1);
        assert_eq!(r.ctl.phase(), Phase::Active);
    }

    #[test]
    fn detach_is_idempotent() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        r.ctl.detach();
        r.ctl.detach();

        let log = r.loader.log();
        assert_eq!(log.destroyed.get(), 1);
        assert_eq!(log.live(), 0);
        assert_eq!(r.host.resize_listeners(), 0);
        assert_eq!(r.host.pending_frames(), 0);
        assert_eq!(r.ctl.stats().effects_destroyed, 1);
    }

    #[test]
    fn load_failure_falls_back() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Fail);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        assert_eq!(r.ctl.phase(), Phase::Fallback);
        assert_eq!(r.ctl.fallback_reason(), Some(FallbackReason::LoadFailed));
        assert_eq!(r.ctl.load_state(), LoadState::Loaded);
        assert_eq!(r.host.pending_frames(), 0);
    }

    #[test]
    fn create_failure_falls_back() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.loader.factory.fail_create.set(true);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));

        assert_eq!(r.ctl.fallback_reason(), Some(FallbackReason::LoadFailed));
        assert!(!r.ctl.has_effect());
    }

    #[test]
    fn missing_loader_falls_back() {
        let host = ManualHost::new();
        let ctl: Controller = BackgroundController::new(
            Rc::new(host.clone()),
            Rc::new(StaticProbe::desktop()),
            None,
            BackgroundConfig::default(),
        )
        .unwrap();
        ctl.attach("#hero");
        host.advance(ms(100));
        assert_eq!(ctl.fallback_reason(), Some(FallbackReason::LoadFailed));
    }

    #[test]
    fn resize_reclassifies_and_resizes_without_recreating() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));
        assert!(!r.ctl.device_profile().is_mobile);

        r.probe.width.set(500.0);
        r.host.resize();

        assert!(r.ctl.device_profile().is_mobile);
        let log = r.loader.log();
        assert_eq!(log.resized.get(), 1);
        assert_eq!(log.created.get(), 1);
    }

    #[test]
    fn dropping_controller_destroys_effect() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));
        let log = r.loader.log();
        let host = r.host.clone();

        drop(r);
        assert_eq!(log.live(), 0);
        assert_eq!(host.resize_listeners(), 0);
    }

    #[test]
    fn scope_teardown_detaches() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        let scope = Scope::new();
        scope.run(|| r.ctl.attach("#hero"));
        r.host.advance(ms(100));
        assert_eq!(r.ctl.phase(), Phase::Active);

        scope.dispose();
        assert_eq!(r.ctl.phase(), Phase::Idle);
        assert_eq!(r.loader.log().live(), 0);
    }

    #[test]
    fn old_scope_teardown_leaves_newer_attachment_running() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        let old = Scope::new();
        old.run(|| r.ctl.attach("#old"));
        r.ctl.detach();

        let current = Scope::new();
        current.run(|| r.ctl.attach("#new"));
        r.host.advance(ms(100));
        assert_eq!(r.ctl.phase(), Phase::Active);

        old.dispose();
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.loader.log().live(), 1);

        current.dispose();
        assert_eq!(r.ctl.phase(), Phase::Idle);
        assert_eq!(r.loader.log().live(), 0);
    }

    #[test]
    fn reattach_under_new_scope_survives_old_scope() {
        let r = rig(StaticProbe::desktop(), LoadBehavior::Ready);
        let old = Scope::new();
        old.run(|| r.ctl.attach("#old"));
        let current = Scope::new();
        current.run(|| r.ctl.attach("#new"));

        old.dispose();
        assert_eq!(r.ctl.phase(), Phase::Probing);
        r.host.advance(ms(100));
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.loader.log().created.get(), 1);
    }

    struct CallbackHandle {
        on_resize: Rc<dyn Fn()>,
        destroyed: Rc<Cell<usize>>,
    }

    impl EffectHandle for CallbackHandle {
        fn resize(&self) {
            (self.on_resize)();
        }

        fn destroy(self: Box<Self>) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    struct CallbackFactory {
        on_resize: Rc<dyn Fn()>,
        destroyed: Rc<Cell<usize>>,
    }

    impl EffectFactory<&'static str> for CallbackFactory {
        fn create(
            &self,
            _container: &&'static str,
            _config: &EffectConfig,
        ) -> Result<Box<dyn EffectHandle>, EffectLoadError> {
            Ok(Box::new(CallbackHandle {
                on_resize: self.on_resize.clone(),
                destroyed: self.destroyed.clone(),
            }))
        }
    }

    struct ReadyLoader(Rc<dyn EffectFactory<&'static str>>);

    impl EffectLoader<&'static str> for ReadyLoader {
        fn load(
            &self,
        ) -> LocalBoxFuture<Result<Rc<dyn EffectFactory<&'static str>>, EffectLoadError>> {
            let factory = self.0.clone();
            Box::pin(async move { Ok::<_, EffectLoadError>(factory) })
        }
    }

    #[test]
    fn effect_may_call_back_into_controller_while_resizing() {
        let host = ManualHost::new();
        let slot: Rc<RefCell<Option<Weak<Controller>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(None));
        let destroyed = Rc::new(Cell::new(0));

        let (s, seen2) = (slot.clone(), seen.clone());
        let factory = Rc::new(CallbackFactory {
            on_resize: Rc::new(move || {
                let ctl = s.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(ctl) = ctl {
                    seen2.set(Some(ctl.phase()));
                    ctl.detach();
                }
            }),
            destroyed: destroyed.clone(),
        });
        let loader: Rc<dyn EffectLoader<&'static str>> = Rc::new(ReadyLoader(factory));
        let ctl = Rc::new(
            BackgroundController::new(
                Rc::new(host.clone()),
                Rc::new(StaticProbe::desktop()),
                Some(loader),
                BackgroundConfig::default(),
            )
            .unwrap(),
        );
        *slot.borrow_mut() = Some(Rc::downgrade(&ctl));

        ctl.attach("#hero");
        host.advance(ms(100));
        assert_eq!(ctl.phase(), Phase::Active);

        host.resize();
        assert_eq!(seen.get(), Some(Phase::Active));
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(destroyed.get(), 1);
        assert_eq!(ctl.stats().effects_destroyed, 1);
        assert_eq!(host.resize_listeners(), 0);
    }

    #[test]
    fn reattach_after_fallback_starts_over() {
        let r = rig(StaticProbe::phone(Some(8)), LoadBehavior::Ready);
        r.ctl.attach("#hero");
        r.host.advance(ms(100));
        for _ in 0..3 {
            window_at(&r.host, 20);
        }
        assert_eq!(r.ctl.phase(), Phase::Fallback);

        r.ctl.detach();
        r.ctl.attach("#hero");
        assert_eq!(r.ctl.fallback_reason(), None);
        r.host.advance(ms(100));
        assert_eq!(r.ctl.phase(), Phase::Active);
        assert_eq!(r.loader.log().created.get(), 2);
    }
}
