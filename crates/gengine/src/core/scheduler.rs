//! The engine loop: logic and draw cadences, input routing and error boundary.
//!
//! One [`GameLoop::tick`] polls input, runs a logic step if the logic cadence
//! is due, runs a draw step if the draw cadence is due, and refreshes the
//! [`LoopStats`]. Errors and panics from either step stop at this boundary
//! and go through the [`ErrorReporter`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::api::config::EngineProperties;
use crate::api::error::{EngineError, Result};
use crate::api::game::{EngineContext, Game};
use crate::core::auto_offset::{AutoOffset, AutoOffsetConfig};
use crate::core::time::{Cadence, Clock, SystemClock};
use crate::input::queue::{InputSource, WindowEvent};
use crate::input::state::EngineEvent;
use crate::renderer::traits::Renderer;
use crate::systems::render::{draw_overlay, draw_scene};

/// Snapshot of loop timing, readable while the loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub fps: f64,
    pub tps: f64,
    /// Last measured interval between draw steps (ms).
    pub frame_interval_ms: f64,
    /// Last measured interval between logic steps (ms).
    pub logic_interval_ms: f64,
    pub poor_framerate: bool,
    pub poor_logicrate: bool,
    pub tps_offset: f64,
    pub fps_offset: f64,
    pub logic_steps: u64,
    pub frames: u64,
    pub ticks: u64,
    pub texture_rebuilds: u64,
}

impl LoopStats {
    /// Take the logic half of `other`.
    pub(crate) fn absorb_logic(&mut self, other: &LoopStats) {
        self.tps = other.tps;
        self.logic_interval_ms = other.logic_interval_ms;
        self.poor_logicrate = other.poor_logicrate;
        self.tps_offset = other.tps_offset;
        self.logic_steps = other.logic_steps;
    }

    /// Take the draw half of `other`.
    pub(crate) fn absorb_draw(&mut self, other: &LoopStats) {
        self.fps = other.fps;
        self.frame_interval_ms = other.frame_interval_ms;
        self.poor_framerate = other.poor_framerate;
        self.fps_offset = other.fps_offset;
        self.frames = other.frames;
        self.texture_rebuilds = other.texture_rebuilds;
    }
}

/// What to do after a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop the loop and hand the error to the host.
    Abort,
    /// Suppress the error and keep running. Nothing is rolled back.
    Continue,
}

/// Receives every error caught at the loop boundary.
///
/// A desktop host may show a blocking abort/continue dialog here.
/// Non-continuable errors abort whatever the reporter answers.
pub trait ErrorReporter: Send {
    fn report(&mut self, error: &EngineError) -> ErrorAction;
}

/// Logs caught errors and keeps running, unless built with [`LogReporter::aborting`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    abort: bool,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort on the first error.
    pub fn aborting() -> Self {
        Self { abort: true }
    }
}

impl ErrorReporter for LogReporter {
    fn report(&mut self, error: &EngineError) -> ErrorAction {
        log::error!("caught error in engine step (code {}): {error}", error.exit_code());
        if self.abort || !error.is_continuable() {
            ErrorAction::Abort
        } else {
            ErrorAction::Continue
        }
    }
}

pub type SharedReporter = Arc<Mutex<Box<dyn ErrorReporter>>>;

pub fn shared_reporter(reporter: impl ErrorReporter + 'static) -> SharedReporter {
    let boxed: Box<dyn ErrorReporter> = Box::new(reporter);
    Arc::new(Mutex::new(boxed))
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// A window handler asked to stop.
    Stop,
    /// Abnormal shutdown (window close with no handler). Skip the cooperative wait.
    ForceStop,
}

/// Answer of a window event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Continue,
    Stop,
}

/// Fixed-timestep scheduler driving one [`EngineContext`].
pub struct GameLoop<C: Clock = SystemClock> {
    clock: C,
    properties: EngineProperties,
    auto_offset: AutoOffset,
    logic: Cadence,
    draw: Cadence,
    /// Alternates every tick while the framelimiter is off.
    draw_toggle: bool,
    frames_since_rebuild: u32,
    reporter: SharedReporter,
    stats: LoopStats,
}

impl GameLoop<SystemClock> {
    pub fn new(properties: EngineProperties) -> Self {
        Self::with_clock(properties, SystemClock::new())
    }
}

impl<C: Clock> GameLoop<C> {
    pub fn with_clock(properties: EngineProperties, clock: C) -> Self {
        let now = clock.now_ms();
        let window = properties.sampler_window;
        Self {
            auto_offset: AutoOffset::new(AutoOffsetConfig::default(), &properties),
            logic: Cadence::new(now, window),
            draw: Cadence::new(now, window),
            draw_toggle: false,
            frames_since_rebuild: 0,
            reporter: shared_reporter(LogReporter::new()),
            stats: LoopStats {
                tps_offset: properties.tps_offset,
                fps_offset: properties.fps_offset,
                ..Default::default()
            },
            properties,
            clock,
        }
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = shared_reporter(reporter);
        self
    }

    /// Share one reporter between loops (logic and draw threads).
    pub fn with_shared_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_auto_offset(mut self, config: AutoOffsetConfig) -> Self {
        self.auto_offset = AutoOffset::new(config, &self.properties);
        self
    }

    pub fn properties(&self) -> &EngineProperties {
        &self.properties
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut LoopStats {
        &mut self.stats
    }

    /// One full tick: input, logic if due, draw if due, stats.
    pub fn tick(
        &mut self,
        ctx: &mut EngineContext,
        game: &mut dyn Game,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
    ) -> Result<TickOutcome> {
        let outcome = self.poll_input(ctx, game, input);
        if outcome == TickOutcome::ForceStop {
            return Ok(outcome);
        }
        self.logic_if_due(ctx, game)?;
        self.draw_if_due(ctx, renderer)?;
        self.stats.ticks += 1;
        Ok(outcome)
    }

    /// Feed pending input into the context and route window/device events.
    pub fn poll_input(
        &mut self,
        ctx: &mut EngineContext,
        game: &mut dyn Game,
        input: &mut dyn InputSource,
    ) -> TickOutcome {
        let events = input.poll();
        if events.is_empty() {
            return TickOutcome::Continue;
        }
        let mut outcome = TickOutcome::Continue;
        for event in ctx.input_mut().process(events) {
            match event {
                EngineEvent::DeviceReset => {
                    log::debug!("render device reset; textures will be rebuilt");
                    ctx.request_texture_rebuild();
                }
                EngineEvent::Window(window) => match game.on_window_event(window, ctx) {
                    Some(EventResponse::Stop) => outcome = TickOutcome::Stop,
                    Some(EventResponse::Continue) => {}
                    None if window == WindowEvent::Close => {
                        log::warn!("window closed with no handler installed; forcing stop");
                        return TickOutcome::ForceStop;
                    }
                    None => {}
                },
            }
        }
        outcome
    }

    /// Run a logic step if its cadence is due. Returns whether one ran.
    pub fn logic_if_due(&mut self, ctx: &mut EngineContext, game: &mut dyn Game) -> Result<bool> {
        let now = self.clock.now_ms();
        if !self.logic.is_due(now, self.properties.target_logic_interval()) {
            return Ok(false);
        }
        let result = catch_unwind(AssertUnwindSafe(|| self.logic_step(ctx, game, now)));
        self.settle(result)?;

        let target = self.properties.target_logic_interval();
        self.stats.tps = self.logic.rate();
        self.stats.logic_interval_ms = self.logic.last_interval();
        self.stats.poor_logicrate =
            self.stats.logic_interval_ms > target + self.properties.poor_rate_margin_ms;
        self.stats.tps_offset = self.properties.tps_offset;
        self.stats.logic_steps = self.logic.runs();
        Ok(true)
    }

    /// Run a draw step if its cadence is due, or every other call with the
    /// framelimiter off. Returns whether one ran.
    pub fn draw_if_due(&mut self, ctx: &mut EngineContext, renderer: &mut dyn Renderer) -> Result<bool> {
        let now = self.clock.now_ms();
        let due = if self.properties.enable_framelimiter {
            self.draw.is_due(now, self.properties.target_frame_interval())
        } else {
            self.draw_toggle = !self.draw_toggle;
            self.draw_toggle
        };
        if !due {
            return Ok(false);
        }
        let result = catch_unwind(AssertUnwindSafe(|| self.draw_step(ctx, renderer, now)));
        self.settle(result)?;

        let target = self.properties.target_frame_interval();
        self.stats.fps = self.draw.rate();
        self.stats.frame_interval_ms = self.draw.last_interval();
        self.stats.poor_framerate =
            self.stats.frame_interval_ms > target + self.properties.poor_rate_margin_ms;
        self.stats.fps_offset = self.properties.fps_offset;
        self.stats.frames = self.draw.runs();
        Ok(true)
    }

    fn logic_step(&mut self, ctx: &mut EngineContext, game: &mut dyn Game, now: f64) -> Result<()> {
        let interval = self.logic.mark(now);
        ctx.input_mut().refresh();
        game.update(ctx)?;
        ctx.step(interval, self.properties.animate_on_logic)?;
        if self.properties.auto_offset {
            self.auto_offset.adjust_logic(&mut self.properties, interval);
        }
        Ok(())
    }

    fn draw_step(&mut self, ctx: &mut EngineContext, renderer: &mut dyn Renderer, now: f64) -> Result<()> {
        let interval = self.draw.mark(now);
        renderer.set_draw_color(self.properties.clear_color);
        renderer.clear()?;

        let every = self.properties.texture_rebuild_every();
        self.frames_since_rebuild += 1;
        let reset = ctx.take_texture_rebuild();
        if reset || (every > 0 && self.frames_since_rebuild >= every) {
            renderer.rebuild_textures()?;
            self.frames_since_rebuild = 0;
            self.stats.texture_rebuilds += 1;
        }

        if let Some(scene) = ctx.active_scene() {
            draw_scene(scene, renderer, self.properties.draw_physics_bounds)?;
        }
        if self.properties.debug_overlay {
            draw_overlay(&self.stats, renderer)?;
        }
        renderer.present()?;

        if !self.properties.animate_on_logic {
            ctx.animate();
        }
        if self.properties.auto_offset && self.properties.enable_framelimiter {
            self.auto_offset.adjust_draw(&mut self.properties, interval);
        }
        Ok(())
    }

    /// Turn a caught step result into continue/abort.
    fn settle(&mut self, result: std::thread::Result<Result<()>>) -> Result<()> {
        let error = match result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(payload) => EngineError::Panicked(panic_message(payload.as_ref())),
        };
        let action = match self.reporter.lock() {
            Ok(mut reporter) => reporter.report(&error),
            Err(_) => ErrorAction::Abort,
        };
        if action == ErrorAction::Abort || !error.is_continuable() {
            return Err(error);
        }
        log::warn!("continuing after error: {error}");
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Size;
    use crate::components::object::{GameObject, ObjectBehavior};
    use crate::components::instance::Instance;
    use crate::components::sprite::{SpriteHandle, TextureId};
    use crate::core::scene::{Scene, SceneContext};
    use crate::core::time::ManualClock;
    use crate::input::queue::{InputEvent, InputQueue};
    use crate::renderer::commands::CommandBuffer;
    use glam::IVec2;

    struct Demo;

    impl Game for Demo {
        fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
            let obj = ctx.objects.add(
                GameObject::new("coin")
                    .with_sprite(SpriteHandle::new(TextureId(0), "coin", 4, Size::new(8, 8))),
            )?;
            ctx.scenes.add_scene(Scene::new("main").place(&obj, IVec2::new(10, 10)))?;
            ctx.load_scene("main")
        }
    }

    struct Failing {
        fail: bool,
        panic: bool,
    }

    impl Game for Failing {
        fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            Ok(())
        }

        fn update(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            if self.panic {
                panic!("boom");
            }
            if self.fail {
                return Err(EngineError::InstanceNotFound("ghost".into()));
            }
            Ok(())
        }
    }

    fn setup(properties: EngineProperties) -> (GameLoop<ManualClock>, ManualClock, EngineContext, Demo) {
        let clock = ManualClock::new();
        let gl = GameLoop::with_clock(properties, clock.clone());
        let mut ctx = EngineContext::new();
        let mut game = Demo;
        game.init(&mut ctx).unwrap();
        (gl, clock, ctx, game)
    }

    fn run(
        gl: &mut GameLoop<ManualClock>,
        clock: &ManualClock,
        ctx: &mut EngineContext,
        game: &mut dyn Game,
        renderer: &mut CommandBuffer,
        ticks: usize,
        step_ms: f64,
    ) {
        let mut input = InputQueue::new();
        for _ in 0..ticks {
            clock.advance(step_ms);
            gl.tick(ctx, game, &mut input, renderer).unwrap();
        }
    }

    #[test]
    fn ten_seconds_at_64_tps_is_about_640_steps() {
        let (mut gl, clock, mut ctx, mut game) = setup(EngineProperties::default());
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 40_000, 0.25);
        let steps = gl.stats().logic_steps;
        assert!((620..=660).contains(&steps), "logic steps = {steps}");
        let frames = gl.stats().frames;
        assert!((580..=620).contains(&frames), "frames = {frames}");
        assert!((gl.stats().tps - 64.0).abs() < 2.0, "tps = {}", gl.stats().tps);
    }

    #[test]
    fn cadence_without_auto_offset_follows_tick_grid() {
        let props = EngineProperties {
            auto_offset: false,
            ..Default::default()
        };
        let (mut gl, clock, mut ctx, mut game) = setup(props);
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 40_000, 0.25);
        // due at 15.75 ms on a 0.25 ms grid
        assert_eq!(gl.stats().logic_steps, 634);
        assert_eq!(gl.properties().tps_offset, 0.0);
    }

    #[test]
    fn auto_offset_stays_within_half_range() {
        let (mut gl, clock, mut ctx, mut game) = setup(EngineProperties::default());
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 8_000, 0.25);
        let offset = gl.properties().tps_offset;
        assert!(offset.abs() <= 2.0 + 1e-9, "offset = {offset}");
        assert!(offset < 0.0, "a late grid should pull the offset down");
    }

    #[test]
    fn framelimiter_off_draws_every_other_tick() {
        let props = EngineProperties {
            enable_framelimiter: false,
            ..Default::default()
        };
        let (mut gl, clock, mut ctx, mut game) = setup(props);
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 100, 0.25);
        assert_eq!(buf.presents, 50);
    }

    #[test]
    fn draw_step_presents_scene_and_animates() {
        let (mut gl, clock, mut ctx, mut game) = setup(EngineProperties::default());
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 1, 20.0);
        assert_eq!(buf.presents, 1);
        assert_eq!(buf.presented_sprites().count(), 1);
        let coin = ctx.active_scene().unwrap().instances().iter().next().unwrap();
        assert_eq!(coin.image_index(), 1);
    }

    #[test]
    fn textures_rebuild_on_schedule_and_device_reset() {
        let props = EngineProperties {
            texture_rebuild_frames: Some(3),
            ..Default::default()
        };
        let (mut gl, clock, mut ctx, mut game) = setup(props);
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        for _ in 0..6 {
            clock.advance(20.0);
            gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap();
        }
        assert_eq!(buf.texture_rebuilds, 2);

        input.push(InputEvent::DeviceReset);
        clock.advance(20.0);
        gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap();
        assert_eq!(buf.texture_rebuilds, 3);
        assert_eq!(gl.stats().texture_rebuilds, 3);
    }

    #[test]
    fn close_without_handler_forces_stop() {
        let (mut gl, _clock, mut ctx, mut game) = setup(EngineProperties::default());
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        input.push(InputEvent::Window(WindowEvent::Close));
        let outcome = gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap();
        assert_eq!(outcome, TickOutcome::ForceStop);
    }

    #[test]
    fn close_with_handler_stops_cooperatively() {
        struct Closable;
        impl Game for Closable {
            fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
                Ok(())
            }
            fn on_window_event(&mut self, event: WindowEvent, _ctx: &mut EngineContext) -> Option<EventResponse> {
                Some(if event == WindowEvent::Close {
                    EventResponse::Stop
                } else {
                    EventResponse::Continue
                })
            }
        }
        let mut gl = GameLoop::with_clock(EngineProperties::default(), ManualClock::new());
        let mut ctx = EngineContext::new();
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        input.push(InputEvent::Window(WindowEvent::FocusLost));
        input.push(InputEvent::Window(WindowEvent::Close));
        let outcome = gl.tick(&mut ctx, &mut Closable, &mut input, &mut buf).unwrap();
        assert_eq!(outcome, TickOutcome::Stop);
    }

    #[test]
    fn continuable_errors_are_reported_and_suppressed() {
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone());
        let mut ctx = EngineContext::new();
        let mut game = Failing {
            fail: true,
            panic: false,
        };
        let mut buf = CommandBuffer::new();
        run(&mut gl, &clock, &mut ctx, &mut game, &mut buf, 3, 20.0);
        assert_eq!(gl.stats().logic_steps, 3);
    }

    #[test]
    fn aborting_reporter_returns_the_error() {
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone())
            .with_reporter(LogReporter::aborting());
        let mut ctx = EngineContext::new();
        let mut game = Failing {
            fail: true,
            panic: false,
        };
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        clock.advance(20.0);
        let err = gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap_err();
        assert!(matches!(err, EngineError::InstanceNotFound(_)));
    }

    #[test]
    fn panics_become_engine_errors() {
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone())
            .with_reporter(LogReporter::aborting());
        let mut ctx = EngineContext::new();
        let mut game = Failing {
            fail: false,
            panic: true,
        };
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        clock.advance(20.0);
        let err = gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap_err();
        assert!(matches!(err, EngineError::Panicked(msg) if msg == "boom"));
    }

    #[test]
    fn fatal_errors_abort_even_when_reporter_continues() {
        struct Stubborn;
        impl ErrorReporter for Stubborn {
            fn report(&mut self, _error: &EngineError) -> ErrorAction {
                ErrorAction::Continue
            }
        }
        struct Fatal;
        impl Game for Fatal {
            fn init(&mut self, _ctx: &mut EngineContext) -> Result<()> {
                Ok(())
            }
            fn update(&mut self, _ctx: &mut EngineContext) -> Result<()> {
                Err(EngineError::Fatal("disk on fire".into()))
            }
        }
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone()).with_reporter(Stubborn);
        let mut ctx = EngineContext::new();
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();
        clock.advance(20.0);
        assert!(gl.tick(&mut ctx, &mut Fatal, &mut input, &mut buf).is_err());
    }

    #[test]
    fn hooks_see_pressed_keys_for_one_logic_step() {
        struct Jumper(Arc<Mutex<Vec<bool>>>);
        impl ObjectBehavior for Jumper {
            fn step(&self, _instance: &mut Instance, ctx: &mut SceneContext<'_>) -> Result<()> {
                self.0.lock().unwrap().push(ctx.input().key_pressed(32));
                Ok(())
            }
        }
        struct JumpGame(Arc<Mutex<Vec<bool>>>);
        impl Game for JumpGame {
            fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
                let obj = ctx
                    .objects
                    .add(GameObject::new("jumper").with_behavior(Jumper(Arc::clone(&self.0))))?;
                ctx.scenes.add_scene(Scene::new("s").place(&obj, IVec2::ZERO))?;
                ctx.load_scene("s")
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut game = JumpGame(Arc::clone(&seen));
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone());
        let mut ctx = EngineContext::new();
        game.init(&mut ctx).unwrap();
        let mut buf = CommandBuffer::new();
        let mut input = InputQueue::new();

        input.push(InputEvent::KeyDown { key: 32 });
        for _ in 0..3 {
            clock.advance(20.0);
            gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![true, false, false]);
    }
}
