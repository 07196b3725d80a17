//! Threaded engine host.
//!
//! [`Engine::start`] moves a [`Game`] onto a loop thread (synchronous mode) or
//! onto a logic thread plus a draw thread sharing the [`EngineContext`] behind
//! a mutex (asynchronous mode). The host keeps a handle to request a
//! cooperative stop, force a stop, or read the loop statistics.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::api::config::{EngineMode, EngineProperties};
use crate::api::error::{EngineError, Result};
use crate::api::game::{EngineContext, Game};
use crate::core::scheduler::{
    shared_reporter, ErrorReporter, GameLoop, LoopStats, SharedReporter, TickOutcome,
};
use crate::input::queue::InputSource;
use crate::renderer::traits::Renderer;

/// Pause between ticks so an idle loop does not spin a core.
const IDLE_SLEEP: Duration = Duration::from_micros(200);

#[derive(Default)]
struct Shared {
    stop: AtomicBool,
    forced: AtomicBool,
    live: AtomicUsize,
    stats: Mutex<LoopStats>,
    error: Mutex<Option<EngineError>>,
}

impl Shared {
    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn record_error(&self, err: EngineError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn stats(&self) -> MutexGuard<'_, LoopStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the live-thread count when a loop thread exits, panicking or not.
struct LiveGuard(Arc<Shared>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle to a running engine.
pub struct Engine {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    mode: EngineMode,
    stop_timeout: Duration,
    stop_poll: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start `game` on its own thread(s).
    ///
    /// `make_renderer` runs on the thread that draws, so native renderer
    /// handles never cross threads.
    pub fn start<G, R, F, I>(
        game: G,
        properties: EngineProperties,
        make_renderer: F,
        input: I,
        reporter: impl ErrorReporter + 'static,
    ) -> Result<Engine>
    where
        G: Game + 'static,
        R: Renderer + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
        I: InputSource + 'static,
    {
        let shared = Arc::new(Shared::default());
        let reporter = shared_reporter(reporter);
        let mode = properties.mode;
        let stop_timeout = Duration::from_millis(properties.stop_timeout_ms);
        let stop_poll = Duration::from_millis(properties.stop_poll_ms.max(1));
        log::info!(
            "starting '{}' ({mode:?}, {} tps / {} fps)",
            properties.title,
            properties.target_tps,
            properties.target_fps
        );

        let mut engine = Engine {
            shared: Arc::clone(&shared),
            threads: Vec::new(),
            mode,
            stop_timeout,
            stop_poll,
        };

        match mode {
            EngineMode::Synchronous => {
                let s = Arc::clone(&shared);
                engine.threads.push(spawn_loop("gengine-loop", &shared, move || {
                    run_sync(&s, game, properties, make_renderer, input, reporter)
                })?);
            }
            EngineMode::Asynchronous => {
                let ctx = Arc::new(Mutex::new(EngineContext::new()));

                let (s, c, props, rep) = (
                    Arc::clone(&shared),
                    Arc::clone(&ctx),
                    properties.clone(),
                    Arc::clone(&reporter),
                );
                engine.threads.push(spawn_loop("gengine-logic", &shared, move || {
                    run_logic(&s, &c, game, props, input, rep)
                })?);

                let s = Arc::clone(&shared);
                let spawned = spawn_loop("gengine-draw", &shared, move || {
                    run_draw(&s, &ctx, properties, make_renderer, reporter)
                });
                match spawned {
                    Ok(handle) => engine.threads.push(handle),
                    Err(err) => {
                        engine.force_stop();
                        return Err(err);
                    }
                }
            }
        }
        Ok(engine)
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Whether any loop thread is still alive.
    pub fn is_running(&self) -> bool {
        self.shared.live.load(Ordering::Acquire) > 0
    }

    /// Whether the loop shut itself down abnormally (window closed with no handler).
    pub fn was_forced(&self) -> bool {
        self.shared.forced.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> LoopStats {
        *self.shared.stats()
    }

    /// Ask the loop to stop and wait for it, up to the configured timeout.
    ///
    /// Returns the error that ended the loop, if any. On timeout the threads
    /// keep running; call [`Engine::force_stop`] to abandon them.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.request_stop();
        let deadline = Instant::now() + self.stop_timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                let ms = self.stop_timeout.as_millis() as u64;
                log::error!("engine did not stop within {ms} ms");
                return Err(EngineError::StopTimeout(ms));
            }
            thread::sleep(self.stop_poll);
        }
        self.join();
        self.take_error()
    }

    /// Block until the loop ends on its own, then return its error if any.
    pub fn wait(&mut self) -> Result<()> {
        self.join();
        self.take_error()
    }

    /// Stop without waiting. The threads are detached and finish their
    /// current step on their own.
    pub fn force_stop(&mut self) {
        log::warn!("forcing engine stop");
        self.shared.forced.store(true, Ordering::Release);
        self.shared.request_stop();
        self.threads.clear();
    }

    fn join(&mut self) {
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("engine").to_string();
            if handle.join().is_err() {
                log::error!("{name} thread panicked");
            }
        }
    }

    fn take_error(&self) -> Result<()> {
        let taken = self
            .shared
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        taken.map_or(Ok(()), Err)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.shared.request_stop();
        }
    }
}

fn spawn_loop<B>(name: &str, shared: &Arc<Shared>, body: B) -> Result<JoinHandle<()>>
where
    B: FnOnce() -> Result<()> + Send + 'static,
{
    shared.live.fetch_add(1, Ordering::AcqRel);
    let guard = LiveGuard(Arc::clone(shared));
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let guard = guard;
            if let Err(err) = body() {
                log::error!("{}: loop ended with error: {err}", thread_name());
                guard.0.record_error(err);
            }
            guard.0.request_stop();
        })
        .map_err(|err| EngineError::Fatal(format!("could not spawn {name}: {err}")))
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("engine").to_string()
}

fn lock_ctx(ctx: &Mutex<EngineContext>) -> Result<MutexGuard<'_, EngineContext>> {
    ctx.lock()
        .map_err(|_| EngineError::Fatal("engine context lock poisoned".into()))
}

/// Tear down the active scene on a cooperative stop.
fn shutdown(ctx: &mut EngineContext) {
    if ctx.active_scene().is_some() {
        if let Err(err) = ctx.unload_scene() {
            log::error!("scene teardown failed: {err}");
        }
    }
}

fn finish(shared: &Shared, outcome: TickOutcome) -> bool {
    match outcome {
        TickOutcome::Continue => false,
        TickOutcome::Stop => {
            log::info!("stop requested by window handler");
            shared.request_stop();
            true
        }
        TickOutcome::ForceStop => {
            shared.forced.store(true, Ordering::Release);
            shared.request_stop();
            true
        }
    }
}

fn run_sync<G, R, F, I>(
    shared: &Shared,
    mut game: G,
    properties: EngineProperties,
    make_renderer: F,
    mut input: I,
    reporter: SharedReporter,
) -> Result<()>
where
    G: Game,
    R: Renderer,
    F: FnOnce() -> Result<R>,
    I: InputSource,
{
    let mut renderer = make_renderer()?;
    log::debug!("renderer '{}' ready", renderer.backend());
    let mut ctx = EngineContext::new();
    let result = drive_sync(shared, &mut game, &mut ctx, properties, &mut input, &mut renderer, reporter);
    if !shared.forced.load(Ordering::Acquire) {
        shutdown(&mut ctx);
    }
    renderer.release();
    result
}

fn drive_sync(
    shared: &Shared,
    game: &mut dyn Game,
    ctx: &mut EngineContext,
    properties: EngineProperties,
    input: &mut dyn InputSource,
    renderer: &mut dyn Renderer,
    reporter: SharedReporter,
) -> Result<()> {
    game.init(ctx)?;
    let mut gl = GameLoop::new(properties).with_shared_reporter(reporter);
    while !shared.stop_requested() {
        let outcome = gl.tick(ctx, game, input, renderer)?;
        *shared.stats() = *gl.stats();
        if finish(shared, outcome) {
            break;
        }
        thread::sleep(IDLE_SLEEP);
    }
    Ok(())
}

fn run_logic<G, I>(
    shared: &Shared,
    ctx: &Mutex<EngineContext>,
    mut game: G,
    properties: EngineProperties,
    mut input: I,
    reporter: SharedReporter,
) -> Result<()>
where
    G: Game,
    I: InputSource,
{
    game.init(&mut *lock_ctx(ctx)?)?;
    let mut gl = GameLoop::new(properties).with_shared_reporter(reporter);
    while !shared.stop_requested() {
        let outcome = {
            let mut guard = lock_ctx(ctx)?;
            let outcome = gl.poll_input(&mut guard, &mut game, &mut input);
            if outcome != TickOutcome::ForceStop {
                gl.logic_if_due(&mut guard, &mut game)?;
            }
            outcome
        };
        gl.stats_mut().ticks += 1;
        shared.stats().absorb_logic(gl.stats());
        if finish(shared, outcome) {
            break;
        }
        thread::sleep(IDLE_SLEEP);
    }
    if !shared.forced.load(Ordering::Acquire) {
        shutdown(&mut *lock_ctx(ctx)?);
    }
    Ok(())
}

fn run_draw<R, F>(
    shared: &Shared,
    ctx: &Mutex<EngineContext>,
    properties: EngineProperties,
    make_renderer: F,
    reporter: SharedReporter,
) -> Result<()>
where
    R: Renderer,
    F: FnOnce() -> Result<R>,
{
    let mut renderer = make_renderer()?;
    log::debug!("renderer '{}' ready", renderer.backend());
    let mut gl = GameLoop::new(properties).with_shared_reporter(reporter);
    let result = (|| -> Result<()> {
        while !shared.stop_requested() {
            let logic = *shared.stats();
            gl.stats_mut().absorb_logic(&logic);
            gl.draw_if_due(&mut *lock_ctx(ctx)?, &mut renderer)?;
            shared.stats().absorb_draw(gl.stats());
            thread::sleep(IDLE_SLEEP);
        }
        Ok(())
    })();
    renderer.release();
    result
}
