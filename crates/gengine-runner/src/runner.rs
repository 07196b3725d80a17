use gengine::{
    input_channel, EngineError, Engine, EngineProperties, Game, InputEvent, InputSender,
    LogReporter, LoopStats, Renderer, Result,
};

/// Generic game runner that wires a [`Game`] into the engine thread(s).
///
/// The runner owns the game until `start`, then keeps the engine handle and
/// the sending half of the input channel the platform layer feeds.
pub struct GameRunner<G: Game + 'static> {
    game: Option<G>,
    properties: EngineProperties,
    engine: Option<Engine>,
    input: Option<InputSender>,
}

impl<G: Game + 'static> GameRunner<G> {
    pub fn new(game: G) -> Self {
        let properties = game.properties();
        Self {
            game: Some(game),
            properties,
            engine: None,
            input: None,
        }
    }

    pub fn properties(&self) -> &EngineProperties {
        &self.properties
    }

    /// Apply key/value overrides before `start`. Returns the number applied.
    pub fn configure<I, K, V>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.properties.apply_config(entries)
    }

    /// Move the game onto the engine thread(s). A runner starts once.
    pub fn start<R, F>(&mut self, make_renderer: F) -> Result<()>
    where
        R: Renderer + 'static,
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let game = self.game.take().ok_or(EngineError::AlreadyRunning)?;
        let (tx, rx) = input_channel();
        let engine = Engine::start(
            game,
            self.properties.clone(),
            make_renderer,
            rx,
            LogReporter::new(),
        )?;
        self.engine = Some(engine);
        self.input = Some(tx);
        Ok(())
    }

    /// Forward one platform event. False when the engine is gone.
    pub fn push_input(&self, event: InputEvent) -> bool {
        self.input.as_ref().is_some_and(|tx| tx.send(event))
    }

    pub fn is_running(&self) -> bool {
        self.engine.as_ref().is_some_and(Engine::is_running)
    }

    pub fn stats(&self) -> LoopStats {
        self.engine.as_ref().map(Engine::stats).unwrap_or_default()
    }

    /// Cooperative stop, falling back to a forced stop on timeout.
    pub fn stop(&mut self) -> Result<()> {
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| EngineError::InvalidState("runner was never started".into()))?;
        match engine.stop() {
            Err(err @ EngineError::StopTimeout(_)) => {
                engine.force_stop();
                Err(err)
            }
            other => other,
        }
    }

    /// Block until the engine ends on its own.
    pub fn wait(&mut self) -> Result<()> {
        match self.engine.as_mut() {
            Some(engine) => engine.wait(),
            None => Err(EngineError::InvalidState("runner was never started".into())),
        }
    }
}

/// Process exit status for a run result: 0 on success, else the error's code.
pub fn exit_status(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.exit_code(),
    }
}
