use crate::api::config::EngineProperties;
use crate::api::error::{EngineError, Result};
use crate::assets::registry::TextureRegistry;
use crate::components::object::ObjectRegistry;
use crate::core::scene::SceneInstance;
use crate::core::scene_manager::SceneManager;
use crate::core::scheduler::EventResponse;
use crate::input::queue::WindowEvent;
use crate::input::state::InputState;
use crate::systems::animation::animate_instances;

/// The contract every game fulfills.
pub trait Game: Send {
    /// Engine configuration. Called once before `init`.
    fn properties(&self) -> EngineProperties {
        EngineProperties::default()
    }

    /// Register objects and scenes and load the first scene.
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()>;

    /// Called at the start of every logic step, before the active scene steps.
    fn update(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Window event handler. `None` means no handler is installed; a close
    /// event then forces the engine down.
    fn on_window_event(&mut self, _event: WindowEvent, _ctx: &mut EngineContext) -> Option<EventResponse> {
        None
    }
}

/// Everything one running engine owns: registries, input and the active scene.
#[derive(Debug, Default)]
pub struct EngineContext {
    pub objects: ObjectRegistry,
    pub scenes: SceneManager,
    pub textures: TextureRegistry,
    input: InputState,
    active: Option<SceneInstance>,
    /// Set by a device reset, consumed by the next draw step.
    textures_stale: bool,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Have the next draw step rebuild renderer textures.
    pub fn request_texture_rebuild(&mut self) {
        self.textures_stale = true;
    }

    pub(crate) fn take_texture_rebuild(&mut self) -> bool {
        std::mem::take(&mut self.textures_stale)
    }

    /// Replace the active scene with a fresh instance of `name`.
    ///
    /// The previous instance is destroyed first. If its teardown fails, the
    /// new scene is still loaded and the teardown error is returned.
    pub fn load_scene(&mut self, name: &str) -> Result<()> {
        let scene = self.scenes.get_scene(name)?;
        let teardown = match self.active.take() {
            Some(mut previous) => {
                log::info!("unloading scene '{}'", previous.name());
                previous.destroy_all(&self.input)
            }
            None => Ok(()),
        };
        self.active = Some(scene.create_instance(&self.input)?);
        teardown
    }

    pub fn active_scene(&self) -> Option<&SceneInstance> {
        self.active.as_ref()
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut SceneInstance> {
        self.active.as_mut()
    }

    /// Restart the active scene from its placements.
    pub fn reinstance_active(&mut self) -> Result<()> {
        let scene = self.active.as_mut().ok_or(EngineError::NoActiveScene)?;
        scene.reinstance(&self.input)
    }

    /// Destroy the active scene and leave none loaded.
    pub fn unload_scene(&mut self) -> Result<()> {
        let mut scene = self.active.take().ok_or(EngineError::NoActiveScene)?;
        scene.destroy_all(&self.input)
    }

    /// Step the active scene. Does nothing when no scene is loaded.
    pub fn step(&mut self, interval_ms: f64, animate: bool) -> Result<()> {
        match self.active.as_mut() {
            Some(scene) => scene.step(&self.input, interval_ms, animate),
            None => Ok(()),
        }
    }

    /// Advance sprite animation of the active scene by one step.
    pub fn animate(&mut self) {
        if let Some(scene) = self.active.as_mut() {
            animate_instances(scene.instances_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::instance::Instance;
    use crate::components::object::{GameObject, ObjectBehavior};
    use crate::core::scene::{Scene, SceneContext};
    use glam::IVec2;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl ObjectBehavior for Log {
        fn on_create(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
            self.0.lock().unwrap().push(format!("create {}", instance.name()));
            Ok(())
        }

        fn on_destroy(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
            self.0.lock().unwrap().push(format!("destroy {}", instance.name()));
            Ok(())
        }
    }

    fn context(log: &Log) -> EngineContext {
        let mut ctx = EngineContext::new();
        let a = ctx.objects.add(GameObject::new("a").with_behavior(log.clone())).unwrap();
        let b = ctx.objects.add(GameObject::new("b").with_behavior(log.clone())).unwrap();
        ctx.scenes.add_scene(Scene::new("first").place(&a, IVec2::ZERO)).unwrap();
        ctx.scenes.add_scene(Scene::new("second").place(&b, IVec2::ZERO)).unwrap();
        ctx
    }

    #[test]
    fn loading_a_scene_destroys_the_previous_one_first() {
        let log = Log::default();
        let mut ctx = context(&log);
        ctx.load_scene("first").unwrap();
        ctx.load_scene("second").unwrap();
        assert_eq!(ctx.active_scene().unwrap().name(), "second");
        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["create a", "destroy a", "create b"]
        );
    }

    #[test]
    fn unknown_scene_keeps_the_current_one() {
        let log = Log::default();
        let mut ctx = context(&log);
        ctx.load_scene("first").unwrap();
        assert!(matches!(ctx.load_scene("nope"), Err(EngineError::SceneNotFound(_))));
        assert_eq!(ctx.active_scene().unwrap().name(), "first");
    }

    #[test]
    fn operations_without_active_scene() {
        let mut ctx = EngineContext::new();
        assert!(matches!(ctx.reinstance_active(), Err(EngineError::NoActiveScene)));
        assert!(matches!(ctx.unload_scene(), Err(EngineError::NoActiveScene)));
        ctx.step(15.625, true).unwrap();
        ctx.animate();
    }

    #[test]
    fn unload_and_reinstance() {
        let log = Log::default();
        let mut ctx = context(&log);
        ctx.load_scene("first").unwrap();
        ctx.reinstance_active().unwrap();
        ctx.unload_scene().unwrap();
        assert!(ctx.active_scene().is_none());
        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["create a", "destroy a", "create a", "destroy a"]
        );
    }
}
