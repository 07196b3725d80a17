use std::collections::VecDeque;
use std::sync::Arc;

use glam::{IVec2, Vec2};

use crate::api::error::{EngineError, Result};
use crate::api::types::{InstanceId, Size};
use crate::components::instance::Instance;
use crate::components::object::GameObject;
use crate::core::collection::{InstanceCollection, Subscription};
#[cfg(feature = "physics")]
use crate::core::physics::{PhysicsConfig, PhysicsWorld};
use crate::input::state::InputState;
use crate::systems::animation::animate_instances;

/// Scene-level hooks. Both run with the whole scene instance at hand.
pub trait SceneBehavior: Send + Sync {
    /// Runs after every placed instance received its own `on_create`.
    fn on_create(&self, _scene: &mut SceneInstance, _input: &InputState) -> Result<()> {
        Ok(())
    }

    /// Runs after every instance received `on_destroy`, before the collection is cleared.
    fn on_destroy(&self, _scene: &mut SceneInstance, _input: &InputState) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSceneBehavior;

impl SceneBehavior for DefaultSceneBehavior {}

/// One entry of a scene's initial population.
#[derive(Debug, Clone)]
pub struct Placement {
    pub object: Arc<GameObject>,
    pub position: IVec2,
}

/// Static scene description. Read-only once registered.
#[derive(Clone)]
pub struct Scene {
    pub name: String,
    /// World size in display units.
    pub size: Size,
    pub view_position: IVec2,
    pub view_origin: IVec2,
    pub view_size: Size,
    /// Simulation units per second squared.
    pub gravity: Vec2,
    pub physics: bool,
    #[cfg(feature = "physics")]
    pub physics_config: PhysicsConfig,
    pub placements: Vec<Placement>,
    behavior: Arc<dyn SceneBehavior>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("physics", &self.physics)
            .field("placements", &self.placements.len())
            .finish_non_exhaustive()
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Size::new(640, 480),
            view_position: IVec2::ZERO,
            view_origin: IVec2::ZERO,
            view_size: Size::new(640, 480),
            gravity: Vec2::ZERO,
            physics: false,
            #[cfg(feature = "physics")]
            physics_config: PhysicsConfig::default(),
            placements: Vec::new(),
            behavior: Arc::new(DefaultSceneBehavior),
        }
    }

    // -- Builder pattern --

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_view(mut self, position: IVec2, origin: IVec2) -> Self {
        self.view_position = position;
        self.view_origin = origin;
        self
    }

    pub fn with_view_size(mut self, size: Size) -> Self {
        self.view_size = size;
        self
    }

    /// Enable physics with the given gravity.
    pub fn with_physics(mut self, gravity: Vec2) -> Self {
        self.physics = true;
        self.gravity = gravity;
        self
    }

    #[cfg(feature = "physics")]
    pub fn with_physics_config(mut self, config: PhysicsConfig) -> Self {
        self.physics_config = config;
        self
    }

    /// Add one instance of `object` at `position` to the initial population.
    pub fn place(mut self, object: &Arc<GameObject>, position: IVec2) -> Self {
        self.placements.push(Placement {
            object: Arc::clone(object),
            position,
        });
        self
    }

    pub fn with_behavior(mut self, behavior: impl SceneBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    pub fn behavior(&self) -> &Arc<dyn SceneBehavior> {
        &self.behavior
    }

    fn default_view(&self) -> View {
        View {
            position: self.view_position,
            origin: self.view_origin,
            size: self.view_size,
        }
    }

    /// Create and populate a new scene instance.
    pub fn create_instance(self: &Arc<Self>, input: &InputState) -> Result<SceneInstance> {
        let mut scene = SceneInstance {
            scene: Arc::clone(self),
            instances: InstanceCollection::new(),
            view: self.default_view(),
            destroyed: false,
            physics: None,
            commands: Vec::new(),
        };
        scene.init_physics();
        scene.populate(input)?;
        log::info!(
            "scene '{}' created with {} instance(s)",
            self.name,
            scene.instances.len()
        );
        Ok(scene)
    }
}

/// Rectangular window into scene space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub position: IVec2,
    /// Subtracted from `position` to get the top-left corner.
    pub origin: IVec2,
    pub size: Size,
}

impl View {
    /// Top-left corner in scene space; the draw offset of every instance.
    pub fn top_left(&self) -> IVec2 {
        self.position.saturating_sub(self.origin)
    }

    /// Whether a point lies in the view rectangle grown by `extent` on every side.
    pub fn covers(&self, point: IVec2, extent: Size) -> bool {
        let tl = self.top_left();
        let x_in = point.x >= tl.x.saturating_sub(extent.w)
            && point.x <= tl.x.saturating_add(self.size.w).saturating_add(extent.w);
        let y_in = point.y >= tl.y.saturating_sub(extent.h)
            && point.y <= tl.y.saturating_add(self.size.h).saturating_add(extent.h);
        x_in && y_in
    }
}

/// Structural change requested from inside a hook, applied after the step loop.
#[derive(Debug, Clone)]
pub enum SceneCommand {
    Spawn {
        object: Arc<GameObject>,
        position: IVec2,
    },
    Destroy(InstanceId),
}

/// Physics world of a scene instance plus its collection subscription.
#[derive(Debug)]
struct PhysicsBridge {
    #[cfg(feature = "physics")]
    world: PhysicsWorld,
    events: Subscription,
}

/// What a behaviour hook may touch besides its own instance.
pub struct SceneContext<'a> {
    view: &'a mut View,
    input: &'a InputState,
    #[cfg_attr(not(feature = "physics"), allow(dead_code))]
    physics: Option<&'a mut PhysicsBridge>,
    commands: &'a mut Vec<SceneCommand>,
}

impl<'a> SceneContext<'a> {
    fn new(
        view: &'a mut View,
        input: &'a InputState,
        physics: Option<&'a mut PhysicsBridge>,
        commands: &'a mut Vec<SceneCommand>,
    ) -> Self {
        Self {
            view,
            input,
            physics,
            commands,
        }
    }

    pub fn view(&self) -> &View {
        self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        self.view
    }

    pub fn input(&self) -> &InputState {
        self.input
    }

    /// Queue a new instance of `object`.
    pub fn spawn(&mut self, object: &Arc<GameObject>, position: IVec2) {
        self.commands.push(SceneCommand::Spawn {
            object: Arc::clone(object),
            position,
        });
    }

    /// Queue removal of an instance. `on_destroy` fires when the command is applied.
    pub fn destroy(&mut self, id: InstanceId) {
        self.commands.push(SceneCommand::Destroy(id));
    }

    #[cfg(feature = "physics")]
    pub fn physics(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_deref_mut().map(|b| &mut b.world)
    }

    /// Other instances whose bodies overlap `instance`'s body shifted by `offset`.
    /// Empty when the scene has no physics.
    pub fn check_collision(&mut self, instance: &Instance, offset: IVec2) -> Result<Vec<InstanceId>> {
        #[cfg(feature = "physics")]
        if let Some(bridge) = self.physics.as_deref_mut() {
            return Ok(bridge.world.check_collision(instance.id(), offset)?);
        }
        let _ = (instance, offset);
        Ok(Vec::new())
    }

    /// Move an instance and, if it has a body, teleport the body with it.
    pub fn set_object_position(&mut self, instance: &mut Instance, position: IVec2) -> Result<()> {
        instance.position = position;
        #[cfg(feature = "physics")]
        if let Some(bridge) = self.physics.as_deref_mut() {
            if bridge.world.contains(instance.id()) {
                bridge.world.set_object_position(instance.id(), position)?;
            }
        }
        Ok(())
    }
}

/// One running playthrough of a [`Scene`].
#[derive(Debug)]
pub struct SceneInstance {
    scene: Arc<Scene>,
    instances: InstanceCollection,
    view: View,
    destroyed: bool,
    physics: Option<PhysicsBridge>,
    commands: Vec<SceneCommand>,
}

impl SceneInstance {
    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn name(&self) -> &str {
        &self.scene.name
    }

    pub fn instances(&self) -> &InstanceCollection {
        &self.instances
    }

    /// Direct access to the collection. Physics bodies follow structural
    /// changes at the next step.
    pub fn instances_mut(&mut self) -> &mut InstanceCollection {
        &mut self.instances
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    #[cfg(feature = "physics")]
    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref().map(|b| &b.world)
    }

    #[cfg(feature = "physics")]
    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_mut().map(|b| &mut b.world)
    }

    /// Create the physics world and subscribe it to the collection. No-op when
    /// the scene has no physics or the world already exists.
    fn init_physics(&mut self) {
        if !self.scene.physics || self.physics.is_some() {
            return;
        }
        #[cfg(feature = "physics")]
        {
            self.physics = Some(PhysicsBridge {
                world: PhysicsWorld::new(self.scene.gravity, self.scene.physics_config),
                events: self.instances.subscribe(),
            });
        }
        #[cfg(not(feature = "physics"))]
        log::warn!(
            "scene '{}' wants physics but the engine was built without it",
            self.scene.name
        );
    }

    /// Feed pending collection events into the physics world.
    fn sync_physics(&mut self) -> Result<()> {
        let Some(bridge) = self.physics.as_mut() else {
            return Ok(());
        };
        let events = bridge.events.drain();
        #[cfg(feature = "physics")]
        bridge.world.apply_events(&events, &self.instances)?;
        #[cfg(not(feature = "physics"))]
        let _ = events;
        Ok(())
    }

    /// Create the placements, fire every `on_create`, then reset the view.
    fn populate(&mut self, input: &InputState) -> Result<()> {
        let scene = Arc::clone(&self.scene);
        self.view = scene.default_view();
        for placement in &scene.placements {
            let mut inst = placement.object.create_instance();
            inst.position = placement.position;
            self.instances.add(inst);
        }
        self.sync_physics()?;

        let mut deferred = Vec::new();
        {
            let Self {
                instances,
                view,
                physics,
                ..
            } = self;
            let mut ctx = SceneContext::new(view, input, physics.as_mut(), &mut deferred);
            let mut reordered = false;
            for inst in instances.iter_mut_keep_order() {
                let depth = inst.depth;
                let behavior = Arc::clone(inst.object().behavior());
                behavior.on_create(inst, &mut ctx)?;
                reordered |= inst.depth != depth;
            }
            if reordered {
                instances.invalidate_order();
            }
        }
        self.commands.extend(deferred);

        scene.behavior().on_create(self, input)?;
        self.view = scene.default_view();
        Ok(())
    }

    /// One logic step: physics first, then view activation and instance
    /// steps, deferred commands, and finally the depth sort.
    pub fn step(&mut self, input: &InputState, interval_ms: f64, animate: bool) -> Result<()> {
        self.sync_physics()?;
        #[cfg(feature = "physics")]
        if let Some(bridge) = self.physics.as_mut() {
            bridge.world.update_cycle(&mut self.instances, interval_ms);
        }
        #[cfg(not(feature = "physics"))]
        let _ = interval_ms;

        let mut deferred = Vec::new();
        {
            let Self {
                instances,
                view,
                physics,
                ..
            } = self;
            let mut ctx = SceneContext::new(view, input, physics.as_mut(), &mut deferred);
            let mut reordered = false;
            let mut failed = None;
            for inst in instances.iter_mut_keep_order() {
                if inst.is_optimized() {
                    inst.activated = ctx.view().covers(inst.position, inst.extent());
                }
                if !inst.activated {
                    continue;
                }
                let depth = inst.depth;
                let behavior = Arc::clone(inst.object().behavior());
                let stepped = behavior.step(inst, &mut ctx);
                reordered |= inst.depth != depth;
                if let Err(err) = stepped {
                    failed = Some(err);
                    break;
                }
                inst.normalize_angle();
            }
            if reordered {
                instances.invalidate_order();
            }
            if let Some(err) = failed {
                return Err(err);
            }
        }
        self.commands.extend(deferred);

        if animate {
            animate_instances(&mut self.instances);
        }
        self.apply_commands(input)?;
        self.sync_physics()?;
        self.instances.sort_by_depth(false);
        Ok(())
    }

    fn apply_commands(&mut self, input: &InputState) -> Result<()> {
        let mut queue: VecDeque<SceneCommand> = self.commands.drain(..).collect();
        while let Some(command) = queue.pop_front() {
            let mut deferred = Vec::new();
            match command {
                SceneCommand::Spawn { object, position } => {
                    self.spawn_instance(&object, position, input, &mut deferred)?;
                }
                SceneCommand::Destroy(id) => {
                    // already gone is fine: two hooks may destroy the same instance
                    self.destroy_instance(id, input, &mut deferred)?;
                }
            }
            queue.extend(deferred);
        }
        Ok(())
    }

    fn spawn_instance(
        &mut self,
        object: &Arc<GameObject>,
        position: IVec2,
        input: &InputState,
        deferred: &mut Vec<SceneCommand>,
    ) -> Result<InstanceId> {
        let mut inst = object.create_instance();
        inst.position = position;
        let id = inst.id();
        self.instances.add(inst);
        self.sync_physics()?;

        let Self {
            instances,
            view,
            physics,
            ..
        } = self;
        if let Some(inst) = instances.get_mut(id) {
            let behavior = Arc::clone(inst.object().behavior());
            let mut ctx = SceneContext::new(view, input, physics.as_mut(), deferred);
            behavior.on_create(inst, &mut ctx)?;
        }
        Ok(id)
    }

    fn destroy_instance(
        &mut self,
        id: InstanceId,
        input: &InputState,
        deferred: &mut Vec<SceneCommand>,
    ) -> Result<bool> {
        {
            let Self {
                instances,
                view,
                physics,
                ..
            } = self;
            let Some(inst) = instances.get_mut(id) else {
                return Ok(false);
            };
            let behavior = Arc::clone(inst.object().behavior());
            let mut ctx = SceneContext::new(view, input, physics.as_mut(), deferred);
            behavior.on_destroy(inst, &mut ctx)?;
        }
        self.instances.remove(id);
        self.sync_physics()?;
        Ok(true)
    }

    /// Create an instance now and run its `on_create`.
    pub fn spawn(&mut self, object: &Arc<GameObject>, position: IVec2, input: &InputState) -> Result<InstanceId> {
        let mut deferred = Vec::new();
        let id = self.spawn_instance(object, position, input, &mut deferred)?;
        self.commands.extend(deferred);
        self.apply_commands(input)?;
        Ok(id)
    }

    /// Run `on_destroy` for one instance and remove it.
    pub fn destroy(&mut self, id: InstanceId, input: &InputState) -> Result<()> {
        let mut deferred = Vec::new();
        if !self.destroy_instance(id, input, &mut deferred)? {
            return Err(EngineError::InstanceNotFound(id.to_string()));
        }
        self.commands.extend(deferred);
        self.apply_commands(input)
    }

    /// Fire `on_destroy` on every instance, then the scene hook, then clear the
    /// collection and release every body.
    ///
    /// All instances are destroyed even if a hook fails; the first error is returned.
    pub fn destroy_all(&mut self, input: &InputState) -> Result<()> {
        let mut first_err = None;
        let mut discarded = Vec::new();
        {
            let Self {
                instances,
                view,
                physics,
                ..
            } = self;
            let mut ctx = SceneContext::new(view, input, physics.as_mut(), &mut discarded);
            for inst in instances.iter_mut_keep_order() {
                let behavior = Arc::clone(inst.object().behavior());
                if let Err(err) = behavior.on_destroy(inst, &mut ctx) {
                    log::error!("{}: on_destroy failed: {err}", inst.name());
                    first_err.get_or_insert(err);
                }
            }
        }
        if !discarded.is_empty() {
            log::debug!(
                "scene '{}': dropping {} command(s) queued during teardown",
                self.scene.name,
                discarded.len()
            );
        }
        self.destroyed = true;

        let scene = Arc::clone(&self.scene);
        if let Err(err) = scene.behavior().on_destroy(self, input) {
            first_err.get_or_insert(err);
        }

        self.commands.clear();
        self.instances.clear();
        self.sync_physics()?;
        first_err.map_or(Ok(()), Err)
    }

    /// Destroy every instance, then repopulate from the placements as on creation.
    pub fn reinstance(&mut self, input: &InputState) -> Result<()> {
        self.destroy_all(input)?;
        self.init_physics();
        self.populate(input)?;
        self.destroyed = false;
        log::info!(
            "scene '{}' reinstanced with {} instance(s)",
            self.scene.name,
            self.instances.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "physics")]
    use crate::components::body::PhysicsAttributes;
    use crate::components::object::ObjectBehavior;
    use crate::components::sprite::{SpriteHandle, TextureId};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Hook {
        Create,
        Destroy,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Hook, InstanceId)>>>);

    impl Recorder {
        fn log(&self) -> Vec<(Hook, InstanceId)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ObjectBehavior for Recorder {
        fn on_create(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
            self.0.lock().unwrap().push((Hook::Create, instance.id()));
            Ok(())
        }

        fn on_destroy(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
            self.0.lock().unwrap().push((Hook::Destroy, instance.id()));
            Ok(())
        }
    }

    fn sprite(w: i32, h: i32) -> SpriteHandle {
        SpriteHandle::new(TextureId(1), "block", 1, Size::new(w, h))
    }

    fn layout(scene: &SceneInstance) -> Vec<(String, IVec2)> {
        scene
            .instances()
            .iter()
            .map(|i| (i.name().to_string(), i.position))
            .collect()
    }

    #[test]
    fn create_instance_populates_placements() {
        let a = Arc::new(GameObject::new("a"));
        let b = Arc::new(GameObject::new("b"));
        let scene = Arc::new(
            Scene::new("level")
                .place(&a, IVec2::new(1, 2))
                .place(&b, IVec2::new(3, 4)),
        );
        let inst = scene.create_instance(&InputState::default()).unwrap();
        assert_eq!(
            layout(&inst),
            vec![("a".into(), IVec2::new(1, 2)), ("b".into(), IVec2::new(3, 4))]
        );
        assert!(!inst.is_destroyed());
    }

    #[test]
    fn depths_sort_stably_after_creation() {
        let hi = Arc::new(GameObject::new("hi").with_depth(5));
        let lo = Arc::new(GameObject::new("lo").with_depth(1));
        let scene = Arc::new(
            Scene::new("stack")
                .place(&hi, IVec2::new(0, 0))
                .place(&lo, IVec2::new(1, 0))
                .place(&hi, IVec2::new(2, 0)),
        );
        let mut inst = scene.create_instance(&InputState::default()).unwrap();
        let created: Vec<InstanceId> = inst.instances().iter().map(|i| i.id()).collect();

        inst.instances_mut().sort_by_depth(true);
        let order: Vec<InstanceId> = inst.instances().iter().map(|i| i.id()).collect();
        assert_eq!(order, vec![created[1], created[0], created[2]]);
        let depths: Vec<i32> = inst.instances().iter().map(|i| i.depth).collect();
        assert_eq!(depths, vec![1, 5, 5]);
    }

    #[test]
    fn reinstance_destroys_each_once_before_recreating() {
        let recorder = Recorder::default();
        let obj = Arc::new(GameObject::new("thing").with_behavior(recorder.clone()));
        let scene = Arc::new(
            Scene::new("loop")
                .place(&obj, IVec2::new(10, 10))
                .place(&obj, IVec2::new(20, 10))
                .place(&obj, IVec2::new(30, 10)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        let before = layout(&inst);
        let original: Vec<InstanceId> = inst.instances().iter().map(|i| i.id()).collect();
        recorder.0.lock().unwrap().clear();

        inst.reinstance(&input).unwrap();

        assert_eq!(layout(&inst), before);
        let log = recorder.log();
        let (destroys, creates) = log.split_at(original.len());
        for id in &original {
            let count = destroys
                .iter()
                .filter(|(hook, hid)| *hook == Hook::Destroy && hid == id)
                .count();
            assert_eq!(count, 1);
        }
        assert!(creates.iter().all(|(hook, _)| *hook == Hook::Create));
        assert_eq!(creates.len(), original.len());
        assert!(creates.iter().all(|(_, id)| !original.contains(id)));
        assert!(!inst.is_destroyed());
    }

    /// Moves itself above or below the rest of the scene on alternate steps.
    struct Flipper;

    impl ObjectBehavior for Flipper {
        fn step(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
            instance.depth = if instance.depth == 0 { 10 } else { 0 };
            Ok(())
        }
    }

    fn depths(scene: &SceneInstance) -> Vec<i32> {
        scene.instances().iter().map(|i| i.depth).collect()
    }

    #[test]
    fn depth_changed_in_step_hook_is_resorted() {
        let still = Arc::new(GameObject::new("still").with_depth(5));
        let flipper = Arc::new(GameObject::new("flipper").with_behavior(Flipper));
        let scene = Arc::new(
            Scene::new("layers")
                .place(&still, IVec2::new(0, 0))
                .place(&flipper, IVec2::new(1, 0)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();

        inst.step(&input, 15.625, false).unwrap();
        assert_eq!(depths(&inst), vec![5, 10]);
        assert!(inst.instances().is_sorted());

        inst.step(&input, 15.625, false).unwrap();
        assert_eq!(depths(&inst), vec![0, 5]);
        assert_eq!(inst.instances().find_by_name("flipper").map(|i| i.depth), Some(0));
        assert_eq!(inst.instances().iter().next().map(|i| i.name()), Some("flipper"));
        assert!(inst.instances().is_sorted());
    }

    #[test]
    fn unchanged_depths_skip_the_rebuild() {
        let obj = Arc::new(GameObject::new("rock").with_depth(3));
        let scene = Arc::new(
            Scene::new("quarry")
                .place(&obj, IVec2::new(0, 0))
                .place(&obj, IVec2::new(5, 0)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        inst.step(&input, 15.625, false).unwrap();
        let rebuilds = inst.instances().rebuild_count();

        inst.step(&input, 15.625, false).unwrap();
        assert_eq!(inst.instances().rebuild_count(), rebuilds);
    }

    #[test]
    fn view_bounds_saturate_at_the_edges() {
        let view = View {
            position: IVec2::new(i32::MAX - 10, i32::MIN + 10),
            origin: IVec2::ZERO,
            size: Size::new(100, 100),
        };
        let extent = Size::new(64, 64);
        assert!(view.covers(IVec2::new(i32::MAX, i32::MIN + 20), extent));
        assert!(!view.covers(IVec2::new(0, 0), extent));

        let far = View {
            position: IVec2::new(i32::MIN + 5, 0),
            origin: IVec2::new(100, 0),
            size: Size::new(10, 10),
        };
        assert!(far.covers(IVec2::new(i32::MIN, 0), extent));
    }

    #[test]
    fn view_culling_toggles_optimized_instances() {
        let obj = Arc::new(
            GameObject::new("tree")
                .with_sprite(sprite(16, 16))
                .with_optimized(true),
        );
        let scene = Arc::new(
            Scene::new("forest")
                .with_view_size(Size::new(100, 100))
                .place(&obj, IVec2::new(50, 50))
                .place(&obj, IVec2::new(117, 50))
                .place(&obj, IVec2::new(300, 300))
                .place(&obj, IVec2::new(-17, -17)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        inst.step(&input, 15.625, false).unwrap();

        let active: Vec<bool> = inst.instances().iter().map(|i| i.activated).collect();
        assert_eq!(active, vec![true, false, false, false]);

        // scroll so the far tree comes into view
        inst.view_mut().position = IVec2::new(250, 250);
        inst.step(&input, 15.625, false).unwrap();
        let far = inst.instances().iter().nth(2).unwrap();
        assert!(far.activated);
    }

    #[test]
    fn view_edge_includes_sprite_extent() {
        let view = View {
            position: IVec2::new(20, 20),
            origin: IVec2::new(10, 10),
            size: Size::new(100, 50),
        };
        assert_eq!(view.top_left(), IVec2::new(10, 10));
        assert!(view.covers(IVec2::new(-6, 10), Size::new(16, 16)));
        assert!(!view.covers(IVec2::new(-7, 10), Size::new(16, 16)));
        assert!(view.covers(IVec2::new(126, 76), Size::new(16, 16)));
        assert!(!view.covers(IVec2::new(126, 77), Size::new(16, 16)));
    }

    #[test]
    fn non_optimized_instances_always_step() {
        struct Counter(Arc<Mutex<u32>>);
        impl ObjectBehavior for Counter {
            fn step(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
                *self.0.lock().unwrap() += 1;
                instance.image_angle += 400.0;
                Ok(())
            }
        }
        let steps = Arc::new(Mutex::new(0));
        let obj = Arc::new(
            GameObject::new("far")
                .with_sprite(sprite(8, 8))
                .with_behavior(Counter(Arc::clone(&steps))),
        );
        let scene = Arc::new(Scene::new("s").place(&obj, IVec2::new(10_000, 10_000)));
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        inst.step(&input, 15.625, false).unwrap();
        inst.step(&input, 15.625, false).unwrap();
        assert_eq!(*steps.lock().unwrap(), 2);
        let angle = inst.instances().iter().next().unwrap().image_angle;
        assert!((angle - 80.0).abs() < 1e-3);
    }

    #[test]
    fn hooks_spawn_and_destroy_through_context() {
        struct Spawner {
            child: Arc<GameObject>,
        }
        impl ObjectBehavior for Spawner {
            fn step(&self, instance: &mut Instance, ctx: &mut SceneContext<'_>) -> Result<()> {
                ctx.spawn(&self.child, instance.position + IVec2::new(5, 0));
                ctx.destroy(instance.id());
                Ok(())
            }
        }
        let child = Arc::new(GameObject::new("child"));
        let parent = Arc::new(GameObject::new("parent").with_behavior(Spawner {
            child: Arc::clone(&child),
        }));
        let scene = Arc::new(Scene::new("s").place(&parent, IVec2::new(1, 1)));
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        inst.step(&input, 15.625, false).unwrap();
        assert_eq!(layout(&inst), vec![("child".into(), IVec2::new(6, 1))]);
    }

    #[test]
    fn destroy_unknown_instance_fails() {
        let scene = Arc::new(Scene::new("empty"));
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        let err = inst.destroy(InstanceId::new(), &input).unwrap_err();
        assert!(matches!(err, EngineError::InstanceNotFound(_)));
    }

    #[test]
    fn scene_hooks_run_after_instance_hooks() {
        struct SceneHook(Recorder);
        impl SceneBehavior for SceneHook {
            fn on_create(&self, scene: &mut SceneInstance, _input: &InputState) -> Result<()> {
                assert_eq!(self.0.log().len(), scene.instances().len());
                scene.view_mut().position = IVec2::new(999, 999);
                Ok(())
            }
        }
        let recorder = Recorder::default();
        let obj = Arc::new(GameObject::new("o").with_behavior(recorder.clone()));
        let scene = Arc::new(
            Scene::new("s")
                .with_view(IVec2::new(5, 5), IVec2::ZERO)
                .place(&obj, IVec2::ZERO)
                .with_behavior(SceneHook(recorder)),
        );
        let inst = scene.create_instance(&InputState::default()).unwrap();
        // the view is reset to the scene defaults last
        assert_eq!(inst.view().position, IVec2::new(5, 5));
    }

    #[cfg(feature = "physics")]
    #[test]
    fn reinstance_releases_bodies() {
        let obj = Arc::new(GameObject::new("box").with_physics(PhysicsAttributes::boxed(10.0, 10.0)));
        let decor = Arc::new(GameObject::new("decor"));
        let scene = Arc::new(
            Scene::new("phys")
                .with_physics(Vec2::ZERO)
                .place(&obj, IVec2::new(0, 0))
                .place(&obj, IVec2::new(50, 0))
                .place(&decor, IVec2::new(0, 50)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        assert_eq!(inst.physics().map(|p| p.body_count()), Some(2));

        for _ in 0..3 {
            inst.reinstance(&input).unwrap();
            assert_eq!(inst.physics().map(|p| p.body_count()), Some(2));
        }
        for i in inst.instances().iter() {
            assert_eq!(
                inst.physics().unwrap().contains(i.id()),
                i.physics_attributes.enabled
            );
        }

        inst.destroy_all(&input).unwrap();
        assert_eq!(inst.physics().map(|p| p.body_count()), Some(0));
        assert!(inst.is_destroyed());
    }

    #[cfg(feature = "physics")]
    #[test]
    fn resting_bodies_keep_positions_through_steps() {
        let obj = Arc::new(GameObject::new("box").with_physics(PhysicsAttributes::boxed(10.0, 10.0)));
        let scene = Arc::new(
            Scene::new("phys")
                .with_physics(Vec2::ZERO)
                .place(&obj, IVec2::new(40, 80)),
        );
        let input = InputState::default();
        let mut inst = scene.create_instance(&input).unwrap();
        for _ in 0..5 {
            inst.step(&input, 15.625, false).unwrap();
        }
        assert_eq!(inst.instances().iter().next().unwrap().position, IVec2::new(40, 80));
    }
}
