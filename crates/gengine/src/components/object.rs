use std::collections::HashMap;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use serde_json::Value;

use crate::api::error::{EngineError, Result};
use crate::components::body::PhysicsAttributes;
use crate::components::instance::Instance;
use crate::components::sprite::SpriteHandle;
use crate::core::scene::SceneContext;
use crate::renderer::traits::Renderer;
use crate::systems::render::draw_instance_sprite;

/// Lifecycle hooks of a game object. Every instance of the object shares one behaviour.
///
/// All hooks have defaults, so a plain sprite needs no implementation at all.
pub trait ObjectBehavior: Send + Sync {
    /// Called once after the instance joined its scene.
    fn on_create(&self, _instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called every logic step while the instance is activated.
    fn step(&self, _instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called before the instance leaves its scene.
    fn on_destroy(&self, _instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Draw the instance. `view_offset` is the view's top-left corner in scene space.
    fn draw(&self, instance: &Instance, renderer: &mut dyn Renderer, view_offset: IVec2) -> Result<()> {
        draw_instance_sprite(instance, renderer, view_offset)
    }
}

/// Behaviour with every hook left at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl ObjectBehavior for DefaultBehavior {}

/// Template for instances: defaults plus shared behaviour. Read-only once registered.
#[derive(Clone)]
pub struct GameObject {
    pub name: String,
    pub sprite: Option<SpriteHandle>,
    pub physics: PhysicsAttributes,
    pub depth: i32,
    pub image_index: u32,
    pub image_speed: u32,
    pub image_angle: f32,
    pub scale: Vec2,
    pub offset: IVec2,
    pub flip_x: bool,
    pub flip_y: bool,
    pub animated: bool,
    pub activated: bool,
    /// Eligible for view-culling activation.
    pub optimized: bool,
    pub variables: HashMap<String, Value>,
    behavior: Arc<dyn ObjectBehavior>,
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("sprite", &self.sprite.as_ref().map(|s| &s.name))
            .field("depth", &self.depth)
            .field("optimized", &self.optimized)
            .finish_non_exhaustive()
    }
}

impl GameObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sprite: None,
            physics: PhysicsAttributes::default(),
            depth: 0,
            image_index: 0,
            image_speed: 0,
            image_angle: 0.0,
            scale: Vec2::ONE,
            offset: IVec2::ZERO,
            flip_x: false,
            flip_y: false,
            animated: true,
            activated: true,
            optimized: false,
            variables: HashMap::new(),
            behavior: Arc::new(DefaultBehavior),
        }
    }

    // -- Builder pattern --

    pub fn with_sprite(mut self, sprite: SpriteHandle) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_physics(mut self, physics: PhysicsAttributes) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_image_index(mut self, index: u32) -> Self {
        self.image_index = index;
        self
    }

    pub fn with_image_speed(mut self, speed: u32) -> Self {
        self.image_speed = speed;
        self
    }

    pub fn with_image_angle(mut self, degrees: f32) -> Self {
        self.image_angle = degrees;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_offset(mut self, offset: IVec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn with_optimized(mut self, optimized: bool) -> Self {
        self.optimized = optimized;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_behavior(mut self, behavior: impl ObjectBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    pub fn behavior(&self) -> &Arc<dyn ObjectBehavior> {
        &self.behavior
    }

    /// Create a new instance with a fresh identity and its own copy of the defaults.
    pub fn create_instance(self: &Arc<Self>) -> Instance {
        Instance::from_template(self)
    }
}

/// Name → template registry. Templates are shared once added.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: HashMap<String, Arc<GameObject>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: GameObject) -> Result<Arc<GameObject>> {
        if self.objects.contains_key(&object.name) {
            return Err(EngineError::DuplicateObject(object.name));
        }
        let object = Arc::new(object);
        self.objects
            .insert(object.name.clone(), Arc::clone(&object));
        log::debug!("registered game object '{}'", object.name);
        Ok(object)
    }

    pub fn get(&self, name: &str) -> Result<Arc<GameObject>> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::ObjectNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<GameObject>> {
        self.objects
            .remove(name)
            .ok_or_else(|| EngineError::ObjectNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_duplicates() {
        let mut reg = ObjectRegistry::new();
        reg.add(GameObject::new("player")).unwrap();
        let err = reg.add(GameObject::new("player")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateObject(name) if name == "player"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_lookup_returns_shared_template() {
        let mut reg = ObjectRegistry::new();
        let added = reg.add(GameObject::new("wall").with_depth(3)).unwrap();
        let found = reg.get("wall").unwrap();
        assert!(Arc::ptr_eq(&added, &found));
        assert!(matches!(reg.get("door"), Err(EngineError::ObjectNotFound(_))));
    }

    #[test]
    fn physics_defaults_are_deep_copied() {
        let obj = Arc::new(GameObject::new("crate").with_physics(PhysicsAttributes::boxed(8.0, 8.0)));
        let mut a = obj.create_instance();
        let b = obj.create_instance();
        a.physics_attributes.friction = 0.9;
        assert_ne!(a.physics_attributes, b.physics_attributes);
        assert_eq!(b.physics_attributes, obj.physics);
    }
}
