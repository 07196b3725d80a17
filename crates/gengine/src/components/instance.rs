use std::collections::HashMap;
use std::sync::Arc;

use glam::{IVec2, Vec2};
use serde_json::Value;

use crate::api::error::{EngineError, Result};
use crate::api::types::{InstanceId, Size};
use crate::components::body::{PhysicsAttributes, PhysicsVariables};
use crate::components::object::GameObject;
use crate::components::sprite::SpriteHandle;

/// A live occurrence of a [`GameObject`] inside a scene instance.
///
/// Created only through [`GameObject::create_instance`]; owns a copy of the
/// template's defaults and shares the template itself.
#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    object: Arc<GameObject>,
    /// Position in scene space.
    pub position: IVec2,
    /// Sort key for update and draw order. Lower depth goes first.
    pub depth: i32,
    sprite: Option<SpriteHandle>,
    image_index: u32,
    /// Number of extra animation steps each frame is held for.
    pub image_speed: u32,
    /// Rotation in degrees, normalised to `[0, 360)` after every step.
    pub image_angle: f32,
    pub scale: Vec2,
    /// Draw offset relative to `position` (sprite origin).
    pub offset: IVec2,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Cleared by view culling for optimized instances.
    pub activated: bool,
    pub animated: bool,
    pub variables: HashMap<String, Value>,
    pub physics_attributes: PhysicsAttributes,
    pub physics: PhysicsVariables,
    animation_counter: u32,
}

impl Instance {
    pub(crate) fn from_template(object: &Arc<GameObject>) -> Self {
        let mut instance = Self {
            id: InstanceId::new(),
            object: Arc::clone(object),
            position: IVec2::ZERO,
            depth: object.depth,
            sprite: object.sprite.clone(),
            image_index: 0,
            image_speed: object.image_speed,
            image_angle: object.image_angle,
            scale: object.scale,
            offset: object.offset,
            flip_x: object.flip_x,
            flip_y: object.flip_y,
            activated: object.activated,
            animated: object.animated,
            variables: object.variables.clone(),
            physics_attributes: object.physics.clone(),
            physics: PhysicsVariables::default(),
            animation_counter: 0,
        };
        if let Err(err) = instance.set_image_index(object.image_index) {
            log::warn!("{}: default {err}; starting at frame 0", object.name);
        }
        instance.normalize_angle();
        instance
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The template this instance was created from.
    pub fn object(&self) -> &Arc<GameObject> {
        &self.object
    }

    /// Name of the owning template.
    pub fn name(&self) -> &str {
        &self.object.name
    }

    /// Whether view culling decides if this instance steps and draws.
    pub fn is_optimized(&self) -> bool {
        self.object.optimized
    }

    pub fn sprite(&self) -> Option<&SpriteHandle> {
        self.sprite.as_ref()
    }

    /// Replace the sprite. The image index restarts at 0.
    pub fn set_sprite(&mut self, sprite: Option<SpriteHandle>) {
        self.sprite = sprite;
        self.image_index = 0;
        self.animation_counter = 0;
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Fails when `index` is not a frame of the current sprite.
    pub fn set_image_index(&mut self, index: u32) -> Result<()> {
        if let Some(sprite) = &self.sprite {
            if index != 0 && index >= sprite.frame_count {
                return Err(EngineError::ImageIndexOutOfRange {
                    index,
                    frames: sprite.frame_count,
                });
            }
        }
        self.image_index = index;
        Ok(())
    }

    /// Advance the animation by one step.
    ///
    /// Each frame is shown for `image_speed + 1` steps before moving on; the
    /// index wraps back to 0 after the last frame.
    pub fn animation_step(&mut self) {
        if !self.animated {
            return;
        }
        let Some(frames) = self.sprite.as_ref().map(|s| s.frame_count) else {
            return;
        };
        if self.animation_counter >= self.image_speed {
            self.animation_counter = 0;
            self.image_index = if self.image_index + 1 >= frames {
                0
            } else {
                self.image_index + 1
            };
        } else {
            self.animation_counter += 1;
        }
    }

    pub fn normalize_angle(&mut self) {
        if !(0.0..360.0).contains(&self.image_angle) {
            self.image_angle = self.image_angle.rem_euclid(360.0);
        }
    }

    /// Scaled frame size used for view culling. Zero without a sprite.
    pub fn extent(&self) -> Size {
        match &self.sprite {
            Some(s) => Size::new(
                (s.frame_size.w as f32 * self.scale.x.abs()).ceil() as i32,
                (s.frame_size.h as f32 * self.scale.y.abs()).ceil() as i32,
            ),
            None => Size::ZERO,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }
}
