use std::collections::HashMap;

use crate::api::error::ResourceError;
use crate::api::types::Size;
use crate::components::sprite::{SpriteHandle, TextureId};

/// Lookup side of the resource collaborator. Loading and decoding happen elsewhere.
pub trait ResourceManager {
    /// Resolve a texture by name into a drawable sprite handle.
    fn texture(&self, name: &str) -> Result<SpriteHandle, ResourceError>;

    fn has_texture(&self, name: &str) -> bool;

    fn frame_count(&self, name: &str) -> Result<u32, ResourceError> {
        self.texture(name).map(|s| s.frame_count)
    }

    fn frame_size(&self, name: &str) -> Result<Size, ResourceError> {
        self.texture(name).map(|s| s.frame_size)
    }
}

/// In-memory texture metadata, keyed by name.
/// Texture ids are handed out in registration order.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<String, SpriteHandle>,
    next_id: u32,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture's frame layout and return its handle.
    pub fn register(
        &mut self,
        name: &str,
        frame_count: u32,
        frame_size: Size,
    ) -> Result<SpriteHandle, ResourceError> {
        if self.textures.contains_key(name) {
            return Err(ResourceError::Duplicate(name.to_string()));
        }
        if frame_count == 0 {
            return Err(ResourceError::Corrupt {
                name: name.to_string(),
                reason: "texture has no frames".to_string(),
            });
        }
        if frame_size.w <= 0 || frame_size.h <= 0 {
            return Err(ResourceError::Corrupt {
                name: name.to_string(),
                reason: format!("invalid frame size {frame_size}"),
            });
        }
        let handle = SpriteHandle::new(TextureId(self.next_id), name, frame_count, frame_size);
        self.next_id += 1;
        self.textures.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl ResourceManager for TextureRegistry {
    fn texture(&self, name: &str) -> Result<SpriteHandle, ResourceError> {
        self.textures
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))
    }

    fn has_texture(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut reg = TextureRegistry::new();
        let hero = reg.register("hero", 4, Size::new(32, 48)).unwrap();
        let wall = reg.register("wall", 1, Size::new(16, 16)).unwrap();
        assert_ne!(hero.texture, wall.texture);

        assert!(reg.has_texture("hero"));
        assert_eq!(reg.frame_count("hero").unwrap(), 4);
        assert_eq!(reg.frame_size("hero").unwrap(), Size::new(32, 48));
        assert_eq!(reg.texture("wall").unwrap(), wall);
    }

    #[test]
    fn duplicate_and_missing_are_errors() {
        let mut reg = TextureRegistry::new();
        reg.register("hero", 1, Size::new(8, 8)).unwrap();
        assert_eq!(
            reg.register("hero", 2, Size::new(8, 8)).unwrap_err(),
            ResourceError::Duplicate("hero".into())
        );
        assert_eq!(
            reg.texture("ghost").unwrap_err(),
            ResourceError::NotFound("ghost".into())
        );
    }

    #[test]
    fn empty_layouts_are_corrupt() {
        let mut reg = TextureRegistry::new();
        assert!(matches!(
            reg.register("none", 0, Size::new(8, 8)),
            Err(ResourceError::Corrupt { .. })
        ));
        assert!(matches!(
            reg.register("flat", 1, Size::new(8, 0)),
            Err(ResourceError::Corrupt { .. })
        ));
        assert!(reg.is_empty());
    }
}
