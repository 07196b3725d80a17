use std::sync::Arc;

use crate::api::types::Size;

/// Renderer-side texture identity. Index into the resource manager's textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

/// A resolved sprite: which texture to draw and how its frames are laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteHandle {
    pub texture: TextureId,
    /// Resource name the handle was resolved from.
    pub name: Arc<str>,
    /// Number of animation frames (at least 1 for a drawable sprite).
    pub frame_count: u32,
    /// Size of a single frame in pixels.
    pub frame_size: Size,
}

impl SpriteHandle {
    pub fn new(texture: TextureId, name: impl Into<Arc<str>>, frame_count: u32, frame_size: Size) -> Self {
        Self {
            texture,
            name: name.into(),
            frame_count,
            frame_size,
        }
    }

    /// Whether stepping the image index can change the displayed frame.
    pub fn is_animated(&self) -> bool {
        self.frame_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_sprite_is_static() {
        let s = SpriteHandle::new(TextureId(0), "wall", 1, Size::new(16, 16));
        assert!(!s.is_animated());
        let s = SpriteHandle::new(TextureId(1), "coin", 8, Size::new(16, 16));
        assert!(s.is_animated());
    }
}
