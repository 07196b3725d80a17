use serde::{Deserialize, Serialize};

use crate::api::error::ResourceError;
use crate::api::types::Size;
use crate::assets::registry::TextureRegistry;

/// Texture manifest describing every texture's frame layout.
/// Loaded from a JSON file at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureManifest {
    pub textures: Vec<TextureDescriptor>,
}

/// Describes a single texture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureDescriptor {
    pub name: String,
    /// Relative path to the image file (e.g., "hero.png").
    #[serde(default)]
    pub path: String,
    /// Number of animation frames (default: 1).
    #[serde(default = "default_frames")]
    pub frames: u32,
    pub frame_width: i32,
    pub frame_height: i32,
}

fn default_frames() -> u32 {
    1
}

impl TextureManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(json).map_err(|e| ResourceError::Manifest(e.to_string()))
    }

    /// Register every entry into `registry`.
    ///
    /// Bad entries are logged and skipped; the rest of the batch still loads.
    /// Returns the number of textures registered.
    pub fn register_into(&self, registry: &mut TextureRegistry) -> usize {
        let mut loaded = 0;
        for desc in &self.textures {
            let size = Size::new(desc.frame_width, desc.frame_height);
            match registry.register(&desc.name, desc.frames, size) {
                Ok(_) => loaded += 1,
                Err(err) => log::warn!("skipping texture '{}': {err}", desc.name),
            }
        }
        log::debug!("registered {loaded}/{} textures", self.textures.len());
        loaded
    }
}
