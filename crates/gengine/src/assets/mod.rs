pub mod manifest;
pub mod registry;

pub use manifest::{TextureDescriptor, TextureManifest};
pub use registry::{ResourceManager, TextureRegistry};
