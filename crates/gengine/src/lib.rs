pub mod api;
pub mod assets;
pub mod components;
pub mod core;
pub mod input;
pub mod logging;
pub mod renderer;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::config::{EngineMode, EngineProperties};
pub use api::error::{EngineError, PhysicsError, ResourceError, Result};
pub use api::game::{EngineContext, Game};
pub use api::types::{ColorRGBA, InstanceId, Size};
pub use assets::{ResourceManager, TextureManifest, TextureRegistry};
pub use components::body::{BodyKind, BodyShape, PhysicsAttributes, PhysicsVariables};
pub use components::instance::Instance;
pub use components::object::{GameObject, ObjectBehavior, ObjectRegistry};
pub use components::sprite::{SpriteHandle, TextureId};
pub use crate::core::auto_offset::{AutoOffset, AutoOffsetConfig};
pub use crate::core::collection::{CollectionEvent, InstanceCollection, Subscription};
pub use crate::core::engine::Engine;
pub use crate::core::scene::{Scene, SceneBehavior, SceneContext, SceneInstance, View};
pub use crate::core::scene_manager::SceneManager;
pub use crate::core::scheduler::{
    ErrorAction, ErrorReporter, EventResponse, GameLoop, LogReporter, LoopStats, TickOutcome,
};
pub use crate::core::time::{Clock, ManualClock, SystemClock};
pub use input::{input_channel, InputEvent, InputQueue, InputSender, InputState, WindowEvent};
pub use logging::{init_logging, LoggingConfig};
pub use renderer::{CommandBuffer, DrawCommand, Renderer, SpriteDraw};

#[cfg(feature = "physics")]
pub use crate::core::physics::{PhysicsConfig, PhysicsWorld};
