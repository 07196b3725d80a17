pub mod auto_offset;
pub mod collection;
pub mod engine;
#[cfg(feature = "physics")]
pub mod physics;
pub mod scene;
pub mod scene_manager;
pub mod scheduler;
pub mod time;
