pub mod animation;
#[cfg(feature = "physics")]
pub mod debug;
pub mod render;
