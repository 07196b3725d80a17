pub mod body;
pub mod instance;
pub mod object;
pub mod sprite;
