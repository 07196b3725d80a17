pub mod queue;
pub mod state;

pub use queue::{
    input_channel, ChannelInput, InputEvent, InputQueue, InputSender, InputSource, MouseButton,
    WindowEvent,
};
pub use state::{EngineEvent, InputState};
