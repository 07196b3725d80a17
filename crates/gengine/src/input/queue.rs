use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Mouse buttons tracked by the input state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub(crate) fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
        }
    }
}

/// Window notifications. None of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Close,
    FocusGained,
    FocusLost,
    Exposed,
    Shown,
    Resized { width: i32, height: i32 },
}

/// Input event types the engine understands.
/// Generic, with no game-specific semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down. `key` is the platform key code.
    KeyDown { key: u32 },
    KeyUp { key: u32 },
    /// The cursor moved to screen coordinates (x, y).
    MouseMove { x: i32, y: i32 },
    MouseDown { button: MouseButton },
    MouseUp { button: MouseButton },
    Window(WindowEvent),
    /// The render device was lost and recreated; textures must be rebuilt.
    DeviceReset,
}

/// Where the scheduler pulls input from once per tick.
pub trait InputSource: Send {
    /// Take every event that arrived since the last poll.
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// A queue of input events.
/// The platform layer pushes events; the engine drains them each tick.
#[derive(Debug)]
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for InputQueue {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.drain()
    }
}

/// Sending half of a cross-thread input channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<InputEvent>,
}

impl InputSender {
    /// Returns false once the engine side has been dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Input source fed from other threads through an [`InputSender`].
#[derive(Debug)]
pub struct ChannelInput {
    rx: Receiver<InputEvent>,
}

impl InputSource for ChannelInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

/// Create a connected sender/source pair.
pub fn input_channel() -> (InputSender, ChannelInput) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (InputSender { tx }, ChannelInput { rx })
}
