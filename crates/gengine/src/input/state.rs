use std::collections::HashSet;

use glam::IVec2;

use crate::input::queue::{InputEvent, MouseButton, WindowEvent};

/// Non-input notifications picked out of the event stream for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Window(WindowEvent),
    DeviceReset,
}

/// Keyboard and mouse state with once-per-logic-tick edge detection.
///
/// Events update the raw state as they arrive; `refresh` derives the
/// pressed/released edges that hooks see for the whole logic step.
#[derive(Debug, Clone)]
pub struct InputState {
    down: HashSet<u32>,
    last_down: HashSet<u32>,
    pressed: HashSet<u32>,
    released: HashSet<u32>,
    mouse: IVec2,
    buttons: [bool; 3],
    last_buttons: [bool; 3],
    buttons_pressed: [bool; 3],
    buttons_released: [bool; 3],
    focused: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            down: HashSet::new(),
            last_down: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
            mouse: IVec2::ZERO,
            buttons: [false; 3],
            last_buttons: [false; 3],
            buttons_pressed: [false; 3],
            buttons_released: [false; 3],
            focused: true,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply raw events. Window and device events are returned for routing.
    pub fn process(&mut self, events: impl IntoIterator<Item = InputEvent>) -> Vec<EngineEvent> {
        let mut routed = Vec::new();
        for event in events {
            match event {
                InputEvent::KeyDown { key } => {
                    self.down.insert(key);
                }
                InputEvent::KeyUp { key } => {
                    self.down.remove(&key);
                }
                InputEvent::MouseMove { x, y } => self.mouse = IVec2::new(x, y),
                InputEvent::MouseDown { button } => self.buttons[button.index()] = true,
                InputEvent::MouseUp { button } => self.buttons[button.index()] = false,
                InputEvent::Window(window) => {
                    match window {
                        WindowEvent::FocusGained => self.focused = true,
                        WindowEvent::FocusLost => {
                            // nothing is reported as held across a focus loss
                            self.focused = false;
                            self.down.clear();
                            self.buttons = [false; 3];
                        }
                        _ => {}
                    }
                    routed.push(EngineEvent::Window(window));
                }
                InputEvent::DeviceReset => routed.push(EngineEvent::DeviceReset),
            }
        }
        routed
    }

    /// Recompute edges against the state seen at the previous refresh.
    pub fn refresh(&mut self) {
        self.pressed = self.down.difference(&self.last_down).copied().collect();
        self.released = self.last_down.difference(&self.down).copied().collect();
        self.last_down.clone_from(&self.down);
        for i in 0..3 {
            self.buttons_pressed[i] = self.buttons[i] && !self.last_buttons[i];
            self.buttons_released[i] = !self.buttons[i] && self.last_buttons[i];
        }
        self.last_buttons = self.buttons;
    }

    pub fn key_down(&self, key: u32) -> bool {
        self.down.contains(&key)
    }

    /// Went down since the previous refresh.
    pub fn key_pressed(&self, key: u32) -> bool {
        self.pressed.contains(&key)
    }

    pub fn key_released(&self, key: u32) -> bool {
        self.released.contains(&key)
    }

    pub fn mouse_position(&self) -> IVec2 {
        self.mouse
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed[button.index()]
    }

    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.buttons_released[button.index()]
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }
}
