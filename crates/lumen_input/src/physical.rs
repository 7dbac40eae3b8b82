use std::collections::HashMap;

use lumen_core::{KeyCode, KeyEvent, KeyState, MouseEvent};

use crate::logical::{ActionId, ActionState};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MouseButtonId {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl From<u16> for MouseButtonId {
    fn from(button: u16) -> Self {
        match button {
            0 => MouseButtonId::Left,
            1 => MouseButtonId::Right,
            2 => MouseButtonId::Middle,
            3 => MouseButtonId::Back,
            4 => MouseButtonId::Forward,
            other => MouseButtonId::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DeviceKind {
    Keyboard(KeyCode),
    MouseButton(MouseButtonId),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PhysicalInputId {
    pub device: DeviceKind,
}

#[derive(Default, Debug)]
pub struct InputState {
    pub physical_buttons: HashMap<PhysicalInputId, bool>,
    pub actions: HashMap<ActionId, ActionState>,

    pub mouse_position: (f32, f32),
    // accumulated since the last end_frame
    pub mouse_delta: (f32, f32),
}

impl InputState {
    pub fn apply_key(&mut self, event: KeyEvent) {
        let id = PhysicalInputId {
            device: DeviceKind::Keyboard(event.key),
        };
        self.physical_buttons
            .insert(id, event.state == KeyState::Pressed);
    }

    pub fn apply_mouse(&mut self, event: MouseEvent) {
        match event {
            MouseEvent::Moved { x, y } => {
                let (old_x, old_y) = self.mouse_position;
                self.mouse_delta.0 += x - old_x;
                self.mouse_delta.1 += y - old_y;
                self.mouse_position = (x, y);
            }
            MouseEvent::Button { button, state } => {
                let id = PhysicalInputId {
                    device: DeviceKind::MouseButton(button.into()),
                };
                self.physical_buttons.insert(id, state == KeyState::Pressed);
            }
        }
    }

    pub fn is_down(&self, id: &PhysicalInputId) -> bool {
        self.physical_buttons.get(id).copied().unwrap_or(false)
    }

    pub fn end_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
    }
}
