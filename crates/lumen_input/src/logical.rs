use std::collections::HashMap;

use lumen_core::KeyCode;

use crate::physical::{DeviceKind, InputState, MouseButtonId, PhysicalInputId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub u32);

#[derive(Clone, Debug)]
pub struct InputBinding {
    pub physical: PhysicalInputId,
    pub action: ActionId,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ButtonPhase: u8 {
        const NONE     = 0;
        const PRESSED  = 1 << 0;
        const HELD     = 1 << 1;
        const RELEASED = 1 << 2;
    }
}

#[derive(Clone, Debug)]
pub struct ActionState {
    pub phase: ButtonPhase,
}

#[derive(Default, Clone, Debug)]
pub struct InputMap {
    pub bindings: Vec<InputBinding>,
}

impl InputMap {
    pub fn bind_keyboard_button(&mut self, key_code: KeyCode, action: ActionId) -> &mut Self {
        self.bindings.push(InputBinding {
            physical: PhysicalInputId {
                device: DeviceKind::Keyboard(key_code),
            },
            action,
        });

        self
    }

    pub fn bind_mouse_button(&mut self, button: MouseButtonId, action: ActionId) -> &mut Self {
        self.bindings.push(InputBinding {
            physical: PhysicalInputId {
                device: DeviceKind::MouseButton(button),
            },
            action,
        });

        self
    }

    /// Folds the physical state into action phases. PRESSED and RELEASED
    /// last until the next update.
    pub fn update(&self, input_state: &mut InputState) {
        // Reset logical state
        for action in input_state.actions.values_mut() {
            let was_held = action.phase.contains(ButtonPhase::HELD);
            action.phase = if was_held {
                ButtonPhase::HELD
            } else {
                ButtonPhase::NONE
            };
        }

        // An action is down while any of its bindings is down.
        let mut down: HashMap<ActionId, bool> = HashMap::new();
        for binding in &self.bindings {
            *down.entry(binding.action).or_insert(false) |= input_state.is_down(&binding.physical);
        }

        // Apply bindings
        for (action, pressed) in down {
            let entry = input_state.actions.entry(action).or_insert(ActionState {
                phase: ButtonPhase::NONE,
            });
            if pressed {
                if !entry.phase.contains(ButtonPhase::HELD) {
                    entry.phase |= ButtonPhase::PRESSED | ButtonPhase::HELD;
                } else {
                    entry.phase |= ButtonPhase::HELD;
                }
            } else if entry.phase.contains(ButtonPhase::HELD) {
                entry.phase &= !ButtonPhase::HELD;
                entry.phase |= ButtonPhase::RELEASED;
            }
        }
    }
}

impl InputState {
    pub fn action_phase(&self, action: ActionId) -> ButtonPhase {
        self.actions
            .get(&action)
            .map_or(ButtonPhase::NONE, |state| state.phase)
    }

    pub fn just_pressed(&self, action: ActionId) -> bool {
        self.action_phase(action).contains(ButtonPhase::PRESSED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::KeyEvent;

    const JUMP: ActionId = ActionId(7);

    #[test]
    fn press_hold_release_cycle() {
        let mut map = InputMap::default();
        map.bind_keyboard_button(KeyCode::Space, JUMP);
        let mut state = InputState::default();

        state.apply_key(KeyEvent::pressed(KeyCode::Space));
        map.update(&mut state);
        assert_eq!(state.action_phase(JUMP), ButtonPhase::PRESSED | ButtonPhase::HELD);

        map.update(&mut state);
        assert_eq!(state.action_phase(JUMP), ButtonPhase::HELD);
        assert!(!state.just_pressed(JUMP));

        state.apply_key(KeyEvent::released(KeyCode::Space));
        map.update(&mut state);
        assert_eq!(state.action_phase(JUMP), ButtonPhase::RELEASED);

        map.update(&mut state);
        assert_eq!(state.action_phase(JUMP), ButtonPhase::NONE);
    }

    #[test]
    fn unbound_keys_do_nothing() {
        let mut map = InputMap::default();
        map.bind_keyboard_button(KeyCode::Space, JUMP);
        let mut state = InputState::default();

        state.apply_key(KeyEvent::pressed(KeyCode::KeyQ));
        map.update(&mut state);
        assert!(!state.just_pressed(JUMP));
    }

    #[test]
    fn either_binding_triggers_the_action() {
        let mut map = InputMap::default();
        map.bind_keyboard_button(KeyCode::Space, JUMP)
            .bind_mouse_button(MouseButtonId::Left, JUMP);
        let mut state = InputState::default();

        state.apply_mouse(lumen_core::MouseEvent::Button {
            button: 0,
            state: lumen_core::KeyState::Pressed,
        });
        map.update(&mut state);
        assert!(state.just_pressed(JUMP));

        // the idle keyboard binding must not release it
        map.update(&mut state);
        assert_eq!(state.action_phase(JUMP), ButtonPhase::HELD);
    }
}
