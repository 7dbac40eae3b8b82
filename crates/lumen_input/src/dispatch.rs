use std::sync::Arc;

use glam::Vec3;
use lumen_core::{
    EngineEvent, KeyCode, KeyEvent, LightAddRequest, RenderMode, RenderModeFlag,
};
use lumen_lights::{LightError, LightStore};
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel,
};

use crate::{
    logical::{ActionId, InputMap},
    physical::InputState,
};

pub const ADD_LIGHT: ActionId = ActionId(1);
pub const RENDER_MODE_ACTIONS: [ActionId; 5] = [
    ActionId(10),
    ActionId(11),
    ActionId(12),
    ActionId(13),
    ActionId(14),
];

const RENDER_MODE_KEYS: [KeyCode; 5] = [
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
];

impl InputMap {
    /// `L` spawns a light at the camera, `F1`..`F5` pick the render mode.
    pub fn with_default_bindings() -> Self {
        let mut map = InputMap::default();
        map.bind_keyboard_button(KeyCode::KeyL, ADD_LIGHT);
        for (key, action) in RENDER_MODE_KEYS.into_iter().zip(RENDER_MODE_ACTIONS) {
            map.bind_keyboard_button(key, action);
        }
        map
    }
}

/// Producer half of the engine event channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender(UnboundedSender<EngineEvent>);

impl EventSender {
    /// Returns false once the dispatcher is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.0.send(event).is_ok()
    }

    pub fn key(&self, event: KeyEvent) -> bool {
        self.send(EngineEvent::Key(event))
    }

    /// Press immediately followed by release.
    pub fn tap(&self, key: KeyCode) -> bool {
        self.key(KeyEvent::pressed(key)) && self.key(KeyEvent::released(key))
    }

    pub fn add_light(&self, request: LightAddRequest) -> bool {
        self.send(EngineEvent::LightAdd(request))
    }
}

pub fn event_channel() -> (EventSender, UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = unbounded_channel::<EngineEvent>();
    (EventSender(tx), rx)
}

/// What one [`EventDispatcher::pump`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub events: usize,
    pub lights_added: usize,
    pub lights_rejected: usize,
    pub mode: Option<RenderMode>,
    /// Last resize seen, if any.
    pub resized: Option<(u32, u32)>,
    pub shutdown: bool,
    /// Every sender has been dropped.
    pub disconnected: bool,
}

/// Consumer half: drains the channel between frames and applies each event to
/// the light store, the render-mode flag and the input state.
pub struct EventDispatcher {
    receiver: UnboundedReceiver<EngineEvent>,
    store: Arc<LightStore>,
    mode: Arc<RenderModeFlag>,
    input_state: InputState,
    input_map: InputMap,
}

impl EventDispatcher {
    pub fn new(
        receiver: UnboundedReceiver<EngineEvent>,
        store: Arc<LightStore>,
        mode: Arc<RenderModeFlag>,
    ) -> Self {
        Self {
            receiver,
            store,
            mode,
            input_state: InputState::default(),
            input_map: InputMap::with_default_bindings(),
        }
    }

    /// Handles every queued event without blocking. `camera_position` is
    /// where the add-light key spawns its light.
    pub fn pump(&mut self, camera_position: Vec3) -> DispatchReport {
        let mut report = DispatchReport::default();

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    report.disconnected = true;
                    break;
                }
            };
            report.events += 1;

            match event {
                EngineEvent::Key(key) => {
                    self.input_state.apply_key(key);
                    self.fire_actions(camera_position, &mut report);
                }
                EngineEvent::Mouse(mouse) => {
                    self.input_state.apply_mouse(mouse);
                    self.fire_actions(camera_position, &mut report);
                }
                EngineEvent::LightAdd(request) => self.add_light(&request, &mut report),
                EngineEvent::RenderMode(mode) => self.set_mode(mode, &mut report),
                EngineEvent::Resized { width, height } => report.resized = Some((width, height)),
                EngineEvent::Shutdown => report.shutdown = true,
            }
        }

        self.input_state.end_frame();
        report
    }

    // Input changes are folded in per event so a press and release arriving
    // in the same batch still trigger the action.
    fn fire_actions(&mut self, camera_position: Vec3, report: &mut DispatchReport) {
        self.input_map.update(&mut self.input_state);

        if self.input_state.just_pressed(ADD_LIGHT) {
            self.add_light(&LightAddRequest::white_at(camera_position), report);
        }

        let pressed_mode = RENDER_MODE_ACTIONS
            .iter()
            .position(|&action| self.input_state.just_pressed(action));
        if let Some(raw) = pressed_mode {
            match self.mode.set_raw(raw as u32) {
                Ok(mode) => {
                    log::info!("Render mode set to {mode:?}");
                    report.mode = Some(mode);
                }
                Err(err) => log::warn!("{err}"),
            }
        }
    }

    fn add_light(&self, request: &LightAddRequest, report: &mut DispatchReport) {
        match self.store.add_request(request) {
            Ok(index) => {
                log::info!("Added point light #{index} at {}", request.position);
                report.lights_added += 1;
            }
            Err(err @ LightError::CapacityExceeded { .. }) => {
                log::warn!("Rejected light at {}: {err}", request.position);
                report.lights_rejected += 1;
            }
            Err(err) => {
                log::warn!("Ignoring invalid light request: {err}");
                report.lights_rejected += 1;
            }
        }
    }

    fn set_mode(&self, mode: RenderMode, report: &mut DispatchReport) {
        self.mode.set(mode);
        log::info!("Render mode set to {mode:?}");
        report.mode = Some(mode);
    }
}
