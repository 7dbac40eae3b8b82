pub mod dispatch;
pub mod logical;
pub mod physical;

pub use dispatch::{
    ADD_LIGHT, DispatchReport, EventDispatcher, EventSender, RENDER_MODE_ACTIONS, event_channel,
};
pub use logical::{ActionId, ButtonPhase, InputMap};
pub use physical::InputState;
