use std::time::Duration;

use glam::Vec3;
use lumen_core::{EngineEvent, KeyCode, LightAddRequest, MouseEvent, RenderMode};
use lumen_input::EventSender;

/// One scripted producer action, sent after `delay`.
#[derive(Clone, Copy, Debug)]
pub enum Step {
    Tap(KeyCode),
    Event(EngineEvent),
}

/// Exercises every producer path: the add-light key, explicit light
/// requests, mode keys, a raw mode event and a resize.
pub fn demo_script() -> Vec<(Duration, Step)> {
    let ms = Duration::from_millis;
    vec![
        (ms(20), Step::Event(EngineEvent::Mouse(MouseEvent::Moved { x: 960.0, y: 540.0 }))),
        (ms(20), Step::Tap(KeyCode::KeyL)),
        (
            ms(20),
            Step::Event(EngineEvent::LightAdd(LightAddRequest {
                position: Vec3::new(8.0, 3.0, 8.0),
                color: Vec3::new(1.0, 0.2, 0.1),
                intensity: 2.0,
                radius: 8.0,
            })),
        ),
        (ms(40), Step::Tap(KeyCode::F2)),
        (ms(40), Step::Event(EngineEvent::Resized { width: 1280, height: 720 })),
        (ms(40), Step::Event(EngineEvent::RenderMode(RenderMode::Normals))),
        (ms(40), Step::Tap(KeyCode::F1)),
    ]
}

/// Plays `script` into the channel. Ends early once the dispatcher is gone.
pub async fn play(sender: EventSender, script: Vec<(Duration, Step)>) {
    for (delay, step) in script {
        tokio::time::sleep(delay).await;
        let delivered = match step {
            Step::Tap(key) => sender.tap(key),
            Step::Event(event) => sender.send(event),
        };
        if !delivered {
            log::debug!("Input script stopped: dispatcher dropped");
            return;
        }
    }
    log::debug!("Input script finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_input::event_channel;

    #[test]
    fn script_is_delivered_in_order() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let (sender, mut receiver) = event_channel();
        let script = demo_script();
        let taps = script.iter().filter(|(_, step)| matches!(step, Step::Tap(_))).count();
        let expected = script.len() + taps;

        runtime.block_on(play(sender, script));

        let mut received = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), expected);
        assert!(matches!(received[0], EngineEvent::Mouse(_)));
        assert!(received.contains(&EngineEvent::Resized { width: 1280, height: 720 }));
    }
}
