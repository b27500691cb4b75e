//! Input events queued by platform backends and drained at `new_frame`.

use super::keyboard::KeyCode;
use super::mouse::MouseButton;

/// One pending input event. Events apply in FIFO order during the frame's
/// drain step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: KeyCode, down: bool },
    MousePos { x: f32, y: f32 },
    MouseButton { button: MouseButton, down: bool },
    MouseWheel { horizontal: f32, vertical: f32 },
    Text { character: char },
}
