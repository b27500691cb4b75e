//! Mouse buttons, cursors, and per-button state.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
    Extra1 = 3,
    Extra2 = 4,
}

impl MouseButton {
    pub const COUNT: usize = 5;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<MouseButton> {
        match index {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Right),
            2 => Some(MouseButton::Middle),
            3 => Some(MouseButton::Extra1),
            4 => Some(MouseButton::Extra2),
            _ => None,
        }
    }
}

/// Cursor shape requested by extensions and committed by the IO frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseCursor {
    None,
    Arrow,
    TextInput,
    ResizeAll,
    ResizeNs,
    ResizeEw,
    ResizeNesw,
    ResizeNwse,
    Hand,
    Wait,
    Progress,
    NotAllowed,
}

/// Per-button state advanced once per frame.
#[derive(Debug, Clone, Copy)]
pub struct MouseButtonState {
    pub down: bool,
    pub clicked: bool,
    pub released: bool,
    pub double_clicked: bool,
    pub clicked_pos: Vec2,
    pub clicked_time: f64,
    pub clicked_count: u32,
    pub down_duration: f32,
    pub down_duration_prev: f32,
    pub drag_max_dist_sqr: f32,
}

impl Default for MouseButtonState {
    fn default() -> Self {
        Self {
            down: false,
            clicked: false,
            released: false,
            double_clicked: false,
            clicked_pos: Vec2::ZERO,
            clicked_time: -f64::MAX,
            clicked_count: 0,
            down_duration: -1.0,
            down_duration_prev: -1.0,
            drag_max_dist_sqr: 0.0,
        }
    }
}
