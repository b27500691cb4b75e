//! The IO frame: input aggregation, frame timing, and the cooperative
//! event pump's view of the world.
//!
//! Platform backends feed events through cloned senders; `new_frame`
//! drains them in FIFO order and distills per-key and per-button state
//! the application queries for the rest of the frame. Nothing here
//! blocks.

pub mod events;
pub mod keyboard;
pub mod mouse;

pub use events::InputEvent;
pub use keyboard::{KeyCode, KeyData, KeyMods};
pub use mouse::{MouseButton, MouseButtonState, MouseCursor};

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use serde::Deserialize;
use std::time::Instant;

/// Slots in the rolling delta-time ring used for the smoothed frame rate.
const FRAME_RATE_SAMPLES: usize = 120;

/// Sentinel for "no valid mouse position yet".
const INVALID_MOUSE_POS: Vec2 = Vec2::new(-f32::MAX, -f32::MAX);

/// Input tunables, loadable from the runtime config.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub mouse_drag_threshold: f32,
    pub mouse_double_click_time: f32,
    pub mouse_double_click_max_dist: f32,
    pub key_repeat_delay: f32,
    pub key_repeat_rate: f32,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            mouse_drag_threshold: 6.0,
            mouse_double_click_time: 0.3,
            mouse_double_click_max_dist: 6.0,
            key_repeat_delay: 0.275,
            key_repeat_rate: 0.050,
        }
    }
}

/// Aggregated IO state for one frame.
pub struct Io {
    pub config: IoConfig,

    // frame output
    delta_time: f32,
    time: f64,
    frame_count: u64,
    frame_rate: f32,
    running: bool,
    viewport_size: Vec2,
    framebuffer_scale: Vec2,
    viewport_resized: bool,
    key_mods: KeyMods,

    // event plumbing
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,

    // keyboard state
    keys: [KeyData; KeyCode::COUNT],
    text_queue: Vec<u16>,

    // mouse state
    mouse_pos: Vec2,
    mouse_pos_prev: Vec2,
    mouse_delta: Vec2,
    last_valid_mouse_pos: Vec2,
    mouse_down: [bool; MouseButton::COUNT],
    buttons: [MouseButtonState; MouseButton::COUNT],
    wheel: f32,
    wheel_horizontal: f32,
    pending_wheel: f32,
    pending_wheel_horizontal: f32,

    // cursor arbitration
    current_cursor: MouseCursor,
    next_cursor: MouseCursor,
    cursor_changed: bool,

    // frame rate ring
    frame_times: [f32; FRAME_RATE_SAMPLES],
    frame_time_index: usize,
    frame_time_count: usize,
    frame_time_accum: f32,

    last_frame: Option<Instant>,
}

impl Io {
    pub fn new(config: IoConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            config,
            delta_time: 0.0,
            time: 0.0,
            frame_count: 0,
            frame_rate: 0.0,
            running: true,
            viewport_size: Vec2::new(500.0, 500.0),
            framebuffer_scale: Vec2::ONE,
            viewport_resized: true,
            key_mods: KeyMods::NONE,
            sender,
            receiver,
            keys: [KeyData::default(); KeyCode::COUNT],
            text_queue: Vec::new(),
            mouse_pos: INVALID_MOUSE_POS,
            mouse_pos_prev: INVALID_MOUSE_POS,
            mouse_delta: Vec2::ZERO,
            last_valid_mouse_pos: INVALID_MOUSE_POS,
            mouse_down: [false; MouseButton::COUNT],
            buttons: [MouseButtonState::default(); MouseButton::COUNT],
            wheel: 0.0,
            wheel_horizontal: 0.0,
            pending_wheel: 0.0,
            pending_wheel_horizontal: 0.0,
            current_cursor: MouseCursor::Arrow,
            next_cursor: MouseCursor::Arrow,
            cursor_changed: false,
            frame_times: [0.0; FRAME_RATE_SAMPLES],
            frame_time_index: 0,
            frame_time_count: 0,
            frame_time_accum: 0.0,
            last_frame: None,
        }
    }

    /// Begins a frame from the wall clock.
    pub fn new_frame(&mut self) {
        let now = Instant::now();
        let dt = match self.last_frame {
            Some(previous) => (now - previous).as_secs_f32(),
            None => 1.0 / 60.0,
        };
        self.last_frame = Some(now);
        self.step(dt.max(f32::EPSILON));
    }

    /// Begins a frame with an explicit delta. This is the whole frame
    /// algorithm; `new_frame` only supplies the clock.
    pub fn step(&mut self, dt: f32) {
        // 1. timing
        self.delta_time = dt;
        self.time += dt as f64;
        self.frame_count += 1;
        self.viewport_resized = false;

        self.frame_time_accum -= self.frame_times[self.frame_time_index];
        self.frame_times[self.frame_time_index] = dt;
        self.frame_time_accum += dt;
        self.frame_time_index = (self.frame_time_index + 1) % FRAME_RATE_SAMPLES;
        self.frame_time_count = (self.frame_time_count + 1).min(FRAME_RATE_SAMPLES);
        if self.frame_time_accum > 0.0 {
            self.frame_rate = self.frame_time_count as f32 / self.frame_time_accum;
        }

        // 2. modifier chord from current key state
        let mut mods = KeyMods::NONE;
        if self.key_down(KeyCode::LeftCtrl) || self.key_down(KeyCode::RightCtrl) {
            mods.insert(KeyMods::CTRL);
        }
        if self.key_down(KeyCode::LeftShift) || self.key_down(KeyCode::RightShift) {
            mods.insert(KeyMods::SHIFT);
        }
        if self.key_down(KeyCode::LeftAlt) || self.key_down(KeyCode::RightAlt) {
            mods.insert(KeyMods::ALT);
        }
        if self.key_down(KeyCode::LeftSuper) || self.key_down(KeyCode::RightSuper) {
            mods.insert(KeyMods::SUPER);
        }
        self.key_mods = mods;

        // 3. drain pending events FIFO
        self.pending_wheel = 0.0;
        self.pending_wheel_horizontal = 0.0;
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                InputEvent::Key { key, down } => {
                    self.keys[key.index()].down = down;
                }
                InputEvent::MousePos { x, y } => {
                    self.mouse_pos = Vec2::new(x, y);
                    if is_pos_valid(self.mouse_pos) {
                        self.last_valid_mouse_pos = self.mouse_pos;
                    }
                }
                InputEvent::MouseButton { button, down } => {
                    self.mouse_down[button.index()] = down;
                }
                InputEvent::MouseWheel {
                    horizontal,
                    vertical,
                } => {
                    self.pending_wheel += vertical;
                    self.pending_wheel_horizontal += horizontal;
                }
                InputEvent::Text { character } => {
                    let mut units = [0u16; 2];
                    self.text_queue
                        .extend_from_slice(character.encode_utf16(&mut units));
                }
            }
        }
        self.wheel = self.pending_wheel;
        self.wheel_horizontal = self.pending_wheel_horizontal;

        // key durations follow the drained state
        for key in self.keys.iter_mut() {
            key.down_duration_prev = key.down_duration;
            key.down_duration = if key.down {
                if key.down_duration < 0.0 {
                    0.0
                } else {
                    key.down_duration + dt
                }
            } else {
                -1.0
            };
        }

        // 4. advance click state
        for index in 0..MouseButton::COUNT {
            let state = &mut self.buttons[index];
            state.down = self.mouse_down[index];
            state.released = !state.down && state.down_duration >= 0.0;
            state.down_duration_prev = state.down_duration;
            state.down_duration = if state.down {
                if state.down_duration < 0.0 {
                    0.0
                } else {
                    state.down_duration + dt
                }
            } else {
                -1.0
            };
            state.clicked = state.down && state.down_duration_prev < 0.0;
            state.double_clicked = false;

            if state.clicked {
                let displacement = if is_pos_valid(self.mouse_pos) {
                    self.mouse_pos - state.clicked_pos
                } else {
                    Vec2::ZERO
                };
                let within_time =
                    self.time - state.clicked_time < self.config.mouse_double_click_time as f64;
                let within_dist = displacement.length_squared()
                    <= self.config.mouse_double_click_max_dist
                        * self.config.mouse_double_click_max_dist;

                if within_time && within_dist {
                    state.clicked_count += 1;
                } else {
                    state.clicked_count = 1;
                }
                state.double_clicked = state.clicked_count == 2;
                state.clicked_time = self.time;
                state.clicked_pos = self.mouse_pos;
                state.drag_max_dist_sqr = 0.0;
            }

            // 5. drag tracking
            if state.down && is_pos_valid(self.mouse_pos) {
                let travelled = (self.mouse_pos - state.clicked_pos).length_squared();
                if travelled > state.drag_max_dist_sqr {
                    state.drag_max_dist_sqr = travelled;
                }
            }
        }

        if is_pos_valid(self.mouse_pos) && is_pos_valid(self.mouse_pos_prev) {
            self.mouse_delta = self.mouse_pos - self.mouse_pos_prev;
        } else {
            self.mouse_delta = Vec2::ZERO;
        }
        self.mouse_pos_prev = self.mouse_pos;

        // 6. commit the cursor chosen during the previous frame
        self.cursor_changed = self.next_cursor != self.current_cursor;
        self.current_cursor = self.next_cursor;
    }

    // ------------------------------------------------------------------
    // event feeders (platform backends)
    // ------------------------------------------------------------------

    /// Cloneable sender for platform backends.
    pub fn event_sender(&self) -> Sender<InputEvent> {
        self.sender.clone()
    }

    pub fn add_key_event(&self, key: KeyCode, down: bool) {
        let _ = self.sender.send(InputEvent::Key { key, down });
    }

    pub fn add_mouse_pos_event(&self, x: f32, y: f32) {
        let _ = self.sender.send(InputEvent::MousePos { x, y });
    }

    pub fn add_mouse_button_event(&self, button: MouseButton, down: bool) {
        let _ = self.sender.send(InputEvent::MouseButton { button, down });
    }

    pub fn add_mouse_wheel_event(&self, horizontal: f32, vertical: f32) {
        let _ = self.sender.send(InputEvent::MouseWheel {
            horizontal,
            vertical,
        });
    }

    /// Queues each scalar value of a UTF-8 string as a text event; the
    /// std decoder handles surrogate-pair emission at drain time.
    pub fn add_text_events_utf8(&self, text: &str) {
        for character in text.chars() {
            let _ = self.sender.send(InputEvent::Text { character });
        }
    }

    pub fn add_text_event(&self, character: char) {
        let _ = self.sender.send(InputEvent::Text { character });
    }

    // ------------------------------------------------------------------
    // keyboard queries
    // ------------------------------------------------------------------

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.key_down(key)
    }

    /// True the frame a key goes down; with `repeat`, also on repeat
    /// pulses governed by the configured delay and rate.
    pub fn is_key_pressed(&self, key: KeyCode, repeat: bool) -> bool {
        let data = &self.keys[key.index()];
        if !data.down {
            return false;
        }
        if data.down_duration == 0.0 {
            return true;
        }
        repeat
            && self.get_key_pressed_amount(
                key,
                self.config.key_repeat_delay,
                self.config.key_repeat_rate,
            ) > 0
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        let data = &self.keys[key.index()];
        !data.down && data.down_duration_prev >= 0.0
    }

    /// Number of repeat pulses that fired this frame for an arbitrary
    /// delay/rate pair.
    pub fn get_key_pressed_amount(&self, key: KeyCode, delay: f32, rate: f32) -> i32 {
        let data = &self.keys[key.index()];
        if !data.down {
            return 0;
        }
        typematic_amount(data.down_duration_prev, data.down_duration, delay, rate)
    }

    pub fn key_mods(&self) -> KeyMods {
        self.key_mods
    }

    /// Pending UTF-16 text input, surrogate pairs already split.
    pub fn input_characters(&self) -> &[u16] {
        &self.text_queue
    }

    pub fn clear_input_characters(&mut self) {
        self.text_queue.clear();
    }

    // ------------------------------------------------------------------
    // mouse queries
    // ------------------------------------------------------------------

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].down
    }

    pub fn is_mouse_clicked(&self, button: MouseButton, repeat: bool) -> bool {
        let state = &self.buttons[button.index()];
        if state.clicked {
            return true;
        }
        repeat
            && state.down
            && typematic_amount(
                state.down_duration_prev,
                state.down_duration,
                self.config.key_repeat_delay,
                self.config.key_repeat_rate,
            ) > 0
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].released
    }

    pub fn is_mouse_double_clicked(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].double_clicked
    }

    /// A negative `threshold` selects the configured drag threshold.
    pub fn is_mouse_dragging(&self, button: MouseButton, threshold: f32) -> bool {
        let state = &self.buttons[button.index()];
        if !state.down {
            return false;
        }
        let threshold = if threshold < 0.0 {
            self.config.mouse_drag_threshold
        } else {
            threshold
        };
        state.drag_max_dist_sqr > threshold * threshold
    }

    pub fn is_mouse_hovering_rect(&self, min: Vec2, max: Vec2) -> bool {
        let pos = self.mouse_pos;
        is_pos_valid(pos) && pos.x >= min.x && pos.y >= min.y && pos.x < max.x && pos.y < max.y
    }

    /// Current position minus click position, zero until `threshold` is
    /// passed.
    pub fn get_mouse_drag_delta(&self, button: MouseButton, threshold: f32) -> Vec2 {
        let state = &self.buttons[button.index()];
        let threshold = if threshold < 0.0 {
            self.config.mouse_drag_threshold
        } else {
            threshold
        };
        if state.down
            && is_pos_valid(self.mouse_pos)
            && state.drag_max_dist_sqr > threshold * threshold
        {
            self.mouse_pos - state.clicked_pos
        } else {
            Vec2::ZERO
        }
    }

    pub fn reset_mouse_drag_delta(&mut self, button: MouseButton) {
        let pos = self.mouse_pos;
        let state = &mut self.buttons[button.index()];
        state.clicked_pos = pos;
        state.drag_max_dist_sqr = 0.0;
    }

    pub fn get_mouse_pos(&self) -> Vec2 {
        self.mouse_pos
    }

    /// Last position that was inside the viewport, for backends that
    /// report an out-of-window sentinel.
    pub fn last_valid_mouse_pos(&self) -> Vec2 {
        self.last_valid_mouse_pos
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_mouse_pos_valid(&self, pos: Vec2) -> bool {
        is_pos_valid(pos)
    }

    pub fn get_mouse_wheel(&self) -> f32 {
        self.wheel
    }

    pub fn get_mouse_wheel_horizontal(&self) -> f32 {
        self.wheel_horizontal
    }

    /// Requests a cursor; committed at the next `new_frame`.
    pub fn set_mouse_cursor(&mut self, cursor: MouseCursor) {
        self.next_cursor = cursor;
    }

    pub fn current_cursor(&self) -> MouseCursor {
        self.current_cursor
    }

    pub fn cursor_changed(&self) -> bool {
        self.cursor_changed
    }

    // ------------------------------------------------------------------
    // frame output
    // ------------------------------------------------------------------

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Rolling average frame rate over the last 120 frames.
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        if size != self.viewport_size {
            self.viewport_size = size;
            self.viewport_resized = true;
        }
    }

    pub fn viewport_resized(&self) -> bool {
        self.viewport_resized
    }

    pub fn framebuffer_scale(&self) -> Vec2 {
        self.framebuffer_scale
    }

    fn key_down(&self, key: KeyCode) -> bool {
        self.keys[key.index()].down
    }
}

fn is_pos_valid(pos: Vec2) -> bool {
    pos.x != -f32::MAX && pos.y != -f32::MAX && pos.x.is_finite() && pos.y.is_finite()
}

/// Repeat pulses between two consecutive down durations for a delay/rate
/// pair. The first frame of a press counts as one pulse.
fn typematic_amount(t_prev: f32, t_now: f32, delay: f32, rate: f32) -> i32 {
    if t_now == 0.0 {
        return 1;
    }
    if t_prev >= t_now {
        return 0;
    }
    if rate <= 0.0 {
        return i32::from(t_prev < delay && t_now >= delay);
    }
    let count_prev = if t_prev < delay {
        -1
    } else {
        ((t_prev - delay) / rate) as i32
    };
    let count_now = if t_now < delay {
        -1
    } else {
        ((t_now - delay) / rate) as i32
    };
    count_now - count_prev
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io() -> Io {
        Io::new(IoConfig::default())
    }

    #[test]
    fn test_key_pressed_once_per_press() {
        let mut io = io();

        io.add_key_event(KeyCode::Space, true);
        io.step(1.0 / 60.0);
        assert!(io.is_key_down(KeyCode::Space));
        assert!(io.is_key_pressed(KeyCode::Space, false));

        io.step(1.0 / 60.0);
        assert!(io.is_key_down(KeyCode::Space));
        assert!(!io.is_key_pressed(KeyCode::Space, false));

        io.add_key_event(KeyCode::Space, false);
        io.step(1.0 / 60.0);
        assert!(io.is_key_released(KeyCode::Space));
        assert!(!io.is_key_pressed(KeyCode::Space, false));
    }

    #[test]
    fn test_key_repeat_fires_after_delay() {
        let mut io = io();
        io.add_key_event(KeyCode::A, true);
        io.step(0.01);
        assert!(io.is_key_pressed(KeyCode::A, true));

        // inside the repeat delay: no pulse
        io.step(0.1);
        assert!(!io.is_key_pressed(KeyCode::A, true));

        // jump past the delay: pulses start
        io.step(0.3);
        assert!(io.is_key_pressed(KeyCode::A, true));
    }

    #[test]
    fn test_key_pressed_amount_counts_pulses() {
        let mut io = io();
        io.add_key_event(KeyCode::A, true);
        io.step(0.01);
        assert_eq!(io.get_key_pressed_amount(KeyCode::A, 0.1, 0.05), 1);

        io.step(0.1); // duration 0.01 -> 0.11: crosses delay 0.1
        assert_eq!(io.get_key_pressed_amount(KeyCode::A, 0.1, 0.05), 1);

        io.step(0.1); // duration 0.11 -> 0.21: pulses at 0.15, 0.20
        assert_eq!(io.get_key_pressed_amount(KeyCode::A, 0.1, 0.05), 2);
    }

    #[test]
    fn test_double_click_within_time_and_distance() {
        let mut io = io();
        io.add_mouse_pos_event(100.0, 100.0);
        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        assert!(io.is_mouse_clicked(MouseButton::Left, false));
        assert!(!io.is_mouse_double_clicked(MouseButton::Left));

        io.add_mouse_button_event(MouseButton::Left, false);
        io.step(0.05);

        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        assert!(io.is_mouse_double_clicked(MouseButton::Left));
    }

    #[test]
    fn test_double_click_rejected_when_slow() {
        let mut io = io();
        io.add_mouse_pos_event(100.0, 100.0);
        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        io.add_mouse_button_event(MouseButton::Left, false);
        io.step(0.4);

        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        assert!(!io.is_mouse_double_clicked(MouseButton::Left));
    }

    #[test]
    fn test_double_click_rejected_when_displaced() {
        let mut io = io();
        io.add_mouse_pos_event(100.0, 100.0);
        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        io.add_mouse_button_event(MouseButton::Left, false);
        io.step(0.05);

        io.add_mouse_pos_event(140.0, 100.0);
        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.05);
        assert!(!io.is_mouse_double_clicked(MouseButton::Left));
    }

    #[test]
    fn test_drag_threshold_and_delta() {
        let mut io = io();
        io.add_mouse_pos_event(10.0, 10.0);
        io.add_mouse_button_event(MouseButton::Left, true);
        io.step(0.016);
        assert!(!io.is_mouse_dragging(MouseButton::Left, -1.0));
        assert_eq!(io.get_mouse_drag_delta(MouseButton::Left, -1.0), Vec2::ZERO);

        io.add_mouse_pos_event(30.0, 10.0);
        io.step(0.016);
        assert!(io.is_mouse_dragging(MouseButton::Left, -1.0));
        assert_eq!(
            io.get_mouse_drag_delta(MouseButton::Left, -1.0),
            Vec2::new(20.0, 0.0)
        );

        io.reset_mouse_drag_delta(MouseButton::Left);
        assert_eq!(io.get_mouse_drag_delta(MouseButton::Left, -1.0), Vec2::ZERO);
    }

    #[test]
    fn test_hovering_rect() {
        let mut io = io();
        io.add_mouse_pos_event(50.0, 50.0);
        io.step(0.016);
        assert!(io.is_mouse_hovering_rect(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0)));
        assert!(!io.is_mouse_hovering_rect(Vec2::new(60.0, 0.0), Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_wheel_accumulates_within_frame_only() {
        let mut io = io();
        io.add_mouse_wheel_event(0.0, 1.0);
        io.add_mouse_wheel_event(0.5, 2.0);
        io.step(0.016);
        assert_eq!(io.get_mouse_wheel(), 3.0);
        assert_eq!(io.get_mouse_wheel_horizontal(), 0.5);

        io.step(0.016);
        assert_eq!(io.get_mouse_wheel(), 0.0);
    }

    #[test]
    fn test_text_queue_emits_utf16_with_surrogates() {
        let mut io = io();
        io.add_text_events_utf8("a😀");
        io.step(0.016);
        let units = io.input_characters();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], 'a' as u16);
        assert!(matches!(units[1], 0xD800..=0xDBFF));
        assert!(matches!(units[2], 0xDC00..=0xDFFF));

        io.clear_input_characters();
        assert!(io.input_characters().is_empty());
    }

    #[test]
    fn test_modifier_chord() {
        let mut io = io();
        io.add_key_event(KeyCode::LeftCtrl, true);
        io.add_key_event(KeyCode::LeftShift, true);
        io.step(0.016);
        // chord reflects state present before this frame's drain
        io.step(0.016);
        assert!(io.key_mods().contains(KeyMods::CTRL | KeyMods::SHIFT));
    }

    #[test]
    fn test_frame_rate_rolling_average() {
        let mut io = io();
        for _ in 0..240 {
            io.step(0.01);
        }
        assert!((io.frame_rate() - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_cursor_commits_next_frame() {
        let mut io = io();
        io.step(0.016);
        io.set_mouse_cursor(MouseCursor::Hand);
        assert_eq!(io.current_cursor(), MouseCursor::Arrow);

        io.step(0.016);
        assert!(io.cursor_changed());
        assert_eq!(io.current_cursor(), MouseCursor::Hand);

        io.step(0.016);
        assert!(!io.cursor_changed());
    }

    #[test]
    fn test_events_apply_fifo() {
        let mut io = io();
        io.add_key_event(KeyCode::Enter, true);
        io.add_key_event(KeyCode::Enter, false);
        io.step(0.016);
        assert!(!io.is_key_down(KeyCode::Enter));
    }

    #[test]
    fn test_running_flag() {
        let mut io = io();
        assert!(io.is_running());
        io.set_running(false);
        assert!(!io.is_running());
    }
}
