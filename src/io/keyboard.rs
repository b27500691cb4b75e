//! Key identifiers and per-key state.

/// A named key. Discriminants are dense so the IO frame can index its
/// per-key state table directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum KeyCode {
    Tab = 0,
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    PageUp,
    PageDown,
    Home,
    End,
    Insert,
    Delete,
    Backspace,
    Space,
    Enter,
    Escape,
    LeftCtrl,
    LeftShift,
    LeftAlt,
    LeftSuper,
    RightCtrl,
    RightShift,
    RightAlt,
    RightSuper,
    Menu,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Apostrophe,
    Comma,
    Minus,
    Period,
    Slash,
    Semicolon,
    Equal,
    LeftBracket,
    Backslash,
    RightBracket,
    GraveAccent,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    KeypadDecimal,
    KeypadDivide,
    KeypadMultiply,
    KeypadSubtract,
    KeypadAdd,
    KeypadEnter,
    KeypadEqual,
}

impl KeyCode {
    pub const COUNT: usize = KeyCode::KeypadEqual as usize + 1;

    pub fn index(self) -> usize {
        self as usize
    }
}

static_assertions::const_assert!(KeyCode::COUNT < 256);

/// Modifier chord, one bit per modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMods(u32);

impl KeyMods {
    pub const NONE: KeyMods = KeyMods(0);
    pub const CTRL: KeyMods = KeyMods(1 << 0);
    pub const SHIFT: KeyMods = KeyMods(1 << 1);
    pub const ALT: KeyMods = KeyMods(1 << 2);
    pub const SUPER: KeyMods = KeyMods(1 << 3);

    pub fn contains(self, other: KeyMods) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: KeyMods) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for KeyMods {
    type Output = KeyMods;

    fn bitor(self, rhs: KeyMods) -> KeyMods {
        KeyMods(self.0 | rhs.0)
    }
}

/// Per-key status tracked across frames. A negative duration means the
/// key is up.
#[derive(Debug, Clone, Copy)]
pub struct KeyData {
    pub down: bool,
    pub down_duration: f32,
    pub down_duration_prev: f32,
}

impl Default for KeyData {
    fn default() -> Self {
        Self {
            down: false,
            down_duration: -1.0,
            down_duration_prev: -1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense() {
        assert_eq!(KeyCode::Tab.index(), 0);
        assert_eq!(KeyCode::KeypadEqual.index(), KeyCode::COUNT - 1);
    }

    #[test]
    fn test_mods_combine() {
        let chord = KeyMods::CTRL | KeyMods::SHIFT;
        assert!(chord.contains(KeyMods::CTRL));
        assert!(chord.contains(KeyMods::SHIFT));
        assert!(!chord.contains(KeyMods::ALT));
    }
}
