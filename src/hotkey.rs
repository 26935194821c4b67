use crate::keyboard_hook::KeyEvent;
use std::fmt;

/// Win32 virtual-key code. The values are fixed by the OS, so the type is
/// usable (and testable) on every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const TAB: Self = Self(0x09);
    pub const RETURN: Self = Self(0x0D);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const PAGE_UP: Self = Self(0x21);
    pub const PAGE_DOWN: Self = Self(0x22);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const INSERT: Self = Self(0x2D);
    pub const DELETE: Self = Self(0x2E);
    pub const F1: Self = Self(0x70);
    pub const LWIN: Self = Self(0x5B);
    pub const RWIN: Self = Self(0x5C);
    pub const LSHIFT: Self = Self(0xA0);
    pub const RSHIFT: Self = Self(0xA1);
    pub const LCONTROL: Self = Self(0xA2);
    pub const RCONTROL: Self = Self(0xA3);
    pub const LMENU: Self = Self(0xA4);
    pub const RMENU: Self = Self(0xA5);

    pub fn from_code(code: u32) -> Self {
        Self(code as u16)
    }
}

/// Modifier families. Each one is satisfied by either its left or right key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Win,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Modifier::Ctrl, Modifier::Shift, Modifier::Alt, Modifier::Win];

    pub fn sides(self) -> [VirtualKey; 2] {
        match self {
            Modifier::Ctrl => [VirtualKey::LCONTROL, VirtualKey::RCONTROL],
            Modifier::Shift => [VirtualKey::LSHIFT, VirtualKey::RSHIFT],
            Modifier::Alt => [VirtualKey::LMENU, VirtualKey::RMENU],
            Modifier::Win => [VirtualKey::LWIN, VirtualKey::RWIN],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Win => "Win",
        }
    }
}

/// Live, non-blocking view of which keys are physically held right now.
///
/// Low-level hooks report one transition at a time, so chord detection asks
/// this at the instant of the trigger key instead of trusting event order.
pub trait ModifierState {
    fn is_down(&self, key: VirtualKey) -> bool;

    fn is_held(&self, modifier: Modifier) -> bool {
        modifier.sides().iter().any(|key| self.is_down(*key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub key: VirtualKey,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            key: VirtualKey::SPACE,
            ctrl: true,
            shift: true,
            alt: false,
            win: false,
        }
    }
}

impl Hotkey {
    pub fn requires(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
            Modifier::Alt => self.alt,
            Modifier::Win => self.win,
        }
    }

    pub fn modifier_count(&self) -> usize {
        Modifier::ALL
            .into_iter()
            .filter(|modifier| self.requires(*modifier))
            .count()
    }

    /// A trigger key plus at least two modifiers. Anything less would fire on
    /// ordinary typing anywhere on the system.
    pub fn is_chord(&self) -> bool {
        self.modifier_count() >= 2
    }

    /// True when `event` is the trigger key and every required modifier has
    /// at least one side held according to `modifiers`. Modifiers that are
    /// not part of the chord are ignored.
    pub fn matches(&self, event: &KeyEvent, modifiers: &dyn ModifierState) -> bool {
        if VirtualKey::from_code(event.vk_code) != self.key {
            return false;
        }
        Modifier::ALL
            .into_iter()
            .filter(|modifier| self.requires(*modifier))
            .all(|modifier| modifiers.is_held(modifier))
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in Modifier::ALL {
            if self.requires(modifier) {
                write!(f, "{}+", modifier.label())?;
            }
        }
        write!(f, "{}", key_name(self.key))
    }
}

/// Parse a hotkey string like "Ctrl+Shift+Space" into a [`Hotkey`].
pub fn parse_hotkey(s: &str) -> Option<Hotkey> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut win = false;
    let mut key: Option<VirtualKey> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => ctrl = true,
            "SHIFT" => shift = true,
            "ALT" => alt = true,
            "WIN" | "SUPER" => win = true,
            "" => {}
            _ => {
                // A second trigger key is ambiguous.
                if key.is_some() {
                    return None;
                }
                key = Some(parse_key(&upper)?);
            }
        }
    }

    key.map(|key| Hotkey {
        key,
        ctrl,
        shift,
        alt,
        win,
    })
}

fn parse_key(upper: &str) -> Option<VirtualKey> {
    match upper {
        "SPACE" => Some(VirtualKey::SPACE),
        "TAB" => Some(VirtualKey::TAB),
        "ENTER" | "RETURN" => Some(VirtualKey::RETURN),
        "ESC" | "ESCAPE" => Some(VirtualKey::ESCAPE),
        "INSERT" => Some(VirtualKey::INSERT),
        "DELETE" => Some(VirtualKey::DELETE),
        "HOME" => Some(VirtualKey::HOME),
        "END" => Some(VirtualKey::END),
        "PAGEUP" => Some(VirtualKey::PAGE_UP),
        "PAGEDOWN" => Some(VirtualKey::PAGE_DOWN),
        "LEFT" | "LEFTARROW" => Some(VirtualKey::LEFT),
        "RIGHT" | "RIGHTARROW" => Some(VirtualKey::RIGHT),
        "UP" | "UPARROW" => Some(VirtualKey::UP),
        "DOWN" | "DOWNARROW" => Some(VirtualKey::DOWN),
        _ if upper.len() > 1 && upper.starts_with('F') => match upper[1..].parse::<u16>().ok()? {
            n @ 1..=24 => Some(VirtualKey(VirtualKey::F1.0 + n - 1)),
            _ => None,
        },
        _ => {
            let mut chars = upper.chars();
            match (chars.next(), chars.next()) {
                // Letters and digits share their ASCII code with the VK code.
                (Some(c), None) if c.is_ascii_uppercase() || c.is_ascii_digit() => {
                    Some(VirtualKey(c as u16))
                }
                _ => None,
            }
        }
    }
}

fn key_name(key: VirtualKey) -> String {
    match key {
        VirtualKey::SPACE => "Space".into(),
        VirtualKey::TAB => "Tab".into(),
        VirtualKey::RETURN => "Enter".into(),
        VirtualKey::ESCAPE => "Esc".into(),
        VirtualKey::INSERT => "Insert".into(),
        VirtualKey::DELETE => "Delete".into(),
        VirtualKey::HOME => "Home".into(),
        VirtualKey::END => "End".into(),
        VirtualKey::PAGE_UP => "PageUp".into(),
        VirtualKey::PAGE_DOWN => "PageDown".into(),
        VirtualKey::LEFT => "Left".into(),
        VirtualKey::RIGHT => "Right".into(),
        VirtualKey::UP => "Up".into(),
        VirtualKey::DOWN => "Down".into(),
        VirtualKey(code) if (VirtualKey::F1.0..VirtualKey::F1.0 + 24).contains(&code) => {
            format!("F{}", code - VirtualKey::F1.0 + 1)
        }
        VirtualKey(code)
            if code < 0x80 && ((code as u8).is_ascii_uppercase() || (code as u8).is_ascii_digit()) =>
        {
            (code as u8 as char).to_string()
        }
        VirtualKey(code) => format!("0x{code:02X}"),
    }
}

#[cfg(windows)]
pub use platform::AsyncKeyState;

#[cfg(windows)]
mod platform {
    use super::{ModifierState, VirtualKey};
    use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

    /// Reads the physical key state through `GetAsyncKeyState`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct AsyncKeyState;

    impl ModifierState for AsyncKeyState {
        fn is_down(&self, key: VirtualKey) -> bool {
            let state = unsafe { GetAsyncKeyState(key.0 as i32) };
            state < 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Held(HashSet<VirtualKey>);

    impl Held {
        fn of(keys: &[VirtualKey]) -> Self {
            Self(keys.iter().copied().collect())
        }
    }

    impl ModifierState for Held {
        fn is_down(&self, key: VirtualKey) -> bool {
            self.0.contains(&key)
        }
    }

    fn key_down(key: VirtualKey) -> KeyEvent {
        KeyEvent {
            vk_code: key.0 as u32,
            scan_code: 0,
            flags: 0,
            time: 0,
        }
    }

    #[test]
    fn default_chord_is_ctrl_shift_space() {
        assert_eq!(Hotkey::default(), parse_hotkey("Ctrl+Shift+Space").unwrap());
        assert_eq!(Hotkey::default().to_string(), "Ctrl+Shift+Space");
    }

    #[test]
    fn parses_function_keys_letters_and_digits() {
        assert_eq!(parse_hotkey("F1").unwrap().key, VirtualKey::F1);
        assert_eq!(parse_hotkey("f24").unwrap().key, VirtualKey(0x87));
        assert_eq!(parse_hotkey("alt+q").unwrap().key, VirtualKey(b'Q' as u16));
        assert_eq!(parse_hotkey("Win+7").unwrap().key, VirtualKey(b'7' as u16));
        assert!(parse_hotkey("F25").is_none());
        assert!(parse_hotkey("F").is_some_and(|hk| hk.key == VirtualKey(b'F' as u16)));
    }

    #[test]
    fn chord_needs_two_modifiers() {
        assert!(Hotkey::default().is_chord());
        assert!(parse_hotkey("Ctrl+Alt+F9").unwrap().is_chord());
        assert!(!parse_hotkey("Alt+F9").unwrap().is_chord());
        assert_eq!(parse_hotkey("Space").unwrap().modifier_count(), 0);
    }

    #[test]
    fn rejects_missing_unknown_or_duplicate_keys() {
        assert!(parse_hotkey("Ctrl+Shift").is_none());
        assert!(parse_hotkey("Ctrl+Foo").is_none());
        assert!(parse_hotkey("A+B").is_none());
        assert!(parse_hotkey("").is_none());
    }

    #[test]
    fn display_round_trips_through_parser() {
        for text in ["Ctrl+Alt+Delete", "Shift+F12", "Win+Z", "Ctrl+PageDown"] {
            let hotkey = parse_hotkey(text).unwrap();
            assert_eq!(parse_hotkey(&hotkey.to_string()), Some(hotkey));
        }
    }

    #[test]
    fn either_side_of_each_modifier_satisfies_the_chord() {
        let hotkey = Hotkey::default();
        let event = key_down(VirtualKey::SPACE);
        for ctrl in [VirtualKey::LCONTROL, VirtualKey::RCONTROL] {
            for shift in [VirtualKey::LSHIFT, VirtualKey::RSHIFT] {
                assert!(hotkey.matches(&event, &Held::of(&[ctrl, shift])));
            }
        }
    }

    #[test]
    fn missing_modifier_or_wrong_key_does_not_match() {
        let hotkey = Hotkey::default();
        let both = Held::of(&[VirtualKey::LCONTROL, VirtualKey::RSHIFT]);
        assert!(!hotkey.matches(&key_down(VirtualKey::RETURN), &both));
        assert!(!hotkey.matches(
            &key_down(VirtualKey::SPACE),
            &Held::of(&[VirtualKey::LCONTROL])
        ));
        assert!(!hotkey.matches(
            &key_down(VirtualKey::SPACE),
            &Held::of(&[VirtualKey::RSHIFT])
        ));
        assert!(!hotkey.matches(&key_down(VirtualKey::SPACE), &Held::of(&[])));
    }

    #[test]
    fn extra_modifiers_do_not_block_the_chord() {
        let held = Held::of(&[VirtualKey::LCONTROL, VirtualKey::LSHIFT, VirtualKey::LMENU]);
        assert!(Hotkey::default().matches(&key_down(VirtualKey::SPACE), &held));
    }
}
