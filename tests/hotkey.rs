use traffic_light::hotkey::{parse_hotkey, Hotkey, Modifier, ModifierState, VirtualKey};
use traffic_light::keyboard_hook::KeyEvent;

struct Held(&'static [VirtualKey]);

impl ModifierState for Held {
    fn is_down(&self, key: VirtualKey) -> bool {
        self.0.contains(&key)
    }
}

fn down(key: VirtualKey) -> KeyEvent {
    KeyEvent {
        vk_code: key.0 as u32,
        ..Default::default()
    }
}

#[test]
fn parse_simple_f_key() {
    let hk = parse_hotkey("F2").expect("should parse F2");
    assert_eq!(hk.key, VirtualKey(0x71));
    assert!(!hk.ctrl && !hk.shift && !hk.alt && !hk.win);
}

#[test]
fn parse_combo_hotkey() {
    let hk = parse_hotkey("Ctrl+Shift+Space").expect("should parse combination");
    assert_eq!(hk, Hotkey::default());
}

#[test]
fn parse_is_case_and_space_insensitive() {
    let hk = parse_hotkey(" ctrl + alt + q ").expect("should parse");
    assert_eq!(hk.key, VirtualKey(b'Q' as u16));
    assert!(hk.ctrl && hk.alt && !hk.shift);
}

#[test]
fn parse_invalid_hotkey() {
    assert!(parse_hotkey("Ctrl+Foo").is_none());
    assert!(parse_hotkey("Ctrl+Shift").is_none());
    assert!(parse_hotkey("A+B").is_none());
    assert!(parse_hotkey("F25").is_none());
    assert!(parse_hotkey("").is_none());
}

#[test]
fn display_round_trips_through_parser() {
    for text in ["Ctrl+Shift+Space", "Alt+F9", "Win+7", "Shift+PageDown"] {
        let hk = parse_hotkey(text).expect("parse");
        assert_eq!(hk.to_string(), text);
        assert_eq!(parse_hotkey(&hk.to_string()), Some(hk));
    }
}

#[test]
fn either_side_satisfies_a_modifier() {
    let hk = Hotkey::default();
    let sides = [
        &[VirtualKey::LCONTROL, VirtualKey::LSHIFT][..],
        &[VirtualKey::LCONTROL, VirtualKey::RSHIFT][..],
        &[VirtualKey::RCONTROL, VirtualKey::LSHIFT][..],
        &[VirtualKey::RCONTROL, VirtualKey::RSHIFT][..],
    ];
    for held in sides {
        assert!(hk.matches(&down(VirtualKey::SPACE), &Held(held)), "{held:?}");
    }
}

#[test]
fn missing_modifier_or_wrong_key_does_not_match() {
    let hk = Hotkey::default();
    let ctrl_only = Held(&[VirtualKey::LCONTROL]);
    let shift_only = Held(&[VirtualKey::RSHIFT]);
    let both = Held(&[VirtualKey::LCONTROL, VirtualKey::LSHIFT]);

    assert!(!hk.matches(&down(VirtualKey::SPACE), &ctrl_only));
    assert!(!hk.matches(&down(VirtualKey::SPACE), &shift_only));
    assert!(!hk.matches(&down(VirtualKey::RETURN), &both));
}

#[test]
fn unrequested_modifiers_are_ignored() {
    let hk = Hotkey::default();
    let held = Held(&[VirtualKey::LCONTROL, VirtualKey::LSHIFT, VirtualKey::LWIN]);
    assert!(hk.matches(&down(VirtualKey::SPACE), &held));
}

#[test]
fn is_held_checks_both_sides() {
    let held = Held(&[VirtualKey::RMENU]);
    assert!(held.is_held(Modifier::Alt));
    assert!(!held.is_held(Modifier::Ctrl));
}
