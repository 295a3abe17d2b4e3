// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyboard normalization: `key`, `charCode`, and legacy key-code translation.

use ripple_dom::NativeEvent;

/// Legacy `key` values mapped to their standard names.
fn normalize_key(key: &str) -> &str {
    match key {
        "Esc" => "Escape",
        "Spacebar" => " ",
        "Left" => "ArrowLeft",
        "Up" => "ArrowUp",
        "Right" => "ArrowRight",
        "Down" => "ArrowDown",
        "Del" => "Delete",
        "Win" => "OS",
        "Menu" | "Apps" => "ContextMenu",
        "Scroll" => "ScrollLock",
        "MozPrintableKey" => "Unidentified",
        other => other,
    }
}

/// `keyCode` of `keydown`/`keyup` mapped to a `key` value.
fn translate_to_key(key_code: u32) -> Option<&'static str> {
    Some(match key_code {
        8 => "Backspace",
        9 => "Tab",
        12 => "Clear",
        13 => "Enter",
        16 => "Shift",
        17 => "Control",
        18 => "Alt",
        19 => "Pause",
        20 => "CapsLock",
        27 => "Escape",
        32 => " ",
        33 => "PageUp",
        34 => "PageDown",
        35 => "End",
        36 => "Home",
        37 => "ArrowLeft",
        38 => "ArrowUp",
        39 => "ArrowRight",
        40 => "ArrowDown",
        45 => "Insert",
        46 => "Delete",
        112 => "F1",
        113 => "F2",
        114 => "F3",
        115 => "F4",
        116 => "F5",
        117 => "F6",
        118 => "F7",
        119 => "F8",
        120 => "F9",
        121 => "F10",
        122 => "F11",
        123 => "F12",
        144 => "NumLock",
        145 => "ScrollLock",
        224 => "Meta",
        _ => return None,
    })
}

/// Printable character code of a keypress, or `0` when it is not printable.
///
/// Platforms disagree about where the code lives: some only fill `keyCode`, some
/// report Enter as `13` in `keyCode` with a zero `charCode`, and some report
/// Ctrl+Enter as `10`.
pub fn event_char_code(native: &NativeEvent) -> u32 {
    let key_code = native.key_code;
    let mut char_code = match native.char_code {
        Some(code) => {
            if code == 0 && key_code == 13 {
                13
            } else {
                code
            }
        }
        None => key_code,
    };
    if char_code == 10 {
        char_code = 13;
    }
    if char_code >= 32 || char_code == 13 {
        char_code
    } else {
        0
    }
}

/// Character for a char code, as `String.fromCharCode` would produce for the BMP.
pub(crate) fn from_char_code(code: u32) -> String {
    char::from_u32(code).map(String::from).unwrap_or_default()
}

/// Normalized `key` of a keyboard event.
pub fn event_key(native: &NativeEvent) -> String {
    if let Some(key) = native.key.as_deref() {
        let key = normalize_key(key);
        if key != "Unidentified" {
            return key.to_owned();
        }
    }
    match native.event_type.as_str() {
        "keypress" => {
            let code = event_char_code(native);
            if code == 13 {
                "Enter".to_owned()
            } else {
                from_char_code(code)
            }
        }
        "keydown" | "keyup" => translate_to_key(native.key_code)
            .unwrap_or("Unidentified")
            .to_owned(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_key_names_are_normalized() {
        let ev = NativeEvent::new("keydown", None).with_key(Some("Esc"), 27);
        assert_eq!(event_key(&ev), "Escape");
        let ev = NativeEvent::new("keydown", None).with_key(Some("Spacebar"), 32);
        assert_eq!(event_key(&ev), " ");
    }

    #[test]
    fn unidentified_falls_back_to_key_code() {
        let ev = NativeEvent::new("keydown", None).with_key(Some("MozPrintableKey"), 37);
        assert_eq!(event_key(&ev), "ArrowLeft");
        let ev = NativeEvent::new("keyup", None).with_key(None, 250);
        assert_eq!(event_key(&ev), "Unidentified");
        let ev = NativeEvent::new("input", None);
        assert_eq!(event_key(&ev), "");
    }

    #[test]
    fn keypress_uses_char_code() {
        let ev = NativeEvent::new("keypress", None).with_char_code(97);
        assert_eq!(event_key(&ev), "a");
        let mut enter = NativeEvent::new("keypress", None).with_char_code(0);
        enter.key_code = 13;
        assert_eq!(event_char_code(&enter), 13);
        assert_eq!(event_key(&enter), "Enter");
    }

    #[test]
    fn char_code_rules() {
        let mut ev = NativeEvent::new("keypress", None);
        ev.key_code = 65;
        assert_eq!(event_char_code(&ev), 65, "falls back to keyCode without charCode");
        let ctrl_enter = NativeEvent::new("keypress", None).with_char_code(10);
        assert_eq!(event_char_code(&ctrl_enter), 13);
        let control = NativeEvent::new("keypress", None).with_char_code(8);
        assert_eq!(event_char_code(&control), 0);
    }
}
