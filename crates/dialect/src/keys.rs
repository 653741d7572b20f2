//! Canonical key and button tables
//!
//! The host block exposes raw key state as `keys[194]`, one slot per winit
//! `KeyCode` variant in enum order (which matches the web `e.code` strings).
//! The emitted `KEY_*` shader constants, the scanner, and the host's
//! key-event mapping all index through this one table, so the shader and
//! the host can never disagree about which slot a key lives in.

/// Number of named OSC float slots accessible via `@osc("name")` or `@engine.osc[N]`
pub const OSC_SLOT_COUNT: usize = 64;

/// Size of the raw key state array
pub const KEY_COUNT: usize = 194;

/// Number of virtual gamepad buttons
pub const BUTTON_COUNT: usize = 12;

pub const BTN_UP: usize = 0;
pub const BTN_DOWN: usize = 1;
pub const BTN_LEFT: usize = 2;
pub const BTN_RIGHT: usize = 3;
pub const BTN_A: usize = 4;
pub const BTN_B: usize = 5;
pub const BTN_X: usize = 6;
pub const BTN_Y: usize = 7;
pub const BTN_L: usize = 8;
pub const BTN_R: usize = 9;
pub const BTN_START: usize = 10;
pub const BTN_SELECT: usize = 11;

/// Button constants emitted into every generated shader, in slot order
pub const WGSL_BUTTON_CONSTANTS: [&str; BUTTON_COUNT] = [
    "BTN_UP",
    "BTN_DOWN",
    "BTN_LEFT",
    "BTN_RIGHT",
    "BTN_A",
    "BTN_B",
    "BTN_X",
    "BTN_Y",
    "BTN_L",
    "BTN_R",
    "BTN_START",
    "BTN_SELECT",
];

/// Key code names in canonical slot order
///
/// Entry `i` is the winit `KeyCode` variant name (= web `e.code` string)
/// stored at `keys[i]`.
pub const KEY_CODE_NAMES: [&str; KEY_COUNT] = [
    "Backquote",
    "Backslash",
    "BracketLeft",
    "BracketRight",
    "Comma",
    "Digit0",
    "Digit1",
    "Digit2",
    "Digit3",
    "Digit4",
    "Digit5",
    "Digit6",
    "Digit7",
    "Digit8",
    "Digit9",
    "Equal",
    "IntlBackslash",
    "IntlRo",
    "IntlYen",
    "KeyA",
    "KeyB",
    "KeyC",
    "KeyD",
    "KeyE",
    "KeyF",
    "KeyG",
    "KeyH",
    "KeyI",
    "KeyJ",
    "KeyK",
    "KeyL",
    "KeyM",
    "KeyN",
    "KeyO",
    "KeyP",
    "KeyQ",
    "KeyR",
    "KeyS",
    "KeyT",
    "KeyU",
    "KeyV",
    "KeyW",
    "KeyX",
    "KeyY",
    "KeyZ",
    "Minus",
    "Period",
    "Quote",
    "Semicolon",
    "Slash",
    "AltLeft",
    "AltRight",
    "Backspace",
    "CapsLock",
    "ContextMenu",
    "ControlLeft",
    "ControlRight",
    "Enter",
    "SuperLeft",
    "SuperRight",
    "ShiftLeft",
    "ShiftRight",
    "Space",
    "Tab",
    "Convert",
    "KanaMode",
    "Lang1",
    "Lang2",
    "Lang3",
    "Lang4",
    "Lang5",
    "NonConvert",
    "Delete",
    "End",
    "Help",
    "Home",
    "Insert",
    "PageDown",
    "PageUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "ArrowUp",
    "NumLock",
    "Numpad0",
    "Numpad1",
    "Numpad2",
    "Numpad3",
    "Numpad4",
    "Numpad5",
    "Numpad6",
    "Numpad7",
    "Numpad8",
    "Numpad9",
    "NumpadAdd",
    "NumpadBackspace",
    "NumpadClear",
    "NumpadClearEntry",
    "NumpadComma",
    "NumpadDecimal",
    "NumpadDivide",
    "NumpadEnter",
    "NumpadEqual",
    "NumpadHash",
    "NumpadMemoryAdd",
    "NumpadMemoryClear",
    "NumpadMemoryRecall",
    "NumpadMemoryStore",
    "NumpadMemorySubtract",
    "NumpadMultiply",
    "NumpadParenLeft",
    "NumpadParenRight",
    "NumpadStar",
    "NumpadSubtract",
    "Escape",
    "Fn",
    "FnLock",
    "PrintScreen",
    "ScrollLock",
    "Pause",
    "BrowserBack",
    "BrowserFavorites",
    "BrowserForward",
    "BrowserHome",
    "BrowserRefresh",
    "BrowserSearch",
    "BrowserStop",
    "Eject",
    "LaunchApp1",
    "LaunchApp2",
    "LaunchMail",
    "MediaPlayPause",
    "MediaSelect",
    "MediaStop",
    "MediaTrackNext",
    "MediaTrackPrevious",
    "Power",
    "Sleep",
    "AudioVolumeDown",
    "AudioVolumeMute",
    "AudioVolumeUp",
    "WakeUp",
    "Meta",
    "Hyper",
    "Turbo",
    "Abort",
    "Resume",
    "Suspend",
    "Again",
    "Copy",
    "Cut",
    "Find",
    "Open",
    "Paste",
    "Props",
    "Select",
    "Undo",
    "Hiragana",
    "Katakana",
    "F1",
    "F2",
    "F3",
    "F4",
    "F5",
    "F6",
    "F7",
    "F8",
    "F9",
    "F10",
    "F11",
    "F12",
    "F13",
    "F14",
    "F15",
    "F16",
    "F17",
    "F18",
    "F19",
    "F20",
    "F21",
    "F22",
    "F23",
    "F24",
    "F25",
    "F26",
    "F27",
    "F28",
    "F29",
    "F30",
    "F31",
    "F32",
    "F33",
    "F34",
    "F35",
];

/// Maps a key code name to its canonical slot index
///
/// Accepts winit `KeyCode` variant names, which are identical to web
/// `e.code` strings. Returns `None` for codes outside the table.
pub fn keycode_index(code: &str) -> Option<usize> {
    KEY_CODE_NAMES.iter().position(|&name| name == code)
}

/// `KEY_*` constants emitted into every generated shader
///
/// A curated subset of the full table covering the keys games actually
/// bind: the contiguous typing block, navigation, arrows, escape, and the
/// function row.
pub const WGSL_KEY_CONSTANTS: [(&str, u32); 87] = [
    ("KEY_BACKQUOTE", 0),
    ("KEY_BACKSLASH", 1),
    ("KEY_BRACKET_LEFT", 2),
    ("KEY_BRACKET_RIGHT", 3),
    ("KEY_COMMA", 4),
    ("KEY_0", 5),
    ("KEY_1", 6),
    ("KEY_2", 7),
    ("KEY_3", 8),
    ("KEY_4", 9),
    ("KEY_5", 10),
    ("KEY_6", 11),
    ("KEY_7", 12),
    ("KEY_8", 13),
    ("KEY_9", 14),
    ("KEY_EQUAL", 15),
    ("KEY_INTL_BACKSLASH", 16),
    ("KEY_INTL_RO", 17),
    ("KEY_INTL_YEN", 18),
    ("KEY_A", 19),
    ("KEY_B", 20),
    ("KEY_C", 21),
    ("KEY_D", 22),
    ("KEY_E", 23),
    ("KEY_F", 24),
    ("KEY_G", 25),
    ("KEY_H", 26),
    ("KEY_I", 27),
    ("KEY_J", 28),
    ("KEY_K", 29),
    ("KEY_L", 30),
    ("KEY_M", 31),
    ("KEY_N", 32),
    ("KEY_O", 33),
    ("KEY_P", 34),
    ("KEY_Q", 35),
    ("KEY_R", 36),
    ("KEY_S", 37),
    ("KEY_T", 38),
    ("KEY_U", 39),
    ("KEY_V", 40),
    ("KEY_W", 41),
    ("KEY_X", 42),
    ("KEY_Y", 43),
    ("KEY_Z", 44),
    ("KEY_MINUS", 45),
    ("KEY_PERIOD", 46),
    ("KEY_QUOTE", 47),
    ("KEY_SEMICOLON", 48),
    ("KEY_SLASH", 49),
    ("KEY_ALT_LEFT", 50),
    ("KEY_ALT_RIGHT", 51),
    ("KEY_BACKSPACE", 52),
    ("KEY_CAPS_LOCK", 53),
    ("KEY_CONTEXT_MENU", 54),
    ("KEY_CTRL_LEFT", 55),
    ("KEY_CTRL_RIGHT", 56),
    ("KEY_ENTER", 57),
    ("KEY_SUPER_LEFT", 58),
    ("KEY_SUPER_RIGHT", 59),
    ("KEY_SHIFT_LEFT", 60),
    ("KEY_SHIFT_RIGHT", 61),
    ("KEY_SPACE", 62),
    ("KEY_TAB", 63),
    ("KEY_DELETE", 72),
    ("KEY_END", 73),
    ("KEY_HOME", 75),
    ("KEY_INSERT", 76),
    ("KEY_PAGE_DOWN", 77),
    ("KEY_PAGE_UP", 78),
    ("KEY_DOWN", 79),
    ("KEY_LEFT", 80),
    ("KEY_RIGHT", 81),
    ("KEY_UP", 82),
    ("KEY_ESCAPE", 114),
    ("KEY_F1", 159),
    ("KEY_F2", 160),
    ("KEY_F3", 161),
    ("KEY_F4", 162),
    ("KEY_F5", 163),
    ("KEY_F6", 164),
    ("KEY_F7", 165),
    ("KEY_F8", 166),
    ("KEY_F9", 167),
    ("KEY_F10", 168),
    ("KEY_F11", 169),
    ("KEY_F12", 170),
];
