//! Input state tracking
//!
//! Accumulates OS input events between frames and produces the frame-stable
//! snapshot the scheduler uploads into the host block. The tracker speaks
//! key code *names* (winit `KeyCode` variant names / web `e.code` strings),
//! so the windowing layer stays at the edge and this module tests without
//! one.

use wgslbox_dialect::keys::{self, BUTTON_COUNT, KEY_COUNT};

/// Frame-stable copy of the input-facing host block fields
#[derive(Debug, Clone)]
pub struct InputSnapshot {
    /// Virtual gamepad state, 0 or 1 per button
    pub buttons: [i32; BUTTON_COUNT],
    /// Raw key state, 0 or 1 per slot
    pub keys: [u32; KEY_COUNT],
    /// xy = cursor position in pixels, zw = last click position; zw are
    /// negated once the button releases, so sign alone encodes "held"
    pub mouse: [f32; 4],
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            buttons: [0; BUTTON_COUNT],
            keys: [0; KEY_COUNT],
            mouse: [0.0; 4],
        }
    }
}

/// Accumulates input events between frames
#[derive(Debug)]
pub struct InputState {
    buttons: [i32; BUTTON_COUNT],
    keys: [u32; KEY_COUNT],
    cursor: (f32, f32),
    click: (f32, f32),
    held: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            buttons: [0; BUTTON_COUNT],
            keys: [0; KEY_COUNT],
            cursor: (0.0, 0.0),
            click: (0.0, 0.0),
            held: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key transition by code name
    ///
    /// Updates the raw key slot and, for the chords games expect, the
    /// virtual gamepad: arrows/WASD drive the dpad, Z/X are A/B, Enter is
    /// Start and the left shift is Select.
    pub fn handle_key(&mut self, code: &str, pressed: bool) {
        let value = i32::from(pressed);

        if let Some(index) = keys::keycode_index(code) {
            self.keys[index] = value as u32;
        }

        match code {
            "ArrowUp" | "KeyW" => self.buttons[keys::BTN_UP] = value,
            "ArrowDown" | "KeyS" => self.buttons[keys::BTN_DOWN] = value,
            "ArrowLeft" | "KeyA" => self.buttons[keys::BTN_LEFT] = value,
            "ArrowRight" | "KeyD" => self.buttons[keys::BTN_RIGHT] = value,
            "KeyZ" => self.buttons[keys::BTN_A] = value,
            "KeyX" => self.buttons[keys::BTN_B] = value,
            "Enter" => self.buttons[keys::BTN_START] = value,
            "ShiftLeft" => self.buttons[keys::BTN_SELECT] = value,
            _ => {}
        }
    }

    /// Records the cursor position in framebuffer pixels
    pub fn handle_cursor_moved(&mut self, x: f32, y: f32) {
        self.cursor = (x, y);
    }

    /// Records a primary-button transition
    ///
    /// A press latches the click position; a release negates it, so the
    /// shader can test the sign of `mouse.z`/`mouse.w` for "button held".
    pub fn handle_mouse_button(&mut self, pressed: bool) {
        if pressed {
            self.click = self.cursor;
            self.held = true;
        } else if self.held {
            self.click = (-self.click.0, -self.click.1);
            self.held = false;
        }
    }

    /// Produces the snapshot uploaded at the top of the frame
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            buttons: self.buttons,
            keys: self.keys,
            mouse: [self.cursor.0, self.cursor.1, self.click.0, self.click.1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_key_slot() {
        let mut input = InputState::new();
        input.handle_key("KeyA", true);
        assert_eq!(input.snapshot().keys[19], 1);
        input.handle_key("KeyA", false);
        assert_eq!(input.snapshot().keys[19], 0);
    }

    #[test]
    fn test_arrow_and_wasd_share_dpad() {
        let mut input = InputState::new();
        input.handle_key("ArrowRight", true);
        assert_eq!(input.snapshot().buttons[keys::BTN_RIGHT], 1);
        input.handle_key("ArrowRight", false);
        input.handle_key("KeyD", true);
        assert_eq!(input.snapshot().buttons[keys::BTN_RIGHT], 1);
    }

    #[test]
    fn test_mouse_click_sign_encoding() {
        let mut input = InputState::new();
        input.handle_cursor_moved(120.0, 40.0);
        input.handle_mouse_button(true);
        assert_eq!(input.snapshot().mouse, [120.0, 40.0, 120.0, 40.0]);

        input.handle_cursor_moved(130.0, 50.0);
        assert_eq!(input.snapshot().mouse, [130.0, 50.0, 120.0, 40.0]);

        input.handle_mouse_button(false);
        let mouse = input.snapshot().mouse;
        assert_eq!(mouse[2], -120.0);
        assert_eq!(mouse[3], -40.0);
    }

    #[test]
    fn test_release_without_press_does_not_flip_sign() {
        let mut input = InputState::new();
        input.handle_mouse_button(false);
        input.handle_mouse_button(false);
        assert_eq!(input.snapshot().mouse[2], 0.0);
    }

    #[test]
    fn test_unknown_code_is_ignored() {
        let mut input = InputState::new();
        input.handle_key("NotAKey", true);
        assert_eq!(input.snapshot().keys, [0; KEY_COUNT]);
    }
}
