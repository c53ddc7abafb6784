pub const KEYBOARD_TEXTURE_WIDTH: u32 = 256;
pub const KEYBOARD_TEXTURE_HEIGHT: u32 = 3;
pub const KEYBOARD_BYTES_PER_PIXEL: u32 = 4;

const ROW_HELD: usize = 0;
const ROW_PRESSED: usize = 1;
const ROW_TOGGLED: usize = 2;
const KEY_COUNT: usize = KEYBOARD_TEXTURE_WIDTH as usize;

/// ShaderToy keyboard input: row 0 is "held", row 1 is "pressed this frame",
/// row 2 flips on every press.
#[derive(Debug, Clone)]
pub struct KeyboardState {
    held: [bool; KEY_COUNT],
    pressed: [bool; KEY_COUNT],
    toggled: [bool; KEY_COUNT],
    texture: Vec<u8>,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            held: [false; KEY_COUNT],
            pressed: [false; KEY_COUNT],
            toggled: [false; KEY_COUNT],
            texture: vec![
                0u8;
                (KEYBOARD_TEXTURE_WIDTH * KEYBOARD_TEXTURE_HEIGHT * KEYBOARD_BYTES_PER_PIXEL)
                    as usize
            ],
        }
    }
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key transition. Codes outside 0..256 are ignored.
    pub fn key_event(&mut self, key_code: u32, down: bool) {
        let Some(index) = usize::try_from(key_code).ok().filter(|&index| index < KEY_COUNT) else {
            tracing::debug!(key_code, "ignoring key outside keyboard texture range");
            return;
        };
        if down && !self.held[index] {
            self.pressed[index] = true;
            self.toggled[index] = !self.toggled[index];
        }
        self.held[index] = down;
    }

    pub fn is_held(&self, key_code: u32) -> bool {
        self.held.get(key_code as usize).copied().unwrap_or(false)
    }

    /// Rebuilds the RGBA texture payload from the current key state.
    pub fn refresh_texture(&mut self) -> &[u8] {
        let rows = [
            (ROW_HELD, &self.held),
            (ROW_PRESSED, &self.pressed),
            (ROW_TOGGLED, &self.toggled),
        ];
        let bytes_per_row = KEY_COUNT * KEYBOARD_BYTES_PER_PIXEL as usize;
        for (row, keys) in rows {
            for (key, &active) in keys.iter().enumerate() {
                let offset = row * bytes_per_row + key * KEYBOARD_BYTES_PER_PIXEL as usize;
                let value = if active { 255 } else { 0 };
                self.texture[offset] = value;
                self.texture[offset + 1] = value;
                self.texture[offset + 2] = value;
                self.texture[offset + 3] = 255;
            }
        }
        &self.texture
    }

    pub fn texture(&self) -> &[u8] {
        &self.texture
    }

    /// "Pressed" only lasts one frame.
    pub fn end_frame(&mut self) {
        self.pressed = [false; KEY_COUNT];
    }
}
