use crate::hardware::INT_JOYPAD;

const SELECT_DIRECTIONS: u8 = 0x10;
const SELECT_BUTTONS: u8 = 0x20;

/// Joypad keys. The discriminant is the key's bit in [`Input::update_state`]
/// masks: bits 0-3 are the button column, bits 4-7 the direction column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    A = 0x01,
    B = 0x02,
    Select = 0x04,
    Start = 0x08,
    Right = 0x10,
    Left = 0x20,
    Up = 0x40,
    Down = 0x80,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
    ];

    #[inline]
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// P1/JOYP register. A cleared bit means pressed or selected.
pub struct Input {
    /// Currently held keys, one bit per [`Button`]; 1 = pressed.
    pressed: u8,
    /// Column select bits 4-5 as last written by the game.
    select: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            pressed: 0,
            select: SELECT_DIRECTIONS | SELECT_BUTTONS,
        }
    }

    pub fn read(&self) -> u8 {
        let mut keys = 0x0F;
        if self.select & SELECT_DIRECTIONS == 0 {
            keys &= !(self.pressed >> 4) & 0x0F;
        }
        if self.select & SELECT_BUTTONS == 0 {
            keys &= !self.pressed & 0x0F;
        }
        0xC0 | self.select | keys
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & (SELECT_DIRECTIONS | SELECT_BUTTONS);
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed & button.mask() != 0
    }

    /// Press or release one key. A press that was not already held raises
    /// the joypad interrupt.
    pub fn set_button(&mut self, button: Button, pressed: bool, if_reg: &mut u8) {
        let state = if pressed {
            self.pressed | button.mask()
        } else {
            self.pressed & !button.mask()
        };
        self.update_state(state, if_reg);
    }

    /// Replace the whole key state at once.
    pub fn update_state(&mut self, state: u8, if_reg: &mut u8) {
        let newly_pressed = state & !self.pressed;
        self.pressed = state;
        if newly_pressed != 0 {
            *if_reg |= INT_JOYPAD;
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
