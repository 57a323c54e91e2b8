//! Input History and Frame Aggregation
//!
//! Raw device events become a time-stamped history of button states;
//! the frame driver asks "what happened during this tick's window" and
//! gets back a [`FrameInput`] with time-weighted movement, so a key
//! tapped for a third of a tick moves the player a third as far.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

// =============================================================================
// BUTTONS
// =============================================================================

/// On/off control buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    /// Move left (-X).
    MoveLeft = 0,
    /// Move right (+X).
    MoveRight = 1,
    /// Move up (+Y).
    MoveUp = 2,
    /// Move down (-Y).
    MoveDown = 3,
    /// Confirm / attack / interact.
    Action1 = 4,
    /// Cancel / secondary attack.
    Action2 = 5,
    /// Bring up the menu.
    Menu = 6,
}

/// Number of on/off control buttons.
pub const BUTTON_COUNT: usize = 7;

impl Button {
    /// Bitmask for this button.
    #[inline]
    pub fn mask(self) -> u32 {
        1u32 << self as u32
    }
}

/// Value of an axis controlled by a pair of buttons.
#[inline]
fn button_axis(buttons: u32, negative: Button, positive: Button) -> f32 {
    let neg = if buttons & negative.mask() != 0 { -1.0 } else { 0.0 };
    let pos = if buttons & positive.mask() != 0 { 1.0 } else { 0.0 };
    neg + pos
}

/// Movement vector for a button mask, clamped to unit magnitude so
/// diagonal input is no faster than a single axis.
fn movement_from_buttons(buttons: u32) -> Vec2 {
    let v = Vec2::new(
        button_axis(buttons, Button::MoveLeft, Button::MoveRight),
        button_axis(buttons, Button::MoveDown, Button::MoveUp),
    );
    let mag2 = v.length_squared();
    if mag2 > 1.0 {
        v / mag2.sqrt()
    } else {
        v
    }
}

// =============================================================================
// FRAME INPUT
// =============================================================================

/// Aggregated input over one tick's time window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Buttons that were down at some point during the window.
    pub buttons: u32,
    /// Buttons that were newly pressed during the window.
    pub pressed: u32,
    /// Time-weighted average movement vector.
    pub movement: Vec2,
}

impl FrameInput {
    /// Was the button down at any point during the window?
    #[inline]
    pub fn button_down(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    /// Did the button transition to down during the window?
    #[inline]
    pub fn button_pressed(&self, button: Button) -> bool {
        self.pressed & button.mask() != 0
    }
}

// =============================================================================
// INPUT HISTORY
// =============================================================================

/// Snapshot of player input at a moment in time.
#[derive(Clone, Copy, Debug)]
struct InputState {
    /// State timestamp.
    time: f64,
    /// The state of all buttons.
    buttons: u32,
    /// Movement vector implied by the buttons, pre-clamped.
    movement: Vec2,
}

/// Record of a physical button currently held down.
#[derive(Clone, Copy, Debug)]
struct ButtonPress {
    /// Device where the button was pressed, e.g. to distinguish
    /// keyboard from gamepad.
    device: u32,
    /// Identity of the button on that device.
    ident: u32,
    /// The logical button it maps to.
    target: Button,
}

/// State of input, including recent history.
///
/// The history always contains at least one entry: the state that was
/// current at the start of the next unread window.
#[derive(Debug)]
pub struct InputHistory {
    states: Vec<InputState>,
    held: Vec<ButtonPress>,
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHistory {
    /// Create an empty history with all buttons up at time zero.
    pub fn new() -> Self {
        Self {
            states: vec![InputState {
                time: 0.0,
                buttons: 0,
                movement: Vec2::ZERO,
            }],
            held: Vec::new(),
        }
    }

    /// Record a button press.
    ///
    /// Duplicate presses of the same `(device, ident)` without an
    /// intervening release (key repeat) are ignored.
    pub fn press(&mut self, time: f64, device: u32, ident: u32, target: Button) {
        if self
            .held
            .iter()
            .any(|b| b.device == device && b.ident == ident)
        {
            return;
        }
        self.held.push(ButtonPress {
            device,
            ident,
            target,
        });
        let buttons = self.latest().buttons | target.mask();
        self.set_buttons(time, buttons);
    }

    /// Record a button release.
    ///
    /// The logical button stays down while any other physical press
    /// still maps to it.
    pub fn release(&mut self, time: f64, device: u32, ident: u32) {
        let Some(idx) = self
            .held
            .iter()
            .position(|b| b.device == device && b.ident == ident)
        else {
            return;
        };
        let target = self.held[idx].target;
        self.held.remove(idx);

        if self.held.iter().any(|b| b.target == target) {
            return;
        }
        let buttons = self.latest().buttons & !target.mask();
        self.set_buttons(time, buttons);
    }

    /// Read a frame of input covering `[start_time, end_time)`.
    ///
    /// With `consume` set, fully-consumed history entries are dropped;
    /// the entry seeding the next window is retained.
    pub fn read(&mut self, start_time: f64, end_time: f64, consume: bool) -> FrameInput {
        // Seed from the last state strictly before the window; a
        // transition stamped exactly at the boundary belongs to this
        // window so its press edge is not lost.
        let mut p = 0;
        while p + 1 < self.states.len() && self.states[p + 1].time < start_time {
            p += 1;
        }
        let mut all = self.states[p].buttons;
        let mut cur = self.states[p].buttons;
        let mut pressed = 0u32;
        let mut cur_time = start_time;
        let mut movement = Vec2::ZERO;

        loop {
            let state_move = self.states[p].movement;
            let next = p + 1;
            if next == self.states.len() || self.states[next].time >= end_time {
                movement += state_move * (end_time - cur_time) as f32;
                break;
            }
            let st = self.states[next];
            movement += state_move * (st.time - cur_time) as f32;
            pressed |= st.buttons & !cur;
            all |= st.buttons;
            cur = st.buttons;
            cur_time = st.time;
            p = next;
        }

        let span = end_time - start_time;
        let movement = if span > 0.0 {
            movement / span as f32
        } else {
            self.states[p].movement
        };

        if consume && p > 0 {
            self.states.drain(..p);
        }

        FrameInput {
            buttons: all,
            pressed,
            movement,
        }
    }

    fn latest(&self) -> &InputState {
        self.states.last().expect("history is never empty")
    }

    /// Set the button mask at a point in time.
    ///
    /// A change stamped at or before the latest entry (jittered event
    /// order) patches that entry in place when the patch cannot corrupt
    /// the transition recorded by the entry before it; otherwise the
    /// timestamp is clamped up to the latest entry's.
    fn set_buttons(&mut self, time: f64, buttons: u32) {
        let len = self.states.len();
        let cur = self.states[len - 1];
        if cur.buttons == buttons {
            return;
        }
        let mut time = time;
        if cur.time >= time {
            if len >= 2 {
                let prev = self.states[len - 2];
                let diff = buttons ^ cur.buttons;
                if prev.buttons & diff == cur.buttons & diff {
                    let cur = &mut self.states[len - 1];
                    cur.buttons = buttons;
                    cur.movement = movement_from_buttons(buttons);
                    return;
                }
            }
            time = cur.time;
        }
        self.states.push(InputState {
            time,
            buttons,
            movement: movement_from_buttons(buttons),
        });
    }
}

// =============================================================================
// BINDINGS
// =============================================================================

/// Device scancodes used by the standard keyboard layout (USB HID).
pub mod keys {
    /// W key.
    pub const KEY_W: u32 = 26;
    /// A key.
    pub const KEY_A: u32 = 4;
    /// S key.
    pub const KEY_S: u32 = 22;
    /// D key.
    pub const KEY_D: u32 = 7;
    /// X key.
    pub const KEY_X: u32 = 27;
    /// Z key.
    pub const KEY_Z: u32 = 29;
    /// Comma key.
    pub const KEY_COMMA: u32 = 54;
    /// Period key.
    pub const KEY_PERIOD: u32 = 55;
    /// Space bar.
    pub const KEY_SPACE: u32 = 44;
    /// Tab key.
    pub const KEY_TAB: u32 = 43;
    /// Escape key.
    pub const KEY_ESCAPE: u32 = 41;
    /// Right arrow.
    pub const KEY_RIGHT: u32 = 79;
    /// Left arrow.
    pub const KEY_LEFT: u32 = 80;
    /// Down arrow.
    pub const KEY_DOWN: u32 = 81;
    /// Up arrow.
    pub const KEY_UP: u32 = 82;
}

/// Map from raw device buttons to logical buttons.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    map: BTreeMap<(u32, u32), Button>,
}

impl Bindings {
    /// Create an empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard keyboard layout (WASD + arrows, space/tab,
    /// X/Z, period/comma, escape) on device 0.
    pub fn standard_keyboard() -> Self {
        use keys::*;
        let mut b = Self::new();
        for (ident, target) in [
            (KEY_W, Button::MoveUp),
            (KEY_A, Button::MoveLeft),
            (KEY_S, Button::MoveDown),
            (KEY_D, Button::MoveRight),
            (KEY_UP, Button::MoveUp),
            (KEY_LEFT, Button::MoveLeft),
            (KEY_DOWN, Button::MoveDown),
            (KEY_RIGHT, Button::MoveRight),
            (KEY_SPACE, Button::Action1),
            (KEY_TAB, Button::Action2),
            (KEY_X, Button::Action1),
            (KEY_Z, Button::Action2),
            (KEY_PERIOD, Button::Action1),
            (KEY_COMMA, Button::Action2),
            (KEY_ESCAPE, Button::Menu),
        ] {
            b.bind(0, ident, target);
        }
        b
    }

    /// Bind a device button to a logical button.
    pub fn bind(&mut self, device: u32, ident: u32, target: Button) {
        self.map.insert((device, ident), target);
    }

    /// Remove a binding.
    pub fn unbind(&mut self, device: u32, ident: u32) {
        self.map.remove(&(device, ident));
    }

    /// Route a raw button event into the history.
    ///
    /// Returns true if the event was handled. Releases are always
    /// routed: the press that started them may have been bound.
    pub fn handle_button(
        &self,
        input: &mut InputHistory,
        time: f64,
        device: u32,
        ident: u32,
        is_down: bool,
    ) -> bool {
        if is_down {
            match self.map.get(&(device, ident)) {
                Some(&target) => {
                    input.press(time, device, ident, target);
                    true
                }
                None => false,
            }
        } else {
            input.release(time, device, ident);
            true
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
