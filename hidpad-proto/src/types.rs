//! Gamepad input types: Buttons, Hat, GamepadState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state represented as a bitfield.
///
/// The report carries ten buttons; bits above [`Buttons::MASK`] are
/// dropped when a report is packed.
///
/// # Example
///
/// ```
/// use hidpad_proto::Buttons;
///
/// let buttons = Buttons::B1 | Buttons::B2;
/// assert!(buttons.contains(Buttons::B1));
/// assert!(buttons.contains(Buttons::B2));
/// assert!(!buttons.contains(Buttons::B3));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const B1: Self = Self(1 << 0);
    pub const B2: Self = Self(1 << 1);
    pub const B3: Self = Self(1 << 2);
    pub const B4: Self = Self(1 << 3);
    pub const B5: Self = Self(1 << 4);
    pub const B6: Self = Self(1 << 5);
    pub const B7: Self = Self(1 << 6);
    pub const B8: Self = Self(1 << 7);
    pub const B9: Self = Self(1 << 8);
    pub const B10: Self = Self(1 << 9);

    /// Number of buttons declared by the report descriptor.
    pub const COUNT: usize = 10;

    /// Bits that are carried in the report.
    pub const MASK: u16 = (1 << Self::COUNT) - 1;

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Button by zero-based index, or `None` past [`Buttons::COUNT`].
    #[inline]
    #[must_use]
    pub const fn nth(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::MASK == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Hat switch position.
///
/// Values 0-7 run clockwise from up in 45 degree steps, matching the
/// report descriptor's physical range of 0-315 degrees. Any value from 8
/// upwards is the null state and is reported as [`Hat::Centered`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Hat {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    #[default]
    Centered = 8,
}

impl Hat {
    /// Decode a raw hat value. Out-of-range values collapse to centered.
    #[must_use]
    pub const fn from_raw(value: u8) -> Self {
        match value {
            0 => Hat::Up,
            1 => Hat::UpRight,
            2 => Hat::Right,
            3 => Hat::DownRight,
            4 => Hat::Down,
            5 => Hat::DownLeft,
            6 => Hat::Left,
            7 => Hat::UpLeft,
            _ => Hat::Centered,
        }
    }

    /// Map four digital directions onto the hat.
    ///
    /// Opposing directions cancel each other, so `up + down` leaves only the
    /// horizontal component (or centered if that cancels too).
    #[must_use]
    pub const fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let vertical = (up as i8) - (down as i8);
        let horizontal = (right as i8) - (left as i8);
        match (vertical, horizontal) {
            (1, 0) => Hat::Up,
            (1, 1) => Hat::UpRight,
            (0, 1) => Hat::Right,
            (-1, 1) => Hat::DownRight,
            (-1, 0) => Hat::Down,
            (-1, -1) => Hat::DownLeft,
            (0, -1) => Hat::Left,
            (1, -1) => Hat::UpLeft,
            _ => Hat::Centered,
        }
    }

    /// Raw 4-bit value as it appears in the report.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Angle in degrees, or `None` when centered.
    #[must_use]
    pub const fn degrees(self) -> Option<u16> {
        match self {
            Hat::Centered => None,
            other => Some(other as u16 * 45),
        }
    }
}

/// Complete gamepad input snapshot, as sampled by the input side.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadState {
    pub buttons: Buttons,
    pub hat: Hat,
}

impl GamepadState {
    /// No buttons pressed, hat centered.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            hat: Hat::Centered,
        }
    }
}
