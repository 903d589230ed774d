//! Windows-console-style color attribute and the layout state threaded through
//! the VT measurement walker.
//!
//! A [`ColorAttr`] packs foreground (low nibble), background (next nibble) and
//! an intensity/reverse flag bit into 16 bits, mirroring the classic console
//! `WORD` attribute the source format is built on. The VT layout engine never
//! mutates a `ColorAttr` in place; every transition produces a new value so
//! that [`LayoutState`] stays a small `Copy` value threaded by value rather
//! than through shared mutable state.

/// A 16-bit console-style color attribute: 4 bits foreground, 4 bits
/// background, and reserved high bits for intensity/reverse flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorAttr(pub u16);

impl ColorAttr {
    pub const FG_MASK: u16 = 0x000F;
    pub const BG_MASK: u16 = 0x00F0;
    pub const INTENSITY_BIT: u16 = 0x0100;
    pub const REVERSE_BIT: u16 = 0x0200;

    pub fn new(fg: u8, bg: u8) -> Self {
        Self(((bg as u16) << 4 & Self::BG_MASK) | (fg as u16 & Self::FG_MASK))
    }

    pub fn foreground(self) -> u8 {
        (self.0 & Self::FG_MASK) as u8
    }

    pub fn background(self) -> u8 {
        ((self.0 & Self::BG_MASK) >> 4) as u8
    }

    pub fn with_foreground(self, fg: u8) -> Self {
        Self((self.0 & !Self::FG_MASK) | (fg as u16 & Self::FG_MASK))
    }

    pub fn with_background(self, bg: u8) -> Self {
        Self((self.0 & !Self::BG_MASK) | ((bg as u16) << 4 & Self::BG_MASK))
    }

    pub fn with_intensity(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::INTENSITY_BIT)
        } else {
            Self(self.0 & !Self::INTENSITY_BIT)
        }
    }

    pub fn with_reverse(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::REVERSE_BIT)
        } else {
            Self(self.0 & !Self::REVERSE_BIT)
        }
    }

    pub fn intensity(self) -> bool {
        self.0 & Self::INTENSITY_BIT != 0
    }

    pub fn reverse(self) -> bool {
        self.0 & Self::REVERSE_BIT != 0
    }

    /// Default light-grey-on-black attribute used before any SGR escape is seen.
    pub fn default_attr() -> Self {
        Self::new(7, 0)
    }

    /// Encode this attribute as an SGR escape sequence re-establishing it from
    /// a neutral state (reset, then set fg/bg/intensity/reverse).
    pub fn to_sgr(self) -> String {
        let mut params = vec!["0".to_string()];
        if self.0 & Self::INTENSITY_BIT != 0 {
            params.push("1".to_string());
        }
        if self.0 & Self::REVERSE_BIT != 0 {
            params.push("7".to_string());
        }
        params.push((30 + ansi_index(self.foreground())).to_string());
        params.push((40 + ansi_index(self.background())).to_string());
        format!("\x1b[{}m", params.join(";"))
    }
}

/// Map the 4-bit console color index to the ANSI 0-7 base index (same order;
/// the console's 16-color palette is the ANSI 8-color palette doubled by the
/// intensity bit, which we already fold separately).
fn ansi_index(console_color: u8) -> u8 {
    console_color & 0x07
}

/// The explicit value threaded through [`crate::vt::measure`] calls, replacing
/// the source's pointer-to-COLOR globals (see design notes on re-architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutState {
    pub display_color: ColorAttr,
    pub user_color: ColorAttr,
    pub chars_remaining_in_match: usize,
}

impl LayoutState {
    pub fn initial(color: ColorAttr) -> Self {
        Self {
            display_color: color,
            user_color: color,
            chars_remaining_in_match: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attr_round_trips_fields() {
        let c = ColorAttr::new(3, 5).with_intensity(true).with_reverse(true);
        assert_eq!(c.foreground(), 3);
        assert_eq!(c.background(), 5);
        assert_eq!(c.with_foreground(1).foreground(), 1);
        assert_eq!(c.with_background(2).background(), 2);
    }

    #[test]
    fn default_attr_is_light_grey_on_black() {
        let c = ColorAttr::default_attr();
        assert_eq!(c.foreground(), 7);
        assert_eq!(c.background(), 0);
    }

    #[test]
    fn to_sgr_contains_reset_and_color_params() {
        let c = ColorAttr::new(1, 0);
        let sgr = c.to_sgr();
        assert!(sgr.starts_with("\x1b[0;"));
        assert!(sgr.ends_with('m'));
    }
}
