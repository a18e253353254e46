//! Keyboard bindings of the bulldoze tool.

use std::fmt;

use crate::error::{Error, Result};
use crate::filter::OccupantFilterKind;
use crate::host::ModifierKeys;

/// Key and modifiers that drive mode changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    /// Virtual key code of the mode-cycle key
    pub mode_cycle: i32,
    pub diagonal: ModifierKeys,
    pub flora: ModifierKeys,
    pub network: ModifierKeys,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode_cycle: i32::from(b'B'),
            diagonal: ModifierKeys::ALT,
            flora: ModifierKeys::CONTROL,
            network: ModifierKeys::SHIFT,
        }
    }
}

impl KeyBindings {
    /// Build bindings from their configured names.
    ///
    /// `mode_cycle` is a single ASCII letter or digit; modifiers are
    /// `shift`, `control` (or `ctrl`) and `alt`, each used once.
    pub fn from_names(mode_cycle: &str, diagonal: &str, flora: &str, network: &str) -> Result<Self> {
        let bindings = Self {
            mode_cycle: parse_virtual_key(mode_cycle)?,
            diagonal: parse_modifier(diagonal)?,
            flora: parse_modifier(flora)?,
            network: parse_modifier(network)?,
        };

        if bindings.diagonal == bindings.flora
            || bindings.diagonal == bindings.network
            || bindings.flora == bindings.network
        {
            return Err(Error::Config(format!(
                "modifier keys must be distinct (diagonal: {diagonal}, flora: {flora}, network: {network})"
            )));
        }

        Ok(bindings)
    }

    /// Filter kind and diagonal flag selected by the mode-cycle key.
    ///
    /// The flora modifier wins when both filter modifiers are held.
    pub fn select(&self, modifiers: ModifierKeys) -> (OccupantFilterKind, bool) {
        let diagonal = modifiers.contains(self.diagonal);
        let kind = if modifiers.contains(self.flora) {
            OccupantFilterKind::Flora
        } else if modifiers.contains(self.network) {
            OccupantFilterKind::Network
        } else {
            OccupantFilterKind::None
        };
        (kind, diagonal)
    }
}

impl fmt::Display for KeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = u8::try_from(self.mode_cycle).map_or('?', char::from);
        write!(
            f,
            "mode cycle {}, diagonal {}, flora {}, network {}",
            key,
            modifier_name(self.diagonal),
            modifier_name(self.flora),
            modifier_name(self.network)
        )
    }
}

fn parse_virtual_key(name: &str) -> Result<i32> {
    match name.trim().as_bytes() {
        // Virtual key codes of letters and digits are their upper case ASCII values
        [c] if c.is_ascii_alphanumeric() => Ok(i32::from(c.to_ascii_uppercase())),
        _ => Err(Error::Config(format!(
            "mode cycle key must be a single letter or digit, got {name:?}"
        ))),
    }
}

fn parse_modifier(name: &str) -> Result<ModifierKeys> {
    match name.trim().to_ascii_lowercase().as_str() {
        "shift" => Ok(ModifierKeys::SHIFT),
        "control" | "ctrl" => Ok(ModifierKeys::CONTROL),
        "alt" => Ok(ModifierKeys::ALT),
        _ => Err(Error::Config(format!("unknown modifier key {name:?}"))),
    }
}

fn modifier_name(modifier: ModifierKeys) -> &'static str {
    if modifier == ModifierKeys::SHIFT {
        "shift"
    } else if modifier == ModifierKeys::CONTROL {
        "control"
    } else if modifier == ModifierKeys::ALT {
        "alt"
    } else {
        "?"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.mode_cycle, 0x42);
        assert_eq!(
            bindings.to_string(),
            "mode cycle B, diagonal alt, flora control, network shift"
        );
    }

    #[test]
    fn test_from_names() {
        let bindings = KeyBindings::from_names("d", "Shift", "ctrl", "ALT").unwrap();
        assert_eq!(bindings.mode_cycle, i32::from(b'D'));
        assert_eq!(bindings.diagonal, ModifierKeys::SHIFT);
        assert_eq!(bindings.flora, ModifierKeys::CONTROL);
        assert_eq!(bindings.network, ModifierKeys::ALT);

        let digit = KeyBindings::from_names("7", "alt", "control", "shift").unwrap();
        assert_eq!(digit.mode_cycle, 0x37);
    }

    #[test]
    fn test_from_names_rejects_bad_input() {
        assert!(KeyBindings::from_names("BB", "alt", "control", "shift").is_err());
        assert!(KeyBindings::from_names("", "alt", "control", "shift").is_err());
        assert!(KeyBindings::from_names("-", "alt", "control", "shift").is_err());
        assert!(KeyBindings::from_names("B", "win", "control", "shift").is_err());

        let err = KeyBindings::from_names("B", "alt", "alt", "shift").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("distinct")));
    }

    #[test]
    fn test_select_modes() {
        let bindings = KeyBindings::default();
        let cases = [
            (ModifierKeys::empty(), (OccupantFilterKind::None, false)),
            (ModifierKeys::ALT, (OccupantFilterKind::None, true)),
            (ModifierKeys::CONTROL, (OccupantFilterKind::Flora, false)),
            (
                ModifierKeys::CONTROL | ModifierKeys::ALT,
                (OccupantFilterKind::Flora, true),
            ),
            (ModifierKeys::SHIFT, (OccupantFilterKind::Network, false)),
            (
                ModifierKeys::SHIFT | ModifierKeys::ALT,
                (OccupantFilterKind::Network, true),
            ),
            (
                ModifierKeys::SHIFT | ModifierKeys::CONTROL,
                (OccupantFilterKind::Flora, false),
            ),
        ];

        for (modifiers, expected) in cases {
            assert_eq!(bindings.select(modifiers), expected, "{modifiers:?}");
        }
    }
}
