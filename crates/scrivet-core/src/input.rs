//! Keyboard input types.
//!
//! Platform-agnostic key and modifier definitions. Hosts translate their
//! native events into a [`KeyCombo`]; the editor decides what it means.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::EditorError;

/// A key, named after the W3C `KeyboardEvent.key` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (or string, for composed input).
    Character(SmolStr),

    Unidentified,

    // === Whitespace / editing ===
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    // === Modifiers ===
    Alt,
    Control,
    Meta,
    Shift,
    CapsLock,

    // === Clipboard / editing commands ===
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Map a `KeyboardEvent.key` value.
    pub fn from_key_value(value: &str) -> Self {
        match value {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Alt" => Self::Alt,
            "Control" => Self::Control,
            "Meta" | "OS" => Self::Meta,
            "Shift" => Self::Shift,
            "CapsLock" => Self::CapsLock,
            "Copy" => Self::Copy,
            "Cut" => Self::Cut,
            "Paste" => Self::Paste,
            "Undo" => Self::Undo,
            "Redo" => Self::Redo,
            "Spacebar" => Self::Character(" ".into()),
            "" | "Unidentified" | "Dead" => Self::Unidentified,
            other if crate::grapheme::count(other) == 1 => Self::Character(other.into()),
            _ => Self::Unidentified,
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }

    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Self::Alt | Self::Control | Self::Meta | Self::Shift | Self::CapsLock
        )
    }

    /// Name used in combo strings (`"ctrl+shift+z"`).
    pub fn name(&self) -> SmolStr {
        match self {
            Self::Character(c) if c == " " => "space".into(),
            Self::Character(c) => c.to_lowercase().into(),
            Self::Unidentified => "unidentified".into(),
            Self::Backspace => "backspace".into(),
            Self::Delete => "delete".into(),
            Self::Enter => "enter".into(),
            Self::Tab => "tab".into(),
            Self::Escape => "escape".into(),
            Self::ArrowLeft => "left".into(),
            Self::ArrowRight => "right".into(),
            Self::ArrowUp => "up".into(),
            Self::ArrowDown => "down".into(),
            Self::Home => "home".into(),
            Self::End => "end".into(),
            Self::PageUp => "pageup".into(),
            Self::PageDown => "pagedown".into(),
            Self::Alt => "alt".into(),
            Self::Control => "control".into(),
            Self::Meta => "meta".into(),
            Self::Shift => "shift".into(),
            Self::CapsLock => "capslock".into(),
            Self::Copy => "copy".into(),
            Self::Cut => "cut".into(),
            Self::Paste => "paste".into(),
            Self::Undo => "undo".into(),
            Self::Redo => "redo".into(),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "space" => Self::Character(" ".into()),
            "backspace" => Self::Backspace,
            "delete" | "del" => Self::Delete,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "escape" | "esc" => Self::Escape,
            "left" | "arrowleft" => Self::ArrowLeft,
            "right" | "arrowright" => Self::ArrowRight,
            "up" | "arrowup" => Self::ArrowUp,
            "down" | "arrowdown" => Self::ArrowDown,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            other if other.chars().count() == 1 => Self::Character(other.into()),
            _ => return None,
        };
        Some(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Ctrl or Meta held, i.e. a shortcut rather than typing.
    pub fn is_command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key together with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::CTRL,
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::SHIFT,
        }
    }

    /// Canonical form for shortcut lookup: characters lowercased, so that
    /// Ctrl+Shift+Z matches `ctrl+shift+z` whatever the event reported.
    pub fn normalized(&self) -> Self {
        let key = match &self.key {
            Key::Character(c) => Key::Character(c.to_lowercase().into()),
            other => other.clone(),
        };
        Self {
            key,
            modifiers: self.modifiers,
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [
            (m.ctrl, "ctrl"),
            (m.alt, "alt"),
            (m.shift, "shift"),
            (m.meta, "meta"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key.name())
    }
}

impl FromStr for KeyCombo {
    type Err = EditorError;

    /// Parse `"ctrl+shift+z"`-style combos. Modifier names are `ctrl`,
    /// `alt`, `shift` and `meta` (`cmd` is accepted for `meta`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| EditorError::MalformedArguments {
            command: "shortcut".into(),
            reason: format!("{reason}: {s:?}"),
        };
        let lower = s.trim().to_lowercase();
        let (mods, key) = match lower.rsplit_once('+') {
            // "ctrl++" binds the plus key itself.
            Some((mods, "")) if mods.ends_with('+') => (&mods[..mods.len() - 1], "+"),
            Some((mods, key)) => (mods, key),
            None => ("", lower.as_str()),
        };
        let mut modifiers = Modifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            match part {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" => modifiers.meta = true,
                _ => return Err(malformed("unknown modifier")),
            }
        }
        let key = Key::from_name(key).ok_or_else(|| malformed("unknown key"))?;
        Ok(Self { key, modifiers })
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, host should prevent default.
    Handled,
    /// Event was not a keybinding, let the host handle it.
    NotHandled,
    /// Event should be passed through to the host, no default prevention.
    PassThrough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combos() {
        let combo: KeyCombo = "ctrl+shift+z".parse().unwrap();
        assert_eq!(combo.key, Key::character("z"));
        assert_eq!(combo.modifiers, Modifiers::CTRL_SHIFT);

        let combo: KeyCombo = "Cmd+B".parse().unwrap();
        assert_eq!(combo, KeyCombo::with_modifiers(Key::character("b"), Modifiers::META));

        let combo: KeyCombo = "ctrl++".parse().unwrap();
        assert_eq!(combo, KeyCombo::ctrl(Key::character("+")));

        assert_eq!("enter".parse::<KeyCombo>().unwrap(), KeyCombo::new(Key::Enter));
        assert!("hyper+x".parse::<KeyCombo>().is_err());
        assert!("ctrl+nosuchkey".parse::<KeyCombo>().is_err());
    }

    #[test]
    fn test_display_roundtrips_parse() {
        for src in ["ctrl+z", "ctrl+shift+z", "alt+left", "meta+space", "shift+enter"] {
            let combo: KeyCombo = src.parse().unwrap();
            assert_eq!(combo.to_string(), src);
        }
    }

    #[test]
    fn test_normalized_lowercases_characters() {
        let combo = KeyCombo::with_modifiers(Key::character("Z"), Modifiers::CTRL_SHIFT);
        assert_eq!(combo.normalized(), "ctrl+shift+z".parse().unwrap());
    }

    #[test]
    fn test_key_values() {
        assert_eq!(Key::from_key_value("a"), Key::character("a"));
        assert_eq!(Key::from_key_value("Backspace"), Key::Backspace);
        assert_eq!(Key::from_key_value("Left"), Key::ArrowLeft);
        assert_eq!(Key::from_key_value("F13"), Key::Unidentified);
        assert!(Key::from_key_value("Shift").is_modifier());
        assert!(Key::from_key_value("Home").is_navigation());
    }
}
