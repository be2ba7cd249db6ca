use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use winit::keyboard::KeyCode;

/// Logical action a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveForward,
    MoveBack,
    StrafeLeft,
    StrafeRight,
    Jump,
    Sneak,
    ToggleCapture,
}

/// Runtime keybind table. Keys are unique; merging resolves duplicates
/// last-write-wins.
pub type Keybinds = HashMap<KeyCode, Action>;

#[derive(Debug, Error)]
pub enum KeybindProfileError {
    #[error("unknown key name '{name}' in keybind profile")]
    UnknownKey { name: String },
}

/// Serialized form of a keybind table: key names mapped to actions.
///
/// The carrier format is a flat JSON object, for example
/// `{"KeyW": "move_forward", "Space": "jump"}`. Key names follow the
/// windowing layer's physical key-code names. Duplicate keys in the source
/// document resolve last-wins, matching the runtime table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeybindProfile {
    binds: HashMap<String, Action>,
}

impl KeybindProfile {
    /// Resolves key names into the runtime table. Unknown key names are a
    /// hard error so a typo in a profile surfaces at load time rather than
    /// as a silently dead binding.
    pub fn resolve(&self) -> Result<Keybinds, KeybindProfileError> {
        let mut keybinds = Keybinds::with_capacity(self.binds.len());
        for (name, action) in &self.binds {
            let key = parse_key_name(name).ok_or_else(|| KeybindProfileError::UnknownKey {
                name: name.clone(),
            })?;
            keybinds.insert(key, *action);
        }
        Ok(keybinds)
    }
}

/// The stock layout: WASD movement, Space/Shift for jump and sneak, C to
/// toggle native-input capture.
#[must_use]
pub fn default_keybinds() -> Keybinds {
    HashMap::from([
        (KeyCode::KeyW, Action::MoveForward),
        (KeyCode::KeyS, Action::MoveBack),
        (KeyCode::KeyA, Action::StrafeLeft),
        (KeyCode::KeyD, Action::StrafeRight),
        (KeyCode::Space, Action::Jump),
        (KeyCode::ShiftLeft, Action::Sneak),
        (KeyCode::KeyC, Action::ToggleCapture),
    ])
}

fn parse_key_name(name: &str) -> Option<KeyCode> {
    let key = match name {
        "KeyA" => KeyCode::KeyA,
        "KeyB" => KeyCode::KeyB,
        "KeyC" => KeyCode::KeyC,
        "KeyD" => KeyCode::KeyD,
        "KeyE" => KeyCode::KeyE,
        "KeyF" => KeyCode::KeyF,
        "KeyG" => KeyCode::KeyG,
        "KeyH" => KeyCode::KeyH,
        "KeyI" => KeyCode::KeyI,
        "KeyJ" => KeyCode::KeyJ,
        "KeyK" => KeyCode::KeyK,
        "KeyL" => KeyCode::KeyL,
        "KeyM" => KeyCode::KeyM,
        "KeyN" => KeyCode::KeyN,
        "KeyO" => KeyCode::KeyO,
        "KeyP" => KeyCode::KeyP,
        "KeyQ" => KeyCode::KeyQ,
        "KeyR" => KeyCode::KeyR,
        "KeyS" => KeyCode::KeyS,
        "KeyT" => KeyCode::KeyT,
        "KeyU" => KeyCode::KeyU,
        "KeyV" => KeyCode::KeyV,
        "KeyW" => KeyCode::KeyW,
        "KeyX" => KeyCode::KeyX,
        "KeyY" => KeyCode::KeyY,
        "KeyZ" => KeyCode::KeyZ,
        "Space" => KeyCode::Space,
        "Tab" => KeyCode::Tab,
        "Enter" => KeyCode::Enter,
        "Escape" => KeyCode::Escape,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "ShiftRight" => KeyCode::ShiftRight,
        "ControlLeft" => KeyCode::ControlLeft,
        "ControlRight" => KeyCode::ControlRight,
        "AltLeft" => KeyCode::AltLeft,
        "AltRight" => KeyCode::AltRight,
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_covers_every_action_once() {
        let binds = default_keybinds();
        for action in [
            Action::MoveForward,
            Action::MoveBack,
            Action::StrafeLeft,
            Action::StrafeRight,
            Action::Jump,
            Action::Sneak,
            Action::ToggleCapture,
        ] {
            assert_eq!(
                binds.values().filter(|bound| **bound == action).count(),
                1,
                "action {action:?} should be bound exactly once"
            );
        }
    }

    #[test]
    fn profile_resolves_known_key_names() {
        let profile: KeybindProfile =
            serde_json::from_str(r#"{"KeyW": "move_forward", "Space": "jump"}"#)
                .expect("profile parses");

        let binds = profile.resolve().expect("profile resolves");
        assert_eq!(binds.get(&KeyCode::KeyW), Some(&Action::MoveForward));
        assert_eq!(binds.get(&KeyCode::Space), Some(&Action::Jump));
    }

    #[test]
    fn unknown_key_name_is_rejected() {
        let profile: KeybindProfile =
            serde_json::from_str(r#"{"NoSuchKey": "jump"}"#).expect("profile parses");

        let error = profile.resolve().expect_err("unknown key must fail");
        assert!(matches!(
            error,
            KeybindProfileError::UnknownKey { ref name } if name == "NoSuchKey"
        ));
    }

    #[test]
    fn unknown_action_fails_at_parse_time() {
        let result = serde_json::from_str::<KeybindProfile>(r#"{"KeyW": "fly"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_keys_in_document_resolve_last_wins() {
        let profile: KeybindProfile =
            serde_json::from_str(r#"{"KeyW": "move_forward", "KeyW": "jump"}"#)
                .expect("profile parses");

        let binds = profile.resolve().expect("profile resolves");
        assert_eq!(binds.get(&KeyCode::KeyW), Some(&Action::Jump));
    }
}
