// ==============================================================================
// player.rs — HUMAN DRIVER
// ------------------------------------------------------------------------------
// The input collaborator hands over the set of held control identifiers once
// per tick. Every intent is a plain membership test against this vehicle's
// own bindings, so two players can share one keyboard.
// ==============================================================================

use std::collections::HashSet;

use serde::Deserialize;

use super::Intents;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub accelerate: String,
    pub brake: String,
    pub steer_left: String,
    pub steer_right: String,
    pub reset: Option<String>, // teleport to course center while held
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            accelerate: "W".into(),
            brake: "Space".into(),
            steer_left: "A".into(),
            steer_right: "D".into(),
            reset: Some("R".into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerControl {
    bindings: KeyBindings,
    held: HashSet<String>,
}

impl PlayerControl {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Replaces the held set wholesale.
    pub fn set_held<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.held = keys.into_iter().map(Into::into).collect();
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn intents(&self) -> Intents {
        Intents {
            accelerate: self.is_held(&self.bindings.accelerate),
            brake: self.is_held(&self.bindings.brake),
            turn_left: self.is_held(&self.bindings.steer_left),
            turn_right: self.is_held(&self.bindings.steer_right),
        }
    }

    pub fn wants_reset(&self) -> bool {
        self.bindings.reset.as_deref().is_some_and(|k| self.is_held(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_follow_held_keys() {
        let mut p = PlayerControl::new(KeyBindings::default());
        assert_eq!(p.intents(), Intents::default());

        p.set_held(["W", "D"]);
        let i = p.intents();
        assert!(i.accelerate && i.turn_right);
        assert!(!i.brake && !i.turn_left);

        p.set_held(["Space", "A", "R"]);
        let i = p.intents();
        assert!(i.brake && i.turn_left && !i.accelerate);
        assert!(p.wants_reset());
    }

    #[test]
    fn bindings_are_per_vehicle() {
        let arrows = KeyBindings {
            accelerate: "Up".into(),
            brake: "Down".into(),
            steer_left: "Left".into(),
            steer_right: "Right".into(),
            reset: None,
        };
        let mut p = PlayerControl::new(arrows);
        p.set_held(["W", "A", "R"]);
        assert_eq!(p.intents(), Intents::default());
        assert!(!p.wants_reset());

        p.set_held(["Up"]);
        assert!(p.intents().accelerate);
    }
}
