//! Purpose: Game session state as reported by the host.
//! Exports: `GameState`.
//! Invariants: Every i32 code round-trips through `Unknown`.
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

/// Where the game client is in its session lifecycle.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, FromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[serde(from = "i32", into = "i32")]
#[repr(i32)]
pub enum GameState {
    PreCharacterSelect  = -1,
    CharacterSelect     = 1,
    CharacterCreate     = 2,
    PostCharacterSelect = 3,
    InGame              = 5,
    LoggingIn           = 253,
    Unloading           = 255,

    #[num_enum(catch_all)]
    Unknown(i32),
}

impl GameState {
    pub fn is_in_game(self) -> bool {
        self == GameState::InGame
    }
}

#[cfg(test)]
mod tests {
    use super::GameState;

    #[test]
    fn host_codes_map_to_states() {
        assert_eq!(GameState::from(-1), GameState::PreCharacterSelect);
        assert_eq!(GameState::from(1), GameState::CharacterSelect);
        assert_eq!(GameState::from(5), GameState::InGame);
        assert_eq!(GameState::from(253), GameState::LoggingIn);
        assert_eq!(i32::from(GameState::Unloading), 255);
        assert!(GameState::from(5).is_in_game());
        assert!(!GameState::CharacterCreate.is_in_game());
    }

    #[test]
    fn unlisted_codes_are_kept() {
        assert_eq!(GameState::from(4), GameState::Unknown(4));
        assert_eq!(i32::from(GameState::Unknown(4)), 4);
        assert_eq!(serde_json::to_string(&GameState::InGame).expect("json"), "5");
        let state: GameState = serde_json::from_str("0").expect("json");
        assert_eq!(state, GameState::Unknown(0));
    }
}
