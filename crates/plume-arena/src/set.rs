//! The three long-lived scoped arenas.

use std::fmt;

use tracing::debug;

use crate::arena::Arena;
use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// Lifetime scope of an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArenaScope {
    /// Lives for the whole game session.
    Game,
    /// Rolled back when a chapter is discarded.
    Chapter,
    /// Rolled back on every room change.
    Room,
}

impl ArenaScope {
    /// All scopes, longest-lived first.
    pub const ALL: [Self; 3] = [Self::Game, Self::Chapter, Self::Room];

    /// Lower-case scope name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Chapter => "chapter",
            Self::Room => "room",
        }
    }
}

impl fmt::Display for ArenaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Game, chapter and room arenas opened together from one [`ArenaConfig`].
///
/// Whoever holds the set governs all three scopes and is the only party that
/// may roll them back.
#[derive(Debug)]
pub struct ArenaSet {
    game: Arena,
    chapter: Arena,
    room: Arena,
}

impl ArenaSet {
    /// Open all three arenas. Nothing is kept if any of them fails.
    pub fn open(config: &ArenaConfig) -> Result<Self, ArenaError> {
        let game = Arena::open(config.game_capacity, config.placement)?;
        let chapter = Arena::open(config.chapter_capacity, config.placement)?;
        let room = Arena::open(config.room_capacity, config.placement)?;
        debug!(
            game = %game.id(),
            chapter = %chapter.id(),
            room = %room.id(),
            "scoped arenas opened"
        );
        Ok(Self {
            game,
            chapter,
            room,
        })
    }

    /// The arena for `scope`.
    pub fn get(&self, scope: ArenaScope) -> &Arena {
        match scope {
            ArenaScope::Game => &self.game,
            ArenaScope::Chapter => &self.chapter,
            ArenaScope::Room => &self.room,
        }
    }

    /// Mutable access to the arena for `scope`.
    pub fn get_mut(&mut self, scope: ArenaScope) -> &mut Arena {
        match scope {
            ArenaScope::Game => &mut self.game,
            ArenaScope::Chapter => &mut self.chapter,
            ArenaScope::Room => &mut self.room,
        }
    }

    /// Roll back one scope.
    ///
    /// Rolling back the chapter also rolls back the room, since room assets
    /// never outlive the chapter that loaded them.
    ///
    /// Asset state held outside the arenas is not touched. Callers that
    /// load through a `plume_asset::Catalog` must follow up with
    /// `Catalog::forget_arena` for every arena rolled back here, or the
    /// pixels decoded for images in those arenas stay allocated until the
    /// next load of the same asset.
    pub fn rollback(&mut self, scope: ArenaScope) {
        match scope {
            ArenaScope::Game => self.game.rollback(),
            ArenaScope::Chapter => {
                self.room.rollback();
                self.chapter.rollback();
            }
            ArenaScope::Room => self.room.rollback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ArenaConfig {
        ArenaConfig {
            game_capacity: 64,
            chapter_capacity: 128,
            room_capacity: 256,
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn scopes_get_their_configured_capacity() {
        let set = ArenaSet::open(&small_config()).unwrap();
        for scope in ArenaScope::ALL {
            assert_eq!(set.get(scope).size(), small_config().capacity(scope));
        }
    }

    #[test]
    fn room_rollback_leaves_chapter_alone() {
        let mut set = ArenaSet::open(&small_config()).unwrap();
        set.get_mut(ArenaScope::Chapter).allocate(8, false).unwrap();
        set.get_mut(ArenaScope::Room).allocate(8, false).unwrap();
        set.rollback(ArenaScope::Room);
        assert_eq!(set.get(ArenaScope::Room).used(), 0);
        assert_eq!(set.get(ArenaScope::Chapter).used(), 8);
    }

    #[test]
    fn chapter_rollback_clears_room_too() {
        let mut set = ArenaSet::open(&small_config()).unwrap();
        set.get_mut(ArenaScope::Game).allocate(4, false).unwrap();
        set.get_mut(ArenaScope::Chapter).allocate(8, false).unwrap();
        set.get_mut(ArenaScope::Room).allocate(8, false).unwrap();
        set.rollback(ArenaScope::Chapter);
        assert_eq!(set.get(ArenaScope::Chapter).used(), 0);
        assert_eq!(set.get(ArenaScope::Room).used(), 0);
        assert_eq!(set.get(ArenaScope::Game).used(), 4);
    }

    #[test]
    fn arenas_have_distinct_ids() {
        let set = ArenaSet::open(&small_config()).unwrap();
        assert_ne!(set.get(ArenaScope::Game).id(), set.get(ArenaScope::Room).id());
    }
}
