use serde::{Deserialize, Serialize};

use crate::protocol::{GameState, Task};
use crate::rotation_store::KeyValueStore;
use crate::timer::ParticipantId;

/// What a player screen needs to come back to after a reload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SlaveSnapshot {
    pub current_task: Option<Task>,
    pub game_state: GameState,
    #[serde(default)]
    pub task_solved: bool,
    #[serde(default)]
    pub timestamp: f64,
}

pub fn storage_key(slave_id: ParticipantId) -> String {
    format!("slave_{}_state", slave_id)
}

pub fn save<S: KeyValueStore + ?Sized>(store: &mut S, slave_id: ParticipantId, task: Option<&Task>, solved: bool, now_ms: f64) {
    let snapshot = SlaveSnapshot {
        current_task: task.cloned(),
        game_state: GameState::Active,
        task_solved: solved,
        timestamp: now_ms,
    };
    match serde_json::to_string(&snapshot) {
        Ok(json) => store.set(&storage_key(slave_id), &json, None),
        Err(e) => log::error!("could not encode slave state: {}", e),
    }
}

/// Returns the saved snapshot only if it describes a round still in play.
pub fn load<S: KeyValueStore + ?Sized>(store: &S, slave_id: ParticipantId) -> Option<SlaveSnapshot> {
    let raw = store.get(&storage_key(slave_id))?;
    let snapshot: SlaveSnapshot = match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("discarding unreadable slave state: {}", e);
            return None;
        }
    };
    if snapshot.game_state == GameState::Active && snapshot.current_task.is_some() {
        Some(snapshot)
    } else {
        None
    }
}

pub fn clear<S: KeyValueStore + ?Sized>(store: &mut S, slave_id: ParticipantId) {
    store.remove(&storage_key(slave_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation_store::MemoryStore;

    fn task() -> Task {
        Task {
            name: "Reverse me".to_string(),
            category: "rev".to_string(),
            kind: "Dynamic".to_string(),
            link: "http://tasks.local/rev".to_string(),
            secret: Some("flag".to_string()),
        }
    }

    #[test]
    fn saved_round_is_restored() {
        let mut store = MemoryStore::new();
        save(&mut store, 2, Some(&task()), true, 1_000.0);
        let restored = load(&store, 2).unwrap();
        assert_eq!(restored.current_task, Some(task()));
        assert!(restored.task_solved);
        assert_eq!(load(&store, 1), None);
    }

    #[test]
    fn finished_or_empty_rounds_are_not_restored() {
        let mut store = MemoryStore::new();
        store.set(
            &storage_key(1),
            r#"{"current_task":{"name":"x"},"game_state":"completed","task_solved":false}"#,
            None,
        );
        assert_eq!(load(&store, 1), None);

        save(&mut store, 1, None, false, 0.0);
        assert_eq!(load(&store, 1), None);
    }

    #[test]
    fn corrupt_state_is_ignored_and_clear_removes_it() {
        let mut store = MemoryStore::new();
        store.set(&storage_key(1), "{oops", None);
        assert_eq!(load(&store, 1), None);
        clear(&mut store, 1);
        assert!(store.get(&storage_key(1)).is_none());
    }
}
