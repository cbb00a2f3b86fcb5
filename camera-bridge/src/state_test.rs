use crate::state::{StateStore, Status, StrategyState};
use crate::strategy::CATALOG;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"))
    }

    #[test]
    fn missing_file_loads_as_fresh_state() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(CATALOG.len()), StrategyState::default());
    }

    #[test]
    fn corrupt_file_loads_as_fresh_state() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"{not json").unwrap();
        assert_eq!(store.load(CATALOG.len()), StrategyState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let state = StrategyState {
            index: 4,
            status: Status::Connected,
        };
        store.save(&state);
        assert_eq!(store.load(CATALOG.len()), state);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&StrategyState::default());
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["state.json"]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            br#"{"index": 2, "status": "pending", "last_error": "whatever"}"#,
        )
        .unwrap();
        assert_eq!(
            store.load(CATALOG.len()),
            StrategyState {
                index: 2,
                status: Status::Pending,
            }
        );
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"{}").unwrap();
        assert_eq!(store.load(CATALOG.len()), StrategyState::default());

        fs::write(store.path(), br#"{"index": 3}"#).unwrap();
        assert_eq!(
            store.load(CATALOG.len()),
            StrategyState {
                index: 3,
                status: Status::New,
            }
        );
    }

    #[test]
    fn out_of_range_index_wraps_on_load() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), br#"{"index": 23, "status": "pending"}"#).unwrap();
        let loaded = store.load(CATALOG.len());
        assert_eq!(loaded.index, 23 % CATALOG.len());
        assert_eq!(loaded.status, Status::Pending);
    }

    #[test]
    fn advance_moves_only_pending_states() {
        let pending = StrategyState {
            index: 1,
            status: Status::Pending,
        };
        assert_eq!(pending.advance(CATALOG.len()).index, 2);

        let fresh = StrategyState {
            index: 1,
            status: Status::New,
        };
        assert_eq!(fresh.advance(CATALOG.len()), fresh);

        let connected = StrategyState {
            index: 1,
            status: Status::Connected,
        };
        assert_eq!(connected.advance(CATALOG.len()), connected);
    }

    #[test]
    fn advance_wraps_at_end_of_catalog() {
        let last = StrategyState {
            index: CATALOG.len() - 1,
            status: Status::Pending,
        };
        assert_eq!(last.advance(CATALOG.len()).index, 0);
    }
}
