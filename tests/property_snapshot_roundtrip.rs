use proptest::prelude::*;
use watchpost::adapters::storage::JsonFileSessionStore;
use watchpost::domain::models::{LogLevel, SessionState};
use watchpost::domain::ports::session_store::{decode_snapshot, encode_snapshot};
use watchpost::domain::ports::{LoadedSnapshot, SessionStore};

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Info),
        Just(LogLevel::Success),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

fn state_strategy() -> impl Strategy<Value = SessionState> {
    (
        (any::<u64>(), 0i64..=i64::MAX, any::<u64>()),
        (0.0f64..=100.0, 0.0f64..=100.0, 0.0f64..=100.0),
        prop::collection::vec(("\\PC{0,40}", level_strategy()), 0..60),
    )
        .prop_map(
            |((uptime, last_active, processed), (precision, coverage, lock), entries)| {
                let mut state = SessionState {
                    uptime_seconds: uptime,
                    last_active_timestamp: last_active,
                    total_processed: processed,
                    precision_rate: precision,
                    coverage_index: coverage,
                    lock_strength: lock,
                    ..Default::default()
                };
                for (message, level) in entries {
                    state.event_log.append(message, level);
                }
                state
            },
        )
}

proptest! {
    /// Property: decoding an encoded snapshot restores the state exactly
    #[test]
    fn prop_codec_round_trip_is_exact(state in state_strategy()) {
        let document = encode_snapshot(&state).unwrap();
        prop_assert_eq!(decode_snapshot(&document), LoadedSnapshot::Decoded(state));
    }

    /// Property: a saved snapshot loads back unchanged from disk
    #[test]
    fn prop_file_store_round_trip_is_exact(state in state_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("session.json"));

        store.save(&state).unwrap();
        prop_assert_eq!(store.load().unwrap(), LoadedSnapshot::Decoded(state));
    }

    /// Property: gauges never move backwards across a save and reload
    #[test]
    fn prop_reload_keeps_gauges_monotonic(
        precision in 0.0f64..=100.0,
        coverage in 0.0f64..=100.0,
        lock in 0.0f64..=100.0,
    ) {
        let state = SessionState {
            precision_rate: precision,
            coverage_index: coverage,
            lock_strength: lock,
            ..Default::default()
        };
        let LoadedSnapshot::Decoded(reloaded) =
            decode_snapshot(&encode_snapshot(&state).unwrap())
        else {
            return Err(TestCaseError::fail("snapshot should decode"));
        };
        prop_assert!(reloaded.precision_rate >= precision);
        prop_assert!(reloaded.coverage_index >= coverage);
        prop_assert!(reloaded.lock_strength >= lock);
    }
}
