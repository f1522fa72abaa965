// Unit tests for the recovery table and clear chord constants

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn stale_is_recoverable_for_every_action() {
    let table = RecoveryTable::new();
    for action in ActionKind::ALL {
        assert_eq!(
            table.lookup(ErrorKind::Stale, action),
            Some(RecoveryStrategy::Reattach),
            "missing recovery entry for {action}"
        );
    }
}

#[test]
fn unmapped_pairs_have_no_entry() {
    let table = RecoveryTable::new();
    for action in ActionKind::ALL {
        assert_eq!(table.lookup(ErrorKind::NotFound, action), None);
        assert_eq!(table.lookup(ErrorKind::Timeout, action), None);
        assert_eq!(table.lookup(ErrorKind::Other, action), None);
    }
}

#[test]
fn table_holds_exactly_one_entry_per_supported_pair() {
    // HashMap keys already guarantee uniqueness; this pins the total so a
    // new action kind cannot land without a recovery decision.
    let table = RecoveryTable::new();
    assert_eq!(table.len(), ActionKind::ALL.len());
    assert!(!table.is_empty());
}

#[test]
fn action_kind_names() {
    assert_eq!(ActionKind::SendKeys.to_string(), "send-keys");
    assert_eq!(ActionKind::GetAttribute.to_string(), "get-attribute");
    assert_eq!(ActionKind::FindChildren.to_string(), "find-children");
    assert_eq!(ActionKind::Move.to_string(), "move");
}

#[test]
fn recovery_runs_at_most_once() {
    use std::cell::Cell;

    let attempts = Cell::new(0u32);
    let recoveries = Cell::new(0u32);

    // Every attempt fails stale; after the single recovered retry fails,
    // the envelope must give up rather than recover again.
    let result: Result<(), String> = tokio_test::block_on(retry_once(
        |_fresh: Option<u32>| {
            attempts.set(attempts.get() + 1);
            async { Err("stale element reference".to_string()) }
        },
        |err: &String| ErrorKind::from_message(err),
        |kind| {
            recoveries.set(recoveries.get() + 1);
            async move {
                match kind {
                    ErrorKind::Stale => Some(7u32),
                    _ => None,
                }
            }
        },
    ));

    assert!(result.is_err());
    assert_eq!(attempts.get(), 2, "original attempt plus exactly one retry");
    assert_eq!(recoveries.get(), 1);
}

#[test]
fn recovered_retry_returns_its_own_result() {
    use std::cell::Cell;

    let attempts = Cell::new(0u32);

    let result: Result<u32, String> = tokio_test::block_on(retry_once(
        |fresh: Option<u32>| {
            attempts.set(attempts.get() + 1);
            async move {
                match fresh {
                    Some(n) => Ok(n),
                    None => Err("stale element reference".to_string()),
                }
            }
        },
        |err: &String| ErrorKind::from_message(err),
        |_kind| async { Some(42u32) },
    ));

    assert_eq!(result, Ok(42));
    assert_eq!(attempts.get(), 2);
}

#[test]
fn unrecoverable_failures_propagate_after_one_attempt() {
    use std::cell::Cell;

    let attempts = Cell::new(0u32);

    let result: Result<(), String> = tokio_test::block_on(retry_once(
        |_fresh: Option<u32>| {
            attempts.set(attempts.get() + 1);
            async { Err("invalid session id".to_string()) }
        },
        |err: &String| ErrorKind::from_message(err),
        |kind| async move {
            match kind {
                ErrorKind::Stale => Some(1u32),
                _ => None,
            }
        },
    ));

    // The original error comes back untouched and no retry ever ran.
    assert_eq!(result, Err("invalid session id".to_string()));
    assert_eq!(attempts.get(), 1);
}

#[test]
fn chord_selects_all_then_deletes_then_releases() {
    let chord = select_all_delete_chord();
    let chars: Vec<char> = chord.chars().collect();
    assert_eq!(chars, vec!['\u{e009}', 'a', '\u{e017}', '\u{e000}']);
}
