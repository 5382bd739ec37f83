//! Edit Coordinator Integration Tests
//!
//! Concurrent sessions racing for the single edit slot

use std::{
    sync::{Arc, Barrier},
    thread,
};

use tool_call_bridge::tool_parser::{EditCoordinator, FencedStreamParser, StreamSession};

mod common;
use common::{apply_pending_edit, fenced_block, tool_names};

#[test]
fn test_concurrent_sessions_emit_exactly_one_edit() {
    let coordinator = Arc::new(EditCoordinator::new());
    let sessions = 8;
    let barrier = Arc::new(Barrier::new(sessions));

    let handles: Vec<_> = (0..sessions)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut session = StreamSession::new(FencedStreamParser::new(coordinator));
                let path = format!("f{}.rs", i);
                let block =
                    fenced_block("edit_file", &[("filepath", path.as_str()), ("changes", "x")]);
                barrier.wait();
                let mut deltas: Vec<_> = session.push(&block).into_iter().collect();
                deltas.extend(session.finish());
                tool_names(&deltas).len()
            })
        })
        .collect();

    let emitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(emitted, 1);
    assert!(coordinator.is_in_flight());
    assert_eq!(coordinator.pending_len(), 1);
}

#[test]
fn test_edits_drain_one_at_a_time() {
    let coordinator = Arc::new(EditCoordinator::new());
    let mut sessions: Vec<StreamSession> = (0..3)
        .map(|_| StreamSession::new(FencedStreamParser::new(Arc::clone(&coordinator))))
        .collect();
    for (i, session) in sessions.iter_mut().enumerate() {
        let changes = format!("edit {}", i);
        session.push(&fenced_block(
            "edit_file",
            &[("filepath", "shared.rs"), ("changes", changes.as_str())],
        ));
    }

    let mut applied = vec![apply_pending_edit(&coordinator).unwrap()];
    loop {
        let emitted: usize = sessions
            .iter_mut()
            .map(|session| tool_names(&session.flush()).len())
            .sum();
        if emitted == 0 {
            break;
        }
        assert_eq!(emitted, 1);
        applied.push(apply_pending_edit(&coordinator).unwrap());
    }

    applied.sort();
    assert_eq!(applied, vec!["edit 0", "edit 1", "edit 2"]);
    assert!(!coordinator.is_in_flight());
}

#[test]
fn test_global_coordinator_is_shared() {
    let a = EditCoordinator::global();
    let b = EditCoordinator::global();
    assert!(Arc::ptr_eq(&a, &b));
}
