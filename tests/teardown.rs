/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! beforeunload, unload, and host destruction.

mod common;

use std::time::{Duration, Instant};

use common::harness;
use document_host::{DiscardReason, LifecycleState};

#[test]
fn beforeunload_without_handler_completes_immediately() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);

    harness.tree.dispatch_beforeunload(host);
    assert_eq!(
        harness.delegate.borrow().beforeunload_completions,
        vec![(host, true)]
    );
    assert!(harness.renderer.borrow().beforeunload_dispatches.is_empty());
}

#[test]
fn beforeunload_reply_decides_the_outcome() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, true, false);

    harness.tree.dispatch_beforeunload(host);
    assert!(harness.delegate.borrow().beforeunload_completions.is_empty());
    assert_eq!(harness.renderer.borrow().beforeunload_dispatches, vec![host]);

    // A second trigger joins the in-flight round-trip.
    harness.tree.dispatch_beforeunload(host);
    assert_eq!(harness.renderer.borrow().beforeunload_dispatches, vec![host]);

    harness.tree.on_beforeunload_reply(host, false);
    assert_eq!(
        harness.delegate.borrow().beforeunload_completions,
        vec![(host, false)]
    );

    // Replies after completion are a benign race.
    harness.tree.on_beforeunload_reply(host, true);
    assert_eq!(harness.delegate.borrow().beforeunload_completions.len(), 1);
}

#[test]
fn beforeunload_timeout_forces_proceed() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, true, false);

    harness.tree.dispatch_beforeunload(host);
    harness.tree.run_timers(Instant::now() + Duration::from_secs(30));
    assert_eq!(
        harness.delegate.borrow().beforeunload_completions,
        vec![(host, true)]
    );
}

#[test]
fn modal_dialog_suppresses_the_beforeunload_timeout() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, true, false);

    harness.tree.dispatch_beforeunload(host);
    harness.tree.set_modal_dialog_blocking_beforeunload(host, true);
    harness.tree.run_timers(Instant::now() + Duration::from_secs(30));
    // The user still owns the decision.
    assert!(harness.delegate.borrow().beforeunload_completions.is_empty());

    harness.tree.set_modal_dialog_blocking_beforeunload(host, false);
    harness.tree.on_beforeunload_reply(host, false);
    assert_eq!(
        harness.delegate.borrow().beforeunload_completions,
        vec![(host, false)]
    );
}

#[test]
fn host_without_unload_handler_is_destroyed_synchronously() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    let frame_token = harness.tree.host(host).expect("host").frame_token;
    let process = harness.tree.host(host).expect("host").process;

    harness.tree.start_pending_deletion(host, DiscardReason::WillRemoveFrame);
    assert!(harness.tree.host(host).is_none());
    assert_eq!(harness.tree.registry().get(&frame_token), None);
    assert_eq!(harness.delegate.borrow().destroyed, vec![host]);
    assert_eq!(harness.delegate.borrow().empty_processes.len(), 1);
    assert_eq!(harness.delegate.borrow().empty_processes[0].0, process);
}

#[test]
fn unload_handlers_delay_destruction_until_the_ack() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, false, true);

    harness.tree.start_pending_deletion(host, DiscardReason::WillRemoveFrame);
    assert_eq!(
        harness.tree.host(host).expect("host").lifecycle_state(),
        LifecycleState::RunningUnloadHandlers
    );
    assert_eq!(harness.renderer.borrow().unload_dispatches, vec![host]);
    assert!(harness.delegate.borrow().destroyed.is_empty());

    harness.tree.on_unload_ack(host);
    assert!(harness.tree.host(host).is_none());
    assert_eq!(harness.delegate.borrow().destroyed, vec![host]);

    // The ack arriving again after destruction is a benign race.
    harness.tree.on_unload_ack(host);
    assert_eq!(harness.delegate.borrow().destroyed, vec![host]);
}

#[test]
fn unload_timeout_forces_destruction() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, false, true);

    harness.tree.start_pending_deletion(host, DiscardReason::WillRemoveFrame);
    harness.tree.run_timers(Instant::now() + Duration::from_secs(30));
    assert!(harness.tree.host(host).is_none());
    assert_eq!(harness.delegate.borrow().destroyed, vec![host]);
}

#[test]
fn subtree_destruction_completes_bottom_up() {
    let mut harness = harness();
    let parent = harness.create_host(LifecycleState::Active);
    let quick_child = harness.create_child(parent);
    let slow_child = harness.create_child(parent);
    harness.tree.set_unload_handlers(slow_child, false, true);

    harness.tree.start_pending_deletion(parent, DiscardReason::WillRemoveFrame);
    // The parent waits in ReadyToBeDeleted for the child still running
    // its unload handlers.
    assert_eq!(
        harness.tree.host(parent).expect("parent").lifecycle_state(),
        LifecycleState::ReadyToBeDeleted
    );
    assert!(harness.tree.host(quick_child).is_none());
    assert_eq!(
        harness.tree.host(slow_child).expect("child").lifecycle_state(),
        LifecycleState::RunningUnloadHandlers
    );

    harness.tree.on_unload_ack(slow_child);
    assert!(harness.tree.host(slow_child).is_none());
    assert!(harness.tree.host(parent).is_none());
    assert_eq!(
        harness.delegate.borrow().destroyed,
        vec![quick_child, slow_child, parent]
    );
}

#[test]
fn unload_instructions_are_dispatched_top_down() {
    let mut harness = harness();
    let parent = harness.create_host(LifecycleState::Active);
    let child = harness.create_child(parent);
    harness.tree.set_unload_handlers(parent, false, true);
    harness.tree.set_unload_handlers(child, false, true);

    harness.tree.start_pending_deletion(parent, DiscardReason::WillRemoveFrame);
    // The parent's renderer hears first; acknowledgement and destruction
    // still complete bottom-up.
    assert_eq!(harness.renderer.borrow().unload_dispatches, vec![parent, child]);

    harness.tree.on_unload_ack(child);
    assert!(harness.tree.host(child).is_none());
    assert!(harness.tree.host(parent).is_some());
    harness.tree.on_unload_ack(parent);
    assert!(harness.tree.host(parent).is_none());
    assert_eq!(harness.delegate.borrow().destroyed, vec![child, parent]);
}

#[test]
fn crashed_process_skips_unload_handlers() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    harness.tree.set_unload_handlers(host, false, true);

    // No renderer left to run handlers in.
    harness.tree.start_pending_deletion(host, DiscardReason::RenderProcessGone);
    assert!(harness.tree.host(host).is_none());
    assert!(harness.renderer.borrow().unload_dispatches.is_empty());
}

#[test]
fn speculative_hosts_are_discarded_without_public_notification() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Speculative);
    let frame_token = harness.tree.host(host).expect("host").frame_token;

    harness.tree.start_pending_deletion(host, DiscardReason::InternalCancellation);
    assert!(harness.tree.host(host).is_none());
    assert_eq!(harness.tree.registry().get(&frame_token), None);
    assert!(harness.delegate.borrow().lifecycle_changes.is_empty());
    assert_eq!(harness.delegate.borrow().destroyed, vec![host]);
}

#[test]
fn cached_documents_are_evicted_without_running_unload_handlers() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    assert!(harness.commit_navigation(host, "http://a.test/"));
    harness.tree.set_unload_handlers(host, false, true);
    harness.tree.enter_back_forward_cache(host);

    harness.tree.start_pending_deletion(host, DiscardReason::InternalCancellation);
    assert!(harness.tree.host(host).is_none());
    assert!(harness.renderer.borrow().unload_dispatches.is_empty());
}

#[test]
fn pending_navigations_are_discarded_before_teardown() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    let (navigation, params) = harness.start_navigation(host, "http://a.test/");
    harness.tree.set_unload_handlers(host, false, true);

    harness.tree.start_pending_deletion(host, DiscardReason::WillRemoveFrame);
    // The late commit report finds no owner and the host is mid-teardown.
    assert!(!harness.tree.did_commit_navigation(host, navigation, params));
    assert!(harness.delegate.borrow().navigations.is_empty());
}

#[test]
fn process_shutdown_is_suggested_only_for_the_last_host() {
    let mut harness = harness();
    let first = harness.create_host(LifecycleState::Active);
    let process = harness.tree.host(first).expect("host").process;
    let second = {
        let mut init = document_host::HostInit::new(process, LifecycleState::Active);
        init.site_instance = harness.tree.host(first).expect("host").site_instance;
        harness.tree.create_host(init)
    };

    harness.tree.start_pending_deletion(first, DiscardReason::WillRemoveFrame);
    assert!(harness.delegate.borrow().empty_processes.is_empty());

    harness.tree.start_pending_deletion(second, DiscardReason::WillRemoveFrame);
    assert_eq!(harness.delegate.borrow().empty_processes.len(), 1);
    assert_eq!(harness.delegate.borrow().empty_processes[0].0, process);
}

#[test]
fn resetting_navigations_stops_loading() {
    let mut harness = harness();
    let host = harness.create_host(LifecycleState::Active);
    let _ = harness.start_navigation(host, "http://a.test/");
    assert!(harness.tree.host(host).expect("host").is_loading());

    harness
        .tree
        .reset_owned_navigation_requests(host, DiscardReason::InternalCancellation);
    assert!(!harness.tree.host(host).expect("host").is_loading());
    assert_eq!(harness.delegate.borrow().stopped_loading, vec![host]);
}
