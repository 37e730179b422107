/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graceful teardown: beforeunload, unload handlers, and host
//! destruction.
//!
//! Teardown never blocks on the renderer without a deadline. Every
//! renderer round-trip here registers a timer; the embedder pumps
//! expiries through `run_timers` and a lost or hung renderer is
//! indistinguishable from a slow one until its deadline fires.
//!
//! Destruction order is bottom-up: a host with live children stays in
//! `ReadyToBeDeleted` until the last child is destroyed, then the
//! completion check runs again and destroys it.

use std::time::Instant;

use log::warn;

use crate::document_host::OutstandingBeforeUnload;
use crate::host_tree::HostTree;
use crate::ids::DocumentHostId;
use crate::lifecycle::LifecycleState;
use crate::navigation::DiscardReason;
use crate::timers::TimerEvent;

impl HostTree {
    /// Asks the current document whether teardown may proceed. Documents
    /// without a beforeunload handler answer immediately; otherwise one
    /// renderer round-trip is started (or joined, if one is already in
    /// flight) and the answer arrives via the delegate.
    pub fn dispatch_beforeunload(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("beforeunload for unknown host {id}. Ignoring.");
            return;
        };
        if host.is_pending_deletion() {
            warn!("beforeunload for host {id} pending deletion. Ignoring.");
            return;
        }
        if !host.has_before_unload_handler {
            self.delegate.beforeunload_completed(id, true);
            return;
        }
        if host.beforeunload.is_some() {
            // A round-trip is already in flight; this trigger shares its
            // answer.
            return;
        }
        let now = self.now();
        let deadline = now + self.config.beforeunload_timeout;
        let timer = self.timers.schedule(deadline, TimerEvent::BeforeUnloadTimeout(id));
        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        host.beforeunload = Some(OutstandingBeforeUnload {
            started: now,
            pending_replies: 1,
            proceed: true,
            timer: Some(timer),
        });
        self.renderer.dispatch_beforeunload(id);
    }

    /// A beforeunload reply from the renderer. Replies aggregate as AND;
    /// the aggregated decision is reported once all are in.
    pub fn on_beforeunload_reply(&mut self, id: DocumentHostId, proceed: bool) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("beforeunload reply for unknown host {id}. Ignoring.");
            return;
        };
        let Some(outstanding) = host.beforeunload.as_mut() else {
            // The round-trip was already resolved by a commit or a
            // timeout. Benign race.
            warn!("Host {id}: stale beforeunload reply. Ignoring.");
            return;
        };
        outstanding.proceed &= proceed;
        outstanding.pending_replies = outstanding.pending_replies.saturating_sub(1);
        if outstanding.pending_replies == 0 {
            self.complete_beforeunload(id, false);
        }
    }

    fn complete_beforeunload(&mut self, id: DocumentHostId, forced: bool) {
        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        let Some(outstanding) = host.beforeunload.take() else {
            return;
        };
        if let Some(timer) = outstanding.timer {
            self.timers.cancel(timer);
        }
        let proceed = forced || outstanding.proceed;
        self.delegate.beforeunload_completed(id, proceed);
    }

    /// Starts tearing the host (and its whole subtree) down. Unload
    /// dispatch runs top-down; destruction completes bottom-up.
    pub fn start_pending_deletion(&mut self, id: DocumentHostId, reason: DiscardReason) {
        let Some(host) = self.hosts.get_mut(&id) else {
            warn!("Deletion requested for unknown host {id}. Ignoring.");
            return;
        };
        if host.is_pending_deletion() {
            return;
        }
        host.reset_owned_navigation_requests(reason);
        host.loading = None;
        let lifecycle = host.lifecycle;
        let has_unload_handler = host.has_unload_handler;
        let children = host.children.clone();

        // Unload is instructed top-down: this host's renderer hears
        // before any of its children do. Acknowledgement and destruction
        // still complete bottom-up through the completion check.
        match lifecycle {
            // Never hosted a committed document; nothing to unload, no
            // public state to leave. Destroyed directly, below.
            LifecycleState::Speculative => {},
            LifecycleState::PendingCommit => {
                if let Some(host) = self.hosts.get_mut(&id) {
                    host.detach_acked = true;
                }
                self.set_lifecycle_state(id, LifecycleState::ReadyToBeDeleted);
            },
            // Cached documents are frozen; their unload handlers do not
            // run on eviction.
            LifecycleState::InBackForwardCache => {
                if let Some(host) = self.hosts.get_mut(&id) {
                    host.detach_acked = true;
                }
                self.set_lifecycle_state(id, LifecycleState::ReadyToBeDeleted);
            },
            LifecycleState::Active | LifecycleState::Prerendering
                if has_unload_handler && reason != DiscardReason::RenderProcessGone =>
            {
                if let Some(host) = self.hosts.get_mut(&id) {
                    host.detach_acked = false;
                }
                self.set_lifecycle_state(id, LifecycleState::RunningUnloadHandlers);
                self.renderer.dispatch_unload(id);
                let deadline = self.now() + self.config.unload_timeout;
                let timer = self.timers.schedule(deadline, TimerEvent::UnloadTimeout(id));
                if let Some(host) = self.hosts.get_mut(&id) {
                    host.unload_timer = Some(timer);
                }
            },
            LifecycleState::Active | LifecycleState::Prerendering => {
                if let Some(host) = self.hosts.get_mut(&id) {
                    host.detach_acked = true;
                }
                self.set_lifecycle_state(id, LifecycleState::ReadyToBeDeleted);
            },
            LifecycleState::RunningUnloadHandlers | LifecycleState::ReadyToBeDeleted => {},
        }

        for child in children {
            if self.hosts.contains_key(&child) {
                self.start_pending_deletion(child, reason);
            }
        }

        if lifecycle == LifecycleState::Speculative {
            self.destroy_host(id);
        }
    }

    /// The renderer acknowledges that unload handlers finished and the
    /// frame detached.
    pub fn on_unload_ack(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get_mut(&id) else {
            // Destroyed by timeout before the ack arrived. Benign race.
            warn!("Unload ack for unknown host {id}. Ignoring.");
            return;
        };
        match host.lifecycle {
            LifecycleState::RunningUnloadHandlers => {
                host.detach_acked = true;
                if let Some(timer) = host.unload_timer.take() {
                    self.timers.cancel(timer);
                }
                self.set_lifecycle_state(id, LifecycleState::ReadyToBeDeleted);
            },
            LifecycleState::ReadyToBeDeleted => {
                warn!("Host {id}: duplicate unload ack. Ignoring.");
            },
            other => {
                warn!("Host {id}: unload ack in {other:?}. Ignoring.");
            },
        }
    }

    /// Pumps expired deadlines. The embedder calls this from its event
    /// loop; tests call it with a synthetic clock.
    pub fn run_timers(&mut self, now: Instant) {
        for event in self.timers.fired(now) {
            match event {
                TimerEvent::BeforeUnloadTimeout(id) => self.on_beforeunload_timeout(id),
                TimerEvent::UnloadTimeout(id) => self.on_unload_timeout(id),
            }
        }
    }

    fn on_beforeunload_timeout(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        if host.beforeunload.is_none() {
            return;
        }
        if host.modal_dialog_blocking_beforeunload {
            // The renderer is not hung, a dialog is up. The decision
            // stays with the user; clear the expired timer handle.
            if let Some(outstanding) = host.beforeunload.as_mut() {
                outstanding.timer = None;
            }
            return;
        }
        warn!("Host {id}: beforeunload timed out; proceeding");
        self.complete_beforeunload(id, true);
    }

    fn on_unload_timeout(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        if host.lifecycle != LifecycleState::RunningUnloadHandlers {
            return;
        }
        warn!("Host {id}: unload handlers timed out; forcing detach");
        host.detach_acked = true;
        host.unload_timer = None;
        self.set_lifecycle_state(id, LifecycleState::ReadyToBeDeleted);
    }

    /// The completion check: a host is destroyed once it is ready, the
    /// detach is acknowledged (or forced), and no children remain.
    pub(crate) fn maybe_delete(&mut self, id: DocumentHostId) {
        let Some(host) = self.hosts.get(&id) else {
            return;
        };
        if host.lifecycle == LifecycleState::ReadyToBeDeleted &&
            host.detach_acked &&
            host.children.is_empty()
        {
            self.destroy_host(id);
        }
    }

    /// Unconditional destruction. Callers go through `maybe_delete`
    /// unless they are bypassing the lifecycle (speculative discard).
    pub(crate) fn destroy_host(&mut self, id: DocumentHostId) {
        let frame_token = match self.hosts.get(&id) {
            Some(host) => host.frame_token,
            None => return,
        };
        // Registry removal comes first so no observer notified below can
        // resolve this host by token.
        self.registry().remove(&frame_token);
        let Some(mut host) = self.hosts.remove(&id) else {
            return;
        };
        debug_assert!(host.children.is_empty(), "host {id} destroyed with live children");

        if let Some(timer) = host.unload_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(outstanding) = host.beforeunload.take() {
            if let Some(timer) = outstanding.timer {
                self.timers.cancel(timer);
            }
        }
        host.reset_owned_navigation_requests(DiscardReason::WillRemoveFrame);

        if host.lifecycle == LifecycleState::Active {
            self.note_active_host_destroyed(host.site_instance);
        }

        let parent = host.parent;
        if let Some(parent) = parent {
            if let Some(parent) = self.hosts.get_mut(&parent) {
                parent.remove_child(id);
            }
        }

        self.note_host_removed_from_process(host.process);
        self.delegate.host_destroyed(id);

        // The parent may have been waiting on this child.
        if let Some(parent) = parent {
            self.maybe_delete(parent);
        }
    }
}
