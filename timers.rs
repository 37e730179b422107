/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A deadline queue for renderer-cooperation timeouts.
//!
//! Every asynchronous coordination point that depends on the renderer
//! (beforeunload, unload acknowledgement) registers a deadline here. The
//! embedder pumps the queue with `fired`, on the same sequence as
//! everything else; there is no timer thread. Cancelled and superseded
//! entries are dropped by handle, so a stale fire is impossible to
//! observe.

use std::time::Instant;

use crate::ids::DocumentHostId;

/// A renderer-cooperation deadline elapsing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerEvent {
    BeforeUnloadTimeout(DocumentHostId),
    UnloadTimeout(DocumentHostId),
}

/// Identifies one scheduled deadline, for cancellation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimerHandle(u64);

struct Scheduled {
    deadline: Instant,
    handle: TimerHandle,
    event: TimerEvent,
}

/// The queue of pending deadlines, owned by the host tree.
#[derive(Default)]
pub struct TimerScheduler {
    scheduled: Vec<Scheduled>,
    next_handle: u64,
}

impl TimerScheduler {
    pub fn new() -> TimerScheduler {
        TimerScheduler {
            scheduled: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Instant, event: TimerEvent) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.scheduled.push(Scheduled {
            deadline,
            handle,
            event,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) {
        self.scheduled.retain(|entry| entry.handle != handle);
    }

    /// Removes and returns every deadline at or before `now`, earliest
    /// first.
    pub fn fired(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut due: Vec<usize> = (0..self.scheduled.len())
            .filter(|&index| self.scheduled[index].deadline <= now)
            .collect();
        due.sort_by_key(|&index| self.scheduled[index].deadline);
        let events: Vec<TimerEvent> = due
            .iter()
            .map(|&index| self.scheduled[index].event)
            .collect();
        self.scheduled.retain(|entry| entry.deadline > now);
        events
    }

    /// The earliest pending deadline, for embedders that sleep between
    /// pumps.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|entry| entry.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}
