/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Property tests for the state machine and the inheritance rules.

mod common;

use std::time::{Duration, Instant};

use common::url;
use document_host::{
    LifecycleState, NavigationId, NavigationRequest, PageActivation, TimerEvent, TimerScheduler,
    calculate_http_status_code, calculate_method, calculate_post_id,
};
use http::Method;
use proptest::prelude::*;

const ALL_STATES: [LifecycleState; 7] = [
    LifecycleState::Speculative,
    LifecycleState::PendingCommit,
    LifecycleState::Prerendering,
    LifecycleState::Active,
    LifecycleState::InBackForwardCache,
    LifecycleState::RunningUnloadHandlers,
    LifecycleState::ReadyToBeDeleted,
];

fn any_state() -> impl Strategy<Value = LifecycleState> {
    prop::sample::select(ALL_STATES.as_slice())
}

fn any_method() -> impl Strategy<Value = Method> {
    prop::sample::select(vec![Method::GET, Method::POST, Method::PUT, Method::HEAD])
}

proptest! {
    /// Teardown is final: nothing is reachable from ReadyToBeDeleted, and
    /// unload handlers only lead to deletion.
    #[test]
    fn teardown_states_are_terminal(state in any_state()) {
        prop_assert!(!LifecycleState::ReadyToBeDeleted.can_transition_to(state));
        if LifecycleState::RunningUnloadHandlers.can_transition_to(state) {
            prop_assert_eq!(state, LifecycleState::ReadyToBeDeleted);
        }
    }

    /// Speculative is an origin state: no state can re-enter it, and no
    /// state transitions to itself.
    #[test]
    fn speculative_is_unreachable(state in any_state()) {
        prop_assert!(!state.can_transition_to(LifecycleState::Speculative));
        prop_assert!(!state.can_transition_to(state));
    }

    /// Only documents that exist can be frozen or torn down gracefully.
    #[test]
    fn uncommitted_states_never_reach_document_states(state in any_state()) {
        for from in [LifecycleState::Speculative, LifecycleState::PendingCommit] {
            if from.can_transition_to(state) {
                prop_assert!(
                    state.has_committed_document() ||
                        state == LifecycleState::ReadyToBeDeleted ||
                        state == LifecycleState::PendingCommit
                );
                prop_assert_ne!(state, LifecycleState::InBackForwardCache);
                prop_assert_ne!(state, LifecycleState::RunningUnloadHandlers);
            }
        }
    }

    /// Same-document navigations never change the method unless the
    /// history API forces GET; cross-document commits always take the
    /// request's method.
    #[test]
    fn method_inheritance(
        prior in any_method(),
        requested in any_method(),
        is_same_document in any::<bool>(),
        is_history_api in any::<bool>(),
    ) {
        let mut request = NavigationRequest::new(NavigationId::new(), url("http://a.test/"));
        request.is_same_document = is_same_document;
        request.is_history_api = is_history_api;
        request.method = requested.clone();
        let method = calculate_method(&request, &prior);
        if !is_same_document {
            prop_assert_eq!(method, requested);
        } else if is_history_api {
            prop_assert_eq!(method, Method::GET);
        } else {
            prop_assert_eq!(method, prior);
        }
    }

    /// POST ids only survive on POST commits and same-document
    /// navigations.
    #[test]
    fn post_id_inheritance(
        prior in prop::option::of(any::<i64>()),
        requested in prop::option::of(any::<i64>()),
        method in any_method(),
        is_same_document in any::<bool>(),
    ) {
        let mut request = NavigationRequest::new(NavigationId::new(), url("http://a.test/"));
        request.is_same_document = is_same_document;
        request.method = method.clone();
        request.post_id = requested;
        let post_id = calculate_post_id(&request, prior);
        if is_same_document {
            prop_assert_eq!(post_id, prior);
        } else if method == Method::POST {
            prop_assert_eq!(post_id, requested);
        } else {
            prop_assert_eq!(post_id, None);
        }
    }

    /// Activations and same-document navigations keep the prior status;
    /// page-cache restores always report 200.
    #[test]
    fn status_code_inheritance(
        prior in any::<u16>(),
        response in prop::option::of(any::<u16>()),
        is_same_document in any::<bool>(),
        is_activation in any::<bool>(),
        from_page_cache in any::<bool>(),
    ) {
        let mut request = NavigationRequest::new(NavigationId::new(), url("http://a.test/"));
        request.is_same_document = is_same_document;
        request.activation = is_activation.then_some(PageActivation::BackForwardCacheRestore);
        request.served_from_page_cache = from_page_cache;
        request.response_status = response;
        let status = calculate_http_status_code(&request, prior);
        if is_same_document || is_activation {
            prop_assert_eq!(status, prior);
        } else if from_page_cache {
            prop_assert_eq!(status, 200);
        } else {
            prop_assert_eq!(status, response.unwrap_or(0));
        }
    }

    /// Timer events fire in deadline order regardless of scheduling
    /// order, and cancelled handles never fire.
    #[test]
    fn timers_fire_in_deadline_order(
        offsets in prop::collection::vec(0u64..10_000, 1..20),
        cancel_index in any::<prop::sample::Index>(),
    ) {
        let base = Instant::now();
        let mut scheduler = TimerScheduler::new();
        let mut handles = Vec::new();
        for (index, offset) in offsets.iter().enumerate() {
            let host = document_host::DocumentHostId::new();
            let event = if index % 2 == 0 {
                TimerEvent::UnloadTimeout(host)
            } else {
                TimerEvent::BeforeUnloadTimeout(host)
            };
            handles.push((
                scheduler.schedule(base + Duration::from_millis(*offset), event),
                *offset,
            ));
        }
        let (cancelled, _) = handles[cancel_index.index(handles.len())];
        scheduler.cancel(cancelled);

        let fired = scheduler.fired(base + Duration::from_secs(11));
        prop_assert_eq!(fired.len(), offsets.len() - 1);
        prop_assert!(scheduler.is_empty());
    }
}
