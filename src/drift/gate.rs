//! Readiness gate and history buffer.
//!
//! The gate is the single owner of the calls accepted before the widget signaled readiness.
//! It flips from [`ReadinessState::NotReady`] to [`ReadinessState::Ready`] exactly once; the
//! transition takes the buffer, starts dispatching every buffered call in arrival order and
//! only then lets post-readiness calls through. An async mutex is held while the flush starts,
//! so a live call arriving mid-flush queues behind it instead of interleaving. Identifies
//! waiting on a signed token do not hold it.

use std::sync::Mutex;

use futures::FutureExt;

use crate::drift::dispatcher::CallDispatcher;
use crate::drift::error::DriftResult;
use crate::drift::types::{AnalyticsPayload, CallKind, PendingCall};
use crate::platform::runtime::spawn_detached;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessState {
    NotReady,
    Ready,
}

/// Outcome of [`ReadinessGate::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Deferred until readiness; nothing reached the widget yet.
    Buffered,
    Dispatched,
}

/// Summary of the single flush performed by the readiness transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub dispatched: usize,
    pub failed: usize,
    /// Identifies started but still waiting on a signed token.
    pub deferred: usize,
}

struct GateState {
    readiness: ReadinessState,
    buffer: Vec<PendingCall>,
    next_sequence: u64,
}

impl GateState {
    fn enqueue(&mut self, payload: AnalyticsPayload) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.buffer.push(PendingCall { sequence, payload });
        sequence
    }
}

pub struct ReadinessGate {
    state: Mutex<GateState>,
    dispatch_lock: async_lock::Mutex<()>,
    settled_tx: async_channel::Sender<()>,
    settled_rx: async_channel::Receiver<()>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (settled_tx, settled_rx) = async_channel::bounded(1);
        Self {
            state: Mutex::new(GateState {
                readiness: ReadinessState::NotReady,
                buffer: Vec::new(),
                next_sequence: 0,
            }),
            dispatch_lock: async_lock::Mutex::new(()),
            settled_tx,
            settled_rx,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state.lock().unwrap().readiness
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// Calls still waiting for readiness, in arrival order.
    pub fn pending(&self) -> Vec<PendingCall> {
        self.state.lock().unwrap().buffer.clone()
    }

    /// Buffers `payload` while not ready, otherwise dispatches it once any in-progress flush has
    /// handed its calls to the widget. Errors from a live dispatch propagate to the caller.
    pub async fn submit(&self, payload: AnalyticsPayload, dispatcher: &CallDispatcher) -> DriftResult<Submission> {
        {
            let mut state = self.state.lock().unwrap();
            if state.readiness == ReadinessState::NotReady {
                let sequence = state.enqueue(payload);
                log::debug!(
                    "buffered call #{sequence} until the Drift widget is ready ({} pending)",
                    state.buffer.len()
                );
                return Ok(Submission::Buffered);
            }
        }

        // Waits out a flush that is still starting; not held across the dispatch.
        drop(self.dispatch_lock.lock().await);
        dispatcher.dispatch(&payload).await?;
        Ok(Submission::Dispatched)
    }

    /// Removes every buffered identify call and returns the most recent one, so it can be
    /// dispatched ahead of the widget load. Earlier identifies are superseded and dropped.
    /// Returns `None` once ready or when nothing was identified.
    pub fn supersede_identity(&self) -> Option<PendingCall> {
        let mut state = self.state.lock().unwrap();
        if state.readiness == ReadinessState::Ready {
            return None;
        }
        let latest = state
            .buffer
            .iter()
            .rposition(|call| call.kind() == CallKind::Identify)?;
        let latest = state.buffer.remove(latest);
        let before = state.buffer.len();
        state.buffer.retain(|call| call.kind() != CallKind::Identify);
        let superseded = before - state.buffer.len();
        if superseded > 0 {
            log::debug!("dropped {superseded} superseded identify call(s) before widget load");
        }
        Some(latest)
    }

    /// Performs the readiness transition. The first invocation starts every buffered dispatch in
    /// arrival order, runs `after_flush` (relay subscription) and then releases queued live
    /// calls. Identifies still waiting on a signed token finish in the background. Later
    /// invocations are no-ops returning `None`.
    pub async fn mark_ready<F>(&self, dispatcher: &CallDispatcher, after_flush: F) -> Option<FlushReport>
    where
        F: FnOnce(),
    {
        let _serial = self.dispatch_lock.lock().await;
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if state.readiness == ReadinessState::Ready {
                return None;
            }
            state.readiness = ReadinessState::Ready;
            std::mem::take(&mut state.buffer)
        };

        let report = flush(snapshot, dispatcher);
        log::debug!(
            "flushed buffered calls on readiness: {} dispatched, {} failed, {} awaiting a token",
            report.dispatched,
            report.failed,
            report.deferred
        );
        after_flush();
        self.settled_tx.close();
        Some(report)
    }

    /// Resolves once the readiness transition ran and the buffered calls were handed to the
    /// widget.
    pub async fn wait_until_ready(&self) {
        // The channel never carries values; closing it is the signal.
        let _ = self.settled_rx.recv().await;
    }
}

/// Starts every buffered dispatch in arrival order. Calls that need no token land immediately,
/// in exact submission order; an identify waiting on its token keeps running detached. A
/// failing call is logged and dropped without affecting the others.
fn flush(snapshot: Vec<PendingCall>, dispatcher: &CallDispatcher) -> FlushReport {
    let mut report = FlushReport::default();
    for call in snapshot {
        let kind = call.kind();
        let sequence = call.sequence;
        let mut dispatch = Box::pin(dispatch_owned(dispatcher.clone(), call.payload));
        match dispatch.as_mut().now_or_never() {
            Some(Ok(())) => report.dispatched += 1,
            Some(Err(err)) => {
                log::error!("dropping buffered {kind} call #{sequence}: {err}");
                report.failed += 1;
            }
            None => {
                report.deferred += 1;
                spawn_detached(async move {
                    if let Err(err) = dispatch.await {
                        log::error!("dropping buffered {kind} call #{sequence}: {err}");
                    }
                });
            }
        }
    }
    report
}

async fn dispatch_owned(dispatcher: CallDispatcher, payload: AnalyticsPayload) -> DriftResult<()> {
    dispatcher.dispatch(&payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::drift::config::IdentityMode;
    use crate::drift::error::DriftErrorCode;
    use crate::drift::identity::IdentityResolver;
    use crate::drift::resolver::IdentityTokenResolver;
    use crate::drift::types::Properties;
    use crate::drift::widget::IdentifyOptions;
    use crate::test_support::drift::{
        props, FailingResolver, GatedResolver, RecordingHost, RecordingWidget, WidgetCall,
    };

    fn dispatcher_with(
        mode: IdentityMode,
        resolver: Option<Arc<dyn IdentityTokenResolver>>,
    ) -> (CallDispatcher, Arc<RecordingWidget>) {
        let widget = RecordingWidget::new();
        let host = RecordingHost::with_widget(widget.clone());
        (
            CallDispatcher::new(host, IdentityResolver::new(mode, resolver)),
            widget,
        )
    }

    fn track(name: &str, x: i64) -> AnalyticsPayload {
        AnalyticsPayload::track(name, props(&[("x", x)]))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn buffered_calls_flush_in_submission_order_exactly_once() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::UserAttributes, None);

        assert_eq!(gate.submit(track("A", 1), &dispatcher).await.unwrap(), Submission::Buffered);
        assert_eq!(gate.submit(track("B", 2), &dispatcher).await.unwrap(), Submission::Buffered);
        assert!(widget.calls().is_empty());
        assert_eq!(gate.pending().len(), 2);

        let report = gate.mark_ready(&dispatcher, || {}).await.unwrap();
        assert_eq!(
            report,
            FlushReport {
                dispatched: 2,
                failed: 0,
                deferred: 0
            }
        );
        assert_eq!(
            widget.calls(),
            vec![
                WidgetCall::Track("A".into(), props(&[("x", 1)])),
                WidgetCall::Track("B".into(), props(&[("x", 2)])),
            ]
        );
        assert!(gate.pending().is_empty());
        assert_eq!(gate.state(), ReadinessState::Ready);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn second_transition_is_a_no_op() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::UserAttributes, None);
        gate.submit(track("A", 1), &dispatcher).await.unwrap();

        let mut hooks = 0;
        assert!(gate.mark_ready(&dispatcher, || hooks += 1).await.is_some());
        assert!(gate.mark_ready(&dispatcher, || hooks += 1).await.is_none());
        assert_eq!(hooks, 1);
        assert_eq!(widget.tracked_events(), vec!["A".to_string()]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_buffer_flush_touches_nothing() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::UserAttributes, None);
        let report = gate.mark_ready(&dispatcher, || {}).await.unwrap();
        assert_eq!(report, FlushReport::default());
        assert!(widget.calls().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_replay_does_not_abort_the_flush() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::Signed, None);
        gate.submit(track("A", 1), &dispatcher).await.unwrap();
        gate.submit(AnalyticsPayload::identify("u1", Properties::new()), &dispatcher)
            .await
            .unwrap();
        gate.submit(track("B", 2), &dispatcher).await.unwrap();

        let report = gate.mark_ready(&dispatcher, || {}).await.unwrap();
        assert_eq!(
            report,
            FlushReport {
                dispatched: 2,
                failed: 1,
                deferred: 0
            }
        );
        assert_eq!(widget.tracked_events(), vec!["A".to_string(), "B".to_string()]);
        assert!(widget.identified_users().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejected_token_drops_only_that_identify() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::Signed, Some(Arc::new(FailingResolver)));
        gate.submit(track("A", 1), &dispatcher).await.unwrap();
        gate.submit(AnalyticsPayload::identify("u1", Properties::new()), &dispatcher)
            .await
            .unwrap();
        gate.submit(track("B", 2), &dispatcher).await.unwrap();

        let report = gate.mark_ready(&dispatcher, || {}).await.unwrap();
        assert_eq!(
            report,
            FlushReport {
                dispatched: 2,
                failed: 1,
                deferred: 0
            }
        );
        assert_eq!(
            widget.calls(),
            vec![
                WidgetCall::Track("A".into(), props(&[("x", 1)])),
                WidgetCall::Track("B".into(), props(&[("x", 2)])),
            ]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn live_call_failures_propagate() {
        let gate = ReadinessGate::new();
        let (dispatcher, _widget) = dispatcher_with(IdentityMode::Signed, None);
        gate.mark_ready(&dispatcher, || {}).await.unwrap();

        let err = gate
            .submit(AnalyticsPayload::identify("u1", Properties::new()), &dispatcher)
            .await
            .unwrap_err();
        assert_eq!(err.code, DriftErrorCode::MissingResolver);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn live_calls_dispatch_immediately_after_readiness() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::UserAttributes, None);
        gate.mark_ready(&dispatcher, || {}).await.unwrap();
        assert_eq!(gate.submit(track("C", 3), &dispatcher).await.unwrap(), Submission::Dispatched);
        assert_eq!(widget.tracked_events(), vec!["C".to_string()]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_resolver_only_delays_its_own_identify() {
        let gate = ReadinessGate::new();
        let resolver = GatedResolver::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::Signed, Some(Arc::new(resolver.clone())));
        gate.submit(track("A", 1), &dispatcher).await.unwrap();
        gate.submit(AnalyticsPayload::identify("u1", Properties::new()), &dispatcher)
            .await
            .unwrap();
        gate.submit(track("B", 2), &dispatcher).await.unwrap();

        let report = gate.mark_ready(&dispatcher, || {}).await;
        assert_eq!(
            report,
            Some(FlushReport {
                dispatched: 2,
                failed: 0,
                deferred: 1
            })
        );
        assert_eq!(widget.tracked_events(), vec!["A".to_string(), "B".to_string()]);
        assert!(widget.identified_users().is_empty());

        resolver.release("token");
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            widget.calls().last(),
            Some(&WidgetCall::Identify(
                "u1".into(),
                Properties::new(),
                Some(IdentifyOptions::signed("token"))
            ))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unanswered_token_does_not_block_relay_or_live_calls() {
        let gate = ReadinessGate::new();
        let resolver = GatedResolver::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::Signed, Some(Arc::new(resolver.clone())));
        gate.submit(AnalyticsPayload::identify("u1", Properties::new()), &dispatcher)
            .await
            .unwrap();

        let mut relay_started = false;
        let report = tokio::time::timeout(
            Duration::from_millis(300),
            gate.mark_ready(&dispatcher, || relay_started = true),
        )
        .await
        .expect("flush never waits on the token");
        assert_eq!(report.map(|report| report.deferred), Some(1));
        assert!(relay_started);

        let live = tokio::time::timeout(Duration::from_millis(300), gate.submit(track("C", 3), &dispatcher))
            .await
            .expect("live call never waits on the token");
        assert_eq!(live.unwrap(), Submission::Dispatched);
        assert_eq!(widget.calls(), vec![WidgetCall::Track("C".into(), props(&[("x", 3)]))]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn live_call_during_flush_waits_for_the_flush() {
        let gate = ReadinessGate::new();
        let (dispatcher, widget) = dispatcher_with(IdentityMode::UserAttributes, None);

        // Held the way a flush holds it right after flipping the state.
        let guard = gate.dispatch_lock.lock().await;
        gate.state.lock().unwrap().readiness = ReadinessState::Ready;
        let (live, ()) = tokio::join!(gate.submit(track("C", 3), &dispatcher), async {
            tokio::task::yield_now().await;
            assert!(widget.calls().is_empty());
            drop(guard);
        });
        assert_eq!(live.unwrap(), Submission::Dispatched);
        assert_eq!(widget.tracked_events(), vec!["C".to_string()]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn supersession_keeps_latest_identify_and_drops_the_rest() {
        let gate = ReadinessGate::new();
        let (dispatcher, _widget) = dispatcher_with(IdentityMode::Identify, None);
        gate.submit(AnalyticsPayload::identify("u1", props(&[("a", 1)])), &dispatcher)
            .await
            .unwrap();
        gate.submit(track("A", 1), &dispatcher).await.unwrap();
        gate.submit(AnalyticsPayload::identify("u2", props(&[("a", 2)])), &dispatcher)
            .await
            .unwrap();

        let latest = gate.supersede_identity().unwrap();
        assert_eq!(latest.payload, AnalyticsPayload::identify("u2", props(&[("a", 2)])));
        assert_eq!(latest.sequence, 2);
        let pending = gate.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind(), CallKind::Track);
        assert!(gate.supersede_identity().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn wait_until_ready_resolves_after_transition() {
        let gate = ReadinessGate::new();
        let (dispatcher, _widget) = dispatcher_with(IdentityMode::UserAttributes, None);
        tokio::join!(gate.wait_until_ready(), async {
            gate.mark_ready(&dispatcher, || {}).await;
        });
        gate.wait_until_ready().await;
        assert!(gate.is_ready());
    }
}
