use crate::{LoadError, LoadOptions};

/// Coarse state of the [`LoadOrchestrator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadPhase {
    Idle,
    Loading,
    /// The data source reported that nothing more exists. Terminal until a reset.
    Exhausted,
}

/// Raw bookkeeping behind [`LoadPhase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadState {
    pub loading: bool,
    pub has_more: bool,
    pub last_request_ms: Option<u64>,
    pub last_completed_ms: Option<u64>,
    /// Item count observed at the last request or completion.
    pub last_known_item_count: usize,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            loading: false,
            has_more: true,
            last_request_ms: None,
            last_completed_ms: None,
            last_known_item_count: 0,
        }
    }
}

/// Identifies one outbound load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadTicket(pub u64);

/// An outbound request for more items.
///
/// The receiver must answer it exactly once via [`LoadOrchestrator::complete`] (or the adapter's
/// equivalent) after appending the new items. A request that is never answered leaves the
/// orchestrator in [`LoadPhase::Loading`] for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    /// Number of items known when the request was issued.
    pub current_count: usize,
}

/// Outcome of a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Completion {
    Idle {
        /// Whether the batch actually added items.
        grew: bool,
        /// When the follow-up sentinel check is due (only scheduled after growth).
        follow_up_at: Option<u64>,
    },
    Exhausted,
}

/// Geometry the host reports when the orchestrator re-checks the sentinel on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportProbe {
    pub viewport_height: u32,
    /// Sentinel top relative to the viewport's top edge (negative when scrolled past).
    pub sentinel_offset: i64,
    pub content_height: u64,
}

impl ViewportProbe {
    /// Whether the sentinel lies within `margin` past the viewport's trailing edge.
    pub fn sentinel_within(&self, margin: u32) -> bool {
        self.sentinel_offset < self.viewport_height as i64 + margin as i64
    }

    /// Whether content is shorter than `ratio_percent`% of the viewport height.
    pub fn is_underfilled(&self, ratio_percent: u32) -> bool {
        (self.content_height as u128) * 100 < self.viewport_height as u128 * ratio_percent as u128
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CheckKind {
    /// First check after initialization; only loads into an empty grid.
    Initial,
    /// First check after a reset.
    Rearm,
    /// Check after a completion that grew the item count.
    Settle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingCheck {
    due_ms: u64,
    kind: CheckKind,
}

/// Decides when to ask the data source for more items.
///
/// At most one request is in flight. Visibility-triggered requests are suppressed within
/// `debounce_ms` of the previous request or completion. After a completion that grew the item
/// count, one follow-up check (see [`LoadOrchestrator::poll`]) tops up an underfilled viewport
/// without waiting for another visibility event. A completion without growth never re-requests
/// on its own.
#[derive(Clone, Debug)]
pub struct LoadOrchestrator {
    options: LoadOptions,
    state: LoadState,
    in_flight: Option<LoadRequest>,
    next_ticket: u64,
    sentinel_attached: bool,
    check: Option<PendingCheck>,
    torn_down: bool,
}

impl LoadOrchestrator {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            state: LoadState::default(),
            in_flight: None,
            next_ticket: 0,
            sentinel_attached: true,
            check: None,
            torn_down: false,
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: LoadOptions) {
        self.options = options;
    }

    pub fn phase(&self) -> LoadPhase {
        if self.state.loading {
            LoadPhase::Loading
        } else if !self.state.has_more {
            LoadPhase::Exhausted
        } else {
            LoadPhase::Idle
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn in_flight(&self) -> Option<LoadRequest> {
        self.in_flight
    }

    pub fn is_sentinel_attached(&self) -> bool {
        self.sentinel_attached
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// When the next scheduled check is due, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.check.map(|c| c.due_ms)
    }

    /// Schedules the one-shot visibility check that follows initialization.
    ///
    /// Arming a torn-down orchestrator brings it back to a fresh `Idle` state; tickets issued
    /// before the teardown stay invalid.
    pub fn arm(&mut self, now_ms: u64) {
        if self.torn_down {
            self.state = LoadState::default();
            self.sentinel_attached = true;
            self.torn_down = false;
        }
        self.schedule(now_ms, self.options.initial_check_delay_ms, CheckKind::Initial);
    }

    /// The sentinel entered the trigger margin.
    pub fn on_sentinel_visible(&mut self, now_ms: u64, item_count: usize) -> Option<LoadRequest> {
        if self.torn_down || !self.sentinel_attached {
            return None;
        }
        if !self.can_request() {
            return None;
        }
        if self.in_cooldown(now_ms) {
            wdebug!(now_ms, "load request suppressed by debounce");
            return None;
        }
        Some(self.start_request(now_ms, item_count))
    }

    /// Runs a due follow-up check. `item_count` is the current number of items.
    pub fn poll(
        &mut self,
        now_ms: u64,
        probe: ViewportProbe,
        item_count: usize,
    ) -> Option<LoadRequest> {
        if self.torn_down {
            return None;
        }
        let check = self.check?;
        if now_ms < check.due_ms {
            return None;
        }
        self.check = None;
        if !self.sentinel_attached || !self.can_request() {
            return None;
        }

        let visible = probe.sentinel_within(self.options.trigger_margin);
        let wanted = match check.kind {
            CheckKind::Initial => visible && item_count == 0,
            CheckKind::Rearm => visible,
            CheckKind::Settle => {
                visible || probe.is_underfilled(self.options.fill_ratio_percent)
            }
        };
        if !wanted || self.in_cooldown(now_ms) {
            return None;
        }
        Some(self.start_request(now_ms, item_count))
    }

    /// Answers a request. `item_count` is the number of items after the new batch was appended.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        has_more: bool,
        now_ms: u64,
        item_count: usize,
    ) -> Result<Completion, LoadError> {
        if self.torn_down {
            return Err(LoadError::TornDown);
        }
        let Some(request) = self.in_flight else {
            return Err(LoadError::NotLoading);
        };
        if request.ticket != ticket {
            wwarn!(ticket = ticket.0, current = request.ticket.0, "stale completion");
            return Err(LoadError::StaleTicket {
                ticket,
                current: request.ticket,
            });
        }
        Ok(self.finish(has_more, now_ms, item_count))
    }

    /// Backward-compatible completion without a ticket.
    ///
    /// Completes the in-flight request. Returns `None` and changes nothing when no request is in
    /// flight (including after teardown), so an `Exhausted` state is only left through `reset`.
    pub fn finish_loading(
        &mut self,
        has_more: bool,
        now_ms: u64,
        item_count: usize,
    ) -> Option<Completion> {
        if self.torn_down {
            return None;
        }
        if self.in_flight.is_none() {
            wwarn!(has_more, "finish_loading without a request in flight ignored");
            return None;
        }
        Some(self.finish(has_more, now_ms, item_count))
    }

    /// Back to `Idle(has_more = true)`: forgets the in-flight request, re-attaches the sentinel
    /// and schedules a single visibility re-check.
    pub fn reset(&mut self, now_ms: u64) {
        wdebug!(now_ms, "LoadOrchestrator::reset");
        self.state = LoadState::default();
        self.in_flight = None;
        self.sentinel_attached = true;
        self.torn_down = false;
        self.schedule(now_ms, self.options.initial_check_delay_ms, CheckKind::Rearm);
    }

    /// Cancels everything. Completions for earlier tickets are rejected afterwards.
    pub fn teardown(&mut self) {
        wdebug!("LoadOrchestrator::teardown");
        self.torn_down = true;
        self.in_flight = None;
        self.state.loading = false;
        self.check = None;
        self.sentinel_attached = false;
    }

    fn can_request(&self) -> bool {
        !self.state.loading && self.state.has_more
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        let debounce = self.options.debounce_ms;
        let recent = |t: Option<u64>| t.is_some_and(|t| now_ms.saturating_sub(t) < debounce);
        recent(self.state.last_request_ms) || recent(self.state.last_completed_ms)
    }

    fn start_request(&mut self, now_ms: u64, item_count: usize) -> LoadRequest {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let request = LoadRequest {
            ticket,
            current_count: item_count,
        };
        self.in_flight = Some(request);
        self.check = None;
        self.state.loading = true;
        self.state.last_request_ms = Some(now_ms);
        self.state.last_known_item_count = item_count;
        wdebug!(ticket = ticket.0, current_count = item_count, now_ms, "load request");
        request
    }

    fn finish(&mut self, has_more: bool, now_ms: u64, item_count: usize) -> Completion {
        let baseline = self
            .in_flight
            .take()
            .map_or(self.state.last_known_item_count, |r| r.current_count);
        let grew = item_count > baseline;

        self.state.loading = false;
        self.state.has_more = has_more;
        self.state.last_completed_ms = Some(now_ms);
        self.state.last_known_item_count = item_count;

        if !has_more {
            self.sentinel_attached = false;
            self.check = None;
            wdebug!(item_count, "load exhausted");
            return Completion::Exhausted;
        }

        if !grew {
            wwarn!(item_count, "completion reported more items but none arrived");
            self.check = None;
            return Completion::Idle {
                grew: false,
                follow_up_at: None,
            };
        }

        let delay = self.options.settle_delay_ms.max(self.options.debounce_ms);
        self.schedule(now_ms, delay, CheckKind::Settle);
        Completion::Idle {
            grew: true,
            follow_up_at: self.next_deadline(),
        }
    }

    fn schedule(&mut self, now_ms: u64, delay_ms: u64, kind: CheckKind) {
        self.check = Some(PendingCheck {
            due_ms: now_ms.saturating_add(delay_ms),
            kind,
        });
    }
}

impl Default for LoadOrchestrator {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}
