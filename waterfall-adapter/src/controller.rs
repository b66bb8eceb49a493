use alloc::boxed::Box;

use waterfall::{
    Completion, FlushReport, IngestOutcome, LayoutKey, LayoutOptions, LoadError, LoadOptions,
    LoadOrchestrator, LoadRequest, LoadTicket, Measure, ViewportProbe, Waterfall,
};

use crate::{ContentTracker, Dispatch, LoadHandler, WatchKey};

/// Configuration for [`Controller`].
#[derive(Clone, Debug)]
pub struct ControllerOptions {
    pub layout: LayoutOptions,
    pub load: LoadOptions,
    /// Per-unit timeout after which unresolved content counts as resolved.
    pub content_timeout_ms: u64,
    /// Quiet period before a reported resize is applied.
    pub resize_debounce_ms: u64,
}

impl ControllerOptions {
    pub fn new() -> Self {
        Self {
            layout: LayoutOptions::new(),
            load: LoadOptions::new(),
            content_timeout_ms: 5_000,
            resize_debounce_ms: 150,
        }
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_load(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    pub fn with_content_timeout_ms(mut self, content_timeout_ms: u64) -> Self {
        self.content_timeout_ms = content_timeout_ms;
        self
    }

    pub fn with_resize_debounce_ms(mut self, resize_debounce_ms: u64) -> Self {
        self.resize_debounce_ms = resize_debounce_ms;
        self
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened during one [`Controller::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// A debounced resize was applied and re-laid out the grid.
    pub relayout: bool,
    /// Items whose content timed out and were queued for reconciliation.
    pub resolved: usize,
    /// A load request that was handed to the handler.
    pub request: Option<LoadRequest>,
    /// A batch flush is pending; the host should call `on_frame` on its next frame.
    pub needs_frame: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingResize {
    width: u32,
    due_ms: u64,
}

/// A framework-neutral controller that owns a [`Waterfall`] engine and a [`LoadOrchestrator`].
///
/// This type holds no UI objects. Hosts drive it by calling:
/// - `initialize` / `teardown` when the component is attached / detached
/// - `on_resize`, `on_items_changed`, `watch_content` / `on_content_unit_settled`,
///   `on_sentinel_visibility` when UI events occur
/// - `tick(now_ms, ..)` on every timer tick and `on_frame(..)` on every rendering frame
///
/// Load requests go to the configured [`LoadHandler`]; without one, every request is answered
/// as if the data source were exhausted.
pub struct Controller<K> {
    engine: Waterfall<K>,
    loader: LoadOrchestrator,
    content: ContentTracker<K>,
    handler: Option<Box<dyn LoadHandler>>,
    resize_debounce_ms: u64,
    pending_resize: Option<PendingResize>,
    initialized: bool,
}

impl<K: LayoutKey + WatchKey> Controller<K> {
    pub fn new(options: ControllerOptions) -> Self {
        Self {
            engine: Waterfall::new(options.layout),
            loader: LoadOrchestrator::new(options.load),
            content: ContentTracker::new(options.content_timeout_ms),
            handler: None,
            resize_debounce_ms: options.resize_debounce_ms,
            pending_resize: None,
            initialized: false,
        }
    }

    pub fn with_handler(mut self, handler: impl LoadHandler + 'static) -> Self {
        self.set_handler(handler);
        self
    }

    pub fn set_handler(&mut self, handler: impl LoadHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    pub fn engine(&self) -> &Waterfall<K> {
        &self.engine
    }

    pub fn orchestrator(&self) -> &LoadOrchestrator {
        &self.loader
    }

    pub fn content(&self) -> &ContentTracker<K> {
        &self.content
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a load request is outstanding (hosts show their loading indicator meanwhile).
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn has_more(&self) -> bool {
        self.loader.has_more()
    }

    /// The component was attached and measured. Returns `true` if items were laid out.
    pub fn initialize(
        &mut self,
        width: u32,
        now_ms: u64,
        measure: impl FnMut(&K) -> Measure,
    ) -> bool {
        wdebug!(width, now_ms, "Controller::initialize");
        self.initialized = true;
        self.loader.arm(now_ms);
        self.engine.set_container_width(width, measure)
    }

    /// The component was detached. Pending corrections, timers and the in-flight request are
    /// dropped; a late completion for that request is rejected.
    pub fn teardown(&mut self) {
        wdebug!(
            pending = self.engine.pending_len(),
            watched = self.content.len(),
            "Controller::teardown"
        );
        self.loader.teardown();
        self.engine.cancel_pending();
        self.content.clear();
        self.pending_resize = None;
        self.initialized = false;
    }

    /// Applies a configuration change. Returns `true` if a relayout ran.
    pub fn on_config_changed(
        &mut self,
        f: impl FnOnce(&mut LayoutOptions),
        measure: impl FnMut(&K) -> Measure,
    ) -> bool {
        self.engine.update_options(f, measure)
    }

    /// Records a resize; it is applied by `tick` once `resize_debounce_ms` passed without
    /// another one.
    pub fn on_resize(&mut self, width: u32, now_ms: u64) {
        if !self.initialized {
            return;
        }
        self.pending_resize = Some(PendingResize {
            width,
            due_ms: now_ms.saturating_add(self.resize_debounce_ms),
        });
    }

    /// The host's item list changed (items are only ever appended between clears).
    ///
    /// Ignored while detached; pass the full list again after `initialize`.
    pub fn on_items_changed(
        &mut self,
        keys: &[K],
        measure: impl FnMut(&K) -> Measure,
    ) -> IngestOutcome {
        if !self.initialized {
            return IngestOutcome::Unchanged;
        }
        self.engine.ingest(keys, measure)
    }

    /// Starts tracking `units` pieces of still-loading content of an item.
    pub fn watch_content(&mut self, key: K, units: usize, now_ms: u64) -> bool {
        if !self.initialized {
            return false;
        }
        self.content.watch(key, units, now_ms)
    }

    /// One content unit of an item finished loading (or failed to).
    ///
    /// Returns `true` when this resolved the item and scheduled a new flush frame.
    pub fn on_content_unit_settled(&mut self, key: &K) -> bool {
        if !self.initialized || !self.content.unit_settled(key) {
            return false;
        }
        self.engine.on_content_resolved(key)
    }

    /// The item's content resolved as a whole (bypasses unit tracking).
    pub fn on_content_resolved(&mut self, key: &K) -> bool {
        if !self.initialized {
            wdebug!("content event after teardown ignored");
            return false;
        }
        self.content.forget(key);
        self.engine.on_content_resolved(key)
    }

    /// The sentinel's visibility changed. Returns the request handed to the handler, if any.
    pub fn on_sentinel_visibility(&mut self, visible: bool, now_ms: u64) -> Option<LoadRequest> {
        if !visible || !self.initialized {
            return None;
        }
        let request = self.loader.on_sentinel_visible(now_ms, self.engine.len())?;
        self.dispatch(request, now_ms)
    }

    /// Advances timers: debounced resize, content timeouts and scheduled sentinel checks.
    pub fn tick(
        &mut self,
        now_ms: u64,
        probe: ViewportProbe,
        mut measure: impl FnMut(&K) -> Measure,
    ) -> Tick {
        if !self.initialized {
            return Tick::default();
        }
        let mut tick = Tick::default();

        if let Some(resize) = self.pending_resize {
            if now_ms >= resize.due_ms {
                self.pending_resize = None;
                tick.relayout = self.engine.set_container_width(resize.width, &mut measure);
            }
        }

        let engine = &mut self.engine;
        tick.resolved = self.content.expire(now_ms, |key| {
            engine.on_content_resolved(&key);
        });

        if let Some(request) = self.loader.poll(now_ms, probe, self.engine.len()) {
            tick.request = self.dispatch(request, now_ms);
        }

        tick.needs_frame = self.engine.is_flush_scheduled();
        wtrace!(
            now_ms,
            relayout = tick.relayout,
            resolved = tick.resolved,
            needs_frame = tick.needs_frame,
            "tick"
        );
        tick
    }

    /// Runs the scheduled batch flush, if any. Call once per rendering frame.
    pub fn on_frame(&mut self, measure: impl FnMut(&K) -> Measure) -> FlushReport {
        if !self.initialized {
            return FlushReport::default();
        }
        self.engine.flush(measure)
    }

    pub fn relayout(&mut self, measure: impl FnMut(&K) -> Measure) -> bool {
        if !self.initialized {
            return false;
        }
        self.engine.relayout(measure)
    }

    /// Removes every item and returns to `Idle(has_more = true)` with the sentinel re-armed.
    ///
    /// Does nothing while detached, so a torn-down controller keeps rejecting old tickets.
    pub fn clear(&mut self, now_ms: u64) {
        if !self.initialized {
            return;
        }
        self.engine.clear();
        self.content.clear();
        self.loader.reset(now_ms);
    }

    /// Answers a load request. Call after the new items were passed to `on_items_changed`.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        has_more: bool,
        now_ms: u64,
    ) -> Result<Completion, LoadError> {
        self.loader
            .complete(ticket, has_more, now_ms, self.engine.len())
    }

    /// Ticketless completion, kept for hosts written against the older callback.
    pub fn finish_loading(&mut self, has_more: bool, now_ms: u64) -> Option<Completion> {
        self.loader
            .finish_loading(has_more, now_ms, self.engine.len())
    }

    /// The earliest time `tick` has work to do, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.loader.next_deadline(),
            self.content.next_deadline(),
            self.pending_resize.map(|r| r.due_ms),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn dispatch(&mut self, request: LoadRequest, now_ms: u64) -> Option<LoadRequest> {
        let outcome = match self.handler.as_mut() {
            Some(handler) => handler.load_more(request),
            None => Dispatch::Unhandled,
        };
        match outcome {
            Dispatch::Accepted => Some(request),
            Dispatch::Unhandled => {
                wdebug!(
                    ticket = request.ticket.0,
                    "no load handler took the request, treating source as exhausted"
                );
                let _ = self
                    .loader
                    .complete(request.ticket, false, now_ms, self.engine.len());
                None
            }
        }
    }
}

impl<K: core::fmt::Debug> core::fmt::Debug for Controller<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("engine", &self.engine)
            .field("loader", &self.loader)
            .field("content", &self.content)
            .field("has_handler", &self.handler.is_some())
            .field("pending_resize", &self.pending_resize)
            .field("initialized", &self.initialized)
            .finish()
    }
}
