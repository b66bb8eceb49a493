/// Coalesces flush requests into at most one pending frame.
///
/// The engine calls [`FrameScheduler::request`] every time a reconciliation is queued; only the
/// first call after a flush returns `true`, which is the adapter's cue to ask the host for a
/// rendering frame. Later calls fold into that same frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameScheduler {
    scheduled: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this call scheduled a new frame.
    pub fn request(&mut self) -> bool {
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Consumes the scheduled frame. Returns `false` if nothing was scheduled.
    pub fn begin(&mut self) -> bool {
        core::mem::replace(&mut self.scheduled, false)
    }

    pub fn cancel(&mut self) {
        self.scheduled = false;
    }
}
