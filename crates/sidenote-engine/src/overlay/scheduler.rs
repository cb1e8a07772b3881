/// Host hook for "call me back before the next paint".
///
/// In a browser this wraps `requestAnimationFrame`; a terminal host flips a
/// flag its event loop checks. The host answers by calling
/// `OverlayManager::run_frame` (or `Editor::on_animation_frame`).
pub trait FrameRequester {
    fn request_frame(&mut self);
}

impl<F: FnMut()> FrameRequester for F {
    fn request_frame(&mut self) {
        self()
    }
}

/// Coalesces recalculation requests into at most one per frame.
pub struct FrameScheduler {
    pending: bool,
    requester: Box<dyn FrameRequester>,
}

impl FrameScheduler {
    pub fn new(requester: impl FrameRequester + 'static) -> Self {
        Self {
            pending: false,
            requester: Box::new(requester),
        }
    }

    /// Ask for a frame unless one is already pending.
    ///
    /// Returns true if this call requested a new frame.
    pub fn schedule(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.requester.request_frame();
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending flag.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.pending, false)
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn repeated_requests_collapse_into_one_frame() {
        let frames = Rc::new(Cell::new(0));
        let counter = frames.clone();
        let mut scheduler = FrameScheduler::new(move || counter.set(counter.get() + 1));

        assert!(scheduler.schedule());
        assert!(!scheduler.schedule());
        assert!(!scheduler.schedule());
        assert_eq!(frames.get(), 1);

        assert!(scheduler.take());
        assert!(!scheduler.take());

        assert!(scheduler.schedule());
        assert_eq!(frames.get(), 2);
    }
}
