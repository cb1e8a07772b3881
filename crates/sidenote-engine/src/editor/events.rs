use crate::text::Span;

/// Handle returned by [`EventEmitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of handlers for one event type.
///
/// Every subscriber is called, in subscription order. Subscribing never
/// replaces an earlier handler.
pub struct EventEmitter<E> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Non-empty selection inside the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedText {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChanged {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub selection: Option<SelectedText>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightClicked {
    pub highlight_id: String,
}

/// The text under a highlight no longer matches its stored quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightUpdated {
    pub highlight_id: String,
    pub new_exact: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_subscriber_runs_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = EventEmitter::<u32>::new();

        let first = log.clone();
        emitter.subscribe(move |n| first.borrow_mut().push(format!("first {n}")));
        let second = log.clone();
        emitter.subscribe(move |n| second.borrow_mut().push(format!("second {n}")));

        emitter.emit(&7);

        assert_eq!(*log.borrow(), vec!["first 7", "second 7"]);
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let hits = Rc::new(RefCell::new(0));
        let mut emitter = EventEmitter::<()>::new();
        let counter = hits.clone();
        let id = emitter.subscribe(move |_| *counter.borrow_mut() += 1);

        emitter.emit(&());
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        emitter.emit(&());

        assert_eq!(*hits.borrow(), 1);
        assert!(emitter.is_empty());
    }
}
