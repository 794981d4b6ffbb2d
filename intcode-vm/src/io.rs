//! # I/O Bridge
//!
//! Decouples the machine from where its values come from and go to.
//!
//! Input is a FIFO queue the caller fills before or between runs, backed by
//! an optional provider consulted only when the queue is empty. Output goes
//! to a single registered sink; without one, values collect in an outbox the
//! caller drains.

use crate::program::Word;
use std::collections::VecDeque;
use std::fmt;

/// Receives every produced value, in order
pub type OutputSink = Box<dyn FnMut(Word) + Send>;

/// Produces one value on demand; `None` means nothing is available
pub type InputProvider = Box<dyn FnMut() -> Option<Word> + Send>;

/// Input queue, output routing and the last produced value
#[derive(Default)]
pub struct IoBridge {
    input: VecDeque<Word>,
    outbox: VecDeque<Word>,
    provider: Option<InputProvider>,
    sink: Option<OutputSink>,
    last_output: Option<Word>,
}

impl IoBridge {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Append one value to the input queue
    pub fn push_input(&mut self, value: Word) {
        self.input.push_back(value);
    }

    /// Append values to the input queue, in order
    pub fn extend_input(&mut self, values: impl IntoIterator<Item = Word>) {
        self.input.extend(values);
    }

    /// Values queued but not yet consumed
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Queued input, oldest first
    pub fn queued_input(&self) -> impl Iterator<Item = &Word> {
        self.input.iter()
    }

    /// Take the next queued value without consulting the provider
    pub fn pop_input(&mut self) -> Option<Word> {
        self.input.pop_front()
    }

    /// Ask the provider for a value, if one is registered
    pub fn provide(&mut self) -> Option<Word> {
        self.provider.as_mut().and_then(|provider| provider())
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Record `value` as the last output and route it to the sink or outbox
    pub fn emit(&mut self, value: Word) {
        self.last_output = Some(value);
        match self.sink.as_mut() {
            Some(sink) => sink(value),
            None => self.outbox.push_back(value),
        }
    }

    /// The most recently produced value
    pub fn last_output(&self) -> Option<Word> {
        self.last_output
    }

    /// Pop the oldest buffered output
    pub fn take_output(&mut self) -> Option<Word> {
        self.outbox.pop_front()
    }

    /// Take every buffered output, oldest first
    pub fn drain_output(&mut self) -> Vec<Word> {
        self.outbox.drain(..).collect()
    }

    /// Number of buffered outputs
    pub fn buffered_output(&self) -> usize {
        self.outbox.len()
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Replace the output sink
    pub fn set_sink(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    /// Replace the input provider
    pub fn set_provider(&mut self, provider: InputProvider) {
        self.provider = Some(provider);
    }

    /// Drop both callbacks
    pub fn clear_callbacks(&mut self) {
        self.sink = None;
        self.provider = None;
    }

    /// Whether an input provider is registered
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Clear queues and the last output; callbacks stay registered
    pub fn reset(&mut self) {
        self.input.clear();
        self.outbox.clear();
        self.last_output = None;
    }
}

impl fmt::Debug for IoBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoBridge")
            .field("input", &self.input)
            .field("outbox", &self.outbox)
            .field("provider", &self.provider.is_some())
            .field("sink", &self.sink.is_some())
            .field("last_output", &self.last_output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_input_fifo() {
        let mut io = IoBridge::new();
        io.push_input(1);
        io.extend_input([2, 3]);
        assert_eq!(io.pending_input(), 3);
        assert_eq!(io.pop_input(), Some(1));
        assert_eq!(io.pop_input(), Some(2));
        assert_eq!(io.pop_input(), Some(3));
        assert_eq!(io.pop_input(), None);
    }

    #[test]
    fn test_provider() {
        let mut io = IoBridge::new();
        assert_eq!(io.provide(), None);

        let mut next = 10;
        io.set_provider(Box::new(move || {
            next += 1;
            Some(next)
        }));
        assert!(io.has_provider());
        assert_eq!(io.provide(), Some(11));
        assert_eq!(io.provide(), Some(12));
    }

    #[test]
    fn test_outbox_without_sink() {
        let mut io = IoBridge::new();
        io.emit(4);
        io.emit(5);
        assert_eq!(io.last_output(), Some(5));
        assert_eq!(io.buffered_output(), 2);
        assert_eq!(io.take_output(), Some(4));
        assert_eq!(io.drain_output(), vec![5]);
        assert_eq!(io.buffered_output(), 0);
    }

    #[test]
    fn test_sink_replaces_outbox() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut io = IoBridge::new();
        let sink_seen = Arc::clone(&seen);
        io.set_sink(Box::new(move |v| sink_seen.lock().unwrap().push(v)));

        io.emit(1);
        io.emit(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(io.buffered_output(), 0);
        assert_eq!(io.last_output(), Some(2));
    }

    #[test]
    fn test_reset_keeps_callbacks() {
        let mut io = IoBridge::new();
        io.set_provider(Box::new(|| Some(0)));
        io.push_input(1);
        io.emit(2);

        io.reset();
        assert_eq!(io.pending_input(), 0);
        assert_eq!(io.last_output(), None);
        assert_eq!(io.buffered_output(), 0);
        assert!(io.has_provider());

        io.clear_callbacks();
        assert!(!io.has_provider());
    }
}
