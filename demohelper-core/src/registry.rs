//! Who gets a console line.
//!
//! Three pools compete for every line, checked in this order and the first
//! match wins:
//! 1. pattern waiters (one-shot, registration order)
//! 2. named-value waiters (one-shot, keyed by cvar name)
//! 3. persistent listeners (registration order, first `can_handle` wins)
//!
//! A line is handed to exactly one consumer. Routing itself never awaits.

use std::sync::Arc;

use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::listener::ListenerService;
use crate::protocol::{self, CvarEcho};

pub type WaiterId = u64;

/// Handle returned by `subscribe`, needed to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    ConsumedByPattern,
    ConsumedByNamedValue,
    ConsumedByListener(String),
    Unhandled,
}

struct PatternWaiter {
    id: WaiterId,
    pattern: Regex,
    slot: oneshot::Sender<String>,
}

struct NamedValueWaiter {
    id: WaiterId,
    name: String,
    slot: oneshot::Sender<f64>,
}

struct ListenerEntry {
    id: ListenerId,
    listener: Arc<dyn ListenerService>,
    mailbox: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
pub struct LineWaiterRegistry {
    next_id: u64,
    patterns: Vec<PatternWaiter>,
    named: Vec<NamedValueWaiter>,
    listeners: Vec<ListenerEntry>,
    closed: bool,
}

impl std::fmt::Debug for LineWaiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWaiterRegistry")
            .field("patterns", &self.patterns.len())
            .field("named", &self.named.len())
            .field(
                "listeners",
                &self
                    .listeners
                    .iter()
                    .map(|l| l.listener.name())
                    .collect::<Vec<_>>(),
            )
            .field("closed", &self.closed)
            .finish()
    }
}

impl LineWaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_pattern(
        &mut self,
        pattern: Regex,
    ) -> ConsoleResult<(WaiterId, oneshot::Receiver<String>)> {
        if self.closed {
            return Err(ConsoleError::Closed);
        }
        let id = self.next_id();
        let (slot, rx) = oneshot::channel();
        debug!(waiter = id, pattern = %pattern, "pattern waiter registered");
        self.patterns.push(PatternWaiter { id, pattern, slot });
        Ok((id, rx))
    }

    pub fn add_named_value(
        &mut self,
        name: &str,
    ) -> ConsoleResult<(WaiterId, oneshot::Receiver<f64>)> {
        if self.closed {
            return Err(ConsoleError::Closed);
        }
        let id = self.next_id();
        let (slot, rx) = oneshot::channel();
        debug!(waiter = id, cvar = name, "named-value waiter registered");
        self.named.push(NamedValueWaiter {
            id,
            name: name.to_string(),
            slot,
        });
        Ok((id, rx))
    }

    /// Drop a one-shot waiter. Returns false when it was already resolved.
    pub fn remove_waiter(&mut self, id: WaiterId) -> bool {
        let before = self.patterns.len() + self.named.len();
        self.patterns.retain(|w| w.id != id);
        self.named.retain(|w| w.id != id);
        before != self.patterns.len() + self.named.len()
    }

    pub fn add_listener(
        &mut self,
        listener: Arc<dyn ListenerService>,
        mailbox: mpsc::UnboundedSender<String>,
    ) -> ConsoleResult<ListenerId> {
        if self.closed {
            return Err(ConsoleError::Closed);
        }
        let id = ListenerId(self.next_id());
        debug!(listener = listener.name(), "listener subscribed");
        self.listeners.push(ListenerEntry {
            id,
            listener,
            mailbox,
        });
        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                let entry = self.listeners.remove(index);
                debug!(listener = entry.listener.name(), "listener unsubscribed");
                true
            }
            None => {
                warn!(?id, "attempted to unsubscribe a listener that is not subscribed");
                false
            }
        }
    }

    pub fn pending_waiters(&self) -> usize {
        self.patterns.len() + self.named.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hand `line` to the single consumer entitled to it.
    pub fn route_line(&mut self, line: &str) -> RoutingOutcome {
        if self.resolve_pattern(line) {
            return RoutingOutcome::ConsumedByPattern;
        }
        if self.resolve_named_value(line) {
            return RoutingOutcome::ConsumedByNamedValue;
        }
        if let Some(name) = self.dispatch_listener(line) {
            return RoutingOutcome::ConsumedByListener(name);
        }
        trace!(%line, "no suitable consumer for line");
        RoutingOutcome::Unhandled
    }

    fn resolve_pattern(&mut self, line: &str) -> bool {
        let mut i = 0;
        while i < self.patterns.len() {
            if !self.patterns[i].pattern.is_match(line) {
                i += 1;
                continue;
            }
            let waiter = self.patterns.remove(i);
            trace!(waiter = waiter.id, %line, "pattern waiter selected");
            if waiter.slot.send(line.to_string()).is_ok() {
                return true;
            }
            // Caller stopped waiting without cleaning up. Try the next one.
            debug!(waiter = waiter.id, "pattern waiter was abandoned");
        }
        false
    }

    fn resolve_named_value(&mut self, line: &str) -> bool {
        let (name, value) = match protocol::parse_cvar_echo(line) {
            CvarEcho::NotAnEcho => return false,
            CvarEcho::Value { name, value } => (name, value),
            CvarEcho::Malformed { name, raw } => {
                if self.named.iter().any(|w| w.name == name) {
                    error!(cvar = %name, value = %raw, %line, "cvar echo matched but value is not numeric");
                }
                return false;
            }
        };

        while let Some(index) = self.named.iter().position(|w| w.name == name) {
            let waiter = self.named.remove(index);
            trace!(waiter = waiter.id, cvar = %name, value, "named-value waiter selected");
            if waiter.slot.send(value).is_ok() {
                return true;
            }
            debug!(waiter = waiter.id, "named-value waiter was abandoned");
        }
        false
    }

    fn dispatch_listener(&mut self, line: &str) -> Option<String> {
        let mut start = 0;
        loop {
            let index = start
                + self.listeners[start..]
                    .iter()
                    .position(|entry| entry.listener.can_handle(line))?;
            let entry = &self.listeners[index];
            let name = entry.listener.name().to_string();
            debug!(listener = %name, %line, "selected listener to handle line");

            if entry.mailbox.send(line.to_string()).is_ok() {
                return Some(name);
            }
            // Offer the line to the next willing listener instead.
            error!(listener = %name, "listener task is gone, dropping it");
            self.listeners.remove(index);
            start = index;
        }
    }

    /// Fail everything still waiting and refuse new registrations.
    pub fn close(&mut self) {
        self.closed = true;
        // Dropping the senders wakes every waiter with a closed-channel error.
        self.patterns.clear();
        self.named.clear();
        self.listeners.clear();
    }
}
