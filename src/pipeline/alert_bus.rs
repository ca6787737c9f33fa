// src/pipeline/alert_bus.rs
//
// Decoupled alert delivery seam. Engines emit, the delivery collaborator
// drains; neither reaches into the other's state.

use std::collections::VecDeque;

use tracing::warn;

use crate::types::AlertEvent;

pub struct AlertBus {
    events: VecDeque<AlertEvent>,
    max_pending: usize,
}

impl AlertBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: AlertEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "alert bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<AlertEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
