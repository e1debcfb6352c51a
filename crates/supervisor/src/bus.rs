// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Multi-producer, single-consumer event bus. `send` backpressures a full
//! channel rather than dropping — events are never silently lost.

use ouro_core::Event;
use tokio::sync::mpsc;

pub struct EventBus {
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx }
    }

    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    /// Drains every event currently buffered without blocking — "one full
    /// pass" per tick, per the loop's step 2.
    pub fn drain_non_blocking(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_collects_everything_buffered_in_arrival_order() {
        let mut bus = EventBus::new(8);
        let tx = bus.sender();
        tx.send(Event::Heartbeat { epoch_ms: 1, pending_tasks: 0, running_tasks: 0 }).await.unwrap();
        tx.send(Event::Heartbeat { epoch_ms: 2, pending_tasks: 0, running_tasks: 0 }).await.unwrap();
        let drained = bus.drain_non_blocking();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].epoch_ms(), 1);
        assert_eq!(drained[1].epoch_ms(), 2);
    }

    #[tokio::test]
    async fn drain_on_empty_channel_returns_empty_without_blocking() {
        let mut bus = EventBus::new(8);
        assert!(bus.drain_non_blocking().is_empty());
    }
}
