//=========================================================================
// Command Collector
//=========================================================================
//
// Step-thread side of the lighting command queue.
//
// Architecture:
//   Receiver<LightCommand> → collect_step() → pending → take_pending()
//
// Bounded draining keeps one burst of effects from stalling a step; the
// remainder is picked up on the following steps.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::warn;

//=== Internal Dependencies ===============================================

use super::LightCommand;

//=== CommandCollector ====================================================

/// Drains queued lighting commands once per step.
pub(crate) struct CommandCollector {
    receiver: Receiver<LightCommand>,
    pending: Vec<LightCommand>,
    max_per_step: usize,
}

impl CommandCollector {
    pub(crate) fn new(receiver: Receiver<LightCommand>, max_per_step: usize) -> Self {
        Self {
            receiver,
            pending: Vec::with_capacity(64),
            max_per_step: max_per_step.max(1),
        }
    }

    /// Collects pending commands (bounded). Returns how many were drained.
    pub(crate) fn collect_step(&mut self) -> usize {
        self.pending.clear();

        while self.pending.len() < self.max_per_step {
            match self.receiver.try_recv() {
                Ok(command) => self.pending.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if self.pending.len() >= self.max_per_step && !self.receiver.is_empty() {
            warn!(
                "Lighting command backlog: drained {} commands this step, {} left",
                self.pending.len(),
                self.receiver.len()
            );
        }

        self.pending.len()
    }

    /// Takes the commands collected this step, in submission order.
    pub(crate) fn take_pending(&mut self) -> Vec<LightCommand> {
        std::mem::take(&mut self.pending)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::LightingHandle;
    use crate::core::math::Vec3;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn collect_handles_empty_queue() {
        let (_tx, rx) = unbounded::<LightCommand>();
        let mut collector = CommandCollector::new(rx, 16);

        assert_eq!(collector.collect_step(), 0);
        assert!(collector.take_pending().is_empty());
    }

    #[test]
    fn collect_preserves_submission_order() {
        let (tx, rx) = unbounded();
        let handle = LightingHandle::new(tx);
        let mut collector = CommandCollector::new(rx, 16);

        handle.add(Vec3::new(1.0, 0.0, 0.0));
        handle.ping(4);
        handle.clear_all();

        assert_eq!(collector.collect_step(), 3);
        let pending = collector.take_pending();
        assert!(matches!(pending[0], LightCommand::AddEmitter { color: None, .. }));
        assert!(matches!(pending[1], LightCommand::Ping(4)));
        assert!(matches!(pending[2], LightCommand::ClearAll));
    }

    #[test]
    fn collect_is_bounded_per_step() {
        let (tx, rx) = unbounded();
        let handle = LightingHandle::new(tx);
        let mut collector = CommandCollector::new(rx, 4);

        for _ in 0..10 {
            handle.force_refresh();
        }

        assert_eq!(collector.collect_step(), 4);
        assert_eq!(collector.collect_step(), 4);
        assert_eq!(collector.collect_step(), 2);
        assert_eq!(collector.collect_step(), 0);
    }

    #[test]
    fn collect_clears_previous_step() {
        let (tx, rx) = unbounded();
        let handle = LightingHandle::new(tx);
        let mut collector = CommandCollector::new(rx, 16);

        handle.untrack(1);
        handle.untrack(2);
        assert_eq!(collector.collect_step(), 2);

        assert_eq!(collector.collect_step(), 0);
        assert!(collector.take_pending().is_empty());
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (tx, rx) = bounded(2);
        let handle = LightingHandle::new(tx);
        let mut collector = CommandCollector::new(rx, 16);

        for owner in 0..5 {
            handle.ping(owner);
        }

        assert_eq!(collector.collect_step(), 2);
    }

    #[test]
    fn disconnected_handle_is_harmless() {
        let (tx, rx) = unbounded::<LightCommand>();
        let handle = LightingHandle::new(tx);
        drop(rx);

        handle.clear_all();
    }
}
