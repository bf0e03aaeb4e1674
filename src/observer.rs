//! Observer pattern for simulations - progress pub/sub
//!
//! Observers subscribed to a network are notified after every reporting
//! step and once when a run reaches its terminal condition. No polling of
//! the network is required while it runs.

use std::fmt;
use std::sync::Arc;

use crate::simulation::RunStatus;

/// Event emitted by a running simulation
#[derive(Clone, Debug, PartialEq)]
pub enum SimulationEvent {
    /// A reporting step completed
    Step {
        /// 1-based reporting step index
        step: usize,
        time: f64,
        /// Watched order parameter after the step. LEGION runs report the
        /// fraction of active oscillators.
        order: f64,
    },
    /// The run stopped
    Terminated {
        status: RunStatus,
        /// Reporting steps performed
        steps: usize,
        time: f64,
        /// Watched order parameter at the stop (NaN after divergence)
        order: f64,
    },
}

/// Observer that receives simulation events
pub trait SimulationObserver: Send + Sync {
    /// Called when a simulation event occurs
    fn on_event(&self, event: SimulationEvent);
}

/// Function-based observer for simple cases
pub struct FnObserver<F: Fn(SimulationEvent) + Send + Sync>(pub F);

impl<F: Fn(SimulationEvent) + Send + Sync> SimulationObserver for FnObserver<F> {
    fn on_event(&self, event: SimulationEvent) {
        (self.0)(event);
    }
}

/// Channel-based observer - sends events to a channel
pub struct ChannelObserver {
    sender: std::sync::mpsc::Sender<SimulationEvent>,
}

impl ChannelObserver {
    pub fn new(sender: std::sync::mpsc::Sender<SimulationEvent>) -> Self {
        Self { sender }
    }
}

impl SimulationObserver for ChannelObserver {
    fn on_event(&self, event: SimulationEvent) {
        let _ = self.sender.send(event);
    }
}

/// Subscribers of one network
#[derive(Clone, Default)]
pub struct Observers {
    subscribers: Vec<Arc<dyn SimulationObserver>>,
}

impl Observers {
    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.subscribers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver an event to every subscriber in subscription order
    pub(crate) fn notify(&self, event: SimulationEvent) {
        if let Some((last, rest)) = self.subscribers.split_last() {
            for observer in rest {
                observer.on_event(event.clone());
            }
            last.on_event(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_fn_observer_receives_all() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut observers = Observers::default();
        observers.subscribe(Arc::new(FnObserver(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        observers.subscribe(Arc::new(FnObserver(|_event| {})));

        observers.notify(SimulationEvent::Step {
            step: 1,
            time: 0.1,
            order: 0.5,
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(observers.len(), 2);
    }

    #[test]
    fn test_channel_observer() {
        let (tx, rx) = mpsc::channel();
        let mut observers = Observers::default();
        observers.subscribe(Arc::new(ChannelObserver::new(tx)));

        let event = SimulationEvent::Terminated {
            status: RunStatus::Converged,
            steps: 3,
            time: 0.3,
            order: 0.999,
        };
        observers.notify(event.clone());
        assert_eq!(rx.recv().unwrap(), event);
    }

    #[test]
    fn test_empty_notify_is_noop() {
        let observers = Observers::default();
        assert!(observers.is_empty());
        observers.notify(SimulationEvent::Step {
            step: 1,
            time: 0.0,
            order: 0.0,
        });
    }
}
