//! OSC parameter routing
//!
//! A background listener (or an embedder) pushes `(address, value)` pairs
//! into a queue; the scheduler drains it once per frame into a persistent
//! 64-slot float bank that mirrors the host block's `osc` region. Two
//! address forms are accepted: `/u/<name>` for a parameter the preprocessor
//! discovered, and `/u/<n>` for a direct slot index. Anything else is
//! silently dropped.

use std::sync::mpsc::{channel, Receiver, Sender};
use wgslbox_dialect::keys::OSC_SLOT_COUNT;

/// Address prefix shared by both OSC forms
const OSC_PREFIX: &str = "/u/";

/// One queued OSC update
#[derive(Debug, Clone)]
pub struct OscMessage {
    /// Full OSC address, e.g. `/u/bass`
    pub address: String,
    /// 32-bit float payload
    pub value: f32,
}

/// Producer half of the OSC queue; cheap to clone into listener tasks
#[derive(Debug, Clone)]
pub struct OscSender {
    sender: Sender<OscMessage>,
}

impl OscSender {
    /// Enqueues one update; drops it if the engine is gone
    pub fn send(&self, address: impl Into<String>, value: f32) {
        let _ = self.sender.send(OscMessage {
            address: address.into(),
            value,
        });
    }
}

/// Consumer half of the OSC queue, drained by the frame scheduler
#[derive(Debug)]
pub struct OscQueue {
    receiver: Receiver<OscMessage>,
}

/// Creates a connected sender/queue pair
pub fn osc_channel() -> (OscSender, OscQueue) {
    let (sender, receiver) = channel();
    (OscSender { sender }, OscQueue { receiver })
}

/// The persistent 64-slot float bank
///
/// Values stay put until overwritten, matching the host block contract.
#[derive(Debug)]
pub struct OscBank {
    values: [f32; OSC_SLOT_COUNT],
    params: Vec<String>,
}

impl OscBank {
    /// Creates a bank with the manifest's parameter-name-to-slot mapping
    pub fn new(params: Vec<String>) -> Self {
        Self {
            values: [0.0; OSC_SLOT_COUNT],
            params,
        }
    }

    /// Routes one address/value pair into the bank
    ///
    /// Returns whether the update landed in a slot.
    pub fn apply(&mut self, address: &str, value: f32) -> bool {
        let Some(key) = address.strip_prefix(OSC_PREFIX) else {
            tracing::trace!("ignoring OSC address outside {OSC_PREFIX}: {address}");
            return false;
        };

        if let Ok(index) = key.parse::<usize>() {
            if index < OSC_SLOT_COUNT {
                self.values[index] = value;
                return true;
            }
            tracing::trace!("ignoring OSC slot index out of range: {address}");
            return false;
        }

        if let Some(index) = self.params.iter().position(|p| p == key) {
            self.values[index.min(OSC_SLOT_COUNT - 1)] = value;
            return true;
        }

        tracing::trace!("ignoring unknown OSC parameter: {address}");
        false
    }

    /// Drains every queued message into the bank
    pub fn drain(&mut self, queue: &OscQueue) {
        while let Ok(message) = queue.receiver.try_recv() {
            self.apply(&message.address, message.value);
        }
    }

    /// The current slot values, in host-block order
    pub fn values(&self) -> &[f32; OSC_SLOT_COUNT] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_parameter_routes_to_its_slot() {
        let mut bank = OscBank::new(vec!["bass".to_string(), "treble".to_string()]);
        assert!(bank.apply("/u/treble", 0.75));
        assert_eq!(bank.values()[1], 0.75);
    }

    #[test]
    fn test_numeric_address_routes_directly() {
        let mut bank = OscBank::new(Vec::new());
        assert!(bank.apply("/u/3", 0.5));
        assert_eq!(bank.values()[3], 0.5);
    }

    #[test]
    fn test_out_of_range_index_is_dropped() {
        let mut bank = OscBank::new(Vec::new());
        assert!(!bank.apply("/u/64", 1.0));
        assert_eq!(bank.values(), &[0.0; OSC_SLOT_COUNT]);
    }

    #[test]
    fn test_unknown_name_is_dropped() {
        let mut bank = OscBank::new(vec!["bass".to_string()]);
        assert!(!bank.apply("/u/unknown", 1.0));
        assert!(!bank.apply("/x/bass", 1.0));
    }

    #[test]
    fn test_values_persist_until_overwritten() {
        let mut bank = OscBank::new(vec!["bass".to_string()]);
        bank.apply("/u/bass", 0.25);
        bank.apply("/u/1", 0.5);
        assert_eq!(bank.values()[0], 0.25);
        bank.apply("/u/bass", 0.75);
        assert_eq!(bank.values()[0], 0.75);
        assert_eq!(bank.values()[1], 0.5);
    }

    #[test]
    fn test_queue_drain() {
        let (sender, queue) = osc_channel();
        let mut bank = OscBank::new(vec!["bass".to_string()]);
        sender.send("/u/bass", 0.75);
        sender.send("/u/3", 0.5);
        bank.drain(&queue);
        assert_eq!(bank.values()[0], 0.75);
        assert_eq!(bank.values()[3], 0.5);
    }
}
