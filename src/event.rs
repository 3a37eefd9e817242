//! Event handling system for accessory status updates.
//!
//! This module provides the event infrastructure for notifying about
//! published state changes, USB audio routing and remote-control key
//! activity.

use std::sync::Arc;

use crate::headset::types::{AccessoryType, KeyCode, StatusBits};

/// Events that can be emitted by the accessory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadsetEvent {
   /// The published h2w status word changed.
   StateChanged(StatusBits),
   /// The usb_audio channel value changed.
   UsbAudioChanged(u32),
   /// The 3.5mm classification changed.
   AccessoryChanged(AccessoryType),
   /// A remote-control key was pressed or released.
   Key { code: KeyCode, pressed: bool },
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an event to all registered listeners.
   fn emit(&self, event: HeadsetEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;
