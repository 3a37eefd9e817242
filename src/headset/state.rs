//! Shared detection state, the atomic button guard and the wake lease.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use log::debug;
use tokio::time::Instant;

use crate::headset::types::{AccessoryType, FmMode, KeyCode, StatusBits, TtyMode, UsbAccessory};

/// The single mutex-guarded record of current classification and published
/// status. Headset-class bits and the accessory type are always updated in
/// the same critical section.
pub struct SharedState {
   /// Current 3.5mm classification.
   pub hs_type: AccessoryType,
   /// Accessory on the external H2W channel; only gates button events.
   pub ext_type: AccessoryType,
   /// Latest externally reported insertion level.
   pub is_ext_insert: bool,
   /// Whether mic bias is currently driven.
   pub mic_bias_on: bool,
   /// Whether metrico test mode is engaged.
   pub metrico_on: bool,
   /// Remaining mic-poll retries.
   pub mic_detect_counter: u32,
   /// Published h2w status word.
   pub h2w_bits: StatusBits,
   /// Published usb_audio channel value.
   pub usb_bits: u32,
   /// Accessory on the USB channel.
   pub usb_type: UsbAccessory,
   pub tty_mode: TtyMode,
   pub fm_mode: FmMode,
}

impl Default for SharedState {
   fn default() -> Self {
      Self {
         hs_type: AccessoryType::Unplug,
         ext_type: AccessoryType::Unplug,
         is_ext_insert: false,
         mic_bias_on: false,
         metrico_on: false,
         mic_detect_counter: 0,
         h2w_bits: StatusBits::NONE,
         usb_bits: 0,
         usb_type: UsbAccessory::NoHeadset,
         tty_mode: TtyMode::Disable,
         fm_mode: FmMode::Disable,
      }
   }
}

/// Lock-free guard for the currently held remote-control key.
///
/// A press is only accepted while nothing is held; a release always clears.
/// Stored as the raw key repr with 0 meaning "none held".
#[derive(Default)]
pub struct ButtonState(AtomicU16);

impl ButtonState {
   pub fn held(&self) -> Option<KeyCode> {
      KeyCode::from_repr(self.0.load(Ordering::SeqCst))
   }

   /// Attempts to latch `key`; fails if another key is already held.
   pub fn try_press(&self, key: KeyCode) -> bool {
      self
         .0
         .compare_exchange(0, key as u16, Ordering::SeqCst, Ordering::SeqCst)
         .is_ok()
   }

   /// Clears the held key unconditionally, returning what was held.
   pub fn release(&self) -> Option<KeyCode> {
      KeyCode::from_repr(self.0.swap(0, Ordering::SeqCst))
   }
}

/// Bounded-duration keep-awake lease.
///
/// Acquired at the start of every externally triggered handler so the
/// device does not suspend mid-sequence. It expires on its own instead of
/// being released.
pub struct WakeLease {
   name: &'static str,
   until: AtomicCell<Instant>,
}

impl WakeLease {
   pub fn new(name: &'static str) -> Self {
      Self {
         name,
         until: AtomicCell::new(Instant::now()),
      }
   }

   /// Extends the lease to at least `timeout` from now.
   pub fn hold(&self, timeout: Duration) {
      let deadline = Instant::now() + timeout;
      if deadline > self.until.load() {
         self.until.store(deadline);
         debug!("{} wake lease held for {timeout:?}", self.name);
      }
   }

   pub fn is_held(&self) -> bool {
      Instant::now() < self.until.load()
   }
}
