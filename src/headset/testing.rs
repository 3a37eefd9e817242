//! Shared test fixtures: a recording event bus, a canonical ADC table
//! and an adjustable fake ADC source.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::Mutex;

use crate::config::{AdcRange, Config};
use crate::event::{EventBus, HeadsetEvent};
use crate::headset::manager::Headset;
use crate::headset::notifier::{NotifierHook, Platform};
use crate::headset::types::{AccessoryType, StatusBits};

/// Event bus that records everything emitted.
#[derive(Default)]
pub struct RecordingBus {
   events: Mutex<Vec<HeadsetEvent>>,
}

impl EventBus for RecordingBus {
   fn emit(&self, event: HeadsetEvent) {
      self.events.lock().push(event);
   }
}

impl RecordingBus {
   pub fn events(&self) -> Vec<HeadsetEvent> {
      self.events.lock().clone()
   }

   /// Published status words, in emission order.
   pub fn state_changes(&self) -> Vec<StatusBits> {
      self
         .events
         .lock()
         .iter()
         .filter_map(|event| match event {
            HeadsetEvent::StateChanged(bits) => Some(*bits),
            _ => None,
         })
         .collect()
   }

   pub fn clear(&self) {
      self.events.lock().clear();
   }
}

pub fn fixture(config: Config) -> (Headset, Arc<RecordingBus>) {
   fixture_with(config, Platform::default())
}

pub fn fixture_with(config: Config, platform: Platform) -> (Headset, Arc<RecordingBus>) {
   let bus = Arc::new(RecordingBus::default());
   let headset = Headset::new(bus.clone(), config, platform);
   (headset, bus)
}

/// The classification table most tests run against.
pub fn mic_table() -> Vec<AdcRange> {
   [
      (0, 200, AccessoryType::NoMic),
      (201, 3000, AccessoryType::Mic),
      (3001, 3500, AccessoryType::Beats),
      (3501, 3650, AccessoryType::Metrico),
      (3651, 3800, AccessoryType::Indicator),
      (3801, 3900, AccessoryType::BeatsSolo),
   ]
   .into_iter()
   .map(|(adc_min, adc_max, accessory)| AdcRange {
      adc_min,
      adc_max,
      accessory,
   })
   .collect()
}

/// Registers an adjustable ADC source and returns its knob.
pub async fn set_adc(headset: &Headset, initial: i32) -> Arc<AtomicI32> {
   let value = Arc::new(AtomicI32::new(initial));
   let source = value.clone();
   headset
      .register(NotifierHook::RemoteAdc(Arc::new(move || {
         source.load(Ordering::SeqCst)
      })))
      .await;
   value
}
