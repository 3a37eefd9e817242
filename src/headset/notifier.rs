//! Hardware notifier registry.
//!
//! Sensor back-ends register callbacks here, one optional slot per
//! capability. An absent capability is a valid "hardware not present"
//! signal, never an error; callers degrade per operation. The table is
//! written during back-end registration and read everywhere else, so a
//! plain rwlock around the slots is sufficient.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::headset::types::AccessoryType;

pub type PinStateFn = Arc<dyn Fn() -> i32 + Send + Sync>;
pub type AdcReadFn = Arc<dyn Fn() -> i32 + Send + Sync>;
pub type KeycodeFn = Arc<dyn Fn(i32) -> i32 + Send + Sync>;
pub type MicStatusFn = Arc<dyn Fn() -> AccessoryType + Send + Sync>;
pub type EnableFn = Arc<dyn Fn(bool) + Send + Sync>;

/// Capability identifiers, used for registration logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Capability {
   #[strum(serialize = "HPIN_GPIO")]
   HpinGpio,
   #[strum(serialize = "REMOTE_ADC")]
   RemoteAdc,
   #[strum(serialize = "REMOTE_KEYCODE")]
   RemoteKeycode,
   #[strum(serialize = "MIC_STATUS")]
   MicStatus,
   #[strum(serialize = "MIC_BIAS")]
   MicBias,
   #[strum(serialize = "MIC_SELECT")]
   MicSelect,
   #[strum(serialize = "KEY_INT_ENABLE")]
   KeyIntEnable,
   #[strum(serialize = "KEY_ENABLE")]
   KeyEnable,
   #[strum(serialize = "INDICATOR_ENABLE")]
   IndicatorEnable,
}

/// A callback being registered; the variant implies the capability slot.
pub enum NotifierHook {
   HpinGpio(PinStateFn),
   RemoteAdc(AdcReadFn),
   RemoteKeycode(KeycodeFn),
   MicStatus(MicStatusFn),
   MicBiasEnable(EnableFn),
   MicSelect(EnableFn),
   KeyIntEnable(EnableFn),
   KeyEnable(EnableFn),
   IndicatorEnable(EnableFn),
}

impl NotifierHook {
   pub const fn capability(&self) -> Capability {
      match self {
         Self::HpinGpio(_) => Capability::HpinGpio,
         Self::RemoteAdc(_) => Capability::RemoteAdc,
         Self::RemoteKeycode(_) => Capability::RemoteKeycode,
         Self::MicStatus(_) => Capability::MicStatus,
         Self::MicBiasEnable(_) => Capability::MicBias,
         Self::MicSelect(_) => Capability::MicSelect,
         Self::KeyIntEnable(_) => Capability::KeyIntEnable,
         Self::KeyEnable(_) => Capability::KeyEnable,
         Self::IndicatorEnable(_) => Capability::IndicatorEnable,
      }
   }
}

#[derive(Default)]
struct Slots {
   hpin_gpio: Option<PinStateFn>,
   remote_adc: Option<AdcReadFn>,
   remote_keycode: Option<KeycodeFn>,
   mic_status: Option<MicStatusFn>,
   mic_bias_enable: Option<EnableFn>,
   mic_select: Option<EnableFn>,
   key_int_enable: Option<EnableFn>,
   key_enable: Option<EnableFn>,
   indicator_enable: Option<EnableFn>,
}

/// The notifier table. Capabilities are fixed for the process lifetime;
/// there is no removal operation.
#[derive(Default)]
pub struct NotifierTable {
   slots: RwLock<Slots>,
}

impl NotifierTable {
   pub fn install(&self, hook: NotifierHook) {
      let mut slots = self.slots.write();
      match hook {
         NotifierHook::HpinGpio(f) => slots.hpin_gpio = Some(f),
         NotifierHook::RemoteAdc(f) => slots.remote_adc = Some(f),
         NotifierHook::RemoteKeycode(f) => slots.remote_keycode = Some(f),
         NotifierHook::MicStatus(f) => slots.mic_status = Some(f),
         NotifierHook::MicBiasEnable(f) => slots.mic_bias_enable = Some(f),
         NotifierHook::MicSelect(f) => slots.mic_select = Some(f),
         NotifierHook::KeyIntEnable(f) => slots.key_int_enable = Some(f),
         NotifierHook::KeyEnable(f) => slots.key_enable = Some(f),
         NotifierHook::IndicatorEnable(f) => slots.indicator_enable = Some(f),
      }
   }

   pub fn hpin_gpio(&self) -> Option<PinStateFn> {
      self.slots.read().hpin_gpio.clone()
   }

   pub fn remote_adc(&self) -> Option<AdcReadFn> {
      self.slots.read().remote_adc.clone()
   }

   pub fn remote_keycode(&self) -> Option<KeycodeFn> {
      self.slots.read().remote_keycode.clone()
   }

   pub fn mic_status(&self) -> Option<MicStatusFn> {
      self.slots.read().mic_status.clone()
   }

   pub fn mic_bias_enable(&self) -> Option<EnableFn> {
      self.slots.read().mic_bias_enable.clone()
   }

   pub fn mic_select(&self) -> Option<EnableFn> {
      self.slots.read().mic_select.clone()
   }

   pub fn key_int_enable(&self) -> Option<EnableFn> {
      self.slots.read().key_int_enable.clone()
   }

   pub fn key_enable(&self) -> Option<EnableFn> {
      self.slots.read().key_enable.clone()
   }

   pub fn indicator_enable(&self) -> Option<EnableFn> {
      self.slots.read().indicator_enable.clone()
   }
}

pub type PinWriteFn = Box<dyn Fn(bool) + Send + Sync>;
pub type PowerFn = Box<dyn Fn(bool) + Send + Sync>;

/// Board-level hooks supplied once at construction, separate from the
/// notifier table because they never change after attach.
#[derive(Default)]
pub struct Platform {
   /// Routes the line to the headphone detector (TV-out probe).
   pub hptv_det_hp: Option<PinWriteFn>,
   /// Routes the line to the TV-out detector (TV-out probe).
   pub hptv_det_tv: Option<PinWriteFn>,
   /// Selects the TV-out path once a TV-out cable is classified.
   pub hptv_sel: Option<PinWriteFn>,
   /// External supply switch; takes precedence over mic-bias debouncing.
   pub headset_power: Option<PowerFn>,
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicBool, Ordering};

   use super::*;

   #[test]
   fn test_absent_capability_reads_none() {
      let table = NotifierTable::default();
      assert!(table.remote_adc().is_none());
      assert!(table.mic_status().is_none());
   }

   #[test]
   fn test_install_and_invoke() {
      let table = NotifierTable::default();
      let fired = Arc::new(AtomicBool::new(false));
      let flag = fired.clone();
      table.install(NotifierHook::KeyEnable(Arc::new(move |on| {
         flag.store(on, Ordering::SeqCst);
      })));

      let hook = table.key_enable().expect("hook installed");
      hook(true);
      assert!(fired.load(Ordering::SeqCst));
   }

   #[test]
   fn test_capability_names() {
      let hook = NotifierHook::RemoteAdc(Arc::new(|| 0));
      assert_eq!(hook.capability().to_string(), "REMOTE_ADC");
   }
}
