//! Diagnostic polling.
//!
//! When ADC debugging is switched on through the attribute surface, a
//! one-second loop samples the presence line and the mic-line ADC and
//! logs both. A second flag widens normal logging; both are plain bits
//! in an atomic word so hot paths can test them without locking.

use std::sync::atomic::Ordering;
use std::time::Duration;

use log::info;
use tokio::time;

use crate::headset::manager::Headset;

/// Poll the presence line and the ADC once a second.
pub(crate) const DEBUG_FLAG_ADC: u32 = 1 << 0;
/// Verbose workflow logging.
pub(crate) const DEBUG_FLAG_LOG: u32 = 1 << 1;

const DELAY_DEBUG_POLL: Duration = Duration::from_secs(1);

impl Headset {
   pub(crate) fn debug_flag(&self, flag: u32) -> bool {
      self.0.debug_flag.load(Ordering::Relaxed) & flag != 0
   }

   pub(crate) fn set_debug_flag(&self, flag: u32, on: bool) {
      if on {
         self.0.debug_flag.fetch_or(flag, Ordering::Relaxed);
      } else {
         self.0.debug_flag.fetch_and(!flag, Ordering::Relaxed);
      }
   }

   pub(crate) fn debug_log_enabled(&self) -> bool {
      self.debug_flag(DEBUG_FLAG_LOG)
   }

   /// Switches the ADC poll loop on or off.
   pub(crate) async fn set_debug_poll(&self, enable: bool) {
      if enable == self.debug_flag(DEBUG_FLAG_ADC) {
         return;
      }
      self.set_debug_flag(DEBUG_FLAG_ADC, enable);
      if enable {
         let headset = self.clone();
         self
            .0
            .debug_slot
            .schedule(Duration::ZERO, headset.debug_poll_task())
            .await;
      } else {
         self.0.debug_slot.cancel().await;
      }
   }

   pub(crate) async fn debug_poll_task(self) {
      while self.debug_flag(DEBUG_FLAG_ADC) {
         let flag = self.0.debug_flag.load(Ordering::Relaxed);
         let hpin = self.0.notifiers.hpin_gpio().map(|pin| pin());
         let adc = self.0.notifiers.remote_adc().map(|read| read());
         match (hpin, adc) {
            (Some(hpin), Some(adc)) => info!("Debug Flag {flag}, HP_DET {hpin}, ADC {adc}"),
            (Some(hpin), None) => info!("Debug Flag {flag}, HP_DET {hpin}"),
            (None, Some(adc)) => info!("Debug Flag {flag}, ADC {adc}"),
            (None, None) => info!("Debug Flag {flag}"),
         }
         time::sleep(DELAY_DEBUG_POLL).await;
      }
   }
}

#[cfg(test)]
mod tests {
   use std::sync::Arc;
   use std::sync::atomic::AtomicU32;

   use super::*;
   use crate::config::Config;
   use crate::headset::notifier::NotifierHook;
   use crate::headset::testing::fixture;

   #[tokio::test(start_paused = true)]
   async fn test_poll_samples_once_per_second() {
      let (headset, _bus) = fixture(Config::default());
      let reads = Arc::new(AtomicU32::new(0));
      let counter = reads.clone();
      headset
         .register(NotifierHook::RemoteAdc(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            1000
         })))
         .await;

      headset.set_debug_poll(true).await;
      time::sleep(Duration::from_millis(3500)).await;
      headset.set_debug_poll(false).await;
      let sampled = reads.load(Ordering::SeqCst);
      assert_eq!(sampled, 4);

      time::sleep(Duration::from_secs(3)).await;
      assert_eq!(reads.load(Ordering::SeqCst), sampled);
   }

   #[tokio::test(start_paused = true)]
   async fn test_enable_is_idempotent() {
      let (headset, _bus) = fixture(Config::default());

      headset.set_debug_poll(true).await;
      headset.set_debug_poll(true).await;
      assert!(headset.debug_flag(DEBUG_FLAG_ADC));

      headset.set_debug_poll(false).await;
      assert!(!headset.debug_flag(DEBUG_FLAG_ADC));
   }

   #[tokio::test(start_paused = true)]
   async fn test_log_flag_is_independent() {
      let (headset, _bus) = fixture(Config::default());

      headset.set_debug_flag(DEBUG_FLAG_LOG, true);
      assert!(headset.debug_log_enabled());
      assert!(!headset.debug_flag(DEBUG_FLAG_ADC));

      headset.set_debug_flag(DEBUG_FLAG_LOG, false);
      assert!(!headset.debug_log_enabled());
   }
}
