//! Accessory classification.
//!
//! Decides the accessory type from one mic-line ADC sample against the
//! configured window table, falling back to the back-end mic-status
//! callback when the board has no table. A no-mic reading can still be a
//! TV-out cable, so a secondary probe reroutes the line to the TV-out
//! detector and samples again.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time;

use crate::headset::manager::{DELAY_MIC_BIAS, Headset};
use crate::headset::types::AccessoryType;

/// TV-out detection window on the 16-bit ADC scale.
const HPTV_ADC_16_BIT_MIN: i32 = 0x0A28;
const HPTV_ADC_16_BIT_MAX: i32 = 0x3E80;

impl Headset {
   /// One classification pass over the available hardware.
   ///
   /// Reports `UnknownMic` when no source can decide, `Unplug` for an
   /// unmatched sample under the float-detect policy.
   pub(crate) fn classify_once(&self) -> AccessoryType {
      let table = &self.0.config.adc_table;
      if !table.is_empty() {
         if let Some(read) = self.0.notifiers.remote_adc() {
            let adc = read();
            if self.debug_log_enabled() {
               debug!("MIC ADC {adc}");
            }
            for range in table {
               if adc >= range.adc_min && adc <= range.adc_max {
                  return range.accessory;
               }
            }
            if self.0.config.float_detect {
               return AccessoryType::Unplug;
            }
            return AccessoryType::UnknownMic;
         }
      }

      if let Some(mic_status) = self.0.notifiers.mic_status() {
         return mic_status();
      }

      info!("Failed to get MIC status");
      AccessoryType::UnknownMic
   }

   /// TV-out probe: reroute the line to the TV-out detector, settle,
   /// sample, and restore the routing regardless of the outcome.
   pub(crate) async fn tv_out_detect(&self) -> AccessoryType {
      let Some(read) = self.0.notifiers.remote_adc() else {
         return AccessoryType::NoMic;
      };
      let (Some(hp), Some(tv)) = (&self.0.platform.hptv_det_hp, &self.0.platform.hptv_det_tv)
      else {
         return AccessoryType::NoMic;
      };

      hp(false);
      tv(true);
      time::sleep(DELAY_MIC_BIAS).await;

      let adc = read();
      let mic = if (HPTV_ADC_16_BIT_MIN..=HPTV_ADC_16_BIT_MAX).contains(&adc) {
         AccessoryType::TvOut
      } else {
         AccessoryType::NoMic
      };

      hp(true);
      tv(false);

      mic
   }

   /// Synchronous confirmation: polls up to `count` times at `interval`
   /// and reports the current type only if every poll agreed with it.
   /// A disagreement kicks a full re-poll and reports `UnknownMic`.
   pub(crate) async fn get_type_sync(&self, count: u32, interval: Duration) -> AccessoryType {
      let current = self.accessory_type().await;
      let mut new_type = AccessoryType::UnknownMic;

      for round in 0..count {
         new_type = self.classify_once();
         if new_type != current {
            break;
         }
         if round + 1 < count {
            time::sleep(interval).await;
         }
      }

      if new_type != current {
         warn!("Accessory type changed during confirm: {current} => {new_type}");
         self.update_mic_status(self.0.config.mic_detect_retries).await;
         return AccessoryType::UnknownMic;
      }

      self.accessory_type().await
   }
}
