//! Insert/remove detection workflow.
//!
//! A plug notification debounces into a delayed classification task;
//! removal debounces into a delayed teardown task; an inconclusive
//! classification re-enters a bounded polling loop. All three publish
//! through the shared record so the headset-class bits and the accessory
//! type always move together.

use std::time::Duration;

use log::{debug, info};
use tokio::time::{self, Instant};

use crate::headset::manager::{
   DELAY_SEC, Headset, MIC_DETECT_WAKE, WAKE_TIMEOUT,
};
use crate::headset::state::SharedState;
use crate::headset::types::{AccessoryType, StatusBits};

/// Insert debounce before classification.
const DELAY_INSERT: Duration = Duration::from_millis(500);
/// Remove debounce, normal jacks.
const DELAY_REMOVE_SHORT: Duration = Duration::from_millis(400);
/// Remove debounce under the legacy-jack workaround.
const DELAY_REMOVE_LONG: Duration = Duration::from_millis(800);
/// Spacing between mic-poll retries.
const DELAY_MIC_DETECT: Duration = Duration::from_secs(1);

impl Headset {
   /// External plug notification: supersede every in-flight detection
   /// timer, then debounce the edge into the matching task.
   pub async fn notify_plug(&self, inserted: bool) -> i32 {
      self.stay_awake(WAKE_TIMEOUT);
      debug!("Headset status {inserted}");

      self.0.state.lock().await.is_ext_insert = inserted;

      self.0.mic_slot.cancel().await;
      if self.0.insert_slot.cancel().await {
         if let Some(key_int) = self.0.notifiers.key_int_enable() {
            key_int(true);
         }
      }
      if self.0.remove_slot.cancel().await {
         if let Some(key_int) = self.0.notifiers.key_int_enable() {
            key_int(false);
         }
      }

      let headset = self.clone();
      if inserted {
         self
            .0
            .insert_slot
            .schedule(DELAY_INSERT, headset.insert_detect_task())
            .await;
      } else {
         let delay = if self.0.config.legacy_audio_jack {
            DELAY_REMOVE_LONG
         } else {
            DELAY_REMOVE_SHORT
         };
         self
            .0
            .remove_slot
            .schedule(delay, headset.remove_detect_task())
            .await;
      }
      1
   }

   /// Folds a classified type into the published word. The plug bit is
   /// asserted by the caller; indicator accessories publish no
   /// headset-class bit at all.
   fn headset_class_bits(base: StatusBits, mic: AccessoryType) -> StatusBits {
      match mic {
         AccessoryType::Unplug => base & !StatusBits::MASK_35MM,
         AccessoryType::NoMic | AccessoryType::UnknownMic => base | StatusBits::HEADSET_NO_MIC,
         AccessoryType::Mic
         | AccessoryType::Metrico
         | AccessoryType::Beats
         | AccessoryType::BeatsSolo => base | StatusBits::HEADSET_MIC,
         AccessoryType::TvOut => base | StatusBits::TV_OUT,
         AccessoryType::Indicator | AccessoryType::Unstable => base,
      }
   }

   /// Publishes `new`, reconciling against the previous word. When both
   /// words assert headset-class bits the legacy-merge workaround is
   /// checked first; otherwise a transient cleared word is published so
   /// falling-edge consumers notice the change.
   fn reconcile_publish(
      &self,
      state: &mut SharedState,
      old: StatusBits,
      mut new: StatusBits,
      mic: AccessoryType,
   ) {
      if old == new {
         info!("No state change");
         return;
      }
      if (old & new).intersects(StatusBits::MASK_35MM) {
         if self.0.config.legacy_audio_jack {
            new |= old;
            info!("Old audio jack found, use workaround");
         } else {
            self.publish_h2w(state, old & !StatusBits::MASK_35MM);
            info!("Report fake remove event");
         }
      }
      self.set_accessory(state, mic);
      info!("Send uevent for state change, {old} => {new}");
      self.publish_h2w(state, new);
   }

   /// Insert-debounce task: classify and publish.
   pub(crate) async fn insert_detect_task(self) {
      self.stay_awake(WAKE_TIMEOUT);

      if !self.0.state.lock().await.is_ext_insert {
         info!("Headset has been removed");
         return;
      }

      self.0.insert_at.store(Instant::now());
      self.set_hw_state(true).await;

      let mut state = self.0.state.lock().await;
      let mut mic = self.classify_once();

      if self.0.config.float_detect {
         info!("Headset float detect enable");
         if mic == AccessoryType::Unplug {
            drop(state);
            self
               .update_mic_status(self.0.config.mic_detect_retries)
               .await;
            return;
         }
      }

      if mic == AccessoryType::NoMic {
         mic = self.tv_out_detect().await;
      }
      if mic == AccessoryType::TvOut {
         if let Some(sel) = &self.0.platform.hptv_sel {
            sel(true);
         }
      }
      if mic == AccessoryType::Metrico {
         self.enable_metrico(&mut state, true);
      }

      let old = state.h2w_bits;
      let base = (old & !StatusBits::MASK_35MM) | StatusBits::PLUG_35MM;
      // A metrico reading is not trusted on insert; publish it unstable
      // and let the re-poll settle it.
      let new = if mic == AccessoryType::Metrico {
         mic = AccessoryType::Unstable;
         info!("HEADSET_METRICO (UNSTABLE)");
         base
      } else {
         info!("{mic}");
         Self::headset_class_bits(base, mic)
      };

      self.reconcile_publish(&mut state, old, new, mic);
      drop(state);

      match mic {
         AccessoryType::UnknownMic => {
            self
               .update_mic_status(self.0.config.mic_detect_retries)
               .await;
         }
         AccessoryType::Unstable => self.update_mic_status(0).await,
         AccessoryType::Indicator => {
            if self.get_type_sync(3, DELAY_SEC).await == AccessoryType::Indicator {
               info!("Delay check: HEADSET_INDICATOR");
            } else {
               info!("Delay check: HEADSET_UNKNOWN_MIC");
            }
         }
         _ => {}
      }
   }

   /// Remove-debounce task: tear down hardware state and clear the
   /// published headset-class and FM bits.
   pub(crate) async fn remove_detect_task(self) {
      self.stay_awake(WAKE_TIMEOUT);

      // A fresh insert has not had time to settle; wait it out.
      if Instant::now() <= self.0.insert_at.load() + DELAY_SEC {
         info!("Waiting for HPIN stable");
         let debounced = if self.0.config.legacy_audio_jack {
            DELAY_REMOVE_LONG
         } else {
            DELAY_REMOVE_SHORT
         };
         time::sleep(DELAY_SEC.saturating_sub(debounced)).await;
      }

      {
         let state = self.0.state.lock().await;
         if state.is_ext_insert {
            info!("Headset has been reinserted during debounce time");
            return;
         }
         if state.hs_type == AccessoryType::Indicator {
            if let Some(indicator) = self.0.notifiers.indicator_enable() {
               indicator(false);
            }
         }
      }

      self.set_hw_state(false).await;

      let mut state = self.0.state.lock().await;
      if state.metrico_on {
         self.enable_metrico(&mut state, false);
      }
      if let Some(held) = self.0.button.held() {
         self.button_released(held);
      }
      self.set_accessory(&mut state, AccessoryType::Unplug);

      if !state.h2w_bits.intersects(StatusBits::MASK_35MM) {
         info!("Headset has been removed");
         return;
      }

      let bits = state.h2w_bits & !(StatusBits::MASK_35MM | StatusBits::MASK_FM);
      self.publish_h2w(&mut state, bits);
      info!("Remove 3.5mm accessory");
   }

   /// Bounded mic-poll loop: retries while the reading stays unknown or
   /// floating, then either publishes a definitive type or gives up.
   pub(crate) async fn mic_detect_task(self) {
      loop {
         time::sleep(DELAY_MIC_DETECT).await;
         self.stay_awake(MIC_DETECT_WAKE);

         if self.0.config.adc_table.is_empty() && self.0.notifiers.mic_status().is_none() {
            info!("Failed to get MIC status");
            return;
         }

         let mut state = self.0.state.lock().await;
         let mut mic = self.classify_once();

         if mic == AccessoryType::NoMic {
            mic = self.tv_out_detect().await;
         }
         if mic == AccessoryType::TvOut {
            if let Some(sel) = &self.0.platform.hptv_sel {
               sel(true);
            }
         }
         if mic == AccessoryType::Metrico {
            self.enable_metrico(&mut state, true);
         }

         if mic == AccessoryType::UnknownMic || mic == AccessoryType::Unplug {
            if state.mic_detect_counter > 0 {
               state.mic_detect_counter -= 1;
               continue;
            }
            info!("MIC polling timeout (UNKNOWN/Floating MIC status)");
            return;
         }

         if state.hs_type == AccessoryType::Unstable && state.mic_detect_counter > 0 {
            state.mic_detect_counter -= 1;
            continue;
         }

         let old = state.h2w_bits;
         if !old.intersects(StatusBits::MASK_35MM) && !state.is_ext_insert {
            info!("Headset has been removed");
            return;
         }

         let base = (old & !StatusBits::MASK_35MM) | StatusBits::PLUG_35MM;
         info!("{mic}");
         let new = Self::headset_class_bits(base, mic);
         self.reconcile_publish(&mut state, old, new, mic);
         return;
      }
   }
}
