//! Remote-control button workflow.
//!
//! Key IRQs and raw key events are gated on accessory validity and HPIN
//! stability, debounced through a single replaceable task slot, and
//! emitted as input key events. An implausible key reading doubles as a
//! hint that the mic classification drifted, so several paths here kick
//! a re-poll instead of forwarding a key.

use std::time::Duration;

use log::info;
use tokio::time;

use crate::event::HeadsetEvent;
use crate::headset::manager::{Headset, WAKE_TIMEOUT};
use crate::headset::types::{AccessoryType, KeyCode};

/// Button debounce, normal jacks.
const DELAY_BUTTON: Duration = Duration::from_millis(500);
/// Button debounce under the legacy-jack workaround.
const DELAY_BUTTON_LONG: Duration = Duration::from_millis(800);
/// Settle before sampling the key ADC after an IRQ.
const DELAY_KEY_IRQ: Duration = Duration::from_millis(40);

impl Headset {
   pub(crate) fn button_pressed(&self, key: KeyCode) {
      info!("{key} ({}) pressed", key as u16);
      self.0.events.emit(HeadsetEvent::Key {
         code: key,
         pressed: true,
      });
   }

   pub(crate) fn button_released(&self, key: KeyCode) {
      info!("{key} ({}) released", key as u16);
      self.0.button.release();
      self.0.events.emit(HeadsetEvent::Key {
         code: key,
         pressed: false,
      });
   }

   /// Delivers a press/release, subject to the validity gates.
   pub async fn headset_button_event(&self, is_press: bool, key: KeyCode) {
      let (hs_type, ext_type) = {
         let state = self.0.state.lock().await;
         (state.hs_type, state.ext_type)
      };

      if hs_type == AccessoryType::Unplug && ext_type == AccessoryType::Unplug {
         info!("IGNORE key {key} (HEADSET_UNPLUG)");
         return;
      }
      if !self.hpin_stable() {
         info!("IGNORE key {key} (Unstable HPIN)");
         return;
      }
      if !hs_type.has_mic() {
         info!("IGNORE key {key} (Not support MIC)");
         return;
      }

      if !is_press {
         self.button_released(key);
      } else if self.0.button.try_press(key) {
         self.button_pressed(key);
      }
   }

   /// Raw key event from a back-end or the key IRQ path. Cancels any
   /// pending debounced press, then either re-polls the mic status or
   /// schedules a fresh debounce task carrying the code.
   pub async fn notify_key_event(&self, key_code: i32) -> i32 {
      self.stay_awake(WAKE_TIMEOUT);

      if self.0.button_slot.cancel().await {
         info!("Previous key code cancelled");
      }

      let (hs_type, ext_type, ext_insert) = {
         let state = self.0.state.lock().await;
         (state.hs_type, state.ext_type, state.is_ext_insert)
      };

      if hs_type == AccessoryType::Indicator {
         info!("Not support remote control");
         return 1;
      }

      if hs_type == AccessoryType::UnknownMic
         || hs_type == AccessoryType::NoMic
         || ext_type == AccessoryType::NoMic
      {
         self
            .update_mic_status(self.0.config.mic_detect_retries)
            .await;
      } else if hs_type == AccessoryType::Unstable {
         self.update_mic_status(0).await;
      } else if !self.hpin_stable() {
         info!("IGNORE key {key_code} (Unstable HPIN)");
      } else if hs_type == AccessoryType::Unplug && ext_insert {
         info!("MIC status is changed from float, re-polling to decide accessory type");
         self
            .update_mic_status(self.0.config.mic_detect_retries)
            .await;
      } else {
         let delay = if self.0.config.legacy_audio_jack {
            DELAY_BUTTON_LONG
         } else {
            DELAY_BUTTON
         };
         let headset = self.clone();
         self
            .0
            .button_slot
            .schedule(delay, headset.button_task(key_code))
            .await;
      }
      1
   }

   /// Debounced button task: map the raw code and deliver it.
   pub(crate) async fn button_task(self, key_code: i32) {
      self.stay_awake(WAKE_TIMEOUT);

      let key = match key_code {
         0 => {
            // Key release
            if let Some(held) = self.0.button.held() {
               self.headset_button_event(false, held).await;
            } else {
               info!("3.5mm RC: WRONG Button Release");
            }
            return;
         }
         1 => KeyCode::Media,
         2 => KeyCode::Backward,
         3 => KeyCode::Forward,
         _ => {
            info!("3.5mm RC: WRONG Button Pressed");
            return;
         }
      };
      self.headset_button_event(true, key).await;
   }

   /// Key interrupt: settle, sample the key ADC, decode and forward.
   pub async fn notify_key_irq(&self) -> i32 {
      self.stay_awake(WAKE_TIMEOUT);

      let hs_type = self.accessory_type().await;
      if hs_type == AccessoryType::Indicator {
         info!("Not support remote control");
         return 1;
      }

      let (Some(read), Some(decode)) = (
         self.0.notifiers.remote_adc(),
         self.0.notifiers.remote_keycode(),
      ) else {
         info!("Failed to get remote key code");
         return 1;
      };

      if self.hpin_stable() {
         time::sleep(DELAY_KEY_IRQ).await;
         let adc = read();
         let key_code = decode(adc);
         self.notify_key_event(key_code).await;
      } else if hs_type == AccessoryType::NoMic || hs_type == AccessoryType::UnknownMic {
         info!("IGNORE key IRQ (Unstable HPIN)");
         self
            .update_mic_status(self.0.config.mic_detect_retries)
            .await;
      }
      1
   }
}
