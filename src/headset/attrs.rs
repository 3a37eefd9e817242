//! Attribute surface.
//!
//! String-valued control knobs exposed over the bus: the current state,
//! an accessory simulator, TTY and FM routing, and the debug commands.
//! Reads and writes go through one `attr_read`/`attr_write` pair so the
//! bus layer stays a thin shim.

use std::str::FromStr;

use log::info;

use crate::error::{HeadsetError, Result};
use crate::headset::debugpoll::{DEBUG_FLAG_ADC, DEBUG_FLAG_LOG};
use crate::headset::manager::Headset;
use crate::headset::types::{AccessoryType, FmMode, StatusBits, TtyMode, UsbAccessory};

impl Headset {
   pub async fn attr_read(&self, attr: &str) -> Result<String> {
      let state = self.0.state.lock().await;
      match attr {
         "state" | "simulate" => Ok(state.hs_type.to_string()),
         "tty" => Ok((state.tty_mode as u8).to_string()),
         "fm" => Ok(state.fm_mode.to_string()),
         "debug" => {
            drop(state);
            let flag = if self.debug_flag(DEBUG_FLAG_ADC) { 1 } else { 0 };
            let mut line = format!("Debug Flag {flag}");
            if let Some(pin) = self.0.notifiers.hpin_gpio() {
               line.push_str(&format!(", HP_DET {}", pin()));
            }
            if let Some(read) = self.0.notifiers.remote_adc() {
               line.push_str(&format!(", ADC {}", read()));
            }
            Ok(line)
         }
         _ => Err(HeadsetError::UnknownAttribute(attr.to_owned())),
      }
   }

   pub async fn attr_write(&self, attr: &str, value: &str) -> Result<()> {
      match attr {
         "simulate" => self.write_simulate(value).await,
         "tty" => self.write_tty(value).await,
         "fm" => self.write_fm(value).await,
         "debug" => self.write_debug(value).await,
         _ => Err(HeadsetError::UnknownAttribute(attr.to_owned())),
      }
   }

   /// Forces a simulated accessory state, replacing whatever the
   /// detection workflow had published on the 3.5mm and USB groups.
   /// The old bits are cleared in their own publish first so
   /// falling-edge consumers see the previous accessory go away.
   async fn write_simulate(&self, value: &str) -> Result<()> {
      let mic = AccessoryType::from_str(value).map_err(|_| HeadsetError::InvalidCommand {
         attr: "simulate",
         value: value.to_owned(),
      })?;
      // An in-flight polling state is not a valid simulation target
      if mic == AccessoryType::Unstable {
         return Err(HeadsetError::InvalidCommand {
            attr: "simulate",
            value: value.to_owned(),
         });
      }

      info!("Simulate {mic}");
      self.set_hw_state(mic != AccessoryType::Unplug).await;

      let mut state = self.0.state.lock().await;
      let cleared = state.h2w_bits & !(StatusBits::MASK_35MM | StatusBits::MASK_USB);
      self.publish_h2w(&mut state, cleared);
      self.set_accessory(&mut state, mic);
      if mic == AccessoryType::Unplug {
         return Ok(());
      }

      let base = cleared | StatusBits::PLUG_35MM;
      let bits = match mic {
         AccessoryType::NoMic | AccessoryType::UnknownMic => base | StatusBits::HEADSET_NO_MIC,
         AccessoryType::TvOut => base | StatusBits::TV_OUT,
         AccessoryType::Indicator => base,
         _ => base | StatusBits::HEADSET_MIC,
      };
      self.publish_h2w(&mut state, bits);
      Ok(())
   }

   async fn write_tty(&self, value: &str) -> Result<()> {
      let mode = TtyMode::from_str(value).map_err(|_| HeadsetError::InvalidCommand {
         attr: "tty",
         value: value.to_owned(),
      })?;

      let mut state = self.0.state.lock().await;
      state.tty_mode = mode;
      let bits = (state.h2w_bits & !StatusBits::MASK_TTY) | mode.status_bit();
      self.publish_h2w(&mut state, bits);
      info!("TTY mode {}", mode as u8);
      Ok(())
   }

   async fn write_fm(&self, value: &str) -> Result<()> {
      let mode = FmMode::from_str(value).map_err(|_| HeadsetError::InvalidCommand {
         attr: "fm",
         value: value.to_owned(),
      })?;

      let mut state = self.0.state.lock().await;
      state.fm_mode = mode;
      let bits = (state.h2w_bits & !StatusBits::MASK_FM) | mode.status_bit();
      self.publish_h2w(&mut state, bits);
      info!("FM mode {mode}");
      Ok(())
   }

   async fn write_debug(&self, value: &str) -> Result<()> {
      match value {
         "enable" => self.set_debug_poll(true).await,
         "disable" => self.set_debug_poll(false).await,
         "debug_log_enable" => self.set_debug_flag(DEBUG_FLAG_LOG, true),
         "debug_log_disable" => self.set_debug_flag(DEBUG_FLAG_LOG, false),
         "no_headset" => {
            self
               .switch_send_event(StatusBits::MASK_35MM | StatusBits::MASK_USB, false)
               .await;
         }
         "35mm_mic" => {
            self
               .switch_send_event(StatusBits::HEADSET_MIC | StatusBits::PLUG_35MM, true)
               .await;
         }
         "35mm_no_mic" => {
            self
               .switch_send_event(StatusBits::HEADSET_NO_MIC | StatusBits::PLUG_35MM, true)
               .await;
         }
         "35mm_tv_out" => {
            self
               .switch_send_event(StatusBits::TV_OUT | StatusBits::PLUG_35MM, true)
               .await;
         }
         "usb_audio" => self.notify_usb_audio(UsbAccessory::AudioOut).await,
         _ => {
            return Err(HeadsetError::InvalidCommand {
               attr: "debug",
               value: value.to_owned(),
            });
         }
      }
      Ok(())
   }
}
