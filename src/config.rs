//! Configuration management for the accessory service.
//!
//! This module handles loading and saving configuration from disk: the
//! ADC classification table, the board policy flags and the mic-poll
//! retry budget.

use std::{env, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HeadsetError, Result};
use crate::headset::types::AccessoryType;

/// One discrete ADC window mapped to an accessory type. Bounds are
/// inclusive; the first matching entry wins, so windows may overlap.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct AdcRange {
   pub adc_min: i32,
   pub adc_max: i32,
   pub accessory: AccessoryType,
}

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
   /// Discrete mic-line ADC table; empty means the board has none and
   /// classification falls back to the mic-status callback.
   #[serde(default)]
   pub adc_table: Vec<AdcRange>,

   /// Treat an unmatched ADC reading as nothing inserted instead of an
   /// unknown accessory.
   #[serde(default)]
   pub float_detect: bool,

   /// Workaround policy for legacy audio jacks: merge already-published
   /// headset bits instead of toggling them.
   #[serde(default)]
   pub legacy_audio_jack: bool,

   #[serde(default = "default_mic_detect_retries")]
   pub mic_detect_retries: u32,
}

const fn default_mic_detect_retries() -> u32 {
   10
}

impl Default for Config {
   fn default() -> Self {
      Self {
         adc_table: vec![],
         float_detect: false,
         legacy_audio_jack: false,
         mic_detect_retries: default_mic_detect_retries(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         // Create default config
         let config = Self::default();
         config.save()?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      // Ensure directory exists
      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(headsetd_home) = env::var("HEADSETD_HOME") {
         PathBuf::from(headsetd_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(HeadsetError::ConfigDirNotFound);
      };

      Ok(config_dir.join("headsetd").join("config.toml"))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let config = Config::default();
      assert!(config.adc_table.is_empty());
      assert!(!config.float_detect);
      assert!(!config.legacy_audio_jack);
      assert_eq!(config.mic_detect_retries, 10);
   }

   #[test]
   fn test_adc_table_round_trip() {
      let config = Config {
         adc_table: vec![
            AdcRange {
               adc_min: 0,
               adc_max: 200,
               accessory: AccessoryType::NoMic,
            },
            AdcRange {
               adc_min: 201,
               adc_max: 3000,
               accessory: AccessoryType::Mic,
            },
         ],
         float_detect: true,
         legacy_audio_jack: false,
         mic_detect_retries: 5,
      };

      let text = toml::to_string_pretty(&config).unwrap();
      let parsed: Config = toml::from_str(&text).unwrap();
      assert_eq!(parsed.adc_table.len(), 2);
      assert_eq!(parsed.adc_table[1].accessory, AccessoryType::Mic);
      assert!(parsed.float_detect);
      assert_eq!(parsed.mic_detect_retries, 5);
   }

   #[test]
   fn test_load_creates_default() {
      let dir = tempfile::tempdir().unwrap();
      // SAFETY: tests in this module run single-threaded over this var
      unsafe { env::set_var("HEADSETD_HOME", dir.path()) };

      let config = Config::load().unwrap();
      assert_eq!(config.mic_detect_retries, 10);
      assert!(dir.path().join("headsetd").join("config.toml").exists());

      unsafe { env::remove_var("HEADSETD_HOME") };
   }
}
