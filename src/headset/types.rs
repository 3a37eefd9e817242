//! Accessory, key and published-status types.
//!
//! This module contains the closed set of accessory classifications, the
//! published status bitmask and the remote-control key codes used across
//! the detection and button workflows.

use core::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

/// Classification of the accessory currently on the 3.5mm jack.
///
/// Exactly one value is current at any time; it starts at `Unplug` and is
/// only rewritten by the insert/remove and mic-poll workflows.
#[repr(u8)]
#[derive(
   Debug,
   Default,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   Deserialize,
   strum::Display,
   strum::EnumString,
   strum::FromRepr,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryType {
   #[default]
   #[strum(serialize = "headset_unplug")]
   Unplug = 0,
   #[strum(serialize = "headset_no_mic")]
   NoMic,
   #[strum(serialize = "headset_mic")]
   Mic,
   #[strum(serialize = "headset_metrico")]
   Metrico,
   #[strum(serialize = "headset_unknown_mic")]
   UnknownMic,
   #[strum(serialize = "headset_tv_out")]
   TvOut,
   #[strum(serialize = "headset_unstable")]
   Unstable,
   #[strum(serialize = "headset_indicator")]
   Indicator,
   #[strum(serialize = "headset_beats")]
   Beats,
   #[strum(serialize = "headset_beats_solo")]
   BeatsSolo,
}

impl AccessoryType {
   /// Whether this accessory carries a working microphone and can therefore
   /// deliver remote-control button events.
   pub const fn has_mic(self) -> bool {
      matches!(
         self,
         Self::Mic | Self::Metrico | Self::Beats | Self::BeatsSolo
      )
   }
}

/// Published status bitmask.
///
/// One flags word covering five independent concerns, published as a unit:
/// - headset class: [`Self::HEADSET_MIC`], [`Self::HEADSET_NO_MIC`],
///   [`Self::PLUG_35MM`], [`Self::TV_OUT`]
/// - USB audio: [`Self::USB_AUDIO_OUT`]
/// - TTY routing: [`Self::TTY_FULL`], [`Self::TTY_VCO`], [`Self::TTY_HCO`]
/// - FM routing: [`Self::FM_HEADSET`], [`Self::FM_SPEAKER`]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusBits(u32);

impl StatusBits {
   pub const NONE: Self = Self(0);

   pub const HEADSET_MIC: Self = Self(1 << 0);
   pub const HEADSET_NO_MIC: Self = Self(1 << 1);
   pub const TTY_FULL: Self = Self(1 << 2);
   pub const FM_HEADSET: Self = Self(1 << 3);
   pub const TTY_VCO: Self = Self(1 << 4);
   pub const FM_SPEAKER: Self = Self(1 << 5);
   pub const TTY_HCO: Self = Self(1 << 6);
   pub const PLUG_35MM: Self = Self(1 << 7);
   pub const TV_OUT: Self = Self(1 << 8);
   pub const USB_AUDIO_OUT: Self = Self(1 << 13);

   /// All headset-class bits owned by the 3.5mm detection workflow.
   pub const MASK_35MM: Self = Self(
      Self::HEADSET_MIC.0 | Self::HEADSET_NO_MIC.0 | Self::PLUG_35MM.0 | Self::TV_OUT.0,
   );
   pub const MASK_TTY: Self = Self(Self::TTY_FULL.0 | Self::TTY_VCO.0 | Self::TTY_HCO.0);
   pub const MASK_FM: Self = Self(Self::FM_HEADSET.0 | Self::FM_SPEAKER.0);
   pub const MASK_USB: Self = Self(Self::USB_AUDIO_OUT.0);

   pub const fn bits(self) -> u32 {
      self.0
   }

   pub const fn from_bits(bits: u32) -> Self {
      Self(bits)
   }

   pub const fn is_empty(self) -> bool {
      self.0 == 0
   }

   pub const fn contains(self, other: Self) -> bool {
      self.0 & other.0 == other.0
   }

   pub const fn intersects(self, other: Self) -> bool {
      self.0 & other.0 != 0
   }
}

impl BitOr for StatusBits {
   type Output = Self;
   fn bitor(self, rhs: Self) -> Self {
      Self(self.0 | rhs.0)
   }
}

impl BitOrAssign for StatusBits {
   fn bitor_assign(&mut self, rhs: Self) {
      self.0 |= rhs.0;
   }
}

impl BitAnd for StatusBits {
   type Output = Self;
   fn bitand(self, rhs: Self) -> Self {
      Self(self.0 & rhs.0)
   }
}

impl BitAndAssign for StatusBits {
   fn bitand_assign(&mut self, rhs: Self) {
      self.0 &= rhs.0;
   }
}

impl Not for StatusBits {
   type Output = Self;
   fn not(self) -> Self {
      Self(!self.0)
   }
}

impl fmt::Debug for StatusBits {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "StatusBits({:#06x})", self.0)
   }
}

impl fmt::Display for StatusBits {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{:#06x}", self.0)
   }
}

/// Input key identifiers emitted for remote-control buttons.
///
/// Discriminants are Linux input key codes, so consumers can forward
/// them to an input layer unchanged.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
pub enum KeyCode {
   #[strum(serialize = "END")]
   End = 107,
   #[strum(serialize = "MUTE")]
   Mute = 113,
   #[strum(serialize = "VOLDOWN")]
   VolDown = 114,
   #[strum(serialize = "VOLUP")]
   VolUp = 115,
   #[strum(serialize = "FORWARD")]
   Forward = 159,
   #[strum(serialize = "PLAY")]
   Play = 164,
   #[strum(serialize = "BACKWARD")]
   Backward = 165,
   #[strum(serialize = "MEDIA")]
   Media = 226,
   #[strum(serialize = "SEND")]
   Send = 231,
}

/// Accessory type on the secondary USB channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum UsbAccessory {
   #[default]
   #[strum(serialize = "none")]
   NoHeadset,
   #[strum(serialize = "audio_out")]
   AudioOut,
}

/// Values published on the dedicated `usb_audio` channel.
pub const USB_AUDIO_UNPLUG: u32 = 0;
pub const USB_AUDIO_ANALOG: u32 = 1;

/// TTY routing mode, reported back as its numeric value.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::EnumString)]
pub enum TtyMode {
   #[default]
   #[strum(serialize = "disable")]
   Disable = 0,
   #[strum(serialize = "enable")]
   Full = 1,
   #[strum(serialize = "vco_enable")]
   Vco = 2,
   #[strum(serialize = "hco_enable")]
   Hco = 3,
}

impl TtyMode {
   pub const fn status_bit(self) -> StatusBits {
      match self {
         Self::Disable => StatusBits::NONE,
         Self::Full => StatusBits::TTY_FULL,
         Self::Vco => StatusBits::TTY_VCO,
         Self::Hco => StatusBits::TTY_HCO,
      }
   }
}

/// FM routing mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum FmMode {
   #[default]
   #[strum(serialize = "disable")]
   Disable,
   #[strum(serialize = "fm_headset")]
   Headset,
   #[strum(serialize = "fm_speaker")]
   Speaker,
}

impl FmMode {
   pub const fn status_bit(self) -> StatusBits {
      match self {
         Self::Disable => StatusBits::NONE,
         Self::Headset => StatusBits::FM_HEADSET,
         Self::Speaker => StatusBits::FM_SPEAKER,
      }
   }
}

#[cfg(test)]
mod tests {
   use std::str::FromStr;

   use super::*;

   #[test]
   fn test_accessory_names() {
      assert_eq!(AccessoryType::Mic.to_string(), "headset_mic");
      assert_eq!(AccessoryType::BeatsSolo.to_string(), "headset_beats_solo");
      assert_eq!(
         AccessoryType::from_str("headset_tv_out").unwrap(),
         AccessoryType::TvOut
      );
      assert!(AccessoryType::from_str("headset_bogus").is_err());
   }

   #[test]
   fn test_mic_capability() {
      for ty in [
         AccessoryType::Mic,
         AccessoryType::Metrico,
         AccessoryType::Beats,
         AccessoryType::BeatsSolo,
      ] {
         assert!(ty.has_mic(), "{ty} should carry a mic");
      }
      for ty in [
         AccessoryType::Unplug,
         AccessoryType::NoMic,
         AccessoryType::UnknownMic,
         AccessoryType::TvOut,
         AccessoryType::Unstable,
         AccessoryType::Indicator,
      ] {
         assert!(!ty.has_mic(), "{ty} should not carry a mic");
      }
   }

   #[test]
   fn test_bit_groups_are_disjoint() {
      let groups = [
         StatusBits::MASK_35MM,
         StatusBits::MASK_TTY,
         StatusBits::MASK_FM,
         StatusBits::MASK_USB,
      ];
      for (i, a) in groups.iter().enumerate() {
         for b in &groups[i + 1..] {
            assert!(!a.intersects(*b), "{a} overlaps {b}");
         }
      }
   }

   #[test]
   fn test_bit_ops() {
      let bits = StatusBits::HEADSET_MIC | StatusBits::PLUG_35MM;
      assert!(bits.contains(StatusBits::HEADSET_MIC));
      assert!(bits.intersects(StatusBits::MASK_35MM));
      let cleared = bits & !StatusBits::MASK_35MM;
      assert!(cleared.is_empty());
   }

   #[test]
   fn test_key_code_repr_round_trip() {
      assert_eq!(KeyCode::from_repr(226), Some(KeyCode::Media));
      assert_eq!(KeyCode::from_repr(0), None);
      assert_eq!(KeyCode::Media.to_string(), "MEDIA");
   }

   #[test]
   fn test_routing_mode_bits() {
      assert_eq!(TtyMode::Vco.status_bit(), StatusBits::TTY_VCO);
      assert_eq!(FmMode::Speaker.status_bit(), StatusBits::FM_SPEAKER);
      assert_eq!(TtyMode::from_str("hco_enable").unwrap(), TtyMode::Hco);
      assert_eq!(FmMode::from_str("fm_headset").unwrap(), FmMode::Headset);
   }
}
