//! The shared accessory-manager context.
//!
//! `Headset` is the one explicit context handed to every workflow: the
//! notifier table, the mutex-guarded classification record, the task
//! slots and the event sender. It is cheaply cloneable and thread-safe;
//! the detection, button, debug and attribute workflows are implemented
//! as further `impl Headset` blocks in their own modules.

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use log::{debug, info};
use tokio::time::{self, Instant};

use crate::config::Config;
use crate::event::{EventSender, HeadsetEvent};
use crate::headset::{
   notifier::{Capability, NotifierHook, NotifierTable, Platform},
   scheduler::TaskSlot,
   state::{ButtonState, SharedState, WakeLease},
   types::{AccessoryType, StatusBits, USB_AUDIO_ANALOG, USB_AUDIO_UNPLUG, UsbAccessory},
};

/// Settle time for the mic bias rail and the TV-out probe.
pub(crate) const DELAY_MIC_BIAS: Duration = Duration::from_millis(200);
/// One-second spacing used by diagnostic polling and the indicator confirm.
pub(crate) const DELAY_SEC: Duration = Duration::from_secs(1);
/// HPIN edges within this window mean the pin has not settled yet.
pub(crate) const UNSTABLE_WINDOW: Duration = Duration::from_millis(1200);
/// Keep-awake budget for externally triggered handlers.
pub(crate) const WAKE_TIMEOUT: Duration = Duration::from_secs(2);
/// Keep-awake budget for one mic-poll firing.
pub(crate) const MIC_DETECT_WAKE: Duration = Duration::from_secs(3);

pub(crate) struct HeadsetInner {
   pub(crate) config: Config,
   pub(crate) platform: Platform,
   pub(crate) notifiers: NotifierTable,
   pub(crate) state: tokio::sync::Mutex<SharedState>,
   pub(crate) button: ButtonState,
   pub(crate) button_slot: TaskSlot,
   pub(crate) insert_slot: TaskSlot,
   pub(crate) remove_slot: TaskSlot,
   pub(crate) mic_slot: TaskSlot,
   pub(crate) debug_slot: TaskSlot,
   pub(crate) debug_flag: AtomicU32,
   pub(crate) hpin_at: AtomicCell<Instant>,
   pub(crate) insert_at: AtomicCell<Instant>,
   pub(crate) wake: WakeLease,
   pub(crate) events: EventSender,
}

/// Accessory manager handle.
#[derive(Clone)]
pub struct Headset(pub(crate) Arc<HeadsetInner>);

impl Headset {
   pub fn new(events: EventSender, config: Config, platform: Platform) -> Self {
      let now = Instant::now();
      let headset = Self(Arc::new(HeadsetInner {
         config,
         platform,
         notifiers: NotifierTable::default(),
         state: tokio::sync::Mutex::new(SharedState::default()),
         button: ButtonState::default(),
         button_slot: TaskSlot::new("button"),
         insert_slot: TaskSlot::new("insert"),
         remove_slot: TaskSlot::new("remove"),
         mic_slot: TaskSlot::new("mic-detect"),
         debug_slot: TaskSlot::new("debug-poll"),
         debug_flag: AtomicU32::new(0),
         hpin_at: AtomicCell::new(now),
         insert_at: AtomicCell::new(now),
         wake: WakeLease::new("hs_mgr"),
         events,
      }));
      headset.init_probe_pins();
      headset
   }

   /// Parks the TV-out probe pins in their idle routing.
   fn init_probe_pins(&self) {
      let platform = &self.0.platform;
      if let Some(hp) = &platform.hptv_det_hp {
         hp(true);
      }
      if let Some(tv) = &platform.hptv_det_tv {
         tv(false);
      }
      if let Some(sel) = &platform.hptv_sel {
         sel(false);
      }
   }

   pub(crate) fn stay_awake(&self, timeout: Duration) {
      self.0.wake.hold(timeout);
   }

   /// Records an HPIN presence-line edge; feeds the stability gate.
   pub fn notify_hpin_irq(&self) {
      self.0.hpin_at.store(Instant::now());
      match self.0.notifiers.hpin_gpio() {
         Some(pin) => info!("HPIN IRQ ({})", pin()),
         None => info!("HPIN IRQ"),
      }
   }

   /// Whether the presence line has been quiet long enough to trust
   /// button and key events.
   pub fn hpin_stable(&self) -> bool {
      Instant::now() > self.0.hpin_at.load() + UNSTABLE_WINDOW
   }

   pub async fn accessory_type(&self) -> AccessoryType {
      self.0.state.lock().await.hs_type
   }

   pub async fn status_bits(&self) -> StatusBits {
      self.0.state.lock().await.h2w_bits
   }

   /// Registers a hardware callback and runs the capability-specific
   /// reconciliation. Returns whether the registration was accepted.
   pub async fn register(&self, hook: NotifierHook) -> bool {
      let capability = hook.capability();
      info!("Register {capability} notifier");
      self.0.notifiers.install(hook);

      match capability {
         Capability::RemoteAdc | Capability::MicStatus => {
            self.update_mic_status(self.0.config.mic_detect_retries).await;
         }
         Capability::MicBias => {
            self.reconcile_mic_bias().await;
         }
         _ => {}
      }
      true
   }

   /// A mic-bias back-end appeared: if an accessory is already inserted
   /// and no external supply switch overrides bias handling, drive the
   /// rail and re-poll.
   async fn reconcile_mic_bias(&self) {
      if self.0.platform.headset_power.is_some() {
         return;
      }
      {
         let mut state = self.0.state.lock().await;
         if state.hs_type == AccessoryType::Unplug {
            return;
         }
         if let Some(bias) = self.0.notifiers.mic_bias_enable() {
            bias(true);
         }
         state.mic_bias_on = true;
      }
      time::sleep(DELAY_MIC_BIAS).await;
      self.update_mic_status(self.0.config.mic_detect_retries).await;
   }

   /// Drives mic bias, mic select and the key hardware for an insert or
   /// remove. Bias toggling is debounced against the stored flag; the
   /// select and key callbacks track every transition.
   pub(crate) async fn set_hw_state(&self, on: bool) {
      debug!("set_hw_state({on})");
      let bias = self.0.notifiers.mic_bias_enable();
      if bias.is_some() || self.0.platform.headset_power.is_some() {
         let mut state = self.0.state.lock().await;
         if state.mic_bias_on != on {
            if let Some(power) = &self.0.platform.headset_power {
               power(on);
            }
            if let Some(bias) = &bias {
               bias(on);
            }
            state.mic_bias_on = on;
            drop(state);
            if on {
               // Wait for MIC bias stable
               time::sleep(DELAY_MIC_BIAS).await;
            }
         }
      }

      if let Some(select) = self.0.notifiers.mic_select() {
         select(on);
      }
      if let Some(key) = self.0.notifiers.key_enable() {
         key(on);
      }
      if let Some(key_int) = self.0.notifiers.key_int_enable() {
         key_int(on);
      }
   }

   /// Restarts bounded mic polling if an accessory is externally
   /// inserted.
   pub(crate) async fn update_mic_status(&self, count: u32) {
      if !self.0.state.lock().await.is_ext_insert {
         return;
      }
      info!("Start MIC status polling ({count})");
      self.0.mic_slot.cancel().await;
      self.0.state.lock().await.mic_detect_counter = count;
      let headset = self.clone();
      self
         .0
         .mic_slot
         .schedule(Duration::ZERO, headset.mic_detect_task())
         .await;
   }

   pub(crate) fn publish_h2w(&self, state: &mut SharedState, bits: StatusBits) {
      if state.h2w_bits != bits {
         state.h2w_bits = bits;
         self.0.events.emit(HeadsetEvent::StateChanged(bits));
      }
   }

   pub(crate) fn publish_usb(&self, state: &mut SharedState, value: u32) {
      if state.usb_bits != value {
         state.usb_bits = value;
         self.0.events.emit(HeadsetEvent::UsbAudioChanged(value));
      }
   }

   pub(crate) fn set_accessory(&self, state: &mut SharedState, ty: AccessoryType) {
      if state.hs_type != ty {
         state.hs_type = ty;
         self.0.events.emit(HeadsetEvent::AccessoryChanged(ty));
      }
   }

   pub(crate) fn enable_metrico(&self, state: &mut SharedState, enable: bool) {
      if enable && !state.metrico_on {
         state.metrico_on = true;
         info!("Enable metrico headset");
      }
      if !enable && state.metrico_on {
         state.metrico_on = false;
         info!("Disable metrico headset");
      }
   }

   /// Sets or clears `bits` in the published status word.
   pub async fn switch_send_event(&self, bits: StatusBits, on: bool) {
      let mut state = self.0.state.lock().await;
      let mut word = state.h2w_bits & !bits;
      if on {
         word |= bits;
      }
      self.publish_h2w(&mut state, word);
   }

   /// USB accessory channel: publishes the usb-audio headset bit and the
   /// dedicated usb_audio value under the same lock as the main state.
   pub async fn notify_usb_audio(&self, ty: UsbAccessory) {
      let mut state = self.0.state.lock().await;
      match ty {
         UsbAccessory::NoHeadset => {
            state.usb_type = UsbAccessory::NoHeadset;
            let bits = state.h2w_bits & !StatusBits::MASK_USB;
            info!("Remove USB_AUDIO_OUT (state {bits}, {USB_AUDIO_UNPLUG})");
            self.publish_h2w(&mut state, bits);
            self.publish_usb(&mut state, USB_AUDIO_UNPLUG);
         }
         UsbAccessory::AudioOut => {
            state.usb_type = UsbAccessory::AudioOut;
            let bits = state.h2w_bits | StatusBits::USB_AUDIO_OUT;
            info!("Insert USB_AUDIO_OUT (state {bits}, {USB_AUDIO_ANALOG})");
            self.publish_h2w(&mut state, bits);
            self.publish_usb(&mut state, USB_AUDIO_ANALOG);
         }
      }
   }

   /// Structured status dump for the D-Bus surface.
   pub async fn to_json(&self) -> serde_json::Value {
      let state = self.0.state.lock().await;
      serde_json::json!({
         "type": state.hs_type.to_string(),
         "status": state.h2w_bits.bits(),
         "usb_audio": state.usb_bits,
         "ext_insert": state.is_ext_insert,
         "mic_bias": state.mic_bias_on,
         "awake": self.0.wake.is_held(),
      })
   }
}

#[cfg(test)]
mod tests {
   use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

   use super::*;
   use crate::headset::testing::{fixture, fixture_with, mic_table};

   #[tokio::test(start_paused = true)]
   async fn test_usb_audio_channel() {
      let (headset, bus) = fixture(Config::default());

      headset.notify_usb_audio(UsbAccessory::AudioOut).await;
      assert!(
         headset
            .status_bits()
            .await
            .contains(StatusBits::USB_AUDIO_OUT)
      );
      assert!(
         bus.events()
            .contains(&HeadsetEvent::UsbAudioChanged(USB_AUDIO_ANALOG))
      );

      headset.notify_usb_audio(UsbAccessory::NoHeadset).await;
      assert!(headset.status_bits().await.is_empty());
      assert!(
         bus.events()
            .contains(&HeadsetEvent::UsbAudioChanged(USB_AUDIO_UNPLUG))
      );
   }

   #[tokio::test(start_paused = true)]
   async fn test_switch_send_event_leaves_other_groups() {
      let (headset, _bus) = fixture(Config::default());

      headset
         .switch_send_event(StatusBits::FM_HEADSET, true)
         .await;
      headset
         .switch_send_event(StatusBits::USB_AUDIO_OUT, true)
         .await;
      headset
         .switch_send_event(StatusBits::FM_HEADSET, false)
         .await;

      let bits = headset.status_bits().await;
      assert!(bits.contains(StatusBits::USB_AUDIO_OUT));
      assert!(!bits.intersects(StatusBits::MASK_FM));
   }

   #[tokio::test(start_paused = true)]
   async fn test_adc_registration_triggers_repoll_when_inserted() {
      let reads = Arc::new(AtomicU32::new(0));
      let counter = reads.clone();
      let (headset, _bus) = fixture(Config {
         adc_table: mic_table(),
         ..Config::default()
      });

      headset.0.state.lock().await.is_ext_insert = true;
      headset
         .register(NotifierHook::RemoteAdc(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            1000
         })))
         .await;

      time::sleep(Duration::from_secs(3)).await;
      assert!(reads.load(Ordering::SeqCst) >= 1);
   }

   #[tokio::test(start_paused = true)]
   async fn test_mic_bias_registration_reconciles() {
      let driven = Arc::new(AtomicBool::new(false));
      let flag = driven.clone();
      let (headset, _bus) = fixture(Config::default());

      {
         let mut state = headset.0.state.lock().await;
         state.hs_type = AccessoryType::Mic;
         state.is_ext_insert = true;
      }
      headset
         .register(NotifierHook::MicBiasEnable(Arc::new(move |on| {
            flag.store(on, Ordering::SeqCst);
         })))
         .await;

      assert!(driven.load(Ordering::SeqCst));
      assert!(headset.0.state.lock().await.mic_bias_on);
   }

   #[tokio::test(start_paused = true)]
   async fn test_mic_bias_registration_skipped_without_accessory() {
      let driven = Arc::new(AtomicBool::new(false));
      let flag = driven.clone();
      let (headset, _bus) = fixture(Config::default());

      headset
         .register(NotifierHook::MicBiasEnable(Arc::new(move |on| {
            flag.store(on, Ordering::SeqCst);
         })))
         .await;

      assert!(!driven.load(Ordering::SeqCst));
   }

   #[tokio::test(start_paused = true)]
   async fn test_set_hw_state_is_bias_idempotent() {
      let toggles = Arc::new(AtomicU32::new(0));
      let counter = toggles.clone();
      let (headset, _bus) = fixture(Config::default());
      headset
         .register(NotifierHook::MicBiasEnable(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
         })))
         .await;

      headset.set_hw_state(true).await;
      headset.set_hw_state(true).await;
      assert_eq!(toggles.load(Ordering::SeqCst), 1);

      headset.set_hw_state(false).await;
      assert_eq!(toggles.load(Ordering::SeqCst), 2);
   }

   #[tokio::test(start_paused = true)]
   async fn test_probe_pins_parked_at_attach() {
      let hp = Arc::new(AtomicBool::new(false));
      let tv = Arc::new(AtomicBool::new(true));
      let hp_flag = hp.clone();
      let tv_flag = tv.clone();
      let platform = Platform {
         hptv_det_hp: Some(Box::new(move |level| hp_flag.store(level, Ordering::SeqCst))),
         hptv_det_tv: Some(Box::new(move |level| tv_flag.store(level, Ordering::SeqCst))),
         ..Platform::default()
      };
      let (_headset, _bus) = fixture_with(Config::default(), platform);

      assert!(hp.load(Ordering::SeqCst));
      assert!(!tv.load(Ordering::SeqCst));
   }

   #[tokio::test(start_paused = true)]
   async fn test_hpin_stability_window() {
      let (headset, _bus) = fixture(Config::default());
      assert!(!headset.hpin_stable());

      time::sleep(Duration::from_secs(2)).await;
      assert!(headset.hpin_stable());

      headset.notify_hpin_irq();
      assert!(!headset.hpin_stable());
   }
}
