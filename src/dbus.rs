use std::str::FromStr;

use log::info;
use zbus::{interface, object_server::SignalEmitter};

use crate::headset::manager::Headset;
use crate::headset::types::UsbAccessory;

pub struct HeadsetService {
   headset: Headset,
}

impl HeadsetService {
   pub const fn new(headset: Headset) -> Self {
      Self { headset }
   }
}

#[interface(name = "org.headsetd.Accessory")]
impl HeadsetService {
   async fn get_status(&self) -> String {
      self.headset.to_json().await.to_string()
   }

   async fn get_attribute(&self, name: String) -> zbus::fdo::Result<String> {
      self
         .headset
         .attr_read(&name)
         .await
         .map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))
   }

   async fn set_attribute(&self, name: String, value: String) -> zbus::fdo::Result<bool> {
      self
         .headset
         .attr_write(&name, &value)
         .await
         .map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))?;
      info!("Set attribute {name} to {value}");
      Ok(true)
   }

   /// External plug notification from a presence back-end.
   async fn notify_plug(&self, inserted: bool) -> i32 {
      self.headset.notify_plug(inserted).await
   }

   /// Presence-line edge; only feeds the stability gate.
   fn notify_hpin_irq(&self) {
      self.headset.notify_hpin_irq();
   }

   async fn notify_key_event(&self, key_code: i32) -> i32 {
      self.headset.notify_key_event(key_code).await
   }

   async fn notify_key_irq(&self) -> i32 {
      self.headset.notify_key_irq().await
   }

   async fn notify_usb_audio(&self, accessory: String) -> zbus::fdo::Result<bool> {
      let ty = UsbAccessory::from_str(&accessory)
         .map_err(|_| zbus::fdo::Error::InvalidArgs(format!("Unknown USB accessory: {accessory}")))?;
      self.headset.notify_usb_audio(ty).await;
      Ok(true)
   }

   // Signals. The h2w prefix keeps the published-word signal clear of
   // the `state` property's change notification.
   #[zbus(signal)]
   pub async fn h2w_state_changed(emitter: &SignalEmitter<'_>, state: u32) -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn usb_audio_changed(emitter: &SignalEmitter<'_>, value: u32) -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn accessory_changed(emitter: &SignalEmitter<'_>, accessory: &str)
   -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn key_event(
      emitter: &SignalEmitter<'_>,
      code: u16,
      pressed: bool,
   ) -> zbus::Result<()>;

   // Properties for polling-free updates
   #[zbus(property)]
   async fn state(&self) -> String {
      self.headset.accessory_type().await.to_string()
   }

   #[zbus(property)]
   async fn status(&self) -> u32 {
      self.headset.status_bits().await.bits()
   }
}
