//! Accessory-jack D-Bus service.
//!
//! This service owns the 3.5mm jack detection, classification and
//! remote-control button workflows and exposes them on the session bus,
//! with signals for published state, USB audio routing and key activity.

use std::{sync::Arc, time::Duration};

use crossbeam::queue::SegQueue;
use log::{info, warn};
use tokio::{signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use dbus::HeadsetService;
use event::{EventBus, HeadsetEvent};
use headset::{manager::Headset, notifier::Platform};

mod config;
mod dbus;
mod error;
mod event;
mod headset;

use crate::{dbus::HeadsetServiceSignals, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting headsetd D-Bus service...");

   // Load configuration
   let config = config::Config::load()?;
   info!(
      "Loaded configuration with {} ADC table entries",
      config.adc_table.len()
   );

   // Create event channel
   let event_bus = EventProcessor::new();

   // Create the accessory manager; hardware back-ends attach later via
   // the notifier registry.
   let headset = Headset::new(event_bus.clone(), config, Platform::default());

   // Create D-Bus service
   let service = HeadsetService::new(headset);

   // Build D-Bus connection
   let connection = connection::Builder::session()?
      .name("org.headsetd")?
      .serve_at("/org/headsetd/accessory", service)?
      .build()
      .await?;

   info!("headsetd D-Bus service started at org.headsetd");

   // Start event processor
   event_bus.spawn_dispatcher(connection).await?;

   // Wait for shutdown signal
   signal::ctrl_c().await?;
   info!("Shutting down headsetd service...");

   Ok(())
}

struct EventProcessor {
   queue: SegQueue<HeadsetEvent>,
   notifier: Notify,
}

impl EventProcessor {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }
}

impl EventProcessor {
   async fn recv(self: &Arc<Self>) -> Option<HeadsetEvent> {
      loop {
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         let notify = self.notifier.notified();
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn dispatch(
      &self,
      iface: &InterfaceRef<HeadsetService>,
      event: HeadsetEvent,
   ) -> Result<()> {
      match event {
         HeadsetEvent::StateChanged(bits) => {
            iface.h2w_state_changed(bits.bits()).await?;
         }
         HeadsetEvent::UsbAudioChanged(value) => {
            iface.usb_audio_changed(value).await?;
         }
         HeadsetEvent::AccessoryChanged(ty) => {
            iface.accessory_changed(&ty.to_string()).await?;
         }
         HeadsetEvent::Key { code, pressed } => {
            iface.key_event(code as u16, pressed).await?;
         }
      }
      Ok(())
   }

   async fn spawn_dispatcher(self: Arc<Self>, connection: Connection) -> Result<()> {
      let iface = connection
         .object_server()
         .interface::<_, HeadsetService>("/org/headsetd/accessory")
         .await?;
      tokio::spawn(async move {
         while let Some(event) = self.recv().await {
            if let Err(e) = self.dispatch(&iface, event).await {
               warn!("Error dispatching event: {e}");
            }
         }
      });

      Ok(())
   }
}

impl EventBus for EventProcessor {
   fn emit(&self, event: HeadsetEvent) {
      self.queue.push(event);
      self.notifier.notify_waiters();
   }
}
