//! Single-slot deferred task scheduling.
//!
//! Each workflow owns a handful of named slots (insert, remove, mic poll,
//! button debounce, debug poll). A slot holds at most one outstanding task;
//! scheduling replaces whatever was pending, and cancellation aborts the
//! task and waits until it can no longer run. A cancel that loses the race
//! to an already-running task is tolerated, not an error.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::{sync::Mutex, task::JoinHandle, time};

pub struct TaskSlot {
   name: &'static str,
   handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
   pub fn new(name: &'static str) -> Self {
      Self {
         name,
         handle: Mutex::new(None),
      }
   }

   /// Schedules `task` to run after `delay`, superseding any pending task
   /// in this slot.
   pub async fn schedule<F>(&self, delay: Duration, task: F)
   where
      F: Future<Output = ()> + Send + 'static,
   {
      let mut slot = self.handle.lock().await;
      if let Some(old) = slot.take() {
         if !old.is_finished() {
            debug!("{} task superseded", self.name);
            old.abort();
            let _ = old.await;
         }
      }
      *slot = Some(tokio::spawn(async move {
         time::sleep(delay).await;
         task.await;
      }));
   }

   /// Cancels the pending task and waits for the cancellation to take
   /// effect. Returns true if a task was still pending.
   pub async fn cancel(&self) -> bool {
      let mut slot = self.handle.lock().await;
      let Some(handle) = slot.take() else {
         return false;
      };
      if handle.is_finished() {
         let _ = handle.await;
         return false;
      }
      handle.abort();
      match handle.await {
         Err(err) if err.is_cancelled() => {
            debug!("{} task cancelled", self.name);
            true
         }
         // Completed between the abort and the await
         _ => false,
      }
   }

   /// Whether a scheduled task has not yet run to completion.
   pub async fn is_pending(&self) -> bool {
      self
         .handle
         .lock()
         .await
         .as_ref()
         .is_some_and(|handle| !handle.is_finished())
   }
}
