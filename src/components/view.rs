use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use super::visibility::{ComponentList, CountdownEntry, VisibilityConfig};
use crate::api::models::ComponentRecord;
use crate::clock::Clock;
use crate::timer::ScheduledTask;

/// Identifies one load of the component view; stale tickets are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// What the browser needs to redraw the countdowns of the open list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListSnapshot {
    pub generation: u64,
    pub device_id: Option<String>,
    pub visible: Vec<CountdownEntry>,
    pub empty: bool,
}

/// The component list of one dashboard session, with at most one countdown
/// timer running against it.
pub struct ComponentView {
    config: VisibilityConfig,
    clock: Arc<dyn Clock>,
    generation: u64,
    device_id: Option<String>,
    list: Arc<Mutex<ComponentList>>,
    updates: watch::Sender<ListSnapshot>,
    timer: Option<ScheduledTask>,
}

impl ComponentView {
    pub fn new(config: VisibilityConfig, clock: Arc<dyn Clock>) -> Self {
        let (updates, _) = watch::channel(ListSnapshot::default());
        ComponentView {
            config,
            clock,
            generation: 0,
            device_id: None,
            list: Arc::new(Mutex::new(ComponentList::default())),
            updates,
            timer: None,
        }
    }

    /// Tears down the current list before another device's data is fetched.
    pub fn begin_load(&mut self, device_id: &str) -> LoadTicket {
        self.stop_timer();
        self.generation += 1;
        self.device_id = Some(device_id.to_string());
        *lock_list(&self.list) = ComponentList::default();
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Installs freshly fetched records. Returns `None` when a newer load has
    /// started since `ticket` was issued.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        records: Vec<ComponentRecord>,
    ) -> Option<ComponentList> {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "Discarding superseded component load"
            );
            return None;
        }

        let list = ComponentList::render(records, self.clock.now_ms(), self.config.window_ms());
        let needs_timer = list.has_countdowns();
        *lock_list(&self.list) = list.clone();
        self.publish();
        if needs_timer {
            self.start_timer();
        }
        Some(list)
    }

    #[cfg(test)]
    pub fn current(&self) -> ComponentList {
        lock_list(&self.list).clone()
    }

    #[cfg(test)]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    #[cfg(test)]
    pub fn is_ticking(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.updates.subscribe()
    }

    pub fn dispose(&mut self) {
        self.stop_timer();
    }

    fn snapshot(&self) -> ListSnapshot {
        snapshot_of(self.generation, &self.device_id, &lock_list(&self.list))
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn stop_timer(&mut self) {
        if let Some(task) = self.timer.take() {
            task.cancel();
        }
    }

    fn start_timer(&mut self) {
        self.stop_timer();

        let list = self.list.clone();
        let clock = self.clock.clone();
        let updates = self.updates.clone();
        let generation = self.generation;
        let device_id = self.device_id.clone();
        self.timer = Some(ScheduledTask::every(self.config.tick, move || {
            let mut list = lock_list(&list);
            let outcome = list.tick(clock.now_ms());
            for id in &outcome.removed {
                tracing::debug!(component = %id, "Replaced component hidden");
            }
            updates.send_replace(snapshot_of(generation, &device_id, &list));
            if list.has_countdowns() {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        }));
    }
}

impl Drop for ComponentView {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn snapshot_of(generation: u64, device_id: &Option<String>, list: &ComponentList) -> ListSnapshot {
    ListSnapshot {
        generation,
        device_id: device_id.clone(),
        visible: list.entries(),
        empty: list.is_empty(),
    }
}

fn lock_list(list: &Mutex<ComponentList>) -> MutexGuard<'_, ComponentList> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}
