//! Resources acquired while the reader is active.
//!
//! Listener registrations and the legend refresh timer live here so deactivation can
//! release all of them through [`ActivationScope::teardown`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::managers::update_coalescer::{Debouncer, DEFAULT_DELAY};
use crate::types::page::{ListenerKind, RegistrationId};

#[derive(Debug)]
pub struct ActivationScope {
    registrations: BTreeMap<u8, (ListenerKind, RegistrationId)>,
    legend_refresh: Debouncer,
}

fn slot(kind: ListenerKind) -> u8 {
    match kind {
        ListenerKind::MutationObserver => 0,
        ListenerKind::PointerMove => 1,
        ListenerKind::Scroll => 2,
        ListenerKind::Resize => 3,
    }
}

impl ActivationScope {
    pub fn new(refresh_delay: Duration) -> Self {
        Self {
            registrations: BTreeMap::new(),
            legend_refresh: Debouncer::new(refresh_delay),
        }
    }

    /// Records a registration. Returns the previous handle of that kind, which the
    /// caller must release.
    pub fn register(&mut self, kind: ListenerKind, id: RegistrationId) -> Option<RegistrationId> {
        self.registrations
            .insert(slot(kind), (kind, id))
            .map(|(_, previous)| previous)
    }

    pub fn is_registered(&self, kind: ListenerKind) -> bool {
        self.registrations.contains_key(&slot(kind))
    }

    /// Forgets one registration and hands back its handle.
    pub fn release(&mut self, kind: ListenerKind) -> Option<RegistrationId> {
        self.registrations.remove(&slot(kind)).map(|(_, id)| id)
    }

    pub fn schedule_legend_refresh(&mut self, now: Instant) {
        self.legend_refresh.schedule(now);
    }

    pub fn cancel_legend_refresh(&mut self) {
        self.legend_refresh.cancel();
    }

    pub fn legend_refresh_due(&mut self, now: Instant) -> bool {
        self.legend_refresh.fire_if_due(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.legend_refresh.deadline()
    }

    /// Cancels timers and hands back every registration for release.
    pub fn teardown(&mut self) -> Vec<(ListenerKind, RegistrationId)> {
        self.legend_refresh.cancel();
        std::mem::take(&mut self.registrations).into_values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty() && !self.legend_refresh.is_pending()
    }
}

impl Default for ActivationScope {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}
