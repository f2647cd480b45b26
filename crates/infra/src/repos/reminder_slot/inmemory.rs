use super::{DueSlotClaim, IReminderSlotRepo};
use crate::repos::{reminder_rule::InMemoryReminderRuleRepo, shared::inmemory_repo::*};
use anniv_scheduler_domain::{ReminderDispatch, ReminderSlot, SlotSchedule, ID};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// Everything a claim needs to reach after it has left the repo
#[derive(Clone)]
struct SlotStore {
    slots: Arc<Mutex<Vec<ReminderSlot>>>,
    dispatches: Arc<Mutex<Vec<ReminderDispatch>>>,
    /// Slots held by a claim that is still open, the inmemory version of a
    /// row lock
    claimed: Arc<Mutex<HashSet<ID>>>,
}

pub struct InMemoryReminderSlotRepo {
    store: SlotStore,
    rules: Arc<InMemoryReminderRuleRepo>,
}

impl InMemoryReminderSlotRepo {
    pub fn new(rules: Arc<InMemoryReminderRuleRepo>) -> Self {
        Self {
            store: SlotStore {
                slots: Arc::new(Mutex::new(vec![])),
                dispatches: Arc::new(Mutex::new(vec![])),
                claimed: Arc::new(Mutex::new(HashSet::new())),
            },
            rules,
        }
    }
}

#[async_trait::async_trait]
impl IReminderSlotRepo for InMemoryReminderSlotRepo {
    async fn insert(&self, slot: &ReminderSlot) -> anyhow::Result<()> {
        insert(slot, &self.store.slots);
        Ok(())
    }

    async fn save(&self, slot: &ReminderSlot) -> anyhow::Result<()> {
        save(slot, &self.store.slots);
        Ok(())
    }

    async fn find(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>> {
        Ok(find(slot_id, &self.store.slots))
    }

    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ReminderSlot>> {
        Ok(find_by(&self.store.slots, |s| s.rule_id == *rule_id))
    }

    async fn find_by_rules(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderSlot>> {
        Ok(find_by(&self.store.slots, |s| rule_ids.contains(&s.rule_id)))
    }

    async fn delete(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>> {
        delete_by(&self.store.dispatches, |d| d.slot_id == *slot_id);
        Ok(delete(slot_id, &self.store.slots))
    }

    async fn find_dispatches(&self, slot_id: &ID) -> anyhow::Result<Vec<ReminderDispatch>> {
        Ok(find_by(&self.store.dispatches, |d| d.slot_id == *slot_id))
    }

    async fn claim_due(&self, now: i64, limit: i64) -> anyhow::Result<Box<dyn DueSlotClaim>> {
        let mut claimed = self.store.claimed.lock().unwrap();
        let mut due = find_by(&self.store.slots, |s| {
            s.is_due(now) && !claimed.contains(&s.id) && self.rules.is_enabled(&s.rule_id)
        });
        due.sort_by_key(|s| s.next_trigger_at);
        due.truncate(limit.max(0) as usize);

        for slot in &due {
            claimed.insert(slot.id.clone());
        }

        Ok(Box::new(InMemoryDueSlotClaim {
            store: self.store.clone(),
            slots: due,
            staged: vec![],
        }))
    }
}

struct InMemoryDueSlotClaim {
    store: SlotStore,
    slots: Vec<ReminderSlot>,
    staged: Vec<(ID, SlotSchedule, Option<ReminderDispatch>)>,
}

impl InMemoryDueSlotClaim {
    fn release(&mut self) {
        let mut claimed = self.store.claimed.lock().unwrap();
        for slot in self.slots.drain(..) {
            claimed.remove(&slot.id);
        }
    }
}

#[async_trait::async_trait]
impl DueSlotClaim for InMemoryDueSlotClaim {
    fn slots(&self) -> &[ReminderSlot] {
        &self.slots
    }

    async fn advance(
        &mut self,
        slot_id: &ID,
        schedule: SlotSchedule,
        dispatch: Option<&ReminderDispatch>,
    ) -> anyhow::Result<()> {
        if !self.slots.iter().any(|s| s.id == *slot_id) {
            anyhow::bail!("Slot {} is not part of this claim", slot_id);
        }
        self.staged
            .push((slot_id.clone(), schedule, dispatch.cloned()));
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        for (slot_id, schedule, dispatch) in self.staged.drain(..) {
            if let Some(dispatch) = dispatch {
                let mut dispatches = self.store.dispatches.lock().unwrap();
                let fired = dispatches.iter().any(|d| {
                    d.slot_id == dispatch.slot_id && d.occurrence_date == dispatch.occurrence_date
                });
                if !fired {
                    dispatches.push(dispatch);
                }
            }
            let mut slots = self.store.slots.lock().unwrap();
            if let Some(slot) = slots.iter_mut().find(|s| s.id == slot_id) {
                slot.apply(schedule);
            }
        }
        self.release();
        Ok(())
    }
}

impl Drop for InMemoryDueSlotClaim {
    fn drop(&mut self) {
        self.release();
    }
}
