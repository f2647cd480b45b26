mod inmemory;
mod postgres;

use anniv_scheduler_domain::{ReminderDispatch, ReminderSlot, SlotSchedule, ID};
pub use inmemory::InMemoryReminderSlotRepo;
pub use postgres::PostgresReminderSlotRepo;

#[async_trait::async_trait]
pub trait IReminderSlotRepo: Send + Sync {
    async fn insert(&self, slot: &ReminderSlot) -> anyhow::Result<()>;
    async fn save(&self, slot: &ReminderSlot) -> anyhow::Result<()>;
    async fn find(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>>;
    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ReminderSlot>>;
    async fn find_by_rules(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderSlot>>;
    async fn delete(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>>;
    async fn find_dispatches(&self, slot_id: &ID) -> anyhow::Result<Vec<ReminderDispatch>>;
    /// Exclusively claims up to `limit` slots of enabled rules that are due at
    /// `now`, earliest first. Slots claimed by another scan that has not
    /// finished yet are skipped without waiting for it.
    async fn claim_due(&self, now: i64, limit: i64) -> anyhow::Result<Box<dyn DueSlotClaim>>;
}

/// A batch of claimed due slots.
///
/// Nothing is visible to others before `commit`. Dropping the claim without
/// committing releases every slot unchanged, so they are due again for the
/// next scan.
#[async_trait::async_trait]
pub trait DueSlotClaim: Send {
    fn slots(&self) -> &[ReminderSlot];

    /// Stores the slot's next schedule together with the record of the
    /// firing that was dispatched for it, if any. A record for an occurrence
    /// the slot already fired for is not stored twice.
    async fn advance(
        &mut self,
        slot_id: &ID,
        schedule: SlotSchedule,
        dispatch: Option<&ReminderDispatch>,
    ) -> anyhow::Result<()>;

    /// Makes every advance of this claim visible and releases the slots
    async fn commit(&mut self) -> anyhow::Result<()>;
}
