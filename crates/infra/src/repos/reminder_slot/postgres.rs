use super::{DueSlotClaim, IReminderSlotRepo};
use crate::repos::shared::postgres_repo::{channel_codes, channels_from_codes, uuids};
use anniv_scheduler_domain::{ReminderDispatch, ReminderSlot, SlotSchedule, ID};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{types::Uuid, Connection, FromRow, PgPool, Postgres, Transaction};
use std::convert::TryFrom;

pub struct PostgresReminderSlotRepo {
    pool: PgPool,
}

impl PostgresReminderSlotRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderSlotRaw {
    slot_uid: Uuid,
    rule_uid: Uuid,
    offset_days: i32,
    trigger_time: NaiveTime,
    next_trigger_at: Option<i64>,
    next_occurrence: Option<NaiveDate>,
}

impl From<ReminderSlotRaw> for ReminderSlot {
    fn from(raw: ReminderSlotRaw) -> Self {
        Self {
            id: raw.slot_uid.into(),
            rule_id: raw.rule_uid.into(),
            offset_days: raw.offset_days,
            trigger_time: raw.trigger_time,
            next_trigger_at: raw.next_trigger_at,
            next_occurrence: raw.next_occurrence,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReminderDispatchRaw {
    dispatch_uid: Uuid,
    rule_uid: Uuid,
    slot_uid: Uuid,
    user_uid: Uuid,
    anniversary_uid: Uuid,
    channels: Vec<i16>,
    occurrence_date: NaiveDate,
    scheduled_at: i64,
    dispatched_at: i64,
}

impl TryFrom<ReminderDispatchRaw> for ReminderDispatch {
    type Error = anyhow::Error;

    fn try_from(raw: ReminderDispatchRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.dispatch_uid.into(),
            rule_id: raw.rule_uid.into(),
            slot_id: raw.slot_uid.into(),
            user_id: raw.user_uid.into(),
            anniversary_id: raw.anniversary_uid.into(),
            channels: channels_from_codes(&raw.channels)?,
            occurrence_date: raw.occurrence_date,
            scheduled_at: raw.scheduled_at,
            dispatched_at: raw.dispatched_at,
        })
    }
}

#[async_trait::async_trait]
impl IReminderSlotRepo for PostgresReminderSlotRepo {
    async fn insert(&self, slot: &ReminderSlot) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_slots
            (slot_uid, rule_uid, offset_days, trigger_time, next_trigger_at, next_occurrence)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(slot.id.inner_ref())
        .bind(slot.rule_id.inner_ref())
        .bind(slot.offset_days)
        .bind(slot.trigger_time)
        .bind(slot.next_trigger_at)
        .bind(slot.next_occurrence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, slot: &ReminderSlot) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminder_slots
            SET next_trigger_at = $2,
            next_occurrence = $3
            WHERE slot_uid = $1
            "#,
        )
        .bind(slot.id.inner_ref())
        .bind(slot.next_trigger_at)
        .bind(slot.next_occurrence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>> {
        let slot = sqlx::query_as::<_, ReminderSlotRaw>(
            r#"
            SELECT * FROM reminder_slots AS s
            WHERE s.slot_uid = $1
            "#,
        )
        .bind(slot_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot.map(|slot| slot.into()))
    }

    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ReminderSlot>> {
        self.find_by_rules(std::slice::from_ref(rule_id)).await
    }

    async fn find_by_rules(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderSlot>> {
        let slots = sqlx::query_as::<_, ReminderSlotRaw>(
            r#"
            SELECT * FROM reminder_slots AS s
            WHERE s.rule_uid = ANY($1)
            ORDER BY s.offset_days, s.trigger_time
            "#,
        )
        .bind(uuids(rule_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(slots.into_iter().map(|slot| slot.into()).collect())
    }

    async fn delete(&self, slot_id: &ID) -> anyhow::Result<Option<ReminderSlot>> {
        let slot = sqlx::query_as::<_, ReminderSlotRaw>(
            r#"
            DELETE FROM reminder_slots AS s
            WHERE s.slot_uid = $1
            RETURNING *
            "#,
        )
        .bind(slot_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot.map(|slot| slot.into()))
    }

    async fn find_dispatches(&self, slot_id: &ID) -> anyhow::Result<Vec<ReminderDispatch>> {
        sqlx::query_as::<_, ReminderDispatchRaw>(
            r#"
            SELECT * FROM reminder_dispatches AS d
            WHERE d.slot_uid = $1
            ORDER BY d.occurrence_date
            "#,
        )
        .bind(slot_id.inner_ref())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ReminderDispatch::try_from)
        .collect()
    }

    async fn claim_due(&self, now: i64, limit: i64) -> anyhow::Result<Box<dyn DueSlotClaim>> {
        let mut tx = self.pool.begin().await?;
        let slots = sqlx::query_as::<_, ReminderSlotRaw>(
            r#"
            SELECT s.* FROM reminder_slots AS s
            INNER JOIN reminder_rules AS r
                ON r.rule_uid = s.rule_uid
            WHERE r.enabled AND s.next_trigger_at <= $1
            ORDER BY s.next_trigger_at
            LIMIT $2
            FOR UPDATE OF s SKIP LOCKED
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        Ok(Box::new(PostgresDueSlotClaim {
            tx: Some(tx),
            slots: slots.into_iter().map(|slot| slot.into()).collect(),
        }))
    }
}

/// Holds the row locks of the claimed slots for as long as its transaction
/// is open. Dropping the transaction rolls it back.
struct PostgresDueSlotClaim {
    tx: Option<Transaction<'static, Postgres>>,
    slots: Vec<ReminderSlot>,
}

#[async_trait::async_trait]
impl DueSlotClaim for PostgresDueSlotClaim {
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
        let tx = match self.tx.as_mut() {
            Some(tx) => tx,
            None => anyhow::bail!("Claim is already committed"),
        };

        // A failing slot only rolls back to here, its neighbours in the batch stay
        let mut savepoint = Connection::begin(&mut **tx).await?;
        if let Some(dispatch) = dispatch {
            sqlx::query(
                r#"
                INSERT INTO reminder_dispatches
                (dispatch_uid, rule_uid, slot_uid, user_uid, anniversary_uid, channels, occurrence_date, scheduled_at, dispatched_at)
                VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (slot_uid, occurrence_date) DO NOTHING
                "#,
            )
            .bind(dispatch.id.inner_ref())
            .bind(dispatch.rule_id.inner_ref())
            .bind(dispatch.slot_id.inner_ref())
            .bind(dispatch.user_id.inner_ref())
            .bind(dispatch.anniversary_id.inner_ref())
            .bind(channel_codes(&dispatch.channels))
            .bind(dispatch.occurrence_date)
            .bind(dispatch.scheduled_at)
            .bind(dispatch.dispatched_at)
            .execute(&mut *savepoint)
            .await?;
        }
        sqlx::query(
            r#"
            UPDATE reminder_slots
            SET next_trigger_at = $2,
            next_occurrence = $3
            WHERE slot_uid = $1
            "#,
        )
        .bind(slot_id.inner_ref())
        .bind(schedule.trigger_at())
        .bind(schedule.occurrence())
        .execute(&mut *savepoint)
        .await?;
        savepoint.commit().await?;

        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}
