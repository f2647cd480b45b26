use super::IReminderRuleRepo;
use crate::repos::shared::postgres_repo::{
    channel_codes, channels_from_codes, decode_rows, uuids,
};
use anniv_scheduler_domain::{ReminderRule, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::TryFrom;

pub struct PostgresReminderRuleRepo {
    pool: PgPool,
}

impl PostgresReminderRuleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRuleRaw {
    rule_uid: Uuid,
    anniversary_uid: Uuid,
    user_uid: Uuid,
    channels: Vec<i16>,
    enabled: bool,
    created: i64,
    updated: i64,
}

impl TryFrom<ReminderRuleRaw> for ReminderRule {
    type Error = anyhow::Error;

    fn try_from(raw: ReminderRuleRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.rule_uid.into(),
            anniversary_id: raw.anniversary_uid.into(),
            user_id: raw.user_uid.into(),
            channels: channels_from_codes(&raw.channels)?,
            enabled: raw.enabled,
            created: raw.created,
            updated: raw.updated,
        })
    }
}

fn into_rules(raws: Vec<ReminderRuleRaw>) -> Vec<ReminderRule> {
    decode_rows(raws, "reminder rule", |raw| raw.rule_uid)
}

#[async_trait::async_trait]
impl IReminderRuleRepo for PostgresReminderRuleRepo {
    async fn insert(&self, rule: &ReminderRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_rules
            (rule_uid, anniversary_uid, user_uid, channels, enabled, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(rule.id.inner_ref())
        .bind(rule.anniversary_id.inner_ref())
        .bind(rule.user_id.inner_ref())
        .bind(channel_codes(&rule.channels))
        .bind(rule.enabled)
        .bind(rule.created)
        .bind(rule.updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, rule: &ReminderRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminder_rules
            SET channels = $2,
            enabled = $3,
            updated = $4
            WHERE rule_uid = $1
            "#,
        )
        .bind(rule.id.inner_ref())
        .bind(channel_codes(&rule.channels))
        .bind(rule.enabled)
        .bind(rule.updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>> {
        sqlx::query_as::<_, ReminderRuleRaw>(
            r#"
            SELECT * FROM reminder_rules AS r
            WHERE r.rule_uid = $1
            "#,
        )
        .bind(rule_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(ReminderRule::try_from)
        .transpose()
    }

    async fn find_many(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderRule>> {
        let raws = sqlx::query_as::<_, ReminderRuleRaw>(
            r#"
            SELECT * FROM reminder_rules AS r
            WHERE r.rule_uid = ANY($1)
            "#,
        )
        .bind(uuids(rule_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(into_rules(raws))
    }

    async fn find_by_anniversary(&self, anniversary_id: &ID) -> anyhow::Result<Vec<ReminderRule>> {
        let raws = sqlx::query_as::<_, ReminderRuleRaw>(
            r#"
            SELECT * FROM reminder_rules AS r
            WHERE r.anniversary_uid = $1
            "#,
        )
        .bind(anniversary_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        Ok(into_rules(raws))
    }

    async fn find_by_anniversary_and_user(
        &self,
        anniversary_id: &ID,
        user_id: &ID,
    ) -> anyhow::Result<Option<ReminderRule>> {
        sqlx::query_as::<_, ReminderRuleRaw>(
            r#"
            SELECT * FROM reminder_rules AS r
            WHERE r.anniversary_uid = $1 AND r.user_uid = $2
            "#,
        )
        .bind(anniversary_id.inner_ref())
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(ReminderRule::try_from)
        .transpose()
    }

    async fn delete(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>> {
        sqlx::query_as::<_, ReminderRuleRaw>(
            r#"
            DELETE FROM reminder_rules AS r
            WHERE r.rule_uid = $1
            RETURNING *
            "#,
        )
        .bind(rule_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(ReminderRule::try_from)
        .transpose()
    }
}
