use super::IAnniversaryRepo;
use crate::repos::shared::postgres_repo::{decode_rows, uuids};
use anniv_scheduler_domain::{AnchorDate, AnniversaryEvent, RepeatPattern, ID};
use anyhow::{anyhow, Context};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use sqlx::{types::Uuid, FromRow, PgPool};
use std::convert::{TryFrom, TryInto};

pub struct PostgresAnniversaryRepo {
    pool: PgPool,
}

impl PostgresAnniversaryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AnniversaryRaw {
    anniversary_uid: Uuid,
    calendar_type: i16,
    gregorian_date: Option<NaiveDate>,
    lunar_year: Option<i32>,
    lunar_month: Option<i32>,
    lunar_day: Option<i32>,
    lunar_is_leap: bool,
    repeat_pattern: i16,
    timezone: String,
    event_time: Option<NaiveTime>,
}

/// Column values of an anchor date
struct AnchorColumns {
    gregorian_date: Option<NaiveDate>,
    lunar_year: Option<i32>,
    lunar_month: Option<i32>,
    lunar_day: Option<i32>,
    lunar_is_leap: bool,
}

impl From<&AnchorDate> for AnchorColumns {
    fn from(anchor: &AnchorDate) -> Self {
        match anchor {
            AnchorDate::Gregorian(date) => Self {
                gregorian_date: Some(*date),
                lunar_year: None,
                lunar_month: None,
                lunar_day: None,
                lunar_is_leap: false,
            },
            AnchorDate::Lunar(lunar) => Self {
                // Solar date of the anchor itself, absent for a day the calendar lacks
                gregorian_date: lunar.to_solar(),
                lunar_year: Some(lunar.year),
                lunar_month: Some(lunar.month as i32),
                lunar_day: Some(lunar.day as i32),
                lunar_is_leap: lunar.is_leap,
            },
        }
    }
}

impl TryFrom<AnniversaryRaw> for AnniversaryEvent {
    type Error = anyhow::Error;

    fn try_from(raw: AnniversaryRaw) -> anyhow::Result<Self> {
        let lunar = match (raw.lunar_year, raw.lunar_month, raw.lunar_day) {
            (Some(year), Some(month), Some(day)) => {
                Some((year, u32::try_from(month)?, u32::try_from(day)?))
            }
            _ => None,
        };
        let anchor = AnchorDate::from_parts(
            raw.calendar_type.try_into()?,
            raw.gregorian_date,
            lunar,
            raw.lunar_is_leap,
        )
        .with_context(|| format!("Anniversary {} has an invalid anchor", raw.anniversary_uid))?;
        let timezone = raw.timezone.parse::<Tz>().map_err(|e| {
            anyhow!(
                "Anniversary {} has an invalid timezone: {}",
                raw.anniversary_uid,
                e
            )
        })?;

        Ok(Self {
            id: raw.anniversary_uid.into(),
            anchor,
            repeat: RepeatPattern::try_from(raw.repeat_pattern)?,
            timezone,
            event_time: raw.event_time,
        })
    }
}

fn into_anniversaries(raws: Vec<AnniversaryRaw>) -> Vec<AnniversaryEvent> {
    decode_rows(raws, "anniversary", |raw| raw.anniversary_uid)
}

#[async_trait::async_trait]
impl IAnniversaryRepo for PostgresAnniversaryRepo {
    async fn insert(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()> {
        let anchor = AnchorColumns::from(&anniversary.anchor);
        sqlx::query(
            r#"
            INSERT INTO anniversaries
            (anniversary_uid, calendar_type, gregorian_date, lunar_year, lunar_month, lunar_day, lunar_is_leap, repeat_pattern, timezone, event_time)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(anniversary.id.inner_ref())
        .bind(anniversary.calendar_type().code())
        .bind(anchor.gregorian_date)
        .bind(anchor.lunar_year)
        .bind(anchor.lunar_month)
        .bind(anchor.lunar_day)
        .bind(anchor.lunar_is_leap)
        .bind(anniversary.repeat.code())
        .bind(anniversary.timezone.name())
        .bind(anniversary.event_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()> {
        let anchor = AnchorColumns::from(&anniversary.anchor);
        sqlx::query(
            r#"
            UPDATE anniversaries
            SET calendar_type = $2,
            gregorian_date = $3,
            lunar_year = $4,
            lunar_month = $5,
            lunar_day = $6,
            lunar_is_leap = $7,
            repeat_pattern = $8,
            timezone = $9,
            event_time = $10
            WHERE anniversary_uid = $1
            "#,
        )
        .bind(anniversary.id.inner_ref())
        .bind(anniversary.calendar_type().code())
        .bind(anchor.gregorian_date)
        .bind(anchor.lunar_year)
        .bind(anchor.lunar_month)
        .bind(anchor.lunar_day)
        .bind(anchor.lunar_is_leap)
        .bind(anniversary.repeat.code())
        .bind(anniversary.timezone.name())
        .bind(anniversary.event_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>> {
        sqlx::query_as::<_, AnniversaryRaw>(
            r#"
            SELECT * FROM anniversaries AS a
            WHERE a.anniversary_uid = $1
            "#,
        )
        .bind(anniversary_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(AnniversaryEvent::try_from)
        .transpose()
    }

    async fn find_many(&self, anniversary_ids: &[ID]) -> anyhow::Result<Vec<AnniversaryEvent>> {
        let raws = sqlx::query_as::<_, AnniversaryRaw>(
            r#"
            SELECT * FROM anniversaries AS a
            WHERE a.anniversary_uid = ANY($1)
            "#,
        )
        .bind(uuids(anniversary_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(into_anniversaries(raws))
    }

    async fn delete(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>> {
        sqlx::query_as::<_, AnniversaryRaw>(
            r#"
            DELETE FROM anniversaries AS a
            WHERE a.anniversary_uid = $1
            RETURNING *
            "#,
        )
        .bind(anniversary_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?
        .map(AnniversaryEvent::try_from)
        .transpose()
    }
}
