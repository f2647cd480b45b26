use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{Advance, ID};
use anniv_scheduler_infra::AnnivContext;
use chrono::NaiveDate;
use serde::Serialize;

/// When an anniversary happens next, at its own event time. Feeds order
/// anniversaries by this instant.
#[derive(Debug)]
pub struct GetNextOccurrenceUseCase {
    pub anniversary_id: ID,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextOccurrence {
    pub occurrence: NaiveDate,
    pub starts_at: i64,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for GetNextOccurrenceUseCase {
    /// `None` once the anniversary will not happen again
    type Response = Option<NextOccurrence>;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &AnnivContext) -> Result<Self::Response, Self::Errors> {
        let anniversary = ctx
            .repos
            .anniversaries
            .find(&self.anniversary_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .ok_or_else(|| UseCaseError::NotFound(self.anniversary_id.clone()))?;

        let now = ctx.sys.get_timestamp_millis();
        match ctx
            .config
            .advancer()
            .next_occurrence_trigger(&anniversary, now)
        {
            Advance::Scheduled {
                occurrence,
                trigger_at,
                ..
            } => Ok(Some(NextOccurrence {
                occurrence,
                starts_at: trigger_at.timestamp_millis(),
            })),
            Advance::Exhausted(_) => Ok(None),
        }
    }
}
