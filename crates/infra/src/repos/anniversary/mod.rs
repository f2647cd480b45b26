mod inmemory;
mod postgres;

use anniv_scheduler_domain::{AnniversaryEvent, ID};
pub use inmemory::InMemoryAnniversaryRepo;
pub use postgres::PostgresAnniversaryRepo;

#[async_trait::async_trait]
pub trait IAnniversaryRepo: Send + Sync {
    async fn insert(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()>;
    async fn save(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()>;
    async fn find(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>>;
    async fn find_many(&self, anniversary_ids: &[ID]) -> anyhow::Result<Vec<AnniversaryEvent>>;
    async fn delete(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>>;
}

#[cfg(test)]
mod tests {
    use crate::AnnivContext;
    use anniv_scheduler_domain::{AnchorDate, AnniversaryEvent, LunarDate, RepeatPattern};
    use chrono_tz::Asia::Shanghai;

    #[tokio::test]
    async fn stores_and_finds_anniversaries() {
        let ctx = AnnivContext::create_inmemory();
        let lunar = LunarDate::new(2024, 8, 15, false).unwrap();
        let mut anniversary =
            AnniversaryEvent::new(AnchorDate::Lunar(lunar), RepeatPattern::Yearly, Shanghai);
        let other = AnniversaryEvent::new(
            AnchorDate::Lunar(lunar),
            RepeatPattern::Monthly,
            Shanghai,
        );
        ctx.repos.anniversaries.insert(&anniversary).await.unwrap();
        ctx.repos.anniversaries.insert(&other).await.unwrap();

        anniversary.repeat = RepeatPattern::None;
        ctx.repos.anniversaries.save(&anniversary).await.unwrap();
        let found = ctx
            .repos
            .anniversaries
            .find(&anniversary.id)
            .await
            .unwrap()
            .expect("To find anniversary");
        assert_eq!(found, anniversary);

        let many = ctx
            .repos
            .anniversaries
            .find_many(&[anniversary.id.clone(), Default::default()])
            .await
            .unwrap();
        assert_eq!(many, vec![anniversary.clone()]);

        assert!(ctx
            .repos
            .anniversaries
            .delete(&anniversary.id)
            .await
            .unwrap()
            .is_some());
        assert!(ctx
            .repos
            .anniversaries
            .find(&anniversary.id)
            .await
            .unwrap()
            .is_none());
    }
}
