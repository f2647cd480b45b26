use super::IAnniversaryRepo;
use crate::repos::shared::inmemory_repo::*;
use anniv_scheduler_domain::{AnniversaryEvent, ID};

pub struct InMemoryAnniversaryRepo {
    anniversaries: std::sync::Mutex<Vec<AnniversaryEvent>>,
}

impl InMemoryAnniversaryRepo {
    pub fn new() -> Self {
        Self {
            anniversaries: std::sync::Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IAnniversaryRepo for InMemoryAnniversaryRepo {
    async fn insert(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()> {
        insert(anniversary, &self.anniversaries);
        Ok(())
    }

    async fn save(&self, anniversary: &AnniversaryEvent) -> anyhow::Result<()> {
        save(anniversary, &self.anniversaries);
        Ok(())
    }

    async fn find(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>> {
        Ok(find(anniversary_id, &self.anniversaries))
    }

    async fn find_many(&self, anniversary_ids: &[ID]) -> anyhow::Result<Vec<AnniversaryEvent>> {
        Ok(find_many(anniversary_ids, &self.anniversaries))
    }

    async fn delete(&self, anniversary_id: &ID) -> anyhow::Result<Option<AnniversaryEvent>> {
        Ok(delete(anniversary_id, &self.anniversaries))
    }
}
