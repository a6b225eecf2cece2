use async_trait::async_trait;

use super::{MemoryPersistence, WriteEvent};
use crate::common::error::{MigrationError, Result};
use crate::common::{Actor, ContentItem, CourseKey, CourseRecord, TimeUtils, UsageKey};
use crate::persistence::traits::ContentStore;

#[async_trait]
impl ContentStore for MemoryPersistence {
    async fn get_items(&self, course: &CourseKey) -> Result<Vec<ContentItem>> {
        Ok(self
            .items_of(course)
            .into_iter()
            .map(|stored| stored.draft)
            .collect())
    }

    async fn has_published_version(&self, location: &UsageKey) -> Result<bool> {
        Ok(self
            .items
            .get(location)
            .is_some_and(|stored| stored.published.is_some()))
    }

    async fn update_item(&self, item: &ContentItem, actor: Actor) -> Result<()> {
        {
            let mut stored = self.items.get_mut(&item.location).ok_or_else(|| {
                MigrationError::Persistence(format!("item {} not found", item.location))
            })?;
            let mut draft = item.clone();
            draft.edited_by = Some(actor);
            draft.edited_on = Some(TimeUtils::now());
            stored.draft = draft;
        }

        self.record(WriteEvent::ItemUpdated {
            location: item.location.clone(),
            actor,
        });
        Ok(())
    }

    async fn publish(&self, location: &UsageKey, actor: Actor) -> Result<()> {
        {
            let mut stored = self.items.get_mut(location).ok_or_else(|| {
                MigrationError::Persistence(format!("item {} not found", location))
            })?;
            // 发布即把当前草稿整体复制为已发布版本
            stored.published = Some(stored.draft.clone());
        }

        self.record(WriteEvent::ItemPublished {
            location: location.clone(),
            actor,
        });
        Ok(())
    }

    async fn get_course(&self, course: &CourseKey) -> Result<Option<CourseRecord>> {
        Ok(self.course(course))
    }

    async fn update_course(&self, course: &CourseRecord, actor: Actor) -> Result<()> {
        {
            let mut stored = self.courses.get_mut(&course.key).ok_or_else(|| {
                MigrationError::Persistence(format!("course {} not found", course.key))
            })?;
            let mut updated = course.clone();
            updated.edited_by = Some(actor);
            *stored = updated;
        }

        self.record(WriteEvent::CourseUpdated {
            course: course.key.clone(),
            actor,
        });
        Ok(())
    }
}
