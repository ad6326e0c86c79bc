//! Platform-wide announcements.

use chrono::Utc;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Announcement, AnnouncementId, Priority, UserId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("announcement {0} not found")]
    NotFound(AnnouncementId),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub is_active: bool,
}

/// Partial edit; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default)]
pub struct Board {
    announcements: BTreeMap<AnnouncementId, Announcement>,
    next_id: AnnouncementId,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        new: NewAnnouncement,
        created_by: UserId,
    ) -> Result<&Announcement, BoardError> {
        let title = non_empty(&new.title, "title")?;
        let content = non_empty(&new.content, "content")?;

        self.next_id += 1;
        let id = self.next_id;
        let now = Utc::now();
        let announcement = Announcement {
            id,
            title,
            content,
            priority: new.priority,
            is_active: new.is_active,
            created_by,
            created_at: now,
            updated_at: now,
        };
        Ok(&*self.announcements.entry(id).or_insert(announcement))
    }

    pub fn update(
        &mut self,
        id: AnnouncementId,
        update: AnnouncementUpdate,
    ) -> Result<&Announcement, BoardError> {
        // validate before touching the row
        let title = update.title.map(|t| non_empty(&t, "title")).transpose()?;
        let content = update
            .content
            .map(|c| non_empty(&c, "content"))
            .transpose()?;

        let announcement = self
            .announcements
            .get_mut(&id)
            .ok_or(BoardError::NotFound(id))?;
        if let Some(title) = title {
            announcement.title = title;
        }
        if let Some(content) = content {
            announcement.content = content;
        }
        if let Some(priority) = update.priority {
            announcement.priority = priority;
        }
        if let Some(is_active) = update.is_active {
            announcement.is_active = is_active;
        }
        announcement.updated_at = Utc::now();
        Ok(&*announcement)
    }

    pub fn set_active(&mut self, id: AnnouncementId, active: bool) -> Result<&Announcement, BoardError> {
        self.update(
            id,
            AnnouncementUpdate {
                is_active: Some(active),
                ..AnnouncementUpdate::default()
            },
        )
    }

    pub fn delete(&mut self, id: AnnouncementId) -> Result<Announcement, BoardError> {
        self.announcements.remove(&id).ok_or(BoardError::NotFound(id))
    }

    /// What players see: active announcements, most urgent first, then newest.
    pub fn public(&self) -> Vec<&Announcement> {
        let mut visible: Vec<_> = self.announcements.values().filter(|a| a.is_active).collect();
        visible.sort_by_key(|a| (a.priority.rank(), Reverse(a.created_at), Reverse(a.id)));
        visible
    }

    /// Every announcement, newest first.
    pub fn all(&self) -> Vec<&Announcement> {
        self.announcements.values().rev().collect()
    }
}

fn non_empty(value: &str, field: &'static str) -> Result<String, BoardError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BoardError::EmptyField(field));
    }
    Ok(value.to_string())
}
