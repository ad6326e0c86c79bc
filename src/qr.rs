//! Payment QR codes for the manual payment path. At most one is active.

use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{QrCode, QrCodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrError {
    #[error("qr code {0} not found")]
    NotFound(QrCodeId),

    #[error("no active payment qr code")]
    NoActiveCode,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone)]
pub struct NewQrCode {
    pub name: String,
    pub description: Option<String>,
    pub image_url: String,
    pub is_active: bool,
}

#[derive(Debug, Default)]
pub struct QrRegistry {
    codes: BTreeMap<QrCodeId, QrCode>,
    next_id: QrCodeId,
}

impl QrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new code. An active one replaces the currently active code.
    pub fn create(&mut self, new: NewQrCode) -> Result<&QrCode, QrError> {
        if new.name.trim().is_empty() {
            return Err(QrError::EmptyField("name"));
        }
        if new.image_url.trim().is_empty() {
            return Err(QrError::EmptyField("image url"));
        }
        if new.is_active {
            self.deactivate_all();
        }

        self.next_id += 1;
        let id = self.next_id;
        let now = Utc::now();
        let code = QrCode {
            id,
            name: new.name.trim().to_string(),
            description: new.description.filter(|d| !d.trim().is_empty()),
            image_url: new.image_url.trim().to_string(),
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        Ok(&*self.codes.entry(id).or_insert(code))
    }

    /// Activate `id` (deactivating every other code) or deactivate it.
    pub fn set_active(&mut self, id: QrCodeId, active: bool) -> Result<&QrCode, QrError> {
        if !self.codes.contains_key(&id) {
            return Err(QrError::NotFound(id));
        }
        if active {
            self.deactivate_all();
        }
        let code = self.codes.get_mut(&id).ok_or(QrError::NotFound(id))?;
        code.is_active = active;
        code.updated_at = Utc::now();
        Ok(&*code)
    }

    pub fn delete(&mut self, id: QrCodeId) -> Result<QrCode, QrError> {
        self.codes.remove(&id).ok_or(QrError::NotFound(id))
    }

    pub fn active(&self) -> Option<&QrCode> {
        self.codes.values().find(|c| c.is_active)
    }

    /// Every code, newest first.
    pub fn all(&self) -> Vec<&QrCode> {
        self.codes.values().rev().collect()
    }

    fn deactivate_all(&mut self) {
        let now = Utc::now();
        for code in self.codes.values_mut().filter(|c| c.is_active) {
            code.is_active = false;
            code.updated_at = now;
        }
    }
}
