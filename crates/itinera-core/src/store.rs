// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use chrono::{DateTime, Utc};
use itinera_codec::Itinerary;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DOCUMENTS_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt document file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No saved itinerary '{id}' for user '{uid}'")]
    NotFound { uid: String, id: String },
    #[error("Refusing to save an itinerary with no legs")]
    EmptyItinerary,
    #[error("Invalid user id '{0}'")]
    InvalidUid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItinerary {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub created: DateTime<Utc>,
    pub itinerary: Itinerary,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
}

impl SavedItinerary {
    pub fn latest_price(&self) -> Option<f64> {
        self.price_history.last().map(|p| p.price)
    }
}

/// Per-user persistence for saved itineraries.
pub trait DocumentStore {
    fn create(&self, uid: &str, name: &str, itinerary: &Itinerary)
        -> Result<SavedItinerary, StoreError>;
    /// Every document owned by `uid`, oldest first.
    fn list(&self, uid: &str) -> Result<Vec<SavedItinerary>, StoreError>;
    fn get(&self, uid: &str, id: &str) -> Result<SavedItinerary, StoreError>;
    fn append_price(&self, uid: &str, id: &str, price: f64) -> Result<SavedItinerary, StoreError>;
    fn delete(&self, uid: &str, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserDocuments {
    version: u32,
    documents: Vec<SavedItinerary>,
}

/// One pretty-printed JSON file per user: `<root>/<uid>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

fn check_uid(uid: &str) -> Result<(), StoreError> {
    let ok = !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidUid(uid.to_string()))
    }
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_path(&self, uid: &str) -> Result<PathBuf, StoreError> {
        check_uid(uid)?;
        Ok(self.root.join(format!("{}.json", uid)))
    }

    fn load(&self, uid: &str) -> Result<UserDocuments, StoreError> {
        let path = self.user_path(uid)?;
        if !path.exists() {
            return Ok(UserDocuments {
                version: DOCUMENTS_VERSION,
                documents: Vec::new(),
            });
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, uid: &str, docs: &UserDocuments) -> Result<(), StoreError> {
        let path = self.user_path(uid)?;
        let result = (|| -> Result<(), StoreError> {
            fs::create_dir_all(&self.root)?;
            let content = serde_json::to_string_pretty(docs)?;
            fs::write(&path, content)?;
            Ok(())
        })();
        if let Err(e) = &result {
            error!("Failed to write {}: {}", path.display(), e);
        }
        result
    }

    fn update<F>(&self, uid: &str, id: &str, f: F) -> Result<SavedItinerary, StoreError>
    where
        F: FnOnce(&mut SavedItinerary),
    {
        let mut docs = self.load(uid)?;
        let doc = docs
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound {
                uid: uid.to_string(),
                id: id.to_string(),
            })?;
        f(doc);
        let updated = doc.clone();
        self.save(uid, &docs)?;
        Ok(updated)
    }
}

fn new_id(now: DateTime<Utc>, taken: &[SavedItinerary]) -> String {
    let mut n = now.timestamp_nanos_opt().unwrap_or_default() as u64;
    loop {
        let id = format!("{:x}", n);
        if !taken.iter().any(|d| d.id == id) {
            return id;
        }
        n += 1;
    }
}

impl DocumentStore for JsonFileStore {
    fn create(
        &self,
        uid: &str,
        name: &str,
        itinerary: &Itinerary,
    ) -> Result<SavedItinerary, StoreError> {
        if itinerary.is_empty() {
            return Err(StoreError::EmptyItinerary);
        }
        let mut docs = self.load(uid)?;
        let created = Utc::now();
        let doc = SavedItinerary {
            id: new_id(created, &docs.documents),
            uid: uid.to_string(),
            name: name.to_string(),
            created,
            itinerary: itinerary.clone(),
            price_history: Vec::new(),
        };
        docs.version = DOCUMENTS_VERSION;
        docs.documents.push(doc.clone());
        self.save(uid, &docs)?;
        debug!("Saved itinerary {} for {}", doc.id, uid);
        Ok(doc)
    }

    fn list(&self, uid: &str) -> Result<Vec<SavedItinerary>, StoreError> {
        let mut documents = self.load(uid)?.documents;
        documents.sort_by_key(|d| d.created);
        Ok(documents)
    }

    fn get(&self, uid: &str, id: &str) -> Result<SavedItinerary, StoreError> {
        self.load(uid)?
            .documents
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound {
                uid: uid.to_string(),
                id: id.to_string(),
            })
    }

    fn append_price(&self, uid: &str, id: &str, price: f64) -> Result<SavedItinerary, StoreError> {
        self.update(uid, id, |doc| {
            doc.price_history.push(PricePoint {
                at: Utc::now(),
                price,
            })
        })
    }

    fn delete(&self, uid: &str, id: &str) -> Result<(), StoreError> {
        let mut docs = self.load(uid)?;
        let before = docs.documents.len();
        docs.documents.retain(|d| d.id != id);
        if docs.documents.len() == before {
            return Err(StoreError::NotFound {
                uid: uid.to_string(),
                id: id.to_string(),
            });
        }
        self.save(uid, &docs)
    }
}
