//! In-memory knowledge-base list backing the management pages.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: u64,
    #[serde(rename = "名称")]
    pub name: String,
    #[serde(rename = "文档个数")]
    pub document_count: u64,
    #[serde(rename = "创建时间")]
    pub created_at: String,
}

/// Explicit store object; owned by the application state rather than a
/// module-level global.
#[derive(Debug, Default)]
pub struct KnowledgeBaseStore {
    items: RwLock<Vec<KnowledgeBase>>,
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn seed_entry(
    id: u64,
    name: &str,
    document_count: u64,
    (year, month, day): (i32, u32, u32),
    (hour, minute): (u32, u32),
) -> Option<KnowledgeBase> {
    let created = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(KnowledgeBase {
        id,
        name: name.to_string(),
        document_count,
        created_at: format_timestamp(created),
    })
}

impl KnowledgeBaseStore {
    pub fn new(items: Vec<KnowledgeBase>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// The entries the management pages ship with.
    pub fn seeded() -> Self {
        let items = [
            seed_entry(1, "人工智能知识库", 128, (2024, 9, 12), (10, 30)),
            seed_entry(2, "前端开发文档库", 86, (2023, 6, 5), (14, 15)),
            seed_entry(3, "公司政策与规章", 54, (2022, 11, 20), (9, 0)),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self::new(items)
    }

    pub async fn list(&self) -> Vec<KnowledgeBase> {
        self.items.read().await.clone()
    }

    /// Add an entry with the next free id and no documents.
    pub async fn create(&self, name: impl Into<String>) -> KnowledgeBase {
        let mut items = self.items.write().await;
        let id = items.iter().map(|kb| kb.id).max().map_or(1, |max| max + 1);
        let entry = KnowledgeBase {
            id,
            name: name.into(),
            document_count: 0,
            created_at: format_timestamp(Local::now().naive_local()),
        };
        items.push(entry.clone());
        entry
    }

    /// Returns whether an entry was removed.
    pub async fn delete(&self, id: u64) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|kb| kb.id != id);
        items.len() < before
    }
}
