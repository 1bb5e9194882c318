use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored page. `content` is the persisted document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    #[serde(default = "empty_content")]
    pub content: Value,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "is_public")]
    pub is_public: bool,
    #[serde(default, alias = "share_token", skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

fn empty_content() -> Value {
    Value::Array(Vec::new())
}

impl Page {
    /// A fresh private page with no content
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: empty_content(),
            created_at: now,
            updated_at: now,
            is_public: false,
            share_token: None,
        }
    }

    /// Apply the supplied fields and bump `updated_at`
    pub fn apply_update(&mut self, update: PageUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        self.updated_at = now;
    }

    /// Make the page public under a freshly minted token
    pub fn publish(&mut self, now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().to_string();
        self.is_public = true;
        self.share_token = Some(token.clone());
        self.updated_at = now;
        token
    }

    pub fn unpublish(&mut self, now: DateTime<Utc>) {
        self.is_public = false;
        self.share_token = None;
        self.updated_at = now;
    }

    /// Whether `token` currently grants read access to this page
    pub fn is_shared_as(&self, token: &str) -> bool {
        self.is_public && self.share_token.as_deref() == Some(token)
    }
}

/// Partial update; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl PageUpdate {
    pub fn content(content: Value) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}
