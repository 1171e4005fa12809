use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Server-assigned notification identifier
pub type NotificationId = i64;

/// A single notification as shown in the badge dropdown and notifications page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub created_at: String, // as sent by the server
    pub read: bool,
}

impl NotificationRecord {
    /// Parse `created_at` into UTC.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (taken as
    /// UTC) and bare dates. Returns `None` for anything else.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// Unread/total counts as last reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    pub unread: u64,
    pub total: u64,
    /// Set when a fetch failed and the values are the last known ones
    pub stale: bool,
}

impl NotificationCounts {
    pub fn new(unread: u64, total: u64) -> Self {
        Self {
            unread,
            total,
            stale: false,
        }
    }

    /// Zero total is how the backend says "no notifications at all"
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Decoded response of a list fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationList {
    pub records: Vec<NotificationRecord>,
    pub page: u32,
    pub total_pages: u32,
    pub counts: NotificationCounts,
}

/// Page snapshot handed to consumers.
///
/// `fetched_at` is `None` for the empty placeholder returned when no session
/// exists or the fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPage {
    pub records: Vec<NotificationRecord>,
    pub page: u32,
    pub total_pages: u32,
    pub fetched_at: Option<Instant>,
}

impl NotificationPage {
    pub fn empty(page: u32) -> Self {
        Self {
            records: Vec::new(),
            page,
            total_pages: 0,
            fetched_at: None,
        }
    }

    pub fn from_list(list: NotificationList, fetched_at: Instant) -> Self {
        Self {
            records: list.records,
            page: list.page,
            total_pages: list.total_pages,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn unread(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter().filter(|record| !record.read)
    }
}
