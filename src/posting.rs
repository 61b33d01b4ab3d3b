// src/posting.rs
//! Core record types: persisted postings, roster entries and match results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ingest::types::RawPosting;

/// Wall-clock format of `scraped_date` in the persisted store.
pub const SCRAPED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Notification state of a stored posting.
///
/// `Pending -> Notified` is the only transition and it is performed by
/// [`crate::notify::gate::NotificationGate`] after a successful delivery.
/// Persisted as the `email_sent` boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyState {
    #[default]
    Pending,
    Notified,
}

impl Serialize for NotifyState {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(matches!(self, NotifyState::Notified))
    }
}

impl<'de> Deserialize<'de> for NotifyState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        // null is tolerated and means "not sent yet"
        let sent = Option::<bool>::deserialize(d)?.unwrap_or(false);
        Ok(if sent {
            NotifyState::Notified
        } else {
            NotifyState::Pending
        })
    }
}

/// One posting as kept in the record store. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub date_posted: String,
    pub url: String,
    pub source: String,
    #[serde(rename = "scraped_date", with = "scraped_date")]
    pub scraped_at: NaiveDateTime,
    #[serde(rename = "email_sent", default)]
    state: NotifyState,
}

impl PostingRecord {
    /// Build a freshly ingested (pending) record from a normalized raw posting.
    pub fn pending(raw: RawPosting, source: &str, scraped_at: NaiveDateTime) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            company: raw.company.unwrap_or_default(),
            location: raw.location.unwrap_or_default(),
            date_posted: raw.date_posted.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            source: source.to_string(),
            scraped_at,
            state: NotifyState::Pending,
        }
    }

    pub fn state(&self) -> NotifyState {
        self.state
    }

    pub fn is_notified(&self) -> bool {
        self.state == NotifyState::Notified
    }

    pub(crate) fn mark_notified(&mut self) {
        self.state = NotifyState::Notified;
    }
}

/// A sponsor roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub name: String,
}

impl ReferenceEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Best roster match for one posting.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub posting: PostingRecord,
    pub matched_reference_name: String,
    pub score: f64,
}

mod scraped_date {
    use super::SCRAPED_DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(SCRAPED_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), SCRAPED_DATE_FORMAT).map_err(de::Error::custom)
    }
}
