use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{DropboxError, Result};

/// Every date field of the API uses RFC 1123 with a numeric offset,
/// e.g. `Sat, 21 Aug 2010 22:31:20 +0000`.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

pub fn parse_date(value: &str) -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::parse(value.trim(), DATE_FORMAT)?)
}

pub fn format_date(value: OffsetDateTime) -> Result<String> {
    Ok(value.format(DATE_FORMAT)?)
}

/// Metadata of a file or folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Entry {
    pub bytes: u64,
    pub client_mtime: String,
    /// Immediate children; only present on folder listings that asked for them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<Entry>>,
    pub hash: String,
    pub icon: String,
    pub is_deleted: bool,
    pub is_dir: bool,
    pub mime_type: String,
    pub modified: String,
    pub path: String,
    pub rev: String,
    pub root: String,
    /// Humanized size, e.g. "225.4KB".
    pub size: String,
    pub thumb_exists: bool,
}

impl Entry {
    pub fn modified_at(&self) -> Result<OffsetDateTime> {
        parse_date(&self.modified)
    }

    pub fn client_modified_at(&self) -> Result<OffsetDateTime> {
        parse_date(&self.client_mtime)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuotaInfo {
    #[serde(default)]
    pub shared: u64,
    #[serde(default)]
    pub quota: u64,
    #[serde(default)]
    pub normal: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Account {
    pub referral_link: String,
    pub display_name: String,
    pub uid: u64,
    /// ISO country code.
    pub country: String,
    pub quota_info: QuotaInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    pub url: String,
    #[serde(default)]
    pub expires: String,
}

/// One-time token naming a file version, to be copied into another account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CopyRef {
    pub copy_ref: String,
    #[serde(default)]
    pub expires: String,
}

/// Server-side state of an unfinished chunked upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChunkSession {
    pub upload_id: String,
    pub offset: u64,
    #[serde(default)]
    pub expires: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeltaPoll {
    pub changes: bool,
    #[serde(default)]
    pub backoff: Option<u64>,
}

impl DeltaPoll {
    /// How long the caller should wait before polling again.
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff.unwrap_or(0))
    }
}

/// A change on one path. `entry` is `None` when the path no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEntry {
    pub path: String,
    pub entry: Option<Entry>,
}

impl DeltaEntry {
    /// Decodes the `[path, metadata]` pair used by the change feed.
    pub fn from_wire(element: &[Value]) -> Result<Self> {
        let [path, metadata] = element else {
            return Err(DropboxError::MalformedReply(format!(
                "delta entry has {} elements, expected 2",
                element.len()
            )));
        };
        let path = path
            .as_str()
            .ok_or_else(|| DropboxError::MalformedReply("delta entry path is not a string".into()))?
            .to_string();
        let entry = match metadata {
            Value::Null => None,
            value => Some(Entry::deserialize(value)?).filter(|entry| !entry.path.is_empty()),
        };
        Ok(Self { path, entry })
    }

    pub fn to_wire(&self) -> Result<Value> {
        let metadata = match &self.entry {
            Some(entry) => serde_json::to_value(entry)?,
            None => Value::Null,
        };
        Ok(Value::Array(vec![Value::String(self.path.clone()), metadata]))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaPage {
    /// Local state must be cleared before applying `entries`.
    pub reset: bool,
    /// Another call with `cursor` returns more entries right away.
    pub has_more: bool,
    pub cursor: String,
    pub entries: Vec<DeltaEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDeltaPage {
    #[serde(default)]
    reset: bool,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    entries: Vec<Vec<Value>>,
}

impl RawDeltaPage {
    /// Projects the untyped `[path, metadata]` pairs into typed entries.
    pub(crate) fn into_page(self) -> Result<DeltaPage> {
        let entries = self
            .entries
            .iter()
            .map(|element| DeltaEntry::from_wire(element))
            .collect::<Result<Vec<_>>>()?;
        Ok(DeltaPage {
            reset: self.reset,
            has_more: self.has_more,
            cursor: self.cursor,
            entries,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThumbnailFormat {
    #[default]
    Jpeg,
    Png,
}

impl ThumbnailFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "jpeg",
            ThumbnailFormat::Png => "png",
        }
    }
}

impl std::str::FromStr for ThumbnailFormat {
    type Err = DropboxError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "" | "jpeg" => Ok(ThumbnailFormat::Jpeg),
            "png" => Ok(ThumbnailFormat::Png),
            other => Err(DropboxError::UnsupportedMedia(format!(
                "unsupported format '{other}' must be jpeg or png"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThumbnailSize {
    Xs,
    #[default]
    S,
    M,
    L,
    Xl,
}

impl ThumbnailSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailSize::Xs => "xs",
            ThumbnailSize::S => "s",
            ThumbnailSize::M => "m",
            ThumbnailSize::L => "l",
            ThumbnailSize::Xl => "xl",
        }
    }
}

impl std::str::FromStr for ThumbnailSize {
    type Err = DropboxError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "xs" => Ok(ThumbnailSize::Xs),
            "" | "s" => Ok(ThumbnailSize::S),
            "m" => Ok(ThumbnailSize::M),
            "l" => Ok(ThumbnailSize::L),
            "xl" => Ok(ThumbnailSize::Xl),
            other => Err(DropboxError::UnsupportedMedia(format!(
                "unsupported size '{other}' must be xs, s, m, l or xl"
            ))),
        }
    }
}
