//! Ingestion types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Default per-category size limit: 5MB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Allowance for multipart framing (boundaries, part headers, small text
/// fields) on top of the file size limit when judging a whole request body.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

// ============================================================================
// Category
// ============================================================================

/// Fixed classification of an upload, chosen by the route it arrives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadCategory {
    Resume,
    Profile,
}

impl UploadCategory {
    pub const ALL: [UploadCategory; 2] = [UploadCategory::Resume, UploadCategory::Profile];

    /// Directory and url segment for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Resume => "resume",
            UploadCategory::Profile => "profile",
        }
    }

    /// Message returned with a successful upload
    pub fn success_message(&self) -> &'static str {
        match self {
            UploadCategory::Resume => "Resume uploaded successfully",
            UploadCategory::Profile => "Profile image uploaded successfully",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resume" => Ok(UploadCategory::Resume),
            "profile" => Ok(UploadCategory::Profile),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown upload category: {0}")]
pub struct UnknownCategory(pub String);

// ============================================================================
// Media Types
// ============================================================================

/// Media types the service knows a storage extension for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaType {
    pub const ALL: [MediaType; 5] = [
        MediaType::Pdf,
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Gif,
        MediaType::Webp,
    ];

    /// Parse a declared `Content-Type`, ignoring case and parameters
    pub fn parse(declared: &str) -> Option<Self> {
        let essence = declared.split(';').next().unwrap_or("").trim();
        Self::ALL
            .into_iter()
            .find(|media_type| media_type.as_str().eq_ignore_ascii_case(essence))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
        }
    }

    /// Extension used for stored files of this type
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::Gif => "gif",
            MediaType::Webp => "webp",
        }
    }

    /// Short human label used in rejection messages
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Pdf => "PDF",
            MediaType::Jpeg => "JPG",
            MediaType::Png => "PNG",
            MediaType::Gif => "GIF",
            MediaType::Webp => "WEBP",
        }
    }

    /// Reverse of [`MediaType::extension`]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|media_type| media_type.extension() == ext)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Incoming / Stored
// ============================================================================

/// A file part as received, before validation
///
/// Everything except `body` is client-declared and untrusted.
#[derive(Debug)]
pub struct IncomingFile<S> {
    /// Declared `Content-Type` of the part
    pub media_type: Option<String>,

    /// Declared original file name. Logged, never used for storage.
    pub file_name: Option<String>,

    /// Declared byte length of the part, when the client sent one
    pub declared_len: Option<u64>,

    /// Payload bytes
    pub body: S,
}

/// A durably written upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub category: UploadCategory,
    pub id: Uuid,
    pub media_type: MediaType,
    pub size: u64,
    pub path: PathBuf,
}

impl StoredFile {
    /// Generated file name, `<uuid>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.media_type.extension())
    }

    /// Public reference served by the retrieval routes
    pub fn url(&self) -> String {
        format!("/host/{}/{}", self.category, self.file_name())
    }
}

/// Response body of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub message: String,
    pub url: String,
}

impl From<&StoredFile> for UploadResult {
    fn from(stored: &StoredFile) -> Self {
        Self {
            message: stored.category.success_message().to_string(),
            url: stored.url(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure of the byte source feeding the store writer
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The transport-level body limit tripped
    #[error("request body exceeded its size limit")]
    LimitExceeded,

    /// The client went away or sent a broken stream
    #[error("upload stream interrupted: {0}")]
    Interrupted(String),
}

/// Validator rejections. Always client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("No file uploaded")]
    NoFile,

    #[error("Invalid format. Only {} files are allowed.", format_labels(.allowed))]
    InvalidFormat {
        declared: Option<String>,
        allowed: Vec<MediaType>,
    },

    #[error("File too large. Maximum size is {}.", format_limit(.max))]
    TooLarge { max: u64 },
}

/// Store writer failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("upload exceeded {max} bytes")]
    TooLarge { max: u64 },

    #[error("{0}")]
    Interrupted(String),

    #[error("refusing to overwrite existing file {0}")]
    Collision(PathBuf),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_labels(allowed: &[MediaType]) -> String {
    allowed
        .iter()
        .map(MediaType::label)
        .collect::<Vec<_>>()
        .join("/")
}

fn format_limit(max: &u64) -> String {
    format_size(*max)
}

/// Human size for messages: whole MB when exact, otherwise bytes
pub fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
