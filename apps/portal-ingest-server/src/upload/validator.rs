//! Upload Validator
//!
//! Decides whether an incoming file may be stored, using only what the
//! client declared. Media types are checked eagerly, before any payload byte
//! is read; the true length is enforced again by the store writer while
//! streaming.

use crate::config::{CategoryRules, UploadConfig};

use super::types::{IncomingFile, MediaType, Rejection, UploadCategory, MULTIPART_OVERHEAD};

/// Per-category content contract
#[derive(Debug, Clone)]
pub struct Validator {
    rules: UploadConfig,
}

impl Validator {
    pub fn new(rules: UploadConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self, category: UploadCategory) -> &CategoryRules {
        self.rules.for_category(category)
    }

    /// Largest request body worth reading for a category
    pub fn body_limit(&self, category: UploadCategory) -> u64 {
        self.rules(category).max_bytes.saturating_add(MULTIPART_OVERHEAD)
    }

    /// Reject a request whose declared `Content-Length` cannot fit a file
    /// within the limit, before the body is touched.
    pub fn check_request_length(
        &self,
        category: UploadCategory,
        content_length: Option<u64>,
    ) -> Result<(), Rejection> {
        match content_length {
            Some(len) if len > self.body_limit(category) => Err(Rejection::TooLarge {
                max: self.rules(category).max_bytes,
            }),
            _ => Ok(()),
        }
    }

    /// Validate the file part of an upload
    pub fn validate<S>(
        &self,
        category: UploadCategory,
        file: Option<&IncomingFile<S>>,
    ) -> Result<MediaType, Rejection> {
        let file = file.ok_or(Rejection::NoFile)?;
        let rules = self.rules(category);

        let media_type = file
            .media_type
            .as_deref()
            .and_then(MediaType::parse)
            .filter(|media_type| rules.allowed_types.contains(media_type))
            .ok_or_else(|| Rejection::InvalidFormat {
                declared: file.media_type.clone(),
                allowed: rules.allowed_types.clone(),
            })?;

        if let Some(len) = file.declared_len {
            if len > rules.max_bytes {
                return Err(Rejection::TooLarge {
                    max: rules.max_bytes,
                });
            }
        }

        Ok(media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(media_type: Option<&str>, declared_len: Option<u64>) -> IncomingFile<()> {
        IncomingFile {
            media_type: media_type.map(String::from),
            file_name: Some("cv.pdf".to_string()),
            declared_len,
            body: (),
        }
    }

    #[test]
    fn test_accepts_allowed_types() {
        let validator = Validator::new(UploadConfig::default());

        let pdf = incoming(Some("application/pdf"), None);
        assert_eq!(
            validator.validate(UploadCategory::Resume, Some(&pdf)),
            Ok(MediaType::Pdf)
        );

        let png = incoming(Some("image/png"), None);
        assert_eq!(
            validator.validate(UploadCategory::Profile, Some(&png)),
            Ok(MediaType::Png)
        );

        let jpeg = incoming(Some("image/jpeg"), Some(1024));
        assert_eq!(
            validator.validate(UploadCategory::Profile, Some(&jpeg)),
            Ok(MediaType::Jpeg)
        );
    }

    #[test]
    fn test_allow_lists_are_per_category() {
        let validator = Validator::new(UploadConfig::default());

        // A png is fine for a profile but not for a resume
        let png = incoming(Some("image/png"), None);
        assert!(matches!(
            validator.validate(UploadCategory::Resume, Some(&png)),
            Err(Rejection::InvalidFormat { .. })
        ));

        let pdf = incoming(Some("application/pdf"), None);
        let rejection = validator
            .validate(UploadCategory::Profile, Some(&pdf))
            .unwrap_err();
        assert_eq!(
            rejection.to_string(),
            "Invalid format. Only JPG/PNG files are allowed."
        );
    }

    #[test]
    fn test_rejects_unknown_or_missing_type() {
        let validator = Validator::new(UploadConfig::default());

        let gif = incoming(Some("application/gif"), None);
        assert_eq!(
            validator.validate(UploadCategory::Profile, Some(&gif)),
            Err(Rejection::InvalidFormat {
                declared: Some("application/gif".to_string()),
                allowed: vec![MediaType::Jpeg, MediaType::Png],
            })
        );

        let untyped = incoming(None, None);
        assert!(matches!(
            validator.validate(UploadCategory::Resume, Some(&untyped)),
            Err(Rejection::InvalidFormat { declared: None, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let validator = Validator::new(UploadConfig::default());
        assert_eq!(
            validator.validate::<()>(UploadCategory::Resume, None),
            Err(Rejection::NoFile)
        );
    }

    #[test]
    fn test_declared_length_over_limit() {
        let validator = Validator::new(UploadConfig::default());
        let max = validator.rules(UploadCategory::Resume).max_bytes;

        let at_limit = incoming(Some("application/pdf"), Some(max));
        assert!(validator.validate(UploadCategory::Resume, Some(&at_limit)).is_ok());

        let over = incoming(Some("application/pdf"), Some(max + 1));
        assert_eq!(
            validator.validate(UploadCategory::Resume, Some(&over)),
            Err(Rejection::TooLarge { max })
        );
    }

    #[test]
    fn test_request_length() {
        let validator = Validator::new(UploadConfig::default());
        let limit = validator.body_limit(UploadCategory::Profile);

        assert!(validator.check_request_length(UploadCategory::Profile, None).is_ok());
        assert!(validator
            .check_request_length(UploadCategory::Profile, Some(limit))
            .is_ok());
        assert!(matches!(
            validator.check_request_length(UploadCategory::Profile, Some(limit + 1)),
            Err(Rejection::TooLarge { .. })
        ));
    }
}
