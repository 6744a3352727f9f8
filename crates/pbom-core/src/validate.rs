//! Structural validation of [`PipelineRecord`] documents.

use std::fmt;

use jiff::Timestamp;

use crate::schema::{PipelineRecord, VERSION};
use crate::{Error, ErrorKind};

const DIGEST_PREFIX: &str = "sha256:";

/// Returns true if `sha` is a full 40 character lowercase hex commit SHA.
#[must_use]
pub fn is_valid_commit_sha(sha: &str) -> bool {
    sha.len() == 40 && is_lower_hex(sha)
}

/// Returns true if `digest` is `sha256:` followed by 64 lowercase hex characters.
#[must_use]
pub fn is_valid_digest(digest: &str) -> bool {
    digest
        .strip_prefix(DIGEST_PREFIX)
        .is_some_and(|hex| hex.len() == 64 && is_lower_hex(hex))
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Every violation found in a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<String>,
}

impl ValidationErrors {
    fn push(&mut self, violation: impl Into<String>) {
        self.violations.push(violation.into());
    }

    /// Returns the violations in the order they were found.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.violations.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::new(ErrorKind::InvalidInput).with_message(errors.to_string())
    }
}

impl PipelineRecord {
    /// Checks required members and identifier formats.
    ///
    /// All violations are collected rather than stopping at the first one.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.pbom_version.is_empty() {
            errors.push("missing pbom_version");
        } else if self.pbom_version != VERSION {
            errors.push(format!(
                "unsupported pbom_version {:?} (expected {VERSION:?})",
                self.pbom_version
            ));
        }

        if self.id.is_empty() {
            errors.push("missing id");
        }
        if self.timestamp == Timestamp::UNIX_EPOCH {
            errors.push("missing timestamp");
        }

        if self.source.repository.is_empty() {
            errors.push("missing source.repository");
        }
        if self.source.commit_sha.is_empty() {
            errors.push("missing source.commit_sha");
        } else if !is_valid_commit_sha(&self.source.commit_sha) {
            errors.push(format!(
                "invalid source.commit_sha {:?} (expected 40-char hex)",
                self.source.commit_sha
            ));
        }

        let build = &self.build;
        for (value, field) in [
            (&build.workflow_run_id, "build.workflow_run_id"),
            (&build.workflow_name, "build.workflow_name"),
            (&build.actor, "build.actor"),
            (&build.status, "build.status"),
        ] {
            if value.is_empty() {
                errors.push(format!("missing {field}"));
            }
        }

        for (i, artifact) in self.artifacts.iter().enumerate() {
            if artifact.name.is_empty() {
                errors.push(format!("missing artifacts[{i}].name"));
            }
            if artifact.artifact_type.is_empty() {
                errors.push(format!("missing artifacts[{i}].type"));
            }
            if artifact.digest.is_empty() {
                errors.push(format!("missing artifacts[{i}].digest"));
            } else if !is_valid_digest(&artifact.digest) {
                errors.push(format!(
                    "invalid artifacts[{i}].digest {:?} (expected sha256:<64-char hex>)",
                    artifact.digest
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Artifact, Build, Source};

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";
    const HEX64: &str = "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

    fn valid_record() -> PipelineRecord {
        let source = Source {
            repository: "acme/widget".into(),
            commit_sha: SHA.into(),
            ..Source::default()
        };
        let build = Build {
            workflow_run_id: "42".into(),
            workflow_name: "CI".into(),
            actor: "octocat".into(),
            status: "success".into(),
            ..Build::default()
        };
        PipelineRecord::new("rec-1", source, build)
    }

    #[test]
    fn digest_format() {
        assert!(is_valid_digest(&format!("sha256:{HEX64}")));

        assert!(!is_valid_digest(HEX64));
        assert!(!is_valid_digest(&format!("sha512:{HEX64}")));
        assert!(!is_valid_digest(&format!("sha256:{}", &HEX64[1..])));
        assert!(!is_valid_digest(&format!("sha256:{HEX64}0")));
        assert!(!is_valid_digest(&format!("sha256:{}", HEX64.to_uppercase())));
        assert!(!is_valid_digest(&format!("sha256:{}g", &HEX64[1..])));
        assert!(!is_valid_digest("sha256:"));
    }

    #[test]
    fn commit_sha_format() {
        assert!(is_valid_commit_sha(SHA));
        assert!(is_valid_commit_sha(&"a".repeat(40)));
        assert!(!is_valid_commit_sha(&SHA[..39]));
        assert!(!is_valid_commit_sha(&SHA.to_uppercase()));
        assert!(!is_valid_commit_sha("z".repeat(40).as_str()));
    }

    #[test]
    fn valid_record_passes() {
        let mut record = valid_record();
        record.artifacts.push(Artifact::container_image(
            "widget",
            "ghcr.io/acme/widget",
            format!("sha256:{HEX64}"),
            vec![],
        ));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn collects_all_violations() {
        let mut record = valid_record();
        record.id.clear();
        record.source.commit_sha = "abc".into();
        record.build.actor.clear();
        record.artifacts.push(Artifact {
            name: "widget".into(),
            artifact_type: "container-image".into(),
            digest: "md5:1234".into(),
            ..Artifact::default()
        });

        let errors = record.validate().unwrap_err();
        let violations = errors.violations();

        assert_eq!(violations.len(), 4);
        assert_eq!(violations[0], "missing id");
        assert!(violations[1].starts_with("invalid source.commit_sha"));
        assert_eq!(violations[2], "missing build.actor");
        assert!(violations[3].starts_with("invalid artifacts[0].digest"));
    }

    #[test]
    fn default_record_reports_missing_fields() {
        let errors = PipelineRecord::default().validate().unwrap_err();
        assert!(errors.violations().iter().any(|v| v == "missing pbom_version"));
        assert!(errors.violations().iter().any(|v| v == "missing timestamp"));
    }
}
