//! Region name translation
//!
//! ExitFlow addresses regions by friendly names ("ohio", "frankfurt") and
//! resolves them to AWS region codes exactly once at the entry point; the
//! cloud crates only ever see provider codes.

use crate::error::{CoreError, Result};

/// Friendly name → AWS region code, in display order.
const REGIONS: &[(&str, &str)] = &[
    ("ohio", "us-east-2"),
    ("virginia", "us-east-1"),
    ("oregon", "us-west-2"),
    ("california", "us-west-1"),
    ("canada", "ca-central-1"),
    ("ireland", "eu-west-1"),
    ("london", "eu-west-2"),
    ("paris", "eu-west-3"),
    ("frankfurt", "eu-central-1"),
    ("stockholm", "eu-north-1"),
    ("singapore", "ap-southeast-1"),
    ("sydney", "ap-southeast-2"),
    ("tokyo", "ap-northeast-1"),
    ("seoul", "ap-northeast-2"),
    ("mumbai", "ap-south-1"),
    ("saopaulo", "sa-east-1"),
];

/// A validated region, carrying both the friendly name and the AWS code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    friendly: &'static str,
    aws: &'static str,
}

impl Region {
    /// Resolve a friendly name (case- and whitespace-insensitive).
    pub fn from_friendly(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        REGIONS
            .iter()
            .find(|(friendly, _)| *friendly == normalized)
            .map(|(friendly, aws)| Self { friendly, aws })
            .ok_or_else(|| CoreError::UnknownRegion {
                name: name.to_string(),
                available: available_regions(),
            })
    }

    /// Resolve an AWS region code back to its friendly name.
    pub fn from_aws(code: &str) -> Result<Self> {
        REGIONS
            .iter()
            .find(|(_, aws)| *aws == code)
            .map(|(friendly, aws)| Self { friendly, aws })
            .ok_or_else(|| CoreError::UnknownAwsRegion(code.to_string()))
    }

    pub fn friendly_name(&self) -> &'static str {
        self.friendly
    }

    pub fn aws_code(&self) -> &'static str {
        self.aws
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly)
    }
}

/// Comma-separated list of friendly names for error messages and usage text.
pub fn available_regions() -> String {
    all_friendly_names().join(", ")
}

/// All friendly names, in table order.
pub fn all_friendly_names() -> Vec<&'static str> {
    REGIONS.iter().map(|(friendly, _)| *friendly).collect()
}

pub fn is_valid_friendly_name(name: &str) -> bool {
    Region::from_friendly(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_friendly_names() {
        let region = Region::from_friendly("ohio").unwrap();
        assert_eq!(region.aws_code(), "us-east-2");
        assert_eq!(region.friendly_name(), "ohio");
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let region = Region::from_friendly("  Frankfurt ").unwrap();
        assert_eq!(region.aws_code(), "eu-central-1");
    }

    #[test]
    fn rejects_unknown_friendly_name() {
        let err = Region::from_friendly("atlantis").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("atlantis"));
        assert!(message.contains("ohio"));
    }

    #[test]
    fn resolves_aws_codes() {
        let region = Region::from_aws("ap-northeast-1").unwrap();
        assert_eq!(region.friendly_name(), "tokyo");
    }

    #[test]
    fn rejects_unknown_aws_code() {
        assert!(Region::from_aws("mars-central-1").is_err());
    }

    #[test]
    fn friendly_and_aws_mappings_are_bijective() {
        for name in all_friendly_names() {
            let region = Region::from_friendly(name).unwrap();
            let back = Region::from_aws(region.aws_code()).unwrap();
            assert_eq!(back.friendly_name(), name);
        }
    }

    #[test]
    fn validity_check() {
        assert!(is_valid_friendly_name("sydney"));
        assert!(!is_valid_friendly_name("us-east-2"));
    }
}
