use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Comply,
    NotComply,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 2] = [ComplianceStatus::Comply, ComplianceStatus::NotComply];

    pub const fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::Comply => "comply",
            ComplianceStatus::NotComply => "not_comply",
        }
    }

    pub fn from_counts(pass_count: usize, total_controls: usize) -> Self {
        if pass_count == total_controls {
            ComplianceStatus::Comply
        } else {
            ComplianceStatus::NotComply
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "comply" => Ok(ComplianceStatus::Comply),
            "not_comply" => Ok(ComplianceStatus::NotComply),
            _ => Err(format!(
                "invalid status: {s} (expected comply|not_comply)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_and_dash_variants() {
        assert_eq!("Comply".parse::<ComplianceStatus>(), Ok(ComplianceStatus::Comply));
        assert_eq!(
            " not-comply ".parse::<ComplianceStatus>(),
            Ok(ComplianceStatus::NotComply)
        );
        assert!("compliant".parse::<ComplianceStatus>().is_err());
    }

    #[test]
    fn comply_only_when_every_control_passes() {
        assert_eq!(ComplianceStatus::from_counts(3, 3), ComplianceStatus::Comply);
        assert_eq!(ComplianceStatus::from_counts(2, 3), ComplianceStatus::NotComply);
        assert_eq!(ComplianceStatus::from_counts(0, 1), ComplianceStatus::NotComply);
    }
}
