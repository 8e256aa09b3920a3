use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Verticals the service accepts documents and questions for.
///
/// Input is matched case-insensitively; the canonical form used for
/// storage, filtering, and responses is the lowercase kebab-case name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Industry {
    Healthcare,
    RealEstate,
    Hvac,
    Legal,
    Finance,
}

#[derive(Debug, Clone, Error)]
#[error("unknown industry {input:?}, allowed: {}", Industry::allowed_list())]
pub struct UnknownIndustry {
    pub input: String,
}

impl Industry {
    pub const ALL: [Industry; 5] = [
        Industry::Healthcare,
        Industry::RealEstate,
        Industry::Hvac,
        Industry::Legal,
        Industry::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Healthcare => "healthcare",
            Industry::RealEstate => "real-estate",
            Industry::Hvac => "hvac",
            Industry::Legal => "legal",
            Industry::Finance => "finance",
        }
    }

    fn allowed_list() -> String {
        Industry::ALL
            .iter()
            .map(|industry| industry.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = UnknownIndustry;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase();
        Industry::ALL
            .into_iter()
            .find(|industry| industry.as_str() == normalized)
            .ok_or_else(|| UnknownIndustry {
                input: input.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::Industry;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("HealthCare".parse::<Industry>().unwrap(), Industry::Healthcare);
        assert_eq!("REAL-ESTATE".parse::<Industry>().unwrap(), Industry::RealEstate);
        assert_eq!(" hvac ".parse::<Industry>().unwrap(), Industry::Hvac);
    }

    #[test]
    fn unknown_industries_are_rejected() {
        let error = "aerospace".parse::<Industry>().unwrap_err();
        assert!(error.to_string().contains("aerospace"));
        assert!(error.to_string().contains("healthcare"));
    }

    #[test]
    fn canonical_form_is_lowercase() {
        for industry in Industry::ALL {
            assert_eq!(industry.as_str(), industry.as_str().to_lowercase());
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Industry::RealEstate).unwrap();
        assert_eq!(json, "\"real-estate\"");
        let back: Industry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Industry::RealEstate);
    }
}
