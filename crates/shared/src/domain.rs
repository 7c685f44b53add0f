use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Backend ids arrive as integers from some deployments and strings from others.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value,
        }
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

id_newtype!(EmployeeId);
id_newtype!(WorksiteId);
id_newtype!(HospitalId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Five-stage label applied to a registration as it moves through the provider portal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalStatus {
    #[default]
    Entry,
    Pending,
    Reviewing,
    Reported,
    Verified,
}

impl PortalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::Pending => "PENDING",
            Self::Reviewing => "REVIEWING",
            Self::Reported => "REPORTED",
            Self::Verified => "VERIFIED",
        }
    }
}

impl fmt::Display for PortalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PortalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTRY" => Ok(Self::Entry),
            "PENDING" => Ok(Self::Pending),
            "REVIEWING" => Ok(Self::Reviewing),
            "REPORTED" => Ok(Self::Reported),
            "VERIFIED" => Ok(Self::Verified),
            _ => Err(ParseEnumError::new("status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenefitType {
    /// Social-security fund.
    Ssf,
    /// Group insurance.
    Aia,
}

impl BenefitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssf => "SSF",
            Self::Aia => "AIA",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Ssf => Self::Aia,
            Self::Aia => Self::Ssf,
        }
    }
}

impl fmt::Display for BenefitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BenefitType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SSF" => Ok(Self::Ssf),
            "AIA" => Ok(Self::Aia),
            _ => Err(ParseEnumError::new("benefit type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationType {
    #[default]
    RegisterIn,
    RegisterOut,
}

impl RegistrationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterIn => "REGISTER_IN",
            Self::RegisterOut => "REGISTER_OUT",
        }
    }
}

impl fmt::Display for RegistrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RegistrationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "register_in" | "register-in" => Ok(Self::RegisterIn),
            "out" | "register_out" | "register-out" => Ok(Self::RegisterOut),
            _ => Err(ParseEnumError::new("registration type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WageType {
    Daily,
    #[default]
    Monthly,
}

impl FromStr for WageType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ParseEnumError::new("wage type", s)),
        }
    }
}

/// Exit reasons offered for both providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    #[serde(rename = "Resign / Left Employer Within 6 Days")]
    ResignWithinSixDays,
    #[serde(rename = "End of Contract Period")]
    EndOfContract,
    #[serde(rename = "Resign Before Retirement Plan")]
    ResignBeforeRetirement,
    #[serde(rename = "Mandatory Retirement")]
    MandatoryRetirement,
    #[serde(rename = "Dismissal for Serious Misconduct")]
    SeriousMisconduct,
    #[serde(rename = "Death of Member")]
    Death,
}

impl TerminationReason {
    pub const ALL: [TerminationReason; 6] = [
        Self::ResignWithinSixDays,
        Self::EndOfContract,
        Self::ResignBeforeRetirement,
        Self::MandatoryRetirement,
        Self::SeriousMisconduct,
        Self::Death,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ResignWithinSixDays => "Resign / Left Employer Within 6 Days",
            Self::EndOfContract => "End of Contract Period",
            Self::ResignBeforeRetirement => "Resign Before Retirement Plan",
            Self::MandatoryRetirement => "Mandatory Retirement",
            Self::SeriousMisconduct => "Dismissal for Serious Misconduct",
            Self::Death => "Death of Member",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for TerminationReason {
    type Err = ParseEnumError;

    /// Accepts the 1-based position in [`TerminationReason::ALL`] or the full label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(position) = trimmed.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| Self::ALL.get(index).copied())
                .ok_or_else(|| ParseEnumError::new("termination reason", s));
        }
        Self::ALL
            .into_iter()
            .find(|reason| reason.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEnumError::new("termination reason", s))
    }
}
