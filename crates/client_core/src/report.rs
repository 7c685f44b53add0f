use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use shared::{
    domain::{BenefitType, ParseEnumError, PortalStatus, RegistrationType},
    protocol::{Employee, Worksite},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub date: Option<NaiveDate>,
    pub name: String,
    pub site: String,
    pub benefit: BenefitType,
    /// Hospital choice 1 or plan for register-in, the exit reason for register-out.
    pub detail: String,
    pub status: PortalStatus,
}

impl AuditRow {
    pub fn new(employee: &Employee, worksites: &[Worksite]) -> Self {
        let details = &employee.details;
        let (date, detail) = match details.registration_type {
            RegistrationType::RegisterIn => {
                let detail = match details.benefit_type {
                    BenefitType::Ssf => details.hospital1.clone(),
                    BenefitType::Aia => details.plan.clone(),
                };
                (Some(details.employment_date), detail)
            }
            RegistrationType::RegisterOut => {
                (details.effective_date, details.resign_reason.clone())
            }
        };
        let site = details
            .worksite_id
            .as_ref()
            .and_then(|id| worksites.iter().find(|worksite| &worksite.id == id))
            .map(|worksite| worksite.name().to_string())
            .unwrap_or_default();

        Self {
            date,
            name: employee.full_name(),
            site,
            benefit: details.benefit_type,
            detail: detail.unwrap_or_default(),
            status: details.status,
        }
    }
}

/// `All`, or one calendar month written `YYYY-MM`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    #[default]
    All,
    Month { year: i32, month: u32 },
}

impl Period {
    pub fn contains(self, date: Option<NaiveDate>) -> bool {
        match self {
            Self::All => true,
            Self::Month { year, month } => {
                date.is_some_and(|date| date.year() == year && date.month() == month)
            }
        }
    }
}

impl FromStr for Period {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| ParseEnumError::new("period", s))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| ParseEnumError::new("period", s))?;
        match month.parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => Ok(Self::Month { year, month }),
            _ => Err(ParseEnumError::new("period", s)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    pub registration_type: RegistrationType,
    /// Worksite name; `None` is every site.
    pub site: Option<String>,
    pub provider: Option<BenefitType>,
    pub period: Period,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            registration_type: RegistrationType::RegisterIn,
            site: None,
            provider: None,
            period: Period::All,
        }
    }
}

pub fn audit_rows(employees: &[Employee], worksites: &[Worksite], filter: &AuditFilter) -> Vec<AuditRow> {
    employees
        .iter()
        .filter(|employee| employee.details.registration_type == filter.registration_type)
        .map(|employee| AuditRow::new(employee, worksites))
        .filter(|row| {
            filter
                .site
                .as_deref()
                .map_or(true, |site| row.site.eq_ignore_ascii_case(site))
                && filter.provider.map_or(true, |provider| row.benefit == provider)
                && filter.period.contains(row.date)
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
