use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    codec::{non_blank, optional_date, optional_number, optional_text},
    domain::{
        BenefitType, EmployeeId, HospitalId, PortalStatus, RegistrationType, WageType, WorksiteId,
    },
};

/// Writable part of an employee record, sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub id_card: String,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    pub employment_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wage_type: Option<WageType>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub employee_no: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub passport: Option<String>,
    #[serde(default, deserialize_with = "optional_number", skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub hospital1: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub hospital2: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub hospital3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksite_id: Option<WorksiteId>,
    pub benefit_type: BenefitType,
    #[serde(default)]
    pub registration_type: RegistrationType,
    #[serde(default)]
    pub status: PortalStatus,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub resign_reason: Option<String>,
    #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
}

impl EmployeeDraft {
    /// A register-in draft with every optional field unset.
    pub fn new(
        id_card: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        employment_date: NaiveDate,
        benefit_type: BenefitType,
    ) -> Self {
        Self {
            id_card: id_card.into(),
            prefix: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            gender: None,
            nationality: None,
            marital_status: None,
            employment_date,
            wage_type: None,
            employee_no: None,
            department: None,
            designation: None,
            passport: None,
            salary: None,
            bank_name: None,
            bank_account: None,
            plan: None,
            hospital1: None,
            hospital2: None,
            hospital3: None,
            worksite_id: None,
            benefit_type,
            registration_type: RegistrationType::RegisterIn,
            status: PortalStatus::Entry,
            effective_date: None,
            resign_reason: None,
            processed_by: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Hospital choices in preference order, skipping unset slots.
    pub fn hospitals(&self) -> impl Iterator<Item = &str> {
        [&self.hospital1, &self.hospital2, &self.hospital3]
            .into_iter()
            .filter_map(|choice| choice.as_deref())
    }

    /// Drops blank optional text so it is omitted from the next payload.
    pub fn compact(mut self) -> Self {
        for field in [
            &mut self.prefix,
            &mut self.gender,
            &mut self.nationality,
            &mut self.marital_status,
            &mut self.employee_no,
            &mut self.department,
            &mut self.designation,
            &mut self.passport,
            &mut self.bank_name,
            &mut self.bank_account,
            &mut self.plan,
            &mut self.hospital1,
            &mut self.hospital2,
            &mut self.hospital3,
            &mut self.resign_reason,
            &mut self.processed_by,
        ] {
            *field = field.take().and_then(non_blank);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    #[serde(flatten)]
    pub details: EmployeeDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        self.details.full_name()
    }

    /// Still engaged: no exit has been processed for this record.
    pub fn is_active(&self) -> bool {
        self.details.registration_type == RegistrationType::RegisterIn
    }
}

/// Writable part of a worksite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksiteDraft {
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Registration window in days.
    #[serde(default)]
    pub hire_limit: u32,
    /// Resignation window in days.
    #[serde(default)]
    pub resign_limit: u32,
    #[serde(default)]
    pub sync_ssf: bool,
    #[serde(default)]
    pub sync_aia: bool,
}

fn default_icon() -> String {
    "fa-building".into()
}

fn default_color() -> String {
    "blue".into()
}

impl WorksiteDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: default_icon(),
            color: default_color(),
            hire_limit: 30,
            resign_limit: 15,
            sync_ssf: true,
            sync_aia: false,
        }
    }

    pub fn supports(&self, benefit: BenefitType) -> bool {
        match benefit {
            BenefitType::Ssf => self.sync_ssf,
            BenefitType::Aia => self.sync_aia,
        }
    }

    pub fn supported_benefits(&self) -> Vec<BenefitType> {
        [BenefitType::Ssf, BenefitType::Aia]
            .into_iter()
            .filter(|benefit| self.supports(*benefit))
            .collect()
    }

    /// Window in days for the given flow.
    pub fn window_days(&self, registration_type: RegistrationType) -> u32 {
        match registration_type {
            RegistrationType::RegisterIn => self.hire_limit,
            RegistrationType::RegisterOut => self.resign_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksite {
    pub id: WorksiteId,
    #[serde(flatten)]
    pub details: WorksiteDraft,
}

impl Worksite {
    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn supports(&self, benefit: BenefitType) -> bool {
        self.details.supports(benefit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub name: String,
    pub province: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_type: Option<String>,
}

impl Hospital {
    pub fn new(id: &str, name: &str, province: &str) -> Self {
        Self {
            id: HospitalId::from(id),
            name: name.to_string(),
            province: province.to_string(),
            hospital_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    #[serde(default)]
    pub register_in: u64,
    #[serde(default)]
    pub register_out: u64,
}

/// Response of `GET /employees/stats/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeStats {
    #[serde(default)]
    pub total_employees: u64,
    #[serde(default)]
    pub new_joiners: u64,
    #[serde(default)]
    pub resignations: u64,
    #[serde(default)]
    pub pending_actions: u64,
    #[serde(default)]
    pub ssf_queue: QueueCounts,
    #[serde(default)]
    pub aia_queue: QueueCounts,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
