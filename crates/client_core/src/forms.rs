use chrono::NaiveDate;
use shared::{
    codec::non_blank,
    domain::{BenefitType, EmployeeId, PortalStatus, RegistrationType, TerminationReason, WageType},
    national_id::{format_national_id, is_complete},
    protocol::{Employee, EmployeeDraft, Worksite, WorksiteDraft},
};
use tracing::{info, warn};

use crate::{
    ai::IdCardScan,
    error::{PortalError, PortalResult, ValidationErrors},
    roster::Roster,
};

/// Keeps `current` when the worksite syncs it, otherwise switches to the other
/// provider the worksite does sync. `None` when it syncs neither.
pub fn corrected_benefit(current: Option<BenefitType>, worksite: &WorksiteDraft) -> Option<BenefitType> {
    let preferred = current.unwrap_or(BenefitType::Ssf);
    [preferred, preferred.other()]
        .into_iter()
        .find(|benefit| worksite.supports(*benefit))
}

fn parse_date(
    errors: &mut ValidationErrors,
    label: &str,
    value: &str,
    required: bool,
) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if required {
            errors.missing(label);
        }
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{label} must be a date in YYYY-MM-DD form"));
            None
        }
    }
}

fn optional(value: &str) -> Option<String> {
    non_blank(value.to_string())
}

fn check_benefit(
    errors: &mut ValidationErrors,
    benefit: Option<BenefitType>,
    worksite: Option<&Worksite>,
) -> Option<BenefitType> {
    match (benefit, worksite) {
        (None, Some(worksite)) => {
            errors.push(format!(
                "worksite '{}' does not sync with any benefit provider",
                worksite.name()
            ));
            None
        }
        (None, None) => {
            errors.missing("benefit type");
            None
        }
        (Some(benefit), Some(worksite)) if !worksite.supports(benefit) => {
            errors.push(format!(
                "worksite '{}' does not sync with {benefit}",
                worksite.name()
            ));
            None
        }
        (Some(benefit), _) => Some(benefit),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeForm {
    pub prefix: String,
    pub first_name: String,
    pub last_name: String,
    id_card: String,
    pub date_of_birth: String,
    pub gender: String,
    pub nationality: String,
    pub marital_status: String,
    pub wage_type: Option<WageType>,
    pub employment_date: String,
    pub effective_date: String,
    pub employee_no: String,
    pub department: String,
    pub designation: String,
    pub passport: String,
    pub salary: String,
    pub bank_name: String,
    pub bank_account: String,
    pub plan: String,
    pub hospital1: String,
    pub hospital2: String,
    pub hospital3: String,
    worksite: Option<Worksite>,
    benefit: Option<BenefitType>,
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            id_card: String::new(),
            date_of_birth: String::new(),
            gender: String::new(),
            nationality: String::new(),
            marital_status: String::new(),
            wage_type: None,
            employment_date: String::new(),
            effective_date: String::new(),
            employee_no: String::new(),
            department: String::new(),
            designation: String::new(),
            passport: String::new(),
            salary: String::new(),
            bank_name: String::new(),
            bank_account: String::new(),
            plan: String::new(),
            hospital1: String::new(),
            hospital2: String::new(),
            hospital3: String::new(),
            worksite: None,
            benefit: Some(BenefitType::Ssf),
        }
    }
}

impl IntakeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_card(&self) -> &str {
        &self.id_card
    }

    pub fn set_id_card(&mut self, raw: &str) {
        self.id_card = format_national_id(raw);
    }

    pub fn benefit(&self) -> Option<BenefitType> {
        self.benefit
    }

    pub fn select_benefit(&mut self, benefit: BenefitType) {
        self.benefit = Some(benefit);
    }

    pub fn worksite(&self) -> Option<&Worksite> {
        self.worksite.as_ref()
    }

    /// Switches worksite and silently corrects the provider if the new worksite
    /// does not sync the current one.
    pub fn select_worksite(&mut self, worksite: &Worksite) -> Option<BenefitType> {
        let corrected = corrected_benefit(self.benefit, &worksite.details);
        if corrected != self.benefit {
            info!(
                "intake: worksite '{}' switched benefit {:?} -> {:?}",
                worksite.name(),
                self.benefit,
                corrected
            );
        }
        self.benefit = corrected;
        self.worksite = Some(worksite.clone());
        corrected
    }

    /// Fills identity fields from an OCR result.
    pub fn apply_scan(&mut self, scan: &IdCardScan) {
        self.first_name = scan.first_name.clone();
        self.last_name = scan.last_name.clone();
        self.set_id_card(&scan.id_number);
        self.date_of_birth = scan.dob.clone().unwrap_or_default();
        self.nationality = scan
            .nationality
            .clone()
            .and_then(non_blank)
            .unwrap_or_else(|| "thai".into());
        self.gender = scan
            .gender
            .as_deref()
            .and_then(|gender| non_blank(gender.to_lowercase()))
            .unwrap_or_else(|| "male".into());
    }

    /// Validates the form and shapes it into a create payload.
    pub fn build_draft(&self) -> PortalResult<EmployeeDraft> {
        let mut errors = ValidationErrors::new();

        if self.first_name.trim().is_empty() {
            errors.missing("first name");
        }
        if self.last_name.trim().is_empty() {
            errors.missing("last name");
        }
        if self.id_card.is_empty() {
            errors.missing("national ID");
        } else if !is_complete(&self.id_card) {
            errors.push("national ID must have 13 digits");
        }
        let employment_date = parse_date(&mut errors, "employment date", &self.employment_date, true);
        let date_of_birth = parse_date(&mut errors, "date of birth", &self.date_of_birth, false);
        let effective_date = parse_date(&mut errors, "effective date", &self.effective_date, false);

        let benefit = check_benefit(&mut errors, self.benefit, self.worksite.as_ref());

        let salary = match optional(&self.salary) {
            None => None,
            Some(raw) => match raw.replace(',', "").parse::<f64>() {
                Ok(value) if value >= 0.0 => Some(value),
                _ => {
                    errors.push("salary must be a non-negative number");
                    None
                }
            },
        };

        errors.into_result()?;

        let (Some(employment_date), Some(benefit_type)) = (employment_date, benefit) else {
            // `into_result` already rejected every path that leaves these unset.
            return Err(PortalError::ValidationFailed(ValidationErrors::new()));
        };

        let mut draft = EmployeeDraft::new(
            self.id_card.clone(),
            self.first_name.trim(),
            self.last_name.trim(),
            employment_date,
            benefit_type,
        );
        draft.prefix = optional(&self.prefix);
        draft.date_of_birth = date_of_birth;
        draft.gender = optional(&self.gender);
        draft.nationality = optional(&self.nationality);
        draft.marital_status = optional(&self.marital_status);
        draft.wage_type = self.wage_type;
        draft.effective_date = effective_date;
        draft.employee_no = optional(&self.employee_no);
        draft.department = optional(&self.department);
        draft.designation = optional(&self.designation);
        draft.passport = optional(&self.passport);
        draft.salary = salary;
        draft.bank_name = optional(&self.bank_name);
        draft.bank_account = optional(&self.bank_account);
        draft.plan = optional(&self.plan);
        draft.hospital1 = optional(&self.hospital1);
        draft.hospital2 = optional(&self.hospital2);
        draft.hospital3 = optional(&self.hospital3);
        draft.worksite_id = self.worksite.as_ref().map(|worksite| worksite.id.clone());
        draft.registration_type = RegistrationType::RegisterIn;
        draft.status = PortalStatus::Entry;
        Ok(draft)
    }

    /// Empties the entry fields. The selected worksite and provider stay.
    pub fn clear(&mut self) {
        *self = Self {
            worksite: self.worksite.take(),
            benefit: self.benefit,
            ..Self::default()
        };
    }

    pub async fn submit(&mut self, roster: &Roster) -> PortalResult<Employee> {
        let draft = self.build_draft()?;
        match roster.create_employee(&draft).await {
            Ok(employee) => {
                info!(
                    "intake: registered {} at worksite={:?}",
                    employee.full_name(),
                    draft.worksite_id.as_ref().map(|id| id.as_str())
                );
                self.clear();
                Ok(employee)
            }
            Err(err) => {
                warn!("intake: failed to register {}: {err}", draft.full_name());
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitForm {
    employee: Option<Employee>,
    pub exit_date: String,
    pub reason: Option<TerminationReason>,
    worksite: Option<Worksite>,
    benefit: Option<BenefitType>,
}

impl ExitForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn employee(&self) -> Option<&Employee> {
        self.employee.as_ref()
    }

    pub fn benefit(&self) -> Option<BenefitType> {
        self.benefit
    }

    /// Pre-fills the form from an existing record, as when "exit" is picked on a roster row.
    pub fn select_employee(&mut self, employee: &Employee) {
        self.benefit = Some(employee.details.benefit_type);
        self.employee = Some(employee.clone());
    }

    pub fn select_worksite(&mut self, worksite: &Worksite) -> Option<BenefitType> {
        self.benefit = corrected_benefit(self.benefit, &worksite.details);
        self.worksite = Some(worksite.clone());
        self.benefit
    }

    pub fn select_benefit(&mut self, benefit: BenefitType) {
        self.benefit = Some(benefit);
    }

    pub fn build_update(&self) -> PortalResult<(EmployeeId, EmployeeDraft)> {
        let mut errors = ValidationErrors::new();

        if self.employee.is_none() {
            errors.missing("employee");
        }
        let exit_date = parse_date(&mut errors, "effective exit date", &self.exit_date, true);
        if self.reason.is_none() {
            errors.missing("termination reason");
        }
        let benefit = check_benefit(&mut errors, self.benefit, self.worksite.as_ref());

        errors.into_result()?;

        let (Some(employee), Some(exit_date), Some(reason), Some(benefit_type)) =
            (self.employee.as_ref(), exit_date, self.reason, benefit)
        else {
            return Err(PortalError::ValidationFailed(ValidationErrors::new()));
        };

        let mut draft = employee.details.clone().compact();
        draft.worksite_id = self
            .worksite
            .as_ref()
            .map(|worksite| worksite.id.clone())
            .or(draft.worksite_id);
        draft.benefit_type = benefit_type;
        draft.registration_type = RegistrationType::RegisterOut;
        draft.status = PortalStatus::Pending;
        draft.effective_date = Some(exit_date);
        draft.resign_reason = Some(reason.label().to_string());
        Ok((employee.id.clone(), draft))
    }

    pub async fn submit(&mut self, roster: &Roster) -> PortalResult<Employee> {
        let (id, draft) = self.build_update()?;
        match roster.update_employee(&id, &draft).await {
            Ok(employee) => {
                info!(
                    "exit: processed resignation for {} reason={:?}",
                    employee.full_name(),
                    draft.resign_reason
                );
                *self = Self {
                    worksite: self.worksite.take(),
                    ..Self::default()
                };
                Ok(employee)
            }
            Err(err) => {
                warn!("exit: failed to process resignation for id={id}: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
