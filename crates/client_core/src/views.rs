use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use shared::{
    domain::{BenefitType, PortalStatus, RegistrationType, WorksiteId},
    national_id,
    protocol::{Employee, EmployeeStats, Hospital, QueueCounts, Worksite},
};

/// Province name to its hospitals. Provinces iterate in name order; hospitals
/// keep their input order within a province.
pub fn group_hospitals_by_province(hospitals: &[Hospital]) -> BTreeMap<String, Vec<Hospital>> {
    let mut groups: BTreeMap<String, Vec<Hospital>> = BTreeMap::new();
    for hospital in hospitals {
        groups
            .entry(hospital.province.clone())
            .or_default()
            .push(hospital.clone());
    }
    groups
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorksiteFilter {
    #[default]
    All,
    Only(WorksiteId),
}

impl WorksiteFilter {
    pub fn matches(&self, worksite_id: Option<&WorksiteId>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => worksite_id == Some(wanted),
        }
    }
}

impl From<Option<WorksiteId>> for WorksiteFilter {
    fn from(value: Option<WorksiteId>) -> Self {
        value.map_or(Self::All, Self::Only)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub active_only: bool,
    pub worksite: WorksiteFilter,
    pub registration_type: Option<RegistrationType>,
    pub benefit: Option<BenefitType>,
    pub search: Option<String>,
}

impl RosterFilter {
    /// Active employees of every worksite, the default roster screen.
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        let details = &employee.details;
        if self.active_only && !employee.is_active() {
            return false;
        }
        if !self.worksite.matches(details.worksite_id.as_ref()) {
            return false;
        }
        if self
            .registration_type
            .is_some_and(|wanted| details.registration_type != wanted)
        {
            return false;
        }
        if self.benefit.is_some_and(|wanted| details.benefit_type != wanted) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => matches_search(employee, needle),
        }
    }

    pub fn apply<'a>(&self, employees: &'a [Employee]) -> Vec<&'a Employee> {
        employees.iter().filter(|employee| self.matches(employee)).collect()
    }
}

/// Case-insensitive substring match on full name or national ID. A needle of
/// digits also matches the ID with its separators ignored.
fn matches_search(employee: &Employee, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if employee.full_name().to_lowercase().contains(&needle)
        || employee.details.id_card.to_lowercase().contains(&needle)
    {
        return true;
    }
    let needle_digits = national_id::digits(&needle);
    !needle_digits.is_empty()
        && needle_digits.len() == needle.chars().filter(|c| *c != '-' && *c != ' ').count()
        && national_id::digits(&employee.details.id_card).contains(&needle_digits)
}

pub fn headcount(employees: &[Employee], filter: &RosterFilter) -> usize {
    employees
        .iter()
        .filter(|employee| employee.is_active() && filter.matches(employee))
        .count()
}

/// Share of synced records as a whole percentage: `round(100 * total / (total + pending))`.
pub fn sync_rate(total: u64, pending: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (100.0 * total as f64 / (total + pending) as f64).round();
    rate.clamp(0.0, 100.0) as u8
}

/// Register-in / register-out counts for one provider.
pub fn queue_counts(employees: &[Employee], benefit: BenefitType) -> QueueCounts {
    employees
        .iter()
        .filter(|employee| employee.details.benefit_type == benefit)
        .fold(QueueCounts::default(), |mut counts, employee| {
            match employee.details.registration_type {
                RegistrationType::RegisterIn => counts.register_in += 1,
                RegistrationType::RegisterOut => counts.register_out += 1,
            }
            counts
        })
}

/// Last day the provider filing may be made, if the record has a start date.
pub fn deadline(employee: &Employee, worksite: &Worksite) -> Option<NaiveDate> {
    let details = &employee.details;
    let start = match details.registration_type {
        RegistrationType::RegisterIn => Some(details.employment_date),
        RegistrationType::RegisterOut => details.effective_date,
    }?;
    let window = worksite.details.window_days(details.registration_type);
    start.checked_add_days(Days::new(u64::from(window)))
}

pub fn is_overdue(employee: &Employee, worksite: &Worksite, today: NaiveDate) -> bool {
    employee.details.status < PortalStatus::Reported
        && deadline(employee, worksite).is_some_and(|deadline| today > deadline)
}

/// Records past their window. Records without a known worksite are never overdue.
pub fn overdue<'a>(
    employees: &'a [Employee],
    worksites: &[Worksite],
    today: NaiveDate,
) -> Vec<&'a Employee> {
    employees
        .iter()
        .filter(|employee| {
            employee
                .details
                .worksite_id
                .as_ref()
                .and_then(|id| worksites.iter().find(|worksite| &worksite.id == id))
                .is_some_and(|worksite| is_overdue(employee, worksite, today))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderQueue {
    pub benefit: BenefitType,
    pub register_in: u64,
    pub register_out: u64,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub stats: EmployeeStats,
    pub sync_rate: u8,
    pub queues: Vec<ProviderQueue>,
    pub overdue: usize,
}

impl DashboardSummary {
    /// Combines backend stats with client-side overdue counts.
    pub fn build(
        stats: EmployeeStats,
        employees: &[Employee],
        worksites: &[Worksite],
        today: NaiveDate,
    ) -> Self {
        let late = overdue(employees, worksites, today);
        let queues = [
            (BenefitType::Ssf, stats.ssf_queue),
            (BenefitType::Aia, stats.aia_queue),
        ]
        .into_iter()
        .map(|(benefit, counts)| ProviderQueue {
            benefit,
            register_in: counts.register_in,
            register_out: counts.register_out,
            overdue: late
                .iter()
                .filter(|employee| employee.details.benefit_type == benefit)
                .count(),
        })
        .collect();

        Self {
            sync_rate: sync_rate(stats.total_employees, stats.pending_actions),
            overdue: late.len(),
            queues,
            stats,
        }
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
