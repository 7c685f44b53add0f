use std::sync::Arc;

use serde::Serialize;
use shared::{
    domain::{BenefitType, EmployeeId, PortalStatus, RegistrationType},
    lifecycle::{self, StepState, TransitionPolicy},
    protocol::{Employee, Worksite},
};
use tracing::{info, warn};

use crate::{
    error::{PortalError, PortalResult},
    roster::Roster,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderDetails {
    Ssf {
        hospitals: Vec<String>,
    },
    Aia {
        plan: Option<String>,
        bank_name: Option<String>,
        bank_account: Option<String>,
    },
}

impl ProviderDetails {
    fn of(employee: &Employee) -> Self {
        let details = &employee.details;
        match details.benefit_type {
            BenefitType::Ssf => Self::Ssf {
                hospitals: details.hospitals().map(str::to_string).collect(),
            },
            BenefitType::Aia => Self::Aia {
                plan: details.plan.clone(),
                bank_name: details.bank_name.clone(),
                bank_account: details.bank_account.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingItem {
    pub id: EmployeeId,
    pub name: String,
    pub id_card: String,
    pub worksite: Option<String>,
    pub registration_type: RegistrationType,
    pub status: PortalStatus,
    pub provider: ProviderDetails,
    pub processed_by: Option<String>,
    pub steps: Vec<(PortalStatus, StepState)>,
}

impl TrackingItem {
    pub fn new(employee: &Employee, worksites: &[Worksite]) -> Self {
        let details = &employee.details;
        let worksite = details.worksite_id.as_ref().and_then(|id| {
            worksites
                .iter()
                .find(|worksite| &worksite.id == id)
                .map(|worksite| worksite.name().to_string())
        });
        Self {
            id: employee.id.clone(),
            name: employee.full_name(),
            id_card: details.id_card.clone(),
            worksite,
            registration_type: details.registration_type,
            status: details.status,
            provider: ProviderDetails::of(employee),
            processed_by: details.processed_by.clone(),
            steps: lifecycle::steps(details.status).collect(),
        }
    }

    /// One-line pipeline view, e.g. `[x] ENTRY > [*] PENDING > [ ] REVIEWING`.
    pub fn progress(&self) -> String {
        self.steps
            .iter()
            .map(|(step, state)| {
                let mark = match state {
                    StepState::Passed => "[x]",
                    StepState::Current => "[*]",
                    StepState::Upcoming => "[ ]",
                };
                format!("{mark} {step}")
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

pub struct SyncTracker {
    roster: Arc<Roster>,
    policy: TransitionPolicy,
}

impl SyncTracker {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self::with_policy(roster, TransitionPolicy::default())
    }

    pub fn with_policy(roster: Arc<Roster>, policy: TransitionPolicy) -> Self {
        Self { roster, policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub async fn queue(
        &self,
        benefit: BenefitType,
        registration_type: RegistrationType,
    ) -> PortalResult<Vec<TrackingItem>> {
        let employees = self.roster.employees().await?;
        let worksites = self.roster.worksites().await?;
        Ok(employees
            .iter()
            .filter(|employee| {
                employee.details.benefit_type == benefit
                    && employee.details.registration_type == registration_type
            })
            .map(|employee| TrackingItem::new(employee, &worksites))
            .collect())
    }

    /// Applies the new status to the cached record first, then to the backend.
    /// Only the status is restored if the backend rejects the update.
    pub async fn set_status(&self, id: &EmployeeId, status: PortalStatus) -> PortalResult<Employee> {
        let mut employee = self
            .roster
            .employee(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("employee {id}")))?;

        let previous = employee.details.status;
        self.policy.check(previous, status)?;

        lifecycle::set_status(&mut employee.details, status);
        self.roster.patch_employee(employee.clone()).await;

        let draft = employee.details.clone().compact();
        match self.roster.gateway().update_employee(id, &draft).await {
            Ok(updated) => {
                info!("tracker: employee id={id} status {previous} -> {status}");
                self.roster.patch_employee(updated.clone()).await;
                Ok(updated)
            }
            Err(err) => {
                warn!("tracker: status update for id={id} failed, restoring {previous}: {err}");
                self.roster
                    .edit_employee(id, |cached| {
                        lifecycle::set_status(&mut cached.details, previous);
                    })
                    .await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/tracker_tests.rs"]
mod tests;
