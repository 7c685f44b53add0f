use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use client_core::{
    error::{PortalError, PortalResult},
    report::{audit_rows, AuditFilter},
    views::{headcount, RosterFilter},
    ExitForm, IntakeForm, PortalGateway, Roster, SyncTracker,
};
use shared::{
    domain::{
        BenefitType, EmployeeId, PortalStatus, RegistrationType, TerminationReason, WorksiteId,
    },
    protocol::{Employee, EmployeeDraft, EmployeeStats, Hospital, Worksite, WorksiteDraft},
};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryGateway {
    employees: Mutex<Vec<Employee>>,
    worksites: Mutex<Vec<Worksite>>,
    next_id: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryGateway {
    fn id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn missing(what: &str) -> PortalError {
        PortalError::NotFound(what.to_string())
    }
}

#[async_trait]
impl PortalGateway for MemoryGateway {
    async fn list_employees(&self) -> PortalResult<Vec<Employee>> {
        Ok(self.employees.lock().await.clone())
    }

    async fn employees_by_worksite(&self, worksite_id: &WorksiteId) -> PortalResult<Vec<Employee>> {
        Ok(self
            .employees
            .lock()
            .await
            .iter()
            .filter(|employee| employee.details.worksite_id.as_ref() == Some(worksite_id))
            .cloned()
            .collect())
    }

    async fn get_employee(&self, id: &EmployeeId) -> PortalResult<Employee> {
        self.employees
            .lock()
            .await
            .iter()
            .find(|employee| &employee.id == id)
            .cloned()
            .ok_or_else(|| Self::missing("employee"))
    }

    async fn create_employee(&self, draft: &EmployeeDraft) -> PortalResult<Employee> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let employee = Employee {
            id: EmployeeId::new(self.id()),
            details: draft.clone(),
            created_at: None,
        };
        self.employees.lock().await.push(employee.clone());
        Ok(employee)
    }

    async fn update_employee(
        &self,
        id: &EmployeeId,
        draft: &EmployeeDraft,
    ) -> PortalResult<Employee> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut employees = self.employees.lock().await;
        let employee = employees
            .iter_mut()
            .find(|employee| &employee.id == id)
            .ok_or_else(|| Self::missing("employee"))?;
        employee.details = draft.clone();
        Ok(employee.clone())
    }

    async fn delete_employee(&self, id: &EmployeeId) -> PortalResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.employees.lock().await.retain(|employee| &employee.id != id);
        Ok(())
    }

    async fn employee_stats(&self) -> PortalResult<EmployeeStats> {
        Ok(EmployeeStats::default())
    }

    async fn list_worksites(&self) -> PortalResult<Vec<Worksite>> {
        Ok(self.worksites.lock().await.clone())
    }

    async fn get_worksite(&self, id: &WorksiteId) -> PortalResult<Worksite> {
        self.worksites
            .lock()
            .await
            .iter()
            .find(|worksite| &worksite.id == id)
            .cloned()
            .ok_or_else(|| Self::missing("worksite"))
    }

    async fn create_worksite(&self, draft: &WorksiteDraft) -> PortalResult<Worksite> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let worksite = Worksite {
            id: WorksiteId::new(self.id()),
            details: draft.clone(),
        };
        self.worksites.lock().await.push(worksite.clone());
        Ok(worksite)
    }

    async fn update_worksite(
        &self,
        id: &WorksiteId,
        draft: &WorksiteDraft,
    ) -> PortalResult<Worksite> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut worksites = self.worksites.lock().await;
        let worksite = worksites
            .iter_mut()
            .find(|worksite| &worksite.id == id)
            .ok_or_else(|| Self::missing("worksite"))?;
        worksite.details = draft.clone();
        Ok(worksite.clone())
    }

    async fn delete_worksite(&self, id: &WorksiteId) -> PortalResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.worksites.lock().await.retain(|worksite| &worksite.id != id);
        Ok(())
    }

    async fn list_hospitals(&self) -> PortalResult<Vec<Hospital>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn employee_moves_from_intake_through_portal_to_exit() {
    let gateway = Arc::new(MemoryGateway::default());
    let roster = Arc::new(Roster::new(gateway.clone()));

    let mut site = WorksiteDraft::new("Branch East");
    site.sync_ssf = false;
    site.sync_aia = true;
    let branch = roster.create_worksite(&site).await.expect("worksite");

    let mut intake = IntakeForm::new();
    assert_eq!(intake.select_worksite(&branch), Some(BenefitType::Aia));
    intake.first_name = "Jane".into();
    intake.last_name = "Smith".into();
    intake.set_id_card("3100100234567");
    intake.employment_date = "2025-01-12".into();
    intake.plan = "Plan 200 - Mid".into();
    let hired = intake.submit(&roster).await.expect("intake");

    let employees = roster.employees().await.expect("employees");
    let active_here = RosterFilter {
        worksite: Some(branch.id.clone()).into(),
        ..RosterFilter::active()
    };
    assert_eq!(headcount(&employees, &active_here), 1);

    let tracker = SyncTracker::new(roster.clone());
    for status in [PortalStatus::Pending, PortalStatus::Reported, PortalStatus::Verified] {
        tracker.set_status(&hired.id, status).await.expect("advance");
    }
    let queue = tracker
        .queue(BenefitType::Aia, RegistrationType::RegisterIn)
        .await
        .expect("queue");
    assert_eq!(queue[0].status, PortalStatus::Verified);

    let mut exit = ExitForm::new();
    let current = roster
        .employee(&hired.id)
        .await
        .expect("lookup")
        .expect("cached");
    exit.select_employee(&current);
    exit.exit_date = "2025-06-30".into();
    exit.reason = Some(TerminationReason::EndOfContract);
    exit.submit(&roster).await.expect("exit");

    let employees = roster.employees().await.expect("employees");
    assert_eq!(headcount(&employees, &active_here), 0);

    let worksites = roster.worksites().await.expect("worksites");
    let exits = audit_rows(
        &employees,
        &worksites,
        &AuditFilter {
            registration_type: RegistrationType::RegisterOut,
            ..AuditFilter::default()
        },
    );
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].site, "Branch East");
    assert_eq!(exits[0].detail, "End of Contract Period");
    assert_eq!(exits[0].status, PortalStatus::Pending);
    assert_eq!(exits[0].date, NaiveDate::from_ymd_opt(2025, 6, 30));

    // worksite, intake, three status changes, exit
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 6);
}
