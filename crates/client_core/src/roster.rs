//! Owned cache of the lists every screen reads.
//!
//! All writes go through [`Roster`], which refetches employees and worksites
//! after each successful write. A generation counter is bumped by every
//! refresh, write, and local patch; a refresh only commits when no newer
//! generation started while it was in flight, so a late response never
//! overwrites newer state.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures::try_join;
use shared::{
    domain::{EmployeeId, WorksiteId},
    protocol::{Employee, EmployeeDraft, Hospital, Worksite, WorksiteDraft},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{error::PortalResult, gateway::PortalGateway};

#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    pub employees: Vec<Employee>,
    pub worksites: Vec<Worksite>,
    pub hospitals: Vec<Hospital>,
    pub loaded: bool,
}

impl RosterSnapshot {
    pub fn employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|employee| &employee.id == id)
    }

    pub fn worksite(&self, id: &WorksiteId) -> Option<&Worksite> {
        self.worksites.iter().find(|worksite| &worksite.id == id)
    }
}

pub struct Roster {
    gateway: Arc<dyn PortalGateway>,
    state: RwLock<RosterSnapshot>,
    generation: AtomicU64,
    load: Mutex<()>,
}

impl Roster {
    pub fn new(gateway: Arc<dyn PortalGateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(RosterSnapshot::default()),
            generation: AtomicU64::new(0),
            load: Mutex::new(()),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PortalGateway> {
        &self.gateway
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        self.state.read().await.clone()
    }

    /// Refetches employees and worksites. Returns `false` when the result was
    /// discarded because a newer generation started meanwhile.
    pub async fn refresh(&self) -> PortalResult<bool> {
        let ticket = self.bump();
        let (employees, worksites) = try_join!(
            self.gateway.list_employees(),
            self.gateway.list_worksites()
        )?;

        let mut state = self.state.write().await;
        if self.generation() != ticket {
            debug!("roster: discarding stale refresh generation={ticket}");
            return Ok(false);
        }
        state.employees = employees;
        state.worksites = worksites;
        state.loaded = true;
        debug!(
            "roster: refreshed employees={} worksites={} generation={ticket}",
            state.employees.len(),
            state.worksites.len()
        );
        Ok(true)
    }

    /// Returns once the lists are loaded. A load that loses to a newer
    /// generation is retried until one commits.
    pub async fn ensure_loaded(&self) -> PortalResult<()> {
        if self.state.read().await.loaded {
            return Ok(());
        }
        let _load = self.load.lock().await;
        while !self.state.read().await.loaded {
            if !self.refresh().await? {
                debug!("roster: initial load superseded, retrying");
            }
        }
        Ok(())
    }

    /// Marks the cached lists stale so the next read refetches them.
    pub async fn invalidate(&self) {
        self.bump();
        self.state.write().await.loaded = false;
    }

    /// Hospitals are reference data: fetched once, not refetched on writes.
    pub async fn hospitals(&self) -> PortalResult<Vec<Hospital>> {
        {
            let state = self.state.read().await;
            if !state.hospitals.is_empty() {
                return Ok(state.hospitals.clone());
            }
        }
        let hospitals = self.gateway.list_hospitals().await?;
        self.state.write().await.hospitals = hospitals.clone();
        Ok(hospitals)
    }

    pub async fn replace_hospitals(&self, hospitals: Vec<Hospital>) {
        self.state.write().await.hospitals = hospitals;
    }

    pub async fn employees(&self) -> PortalResult<Vec<Employee>> {
        self.ensure_loaded().await?;
        Ok(self.state.read().await.employees.clone())
    }

    pub async fn worksites(&self) -> PortalResult<Vec<Worksite>> {
        self.ensure_loaded().await?;
        Ok(self.state.read().await.worksites.clone())
    }

    pub async fn employee(&self, id: &EmployeeId) -> PortalResult<Option<Employee>> {
        self.ensure_loaded().await?;
        Ok(self.state.read().await.employee(id).cloned())
    }

    pub async fn worksite(&self, id: &WorksiteId) -> PortalResult<Option<Worksite>> {
        self.ensure_loaded().await?;
        Ok(self.state.read().await.worksite(id).cloned())
    }

    /// Replaces one cached employee in place, without a backend call.
    pub(crate) async fn patch_employee(&self, employee: Employee) {
        self.bump();
        let mut state = self.state.write().await;
        match state.employees.iter_mut().find(|cached| cached.id == employee.id) {
            Some(cached) => *cached = employee,
            None => state.employees.push(employee),
        }
    }

    /// Edits the cached employee in place. Returns `false` when it is not cached.
    pub(crate) async fn edit_employee(&self, id: &EmployeeId, edit: impl FnOnce(&mut Employee)) -> bool {
        self.bump();
        let mut state = self.state.write().await;
        match state.employees.iter_mut().find(|cached| &cached.id == id) {
            Some(cached) => {
                edit(cached);
                true
            }
            None => false,
        }
    }

    async fn refresh_after_write(&self, operation: &str) {
        self.invalidate().await;
        if let Err(err) = self.refresh().await {
            warn!("roster: refresh after {operation} failed: {err}");
        }
    }

    pub async fn create_employee(&self, draft: &EmployeeDraft) -> PortalResult<Employee> {
        let employee = self.gateway.create_employee(draft).await?;
        info!(
            "roster: created employee id={} name={}",
            employee.id,
            employee.full_name()
        );
        self.refresh_after_write("create employee").await;
        Ok(employee)
    }

    pub async fn update_employee(
        &self,
        id: &EmployeeId,
        draft: &EmployeeDraft,
    ) -> PortalResult<Employee> {
        let employee = self.gateway.update_employee(id, draft).await?;
        info!("roster: updated employee id={id}");
        self.refresh_after_write("update employee").await;
        Ok(employee)
    }

    pub async fn delete_employee(&self, id: &EmployeeId) -> PortalResult<()> {
        self.gateway.delete_employee(id).await?;
        info!("roster: deleted employee id={id}");
        self.refresh_after_write("delete employee").await;
        Ok(())
    }

    pub async fn create_worksite(&self, draft: &WorksiteDraft) -> PortalResult<Worksite> {
        let worksite = self.gateway.create_worksite(draft).await?;
        info!(
            "roster: created worksite id={} name={}",
            worksite.id,
            worksite.name()
        );
        self.refresh_after_write("create worksite").await;
        Ok(worksite)
    }

    pub async fn update_worksite(
        &self,
        id: &WorksiteId,
        draft: &WorksiteDraft,
    ) -> PortalResult<Worksite> {
        let worksite = self.gateway.update_worksite(id, draft).await?;
        info!("roster: updated worksite id={id}");
        self.refresh_after_write("update worksite").await;
        Ok(worksite)
    }

    /// Employees still referencing the worksite are left for the backend to handle.
    pub async fn delete_worksite(&self, id: &WorksiteId) -> PortalResult<()> {
        self.gateway.delete_worksite(id).await?;
        info!("roster: deleted worksite id={id}");
        self.refresh_after_write("delete worksite").await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/roster_tests.rs"]
mod tests;
