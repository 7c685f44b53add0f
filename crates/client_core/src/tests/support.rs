//! In-process fake of the PortalSync REST backend, served by axum on a loopback port.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{BenefitType, EmployeeId, RegistrationType, WorksiteId},
    protocol::{Employee, EmployeeDraft, EmployeeStats, Hospital, QueueCounts, Worksite, WorksiteDraft},
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{
    gateway::{GatewayConfig, HttpGateway},
    roster::Roster,
};

#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub(crate) struct Backend {
    pub employees: Vec<Employee>,
    pub worksites: Vec<Worksite>,
    pub hospitals: Vec<Hospital>,
    pub requests: Vec<Captured>,
    /// When set, every POST/PUT/DELETE is answered with this status.
    pub reject_writes: Option<StatusCode>,
    /// Wrap list responses in `{ "results": [...] }`.
    pub paged: bool,
    pub next_id: u64,
    /// Per-call delays for `GET /employees/`, consumed front first.
    pub employee_delays: Vec<Duration>,
}

impl Backend {
    fn record(&mut self, method: &'static str, path: String, body: Option<Value>) {
        self.requests.push(Captured { method, path, body });
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        (100 + self.next_id).to_string()
    }

    fn list<T: serde::Serialize>(&self, items: &[T]) -> Value {
        let items = json!(items);
        if self.paged {
            json!({ "count": items.as_array().map_or(0, Vec::len), "results": items })
        } else {
            items
        }
    }

    fn check_writes(&self) -> Result<(), (StatusCode, String)> {
        match self.reject_writes {
            Some(status) => Err((status, "backend rejected the write".into())),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub(crate) struct FakeBackend {
    pub state: Arc<Mutex<Backend>>,
    pub base_url: String,
}

impl FakeBackend {
    pub async fn requests(&self) -> Vec<Captured> {
        self.state.lock().await.requests.clone()
    }

    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|captured| captured.method == method && captured.path == path)
            .count()
    }

    pub async fn writes(&self) -> Vec<Captured> {
        self.requests()
            .await
            .into_iter()
            .filter(|captured| captured.method != "GET")
            .collect()
    }

    pub fn gateway(&self) -> HttpGateway {
        HttpGateway::new(&GatewayConfig::new(self.base_url.clone())).expect("gateway")
    }

    pub fn roster(&self) -> Arc<Roster> {
        Arc::new(Roster::new(Arc::new(self.gateway())))
    }
}

type Reply = Result<Json<Value>, (StatusCode, String)>;
type Shared = Arc<Mutex<Backend>>;

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

fn bad_request(err: serde_json::Error) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

async fn list_employees(State(state): State<Shared>) -> Reply {
    let (body, delay) = {
        let mut backend = state.lock().await;
        backend.record("GET", "/api/employees/".into(), None);
        let delay = (!backend.employee_delays.is_empty()).then(|| backend.employee_delays.remove(0));
        (backend.list(&backend.employees), delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Ok(Json(body))
}

async fn create_employee(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("POST", "/api/employees/".into(), Some(body.clone()));
    backend.check_writes()?;
    let draft: EmployeeDraft = serde_json::from_value(body).map_err(bad_request)?;
    let employee = Employee {
        id: EmployeeId::new(backend.next_id()),
        details: draft,
        created_at: None,
    };
    backend.employees.push(employee.clone());
    Ok(Json(json!(employee)))
}

async fn get_employee(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("GET", format!("/api/employees/{id}/"), None);
    backend
        .employees
        .iter()
        .find(|employee| employee.id.as_str() == id)
        .map(|employee| Json(json!(employee)))
        .ok_or_else(|| not_found("employee"))
}

async fn update_employee(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut backend = state.lock().await;
    backend.record("PUT", format!("/api/employees/{id}/"), Some(body.clone()));
    backend.check_writes()?;
    let draft: EmployeeDraft = serde_json::from_value(body).map_err(bad_request)?;
    let employee = backend
        .employees
        .iter_mut()
        .find(|employee| employee.id.as_str() == id)
        .ok_or_else(|| not_found("employee"))?;
    employee.details = draft;
    Ok(Json(json!(employee)))
}

async fn delete_employee(State(state): State<Shared>, Path(id): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    let mut backend = state.lock().await;
    backend.record("DELETE", format!("/api/employees/{id}/"), None);
    backend.check_writes()?;
    let before = backend.employees.len();
    backend.employees.retain(|employee| employee.id.as_str() != id);
    if backend.employees.len() == before {
        return Err(not_found("employee"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ByWorksite {
    worksite_id: String,
}

async fn employees_by_worksite(State(state): State<Shared>, Query(query): Query<ByWorksite>) -> Reply {
    let mut backend = state.lock().await;
    backend.record(
        "GET",
        format!("/api/employees/by_worksite/?worksite_id={}", query.worksite_id),
        None,
    );
    let matching: Vec<Employee> = backend
        .employees
        .iter()
        .filter(|employee| {
            employee
                .details
                .worksite_id
                .as_ref()
                .is_some_and(|id| id.as_str() == query.worksite_id)
        })
        .cloned()
        .collect();
    Ok(Json(backend.list(&matching)))
}

fn queue(employees: &[Employee], benefit: BenefitType) -> QueueCounts {
    let mut counts = QueueCounts::default();
    for employee in employees.iter().filter(|e| e.details.benefit_type == benefit) {
        match employee.details.registration_type {
            RegistrationType::RegisterIn => counts.register_in += 1,
            RegistrationType::RegisterOut => counts.register_out += 1,
        }
    }
    counts
}

async fn employee_stats(State(state): State<Shared>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("GET", "/api/employees/stats/".into(), None);
    let employees = &backend.employees;
    let stats = EmployeeStats {
        total_employees: employees.len() as u64,
        new_joiners: employees.iter().filter(|e| e.is_active()).count() as u64,
        resignations: employees.iter().filter(|e| !e.is_active()).count() as u64,
        pending_actions: employees
            .iter()
            .filter(|e| e.details.status < shared::domain::PortalStatus::Reported)
            .count() as u64,
        ssf_queue: queue(employees, BenefitType::Ssf),
        aia_queue: queue(employees, BenefitType::Aia),
    };
    Ok(Json(json!(stats)))
}

async fn list_worksites(State(state): State<Shared>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("GET", "/api/worksites/".into(), None);
    Ok(Json(backend.list(&backend.worksites)))
}

async fn create_worksite(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("POST", "/api/worksites/".into(), Some(body.clone()));
    backend.check_writes()?;
    let draft: WorksiteDraft = serde_json::from_value(body).map_err(bad_request)?;
    let worksite = Worksite {
        id: WorksiteId::new(backend.next_id()),
        details: draft,
    };
    backend.worksites.push(worksite.clone());
    Ok(Json(json!(worksite)))
}

async fn get_worksite(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("GET", format!("/api/worksites/{id}/"), None);
    backend
        .worksites
        .iter()
        .find(|worksite| worksite.id.as_str() == id)
        .map(|worksite| Json(json!(worksite)))
        .ok_or_else(|| not_found("worksite"))
}

async fn update_worksite(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let mut backend = state.lock().await;
    backend.record("PUT", format!("/api/worksites/{id}/"), Some(body.clone()));
    backend.check_writes()?;
    let draft: WorksiteDraft = serde_json::from_value(body).map_err(bad_request)?;
    let worksite = backend
        .worksites
        .iter_mut()
        .find(|worksite| worksite.id.as_str() == id)
        .ok_or_else(|| not_found("worksite"))?;
    worksite.details = draft;
    Ok(Json(json!(worksite)))
}

async fn delete_worksite(State(state): State<Shared>, Path(id): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    let mut backend = state.lock().await;
    backend.record("DELETE", format!("/api/worksites/{id}/"), None);
    backend.check_writes()?;
    let before = backend.worksites.len();
    backend.worksites.retain(|worksite| worksite.id.as_str() != id);
    if backend.worksites.len() == before {
        return Err(not_found("worksite"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_hospitals(State(state): State<Shared>) -> Reply {
    let mut backend = state.lock().await;
    backend.record("GET", "/api/benefits/hospitals/".into(), None);
    Ok(Json(backend.list(&backend.hospitals)))
}

pub(crate) async fn spawn_backend(seed: Backend) -> FakeBackend {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state: Shared = Arc::new(Mutex::new(seed));
    let app = Router::new()
        .route("/api/employees/", get(list_employees).post(create_employee))
        .route("/api/employees/stats/", get(employee_stats))
        .route("/api/employees/by_worksite/", get(employees_by_worksite))
        .route(
            "/api/employees/:id/",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/api/worksites/", get(list_worksites).post(create_worksite))
        .route(
            "/api/worksites/:id/",
            get(get_worksite).put(update_worksite).delete(delete_worksite),
        )
        .route("/api/benefits/hospitals/", get(list_hospitals))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    FakeBackend {
        state,
        base_url: format!("http://{addr}/api"),
    }
}

pub(crate) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("test date")
}

pub(crate) fn worksite(id: &str, name: &str, sync_ssf: bool, sync_aia: bool) -> Worksite {
    let mut details = WorksiteDraft::new(name);
    details.sync_ssf = sync_ssf;
    details.sync_aia = sync_aia;
    Worksite {
        id: WorksiteId::from(id),
        details,
    }
}

pub(crate) fn employee(id: &str, first: &str, last: &str, benefit: BenefitType) -> Employee {
    let mut details = EmployeeDraft::new(
        "1-1111-11111-11-1",
        first,
        last,
        date("2025-01-10"),
        benefit,
    );
    details.worksite_id = Some(WorksiteId::from("1"));
    Employee {
        id: EmployeeId::from(id),
        details,
        created_at: None,
    }
}

/// Main Office (SSF + AIA), Factory Site A (SSF only), Branch East (AIA only).
pub(crate) fn seeded_worksites() -> Vec<Worksite> {
    let mut factory = worksite("2", "Factory Site A", true, false);
    factory.details.hire_limit = 45;
    factory.details.resign_limit = 10;
    let mut branch = worksite("3", "Branch East", false, true);
    branch.details.hire_limit = 15;
    branch.details.resign_limit = 5;
    vec![worksite("1", "Main Office", true, true), factory, branch]
}
