use std::{fs, path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use client_core::{
    export::{self, DocumentSubject},
    report::{audit_rows, AuditFilter},
    views::{group_hospitals_by_province, DashboardSummary, RosterFilter, WorksiteFilter},
    ExitForm, GeminiClient, HttpGateway, IntakeForm, OfflineReference,
    ReferenceService, Roster, SyncTracker,
};
use serde::Serialize;
use shared::{
    domain::{EmployeeId, WorksiteId},
    lifecycle::TransitionPolicy,
    protocol::{Employee, Worksite, WorksiteDraft},
};
use tracing::{info, warn};

use crate::{
    config::{load_settings, Settings},
    Cli, Command, RegisterInArgs, WorksiteAction, WorksiteArgs,
};

struct App {
    roster: Arc<Roster>,
    reference: Box<dyn ReferenceService>,
    json: bool,
}

impl App {
    fn new(settings: &Settings, json: bool) -> Result<Self> {
        let gateway = HttpGateway::new(&settings.gateway_config())
            .context("failed to set up the backend gateway")?;
        info!("using backend {}", gateway.base_url());

        let reference: Box<dyn ReferenceService> = match settings.gemini_config() {
            Some(config) => Box::new(
                GeminiClient::new(config).context("failed to set up the AI reference service")?,
            ),
            None => Box::new(OfflineReference),
        };

        Ok(Self {
            roster: Arc::new(Roster::new(Arc::new(gateway))),
            reference,
            json,
        })
    }

    /// Prints `value` as JSON under `--json`, otherwise hands it to `render`.
    fn show<T: Serialize>(&self, value: &T, render: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            render(value);
        }
        Ok(())
    }

    async fn employee(&self, id: &str) -> Result<Employee> {
        self.roster
            .employee(&EmployeeId::from(id))
            .await?
            .ok_or_else(|| anyhow!("no employee with id {id}"))
    }

    async fn worksite(&self, id: &str) -> Result<Worksite> {
        self.roster
            .worksite(&WorksiteId::from(id))
            .await?
            .ok_or_else(|| anyhow!("no worksite with id {id}"))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let app = App::new(&settings, cli.json)?;

    match cli.command {
        Command::Dashboard => dashboard(&app).await,
        Command::Employees {
            worksite,
            tab,
            search,
            all,
        } => {
            let filter = RosterFilter {
                active_only: !all,
                worksite: WorksiteFilter::from(worksite.map(WorksiteId::new)),
                registration_type: tab,
                benefit: None,
                search,
            };
            list_employees(&app, &filter).await
        }
        Command::RegisterIn(args) => register_in(&app, args).await,
        Command::RegisterOut {
            employee,
            exit_date,
            reason,
            worksite,
            benefit,
        } => {
            let record = app.employee(&employee).await?;
            let mut form = ExitForm::new();
            form.select_employee(&record);
            if let Some(id) = worksite {
                form.select_worksite(&app.worksite(&id).await?);
            }
            if let Some(benefit) = benefit {
                form.select_benefit(benefit);
            }
            form.exit_date = exit_date;
            form.reason = Some(reason);

            let updated = form.submit(&app.roster).await?;
            app.show(&updated, |employee| {
                println!(
                    "exit recorded for {} ({}) effective {}",
                    employee.full_name(),
                    employee.id,
                    employee
                        .details
                        .effective_date
                        .map(|date| date.to_string())
                        .unwrap_or_default()
                );
            })
        }
        Command::SetStatus {
            employee,
            status,
            forward_only,
        } => {
            let policy = if forward_only {
                TransitionPolicy::ForwardOnly
            } else {
                TransitionPolicy::Unrestricted
            };
            let tracker = SyncTracker::with_policy(app.roster.clone(), policy);
            let updated = tracker
                .set_status(&EmployeeId::from(employee.as_str()), status)
                .await?;
            app.show(&updated, |employee| {
                println!("{} is now {}", employee.full_name(), employee.details.status);
            })
        }
        Command::Tracker { benefit, tab } => {
            let tracker = SyncTracker::new(app.roster.clone());
            let items = tracker.queue(benefit, tab).await?;
            app.show(&items, |items| {
                println!("{benefit} {tab} queue: {} record(s)", items.len());
                for item in items {
                    println!(
                        "{:>6}  {:<28} {:<20} {}",
                        item.id.as_str(),
                        item.name,
                        item.worksite.as_deref().unwrap_or("-"),
                        item.progress()
                    );
                }
            })
        }
        Command::Report {
            tab,
            site,
            provider,
            period,
            csv,
        } => {
            let employees = app.roster.employees().await?;
            let worksites = app.roster.worksites().await?;
            let filter = AuditFilter {
                registration_type: tab,
                site: site.filter(|site| !site.eq_ignore_ascii_case("all")),
                provider,
                period,
            };
            let rows = audit_rows(&employees, &worksites, &filter);
            if let Some(dir) = csv {
                ensure_dir(&dir)?;
                let path = export::write_report_csv(&dir, &rows, tab, today())?;
                eprintln!("wrote {}", path.display());
            }
            app.show(&rows, |rows| {
                for row in rows {
                    println!(
                        "{:<10}  {:<28} {:<20} {:<3}  {:<32} {}",
                        row.date.map(|date| date.to_string()).unwrap_or_default(),
                        row.name,
                        row.site,
                        row.benefit,
                        row.detail,
                        row.status
                    );
                }
                println!("{} row(s), period {}", rows.len(), filter.period);
            })
        }
        Command::Worksites { action } => worksites(&app, action).await,
        Command::Hospitals { ai } => {
            let hospitals = if ai {
                let hospitals = app.reference.lookup_hospitals().await;
                app.roster.replace_hospitals(hospitals.clone()).await;
                hospitals
            } else {
                app.roster.hospitals().await?
            };
            let groups = group_hospitals_by_province(&hospitals);
            app.show(&groups, |groups| {
                for (province, members) in groups {
                    println!("{province}");
                    for hospital in members {
                        println!("  {:>4}  {}", hospital.id.as_str(), hospital.name);
                    }
                }
            })
        }
        Command::DeleteEmployee { employee } => {
            let id = EmployeeId::from(employee.as_str());
            app.roster.delete_employee(&id).await?;
            app.show(&serde_json::json!({ "deleted": id }), |_| {
                println!("deleted employee {id}");
            })
        }
        Command::Document {
            title,
            employee,
            out,
        } => {
            let record = app.employee(&employee).await?;
            let site = match &record.details.worksite_id {
                Some(id) => app
                    .roster
                    .worksite(id)
                    .await?
                    .map(|worksite| worksite.name().to_string())
                    .unwrap_or_default(),
                None => String::new(),
            };
            let subject = DocumentSubject {
                first_name: record.details.first_name.clone(),
                last_name: record.details.last_name.clone(),
                site,
            };
            ensure_dir(&out)?;
            let path = export::write_document(&out, &title, &subject, today())?;
            app.show(&serde_json::json!({ "path": path }), |_| {
                println!("wrote {}", path.display());
            })
        }
    }
}

async fn dashboard(app: &App) -> Result<()> {
    let stats = app.roster.gateway().employee_stats().await?;
    let employees = app.roster.employees().await?;
    let worksites = app.roster.worksites().await?;
    let summary = DashboardSummary::build(stats, &employees, &worksites, today());

    app.show(&summary, |summary| {
        let stats = &summary.stats;
        println!("total employees   {}", stats.total_employees);
        println!("new joiners       {}", stats.new_joiners);
        println!("resignations      {}", stats.resignations);
        println!("pending actions   {}", stats.pending_actions);
        println!("sync rate         {}%", summary.sync_rate);
        for queue in &summary.queues {
            println!(
                "{} queue         in={} out={} overdue={}",
                queue.benefit, queue.register_in, queue.register_out, queue.overdue
            );
        }
        if summary.overdue > 0 {
            println!("{} OVERDUE", summary.overdue);
        }
    })
}

async fn list_employees(app: &App, filter: &RosterFilter) -> Result<()> {
    let employees = app.roster.employees().await?;
    let worksites = app.roster.worksites().await?;
    let matching: Vec<&Employee> = filter.apply(&employees);

    app.show(&matching, |matching| {
        for employee in matching {
            let site = employee
                .details
                .worksite_id
                .as_ref()
                .and_then(|id| worksites.iter().find(|worksite| &worksite.id == id))
                .map_or("-", |worksite| worksite.name());
            println!(
                "{:>6}  {:<28} {:<18} {:<3} {:<12} {:<9} {}",
                employee.id.as_str(),
                employee.full_name(),
                employee.details.id_card,
                employee.details.benefit_type,
                employee.details.registration_type,
                employee.details.status,
                site
            );
        }
        println!("{} employee(s)", matching.len());
    })
}

async fn register_in(app: &App, args: RegisterInArgs) -> Result<()> {
    let mut form = IntakeForm::new();

    if let Some(path) = &args.scan {
        let image = fs::read(path)
            .with_context(|| format!("failed to read ID card image '{}'", path.display()))?;
        match app.reference.extract_id_card(&image).await {
            Some(scan) => form.apply_scan(&scan),
            None => warn!("ID card could not be read, continuing with the given fields"),
        }
    }

    fill_intake(&mut form, &args);
    if let Some(id) = &args.worksite {
        form.select_worksite(&app.worksite(id).await?);
    }
    if let Some(benefit) = args.benefit {
        form.select_benefit(benefit);
    }

    let created = form.submit(&app.roster).await?;
    app.show(&created, |employee| {
        println!(
            "registered {} ({}) as {} {}",
            employee.full_name(),
            employee.id,
            employee.details.benefit_type,
            employee.details.status
        );
    })
}

/// Copies the given flags onto the form; flags left out keep whatever a scan filled in.
fn fill_intake(form: &mut IntakeForm, args: &RegisterInArgs) {
    let text_fields = [
        (&args.first, &mut form.first_name),
        (&args.last, &mut form.last_name),
        (&args.employment_date, &mut form.employment_date),
        (&args.hospital1, &mut form.hospital1),
        (&args.hospital2, &mut form.hospital2),
        (&args.hospital3, &mut form.hospital3),
        (&args.prefix, &mut form.prefix),
        (&args.date_of_birth, &mut form.date_of_birth),
        (&args.gender, &mut form.gender),
        (&args.nationality, &mut form.nationality),
        (&args.marital_status, &mut form.marital_status),
        (&args.effective_date, &mut form.effective_date),
        (&args.employee_no, &mut form.employee_no),
        (&args.department, &mut form.department),
        (&args.designation, &mut form.designation),
        (&args.passport, &mut form.passport),
        (&args.salary, &mut form.salary),
        (&args.bank_name, &mut form.bank_name),
        (&args.bank_account, &mut form.bank_account),
        (&args.plan, &mut form.plan),
    ];
    for (value, field) in text_fields {
        if let Some(value) = value {
            *field = value.clone();
        }
    }
    if let Some(id_card) = &args.id_card {
        form.set_id_card(id_card);
    }
    if args.wage_type.is_some() {
        form.wage_type = args.wage_type;
    }
}

fn apply_worksite_args(draft: &mut WorksiteDraft, args: WorksiteArgs) {
    if let Some(v) = args.name {
        draft.name = v;
    }
    if let Some(v) = args.icon {
        draft.icon = v;
    }
    if let Some(v) = args.color {
        draft.color = v;
    }
    if let Some(v) = args.hire_limit {
        draft.hire_limit = v;
    }
    if let Some(v) = args.resign_limit {
        draft.resign_limit = v;
    }
    if let Some(v) = args.sync_ssf {
        draft.sync_ssf = v;
    }
    if let Some(v) = args.sync_aia {
        draft.sync_aia = v;
    }
}

fn print_worksite(worksite: &Worksite) {
    let details = &worksite.details;
    let providers: Vec<&str> = details
        .supported_benefits()
        .into_iter()
        .map(|benefit| benefit.as_str())
        .collect();
    println!(
        "{:>6}  {:<24} hire={}d resign={}d providers={}",
        worksite.id.as_str(),
        details.name,
        details.hire_limit,
        details.resign_limit,
        if providers.is_empty() {
            "none".to_string()
        } else {
            providers.join("+")
        }
    );
}

async fn worksites(app: &App, action: WorksiteAction) -> Result<()> {
    match action {
        WorksiteAction::List => {
            let worksites = app.roster.worksites().await?;
            app.show(&worksites, |worksites| {
                worksites.iter().for_each(print_worksite);
            })
        }
        WorksiteAction::Add(args) => {
            let name = args
                .name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| anyhow!("--name is required to add a worksite"))?;
            let mut draft = WorksiteDraft::new(name.trim());
            apply_worksite_args(&mut draft, WorksiteArgs { name: None, ..args });
            let created = app.roster.create_worksite(&draft).await?;
            app.show(&created, print_worksite)
        }
        WorksiteAction::Update { id, fields } => {
            let mut draft = app.worksite(&id).await?.details;
            apply_worksite_args(&mut draft, fields);
            let updated = app
                .roster
                .update_worksite(&WorksiteId::from(id.as_str()), &draft)
                .await?;
            app.show(&updated, print_worksite)
        }
        WorksiteAction::Remove { id } => {
            let id = WorksiteId::from(id.as_str());
            app.roster.delete_worksite(&id).await?;
            app.show(&serde_json::json!({ "deleted": id }), |_| {
                println!("removed worksite {id}");
            })
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create '{}'", dir.display()))
}
