use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use shared::domain::RegistrationType;
use tracing::info;

use crate::{
    error::{PortalError, PortalResult},
    report::AuditRow,
};

pub fn report_file_name(registration_type: RegistrationType, day: NaiveDate) -> String {
    format!(
        "PortalSync_Report_{}_{}.csv",
        registration_type.as_str(),
        day.format("%Y-%m-%d")
    )
}

/// Renders audit rows as CSV with a header row. The detail column is headed
/// `reason` for exit reports.
pub fn report_csv(rows: &[AuditRow], registration_type: RegistrationType) -> PortalResult<String> {
    let detail_header = match registration_type {
        RegistrationType::RegisterIn => "detail",
        RegistrationType::RegisterOut => "reason",
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["date", "name", "site", "benefit", detail_header, "status"])
        .map_err(csv_error)?;
    for row in rows {
        let date = row
            .date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer
            .write_record([
                date.as_str(),
                row.name.as_str(),
                row.site.as_str(),
                row.benefit.as_str(),
                row.detail.as_str(),
                row.status.as_str(),
            ])
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| PortalError::Export(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| PortalError::Export(err.to_string()))
}

fn csv_error(err: csv::Error) -> PortalError {
    PortalError::Export(err.to_string())
}

pub fn write_report_csv(
    dir: &Path,
    rows: &[AuditRow],
    registration_type: RegistrationType,
    day: NaiveDate,
) -> PortalResult<PathBuf> {
    let path = dir.join(report_file_name(registration_type, day));
    let content = report_csv(rows, registration_type)?;
    write_file(&path, &content)?;
    info!("export: wrote {} report rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Identity block written into a generated form document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSubject {
    pub first_name: String,
    pub last_name: String,
    pub site: String,
}

/// Path separators and dots are treated like whitespace, so the file always
/// lands directly in the target directory.
pub fn document_file_name(title: &str) -> String {
    let title = title
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '\\' | '.'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let title = if title.is_empty() { "Document" } else { title.as_str() };
    format!("{title}_PortalSync.txt")
}

pub fn document_text(title: &str, subject: &DocumentSubject, day: NaiveDate) -> String {
    let first = non_empty_or(&subject.first_name, "New");
    let last = non_empty_or(&subject.last_name, "Employee");
    format!(
        "PortalSync Document: {title}\nGenerated for: {first} {last}\nDate: {}\nSite: {}",
        day.format("%Y-%m-%d"),
        subject.site
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

pub fn write_document(
    dir: &Path,
    title: &str,
    subject: &DocumentSubject,
    day: NaiveDate,
) -> PortalResult<PathBuf> {
    let path = dir.join(document_file_name(title));
    write_file(&path, &document_text(title, subject, day))?;
    info!("export: wrote document '{title}' to {}", path.display());
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> PortalResult<()> {
    fs::write(path, content)
        .map_err(|err| PortalError::Export(format!("cannot write {}: {err}", path.display())))
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
