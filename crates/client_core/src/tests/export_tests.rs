use super::*;
use shared::domain::{BenefitType, PortalStatus};
use std::time::{SystemTime, UNIX_EPOCH};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 30).expect("date")
}

fn rows() -> Vec<AuditRow> {
    vec![
        AuditRow {
            date: NaiveDate::from_ymd_opt(2025, 1, 10),
            name: "Somchai Saetang".into(),
            site: "Main Office".into(),
            benefit: BenefitType::Ssf,
            detail: "Siriraj Hospital".into(),
            status: PortalStatus::Verified,
        },
        AuditRow {
            date: None,
            name: "Smith, Jane".into(),
            site: "Branch East".into(),
            benefit: BenefitType::Aia,
            detail: "Plan 200 - Mid".into(),
            status: PortalStatus::Pending,
        },
    ]
}

fn scratch_dir(label: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let dir = std::env::temp_dir().join(format!("portalsync-{label}-{nanos}"));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[test]
fn file_names_follow_export_conventions() {
    assert_eq!(
        report_file_name(RegistrationType::RegisterOut, day()),
        "PortalSync_Report_REGISTER_OUT_2025-01-30.csv"
    );
    assert_eq!(
        document_file_name("Employment  Contract Form"),
        "Employment_Contract_Form_PortalSync.txt"
    );
}

#[test]
fn csv_has_header_and_quotes_commas() {
    let csv = report_csv(&rows(), RegistrationType::RegisterIn).expect("csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "date,name,site,benefit,detail,status");
    assert_eq!(
        lines[1],
        "2025-01-10,Somchai Saetang,Main Office,SSF,Siriraj Hospital,VERIFIED"
    );
    assert_eq!(lines[2], ",\"Smith, Jane\",Branch East,AIA,Plan 200 - Mid,PENDING");

    let exits = report_csv(&[], RegistrationType::RegisterOut).expect("csv");
    assert_eq!(exits.trim_end(), "date,name,site,benefit,reason,status");
}

#[test]
fn document_text_defaults_missing_names() {
    let subject = DocumentSubject {
        site: "Main Office".into(),
        ..DocumentSubject::default()
    };
    assert_eq!(
        document_text("Medical Check", &subject, day()),
        "PortalSync Document: Medical Check\nGenerated for: New Employee\nDate: 2025-01-30\nSite: Main Office"
    );
}

#[test]
fn writers_place_files_under_target_dir() {
    let dir = scratch_dir("export");
    let report = write_report_csv(&dir, &rows(), RegistrationType::RegisterIn, day()).expect("report");
    assert_eq!(
        report.file_name().and_then(|name| name.to_str()),
        Some("PortalSync_Report_REGISTER_IN_2025-01-30.csv")
    );
    assert!(fs::read_to_string(&report).expect("read").starts_with("date,name"));

    let subject = DocumentSubject {
        first_name: "Somchai".into(),
        last_name: "Saetang".into(),
        site: "Main Office".into(),
    };
    let document = write_document(&dir, "Consent Form", &subject, day()).expect("document");
    assert!(fs::read_to_string(&document)
        .expect("read")
        .contains("Generated for: Somchai Saetang"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_target_dir_is_an_export_error() {
    let dir = std::env::temp_dir().join("portalsync-does-not-exist").join("nested");
    let err = write_report_csv(&dir, &rows(), RegistrationType::RegisterIn, day()).expect_err("no dir");
    assert!(matches!(err, PortalError::Export(_)));
}

#[test]
fn document_titles_cannot_leave_the_output_dir() {
    assert_eq!(document_file_name("../x"), "x_PortalSync.txt");
    assert_eq!(document_file_name("a/b\\c..d"), "a_b_c_d_PortalSync.txt");
    assert_eq!(document_file_name(" ../ "), "Document_PortalSync.txt");

    let dir = scratch_dir("document-escape");
    let path = write_document(&dir, "../../escape", &DocumentSubject::default(), day())
        .expect("document");
    assert_eq!(path.parent(), Some(dir.as_path()));
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("escape_PortalSync.txt")
    );
    let _ = fs::remove_dir_all(dir);
}
