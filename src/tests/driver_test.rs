use indoc::indoc;
use std::fs;
use std::io::Write;

use crate::config::ProverConfig;
use crate::driver::{write_reports, Driver, ProofUnit, Report, Verdict};
use crate::tests::common::check_unit;

const UNIT: &str = indoc! {r#"
    {"assertions": [
        {"name": "reflexive", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Equal": [{"Variable": "x"}, {"Variable": "x"}]}
            ]}
        },
        {"name": "not_always_positive", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}
            ]}
        }
    ]}
"#};

#[test]
fn test_one_report_per_assertion() {
    let reports = check_unit(UNIT);
    let names: Vec<_> = reports.iter().map(|r| r.assertion.as_str()).collect();
    assert_eq!(names, vec!["reflexive", "not_always_positive"]);
    assert!(reports[0].verdict.is_proved());
    assert_eq!(
        reports[1].verdict,
        Verdict::Counterexample {
            truths: vec!["0 >= x$1".to_string()]
        }
    );
    assert!(reports.iter().all(|r| r.states >= 1));
}

#[test]
fn test_unit_and_report_files() {
    let mut unit_file = tempfile::NamedTempFile::new().unwrap();
    write!(unit_file, "{}", UNIT).unwrap();
    let unit = ProofUnit::load(unit_file.path()).unwrap();
    let driver = Driver::new(unit.declarations.clone(), ProverConfig::default());
    let reports = driver.check_all(&unit).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.jsonl");
    write_reports(&reports, fs::File::create(&path).unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(r#"{"assertion":"reflexive","verdict":"proved""#));
    let back: Vec<Report> = lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(back, reports);
}

#[test]
fn test_missing_unit_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ProofUnit::load(&dir.path().join("nope.json")).unwrap_err();
    assert_eq!(err.error_type(), "Io");
}
