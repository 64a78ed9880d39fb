use crate::config::ProverConfig;
use crate::driver::{Driver, ProofUnit, Report, Verdict};

// Checks every assertion of a unit written as JSON.
pub fn check_unit_with(text: &str, config: ProverConfig) -> Vec<Report> {
    let unit: ProofUnit = match serde_json::from_str(text) {
        Ok(unit) => unit,
        Err(e) => panic!("bad unit: {}", e),
    };
    let driver = Driver::new(unit.declarations.clone(), config);
    match driver.check_all(&unit) {
        Ok(reports) => reports,
        Err(e) => panic!("check failed: {}", e),
    }
}

pub fn check_unit(text: &str) -> Vec<Report> {
    check_unit_with(text, ProverConfig::default())
}

pub fn verdicts(text: &str) -> Vec<Verdict> {
    check_unit(text).into_iter().map(|r| r.verdict).collect()
}

/// Expects a unit with a single assertion, and returns its verdict.
pub fn verdict(text: &str) -> Verdict {
    let mut all = verdicts(text);
    assert_eq!(all.len(), 1);
    all.remove(0)
}

pub fn expect_proved(text: &str) {
    let v = verdict(text);
    assert!(v.is_proved(), "expected a proof, got {:?}", v);
}
