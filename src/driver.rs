use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::config::ProverConfig;
use crate::error::Error;
use crate::formula::to_formula;
use crate::kernel::declaration::{Declaration, Declarations};
use crate::kernel::expr::Expr;
use crate::proof::Proof;
use crate::prover::{Outcome, Prover};
use crate::type_system::{TypeEnvironment, TypeSystem};

/// A named claim to be proved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub name: String,
    pub body: Expr,
}

/// Declarations together with the assertions to check against them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofUnit {
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    pub assertions: Vec<Assertion>,
}

impl ProofUnit {
    pub fn load(path: &Path) -> Result<ProofUnit, Error> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Proved,
    Counterexample { truths: Vec<String> },
    Inconclusive { reason: String },

    // A name in the assertion did not resolve. Other assertions are unaffected.
    ResolutionError { message: String },
}

impl Verdict {
    pub fn is_proved(&self) -> bool {
        matches!(self, Verdict::Proved)
    }
}

impl From<Outcome> for Verdict {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Proved => Verdict::Proved,
            Outcome::Counterexample(truths) => Verdict::Counterexample { truths },
            Outcome::Inconclusive(reason) => Verdict::Inconclusive { reason },
        }
    }
}

/// One line of the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub assertion: String,

    #[serde(flatten)]
    pub verdict: Verdict,

    pub steps: usize,

    // Proof states created while checking this assertion.
    pub states: usize,
}

/// Checks each assertion of a unit independently.
pub struct Driver {
    types: TypeSystem,
    config: ProverConfig,
}

impl Driver {
    pub fn new(declarations: Vec<Declaration>, config: ProverConfig) -> Driver {
        Driver {
            types: TypeSystem::new(Declarations::from_vec(declarations)),
            config,
        }
    }

    /// Refutes the negation of the assertion.
    /// Resolution failures become a verdict. Other errors abort the run.
    pub fn check(&self, assertion: &Assertion) -> Result<Report, Error> {
        let mut proof = Proof::new(&self.types, TypeEnvironment::new());
        let mut prover = Prover::new(self.config.clone());
        let verdict = match attempt(&self.types, &mut prover, &mut proof, &assertion.body) {
            Ok(outcome) => Verdict::from(outcome),
            Err(e) if e.is_resolution() => Verdict::ResolutionError {
                message: e.to_string(),
            },
            Err(Error::Internal(s)) => {
                return Err(Error::internal(format!("{}: {}", assertion.name, s)))
            }
            Err(e) => return Err(e),
        };
        info!(
            assertion = assertion.name.as_str(),
            verdict = ?verdict,
            steps = prover.steps(),
            states = proof.len(),
            "checked"
        );
        Ok(Report {
            assertion: assertion.name.clone(),
            verdict,
            steps: prover.steps(),
            states: proof.len(),
        })
    }

    pub fn check_all(&self, unit: &ProofUnit) -> Result<Vec<Report>, Error> {
        unit.assertions.iter().map(|a| self.check(a)).collect()
    }
}

fn attempt(
    types: &TypeSystem,
    prover: &mut Prover,
    proof: &mut Proof,
    body: &Expr,
) -> Result<Outcome, Error> {
    let goal = to_formula(types, &TypeEnvironment::new(), &Expr::not(body.clone()))?;
    let head = proof.infer(proof.root(), "Assertion", goal, &[]);
    prover.refute(proof, head)
}

/// Writes one JSON object per line.
pub fn write_reports<W: Write>(reports: &[Report], mut out: W) -> Result<(), Error> {
    for report in reports {
        serde_json::to_writer(&mut out, report)?;
        writeln!(out)?;
    }
    Ok(())
}
