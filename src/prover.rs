use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace};

use crate::config::ProverConfig;
use crate::error::Error;
use crate::formula::Formula;
use crate::proof::state::StateId;
use crate::proof::Proof;
use crate::rules::RuleLibrary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    // Every branch reached falsehood.
    Proved,

    // Some branch saturated without a contradiction. Holds the truths in force there.
    Counterexample(Vec<String>),

    // The budget ran out first.
    Inconclusive(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Proved => write!(f, "Proved"),
            Outcome::Counterexample(_) => write!(f, "Counterexample"),
            Outcome::Inconclusive(reason) => write!(f, "Inconclusive ({})", reason),
        }
    }
}

/// Saturates proof states with the rule library, splitting on disjunctions when nothing else
/// applies, until every branch closes.
pub struct Prover {
    rules: RuleLibrary,
    config: ProverConfig,

    // Rule applications that changed something, over the whole search.
    steps: usize,

    splits: usize,
}

impl Prover {
    pub fn new(config: ProverConfig) -> Prover {
        Prover {
            rules: RuleLibrary::standard(&config),
            config,
            steps: 0,
            splits: 0,
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn splits(&self) -> usize {
        self.splits
    }

    /// Tries to derive falsehood from the truths in force at `head`.
    /// Every state between the root and `head` is treated as new.
    pub fn refute(&mut self, proof: &mut Proof, head: StateId) -> Result<Outcome, Error> {
        let pending = proof.path(proof.root(), head)?;
        self.explore(proof, head, pending)
    }

    fn explore(
        &mut self,
        proof: &mut Proof,
        head: StateId,
        pending: Vec<StateId>,
    ) -> Result<Outcome, Error> {
        let head = match self.saturate(proof, head, pending)? {
            Some(head) => head,
            None => {
                return Ok(Outcome::Inconclusive(format!(
                    "step budget of {} exhausted",
                    self.config.max_steps
                )))
            }
        };
        if proof.is_closed(head) {
            debug!(state = %head, steps = self.steps, "branch closed");
            return Ok(Outcome::Proved);
        }

        let children = match self.split(proof, head)? {
            Some(children) => children,
            None => {
                debug!(state = %head, "saturated without contradiction");
                let mut truths = proof.describe(head);
                truths.sort();
                return Ok(Outcome::Counterexample(truths));
            }
        };
        for child in children {
            self.splits += 1;
            if self.splits > self.config.max_splits {
                return Ok(Outcome::Inconclusive(format!(
                    "split budget of {} exhausted",
                    self.config.max_splits
                )));
            }
            let outcome = self.explore(proof, child, vec![child])?;
            if outcome != Outcome::Proved {
                return Ok(outcome);
            }
        }
        Ok(Outcome::Proved)
    }

    // Runs the linear rules over every truth added by the pending states, oldest first.
    // Returns None if the step budget runs out.
    fn saturate(
        &mut self,
        proof: &mut Proof,
        head: StateId,
        pending: Vec<StateId>,
    ) -> Result<Option<StateId>, Error> {
        let mut head = head;
        let mut queue: VecDeque<StateId> = pending.into();
        while let Some(state) = queue.pop_front() {
            let additions: Vec<_> = proof.state(state).delta.additions().collect();
            for truth in additions {
                for rule in self.rules.linear() {
                    if proof.is_closed(head) {
                        return Ok(Some(head));
                    }
                    if !proof.is_active(head, truth) {
                        break;
                    }
                    let next = rule.apply(proof, truth, head)?;
                    if next == head {
                        continue;
                    }
                    self.steps += 1;
                    if self.steps > self.config.max_steps {
                        return Ok(None);
                    }
                    trace!(rule = rule.name(), truth = %proof.formula(truth), state = %next, "applied");
                    let path = proof.path(head, next).map_err(|e| {
                        Error::internal(format!("{} left the branch: {}", rule.name(), e))
                    })?;
                    queue.extend(path);
                    head = next;
                }
            }
        }
        Ok(Some(head))
    }

    // Applies the first branching rule that fits the first truth it fits.
    fn split(&self, proof: &mut Proof, head: StateId) -> Result<Option<Vec<StateId>>, Error> {
        let mut active = proof.active(head);
        // Smaller disjunctions first.
        active.sort_by_key(|id| match proof.formula(*id) {
            Formula::Disjunct(arms) => arms.len(),
            _ => usize::MAX,
        });
        for rule in self.rules.non_linear() {
            for truth in &active {
                if let Some(children) = rule.apply(proof, *truth, head)? {
                    trace!(rule = rule.name(), truth = %proof.formula(*truth), "split");
                    return Ok(Some(children));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::to_formula;
    use crate::kernel::declaration::Declarations;
    use crate::kernel::expr::{Expr, VariableDecl};
    use crate::kernel::types::Type;
    use crate::type_system::{TypeEnvironment, TypeSystem};

    fn check(types: &TypeSystem, assertion: Expr, config: ProverConfig) -> Outcome {
        let mut proof = Proof::new(types, TypeEnvironment::new());
        let goal = to_formula(types, &TypeEnvironment::new(), &Expr::not(assertion)).unwrap();
        let head = proof.infer(proof.root(), "Assertion", goal, &[]);
        Prover::new(config).refute(&mut proof, head).unwrap()
    }

    fn int(name: &str) -> VariableDecl {
        VariableDecl::new(name, Type::Int)
    }

    #[test]
    fn test_excluded_middle() {
        let types = TypeSystem::new(Declarations::new());
        let x = Expr::var("x");
        let e = Expr::forall(
            vec![int("x")],
            Expr::or(vec![Expr::gt(x.clone(), Expr::int(0)), Expr::le(x, Expr::int(0))]),
        );
        assert_eq!(check(&types, e, ProverConfig::default()), Outcome::Proved);
    }

    #[test]
    fn test_split_both_branches_close() {
        // (b ==> x > 0) && (!b ==> x > 0) ==> x > 0
        let types = TypeSystem::new(Declarations::new());
        let b = Expr::var("b");
        let positive = Expr::gt(Expr::var("x"), Expr::int(0));
        let e = Expr::forall(
            vec![VariableDecl::new("b", Type::Bool), int("x")],
            Expr::implies(
                Expr::and(vec![
                    Expr::implies(b.clone(), positive.clone()),
                    Expr::implies(Expr::not(b), positive.clone()),
                ]),
                positive,
            ),
        );
        let mut proof = Proof::new(&types, TypeEnvironment::new());
        let goal = to_formula(&types, &TypeEnvironment::new(), &Expr::not(e)).unwrap();
        let head = proof.infer(proof.root(), "Assertion", goal, &[]);
        let mut prover = Prover::new(ProverConfig::default());
        assert_eq!(prover.refute(&mut proof, head).unwrap(), Outcome::Proved);
        assert!(prover.splits() >= 2);
    }

    #[test]
    fn test_disequality_with_both_bounds() {
        let types = TypeSystem::new(Declarations::new());
        let x = Expr::var("x");
        let e = Expr::forall(
            vec![int("x")],
            Expr::implies(
                Expr::ne(x.clone(), Expr::int(0)),
                Expr::or(vec![Expr::lt(x.clone(), Expr::int(0)), Expr::gt(x, Expr::int(0))]),
            ),
        );
        assert_eq!(check(&types, e, ProverConfig::default()), Outcome::Proved);
    }

    #[test]
    fn test_falsifiable_gives_counterexample() {
        let types = TypeSystem::new(Declarations::new());
        let x = Expr::var("x");
        let e = Expr::forall(vec![int("x")], Expr::gt(x, Expr::int(0)));
        match check(&types, e, ProverConfig::default()) {
            Outcome::Counterexample(truths) => assert_eq!(truths, vec!["0 >= x$1"]),
            other => panic!("unexpected outcome {}", other),
        }
    }

    #[test]
    fn test_tiny_budget_is_inconclusive() {
        let types = TypeSystem::new(Declarations::new());
        let x = Expr::var("x");
        let e = Expr::forall(
            vec![int("x")],
            Expr::implies(Expr::gt(x.clone(), Expr::int(1)), Expr::gt(x, Expr::int(0))),
        );
        let config = ProverConfig {
            max_steps: 1,
            ..ProverConfig::default()
        };
        assert!(matches!(check(&types, e, config), Outcome::Inconclusive(_)));
    }
}
