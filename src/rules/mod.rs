pub mod and_elimination;
pub mod axioms;
pub mod congruence;
pub mod equality_case_analysis;
pub mod inequality;
pub mod macro_expansion;
pub mod or_elimination;
pub mod quantifier;
pub mod simplify;
pub mod type_test;

use crate::config::ProverConfig;
use crate::error::Error;
use crate::formula::{to_formula, Formula};
use crate::kernel::expr::Expr;
use crate::kernel::heap::FormulaId;
use crate::proof::state::StateId;
use crate::proof::Proof;

use self::and_elimination::AndElimination;
use self::axioms::{ArrayIndexAxiom, ArrayLengthAxiom, FunctionCallAxiom};
use self::congruence::CongruenceClosure;
use self::equality_case_analysis::EqualityCaseAnalysis;
use self::inequality::InequalityIntroduction;
use self::macro_expansion::MacroExpansion;
use self::or_elimination::OrElimination;
use self::quantifier::{ExhaustiveQuantifierInstantiation, ExistentialElimination};
use self::simplify::Simplification;
use self::type_test::{TypeInvariantExpansion, TypeTestClosure};

/// A rule that reacts to one newly added truth and moves the head forward.
///
/// Returning `head` unchanged means the rule does not apply. The returned state is always
/// `head` itself or one of its descendants.
pub trait LinearRule {
    fn name(&self) -> &'static str;

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error>;
}

/// A linear rule that combines the new truth with the truths already in force.
pub trait ClosureRule {
    fn name(&self) -> &'static str;

    /// `existing` holds the active truths of `head` other than `truth`.
    /// Some of them may stop being active as the rule rewrites them.
    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        existing: &[FormulaId],
        head: StateId,
    ) -> Result<StateId, Error>;
}

/// Runs a closure rule as a linear rule.
pub struct Closure<R>(pub R);

impl<R: ClosureRule> LinearRule for Closure<R> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn apply(&self, proof: &mut Proof, truth: FormulaId, head: StateId) -> Result<StateId, Error> {
        let existing: Vec<FormulaId> = proof
            .active(head)
            .into_iter()
            .filter(|id| *id != truth)
            .collect();
        self.0.apply(proof, truth, &existing, head)
    }
}

/// A rule that branches the proof.
pub trait NonLinearRule {
    fn name(&self) -> &'static str;

    /// The children to explore instead of `head`, or None if the rule does not apply.
    fn apply(
        &self,
        proof: &mut Proof,
        truth: FormulaId,
        head: StateId,
    ) -> Result<Option<Vec<StateId>>, Error>;
}

/// The rules the prover runs, in the order it runs them.
pub struct RuleLibrary {
    linear: Vec<Box<dyn LinearRule>>,
    non_linear: Vec<Box<dyn NonLinearRule>>,
}

impl RuleLibrary {
    pub fn standard(config: &ProverConfig) -> RuleLibrary {
        let depth = config.max_instantiation_depth;
        RuleLibrary {
            linear: vec![
                Box::new(Simplification),
                Box::new(AndElimination),
                Box::new(ExistentialElimination),
                Box::new(MacroExpansion),
                Box::new(Closure(TypeTestClosure)),
                Box::new(TypeInvariantExpansion),
                Box::new(EqualityCaseAnalysis),
                Box::new(Closure(CongruenceClosure)),
                Box::new(Closure(InequalityIntroduction)),
                Box::new(ArrayLengthAxiom),
                Box::new(ArrayIndexAxiom),
                Box::new(FunctionCallAxiom::new(depth)),
                Box::new(Closure(ExhaustiveQuantifierInstantiation::new(depth))),
            ],
            non_linear: vec![Box::new(OrElimination)],
        }
    }

    pub fn linear(&self) -> &[Box<dyn LinearRule>] {
        &self.linear
    }

    pub fn non_linear(&self) -> &[Box<dyn NonLinearRule>] {
        &self.non_linear
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.linear
            .iter()
            .map(|r| r.name())
            .chain(self.non_linear.iter().map(|r| r.name()))
            .collect()
    }
}

/// Lowers a boolean expression in the type environment of `head`.
pub(crate) fn lower(proof: &Proof, head: StateId, e: &Expr) -> Result<Formula, Error> {
    to_formula(proof.types(), proof.environment(head), e)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::kernel::declaration::Declarations;
    use crate::kernel::name::Name;
    use crate::kernel::types::Type;
    use crate::type_system::{TypeEnvironment, TypeSystem};

    /// Environment for rule tests: int skolems x$1, y$1, z$1, an int array xs$1 and a
    /// bool b$1.
    pub fn environment() -> TypeEnvironment {
        let mut env = TypeEnvironment::new();
        for name in ["x$1", "y$1", "z$1"] {
            env.insert(Name::new(name), Type::Int);
        }
        env.insert(Name::new("xs$1"), Type::array(Type::Int));
        env.insert(Name::new("b$1"), Type::Bool);
        env
    }

    pub fn types(declarations: Declarations) -> TypeSystem {
        TypeSystem::new(declarations)
    }

    /// Asserts each expression in turn on top of the root.
    pub fn assume(proof: &mut Proof, exprs: &[Expr]) -> (StateId, Vec<FormulaId>) {
        let mut head = proof.root();
        let mut ids = vec![];
        for e in exprs {
            let f = lower(proof, head, e).unwrap();
            head = proof.infer(head, "Assumption", f.clone(), &[]);
            ids.push(proof.heap().lookup(&f).unwrap());
        }
        (head, ids)
    }

    /// The active truths of a state, as sorted strings.
    pub fn truths(proof: &Proof, head: StateId) -> Vec<String> {
        let mut answer = proof.describe(head);
        answer.sort();
        answer
    }
}
