use indoc::indoc;

use crate::config::ProverConfig;
use crate::driver::Verdict;
use crate::tests::common::{check_unit_with, expect_proved, verdict, verdicts};

#[test]
fn test_positive_is_non_negative() {
    expect_proved(indoc! {r#"
        {"assertions": [{"name": "positive_is_non_negative", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Implies": [
                    {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]},
                    {"GreaterThanOrEqual": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}
                ]}
            ]}
        }]}
    "#});
}

#[test]
fn test_array_length_is_non_negative() {
    expect_proved(indoc! {r#"
        {"assertions": [{"name": "length", "body":
            {"Forall": [[{"var_type": {"Array": "Int"}, "name": "xs"}],
                {"GreaterThanOrEqual": [{"ArrayLength": {"Variable": "xs"}}, {"Constant": {"Int": 0}}]}
            ]}
        }]}
    "#});
}

#[test]
fn test_false_claim_has_a_counterexample() {
    // x == 0 && y < x does not lead anywhere.
    let v = verdict(indoc! {r#"
        {"assertions": [{"name": "unprovable", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}, {"var_type": "Int", "name": "y"}],
                {"Implies": [
                    {"And": [
                        {"Equal": [{"Variable": "x"}, {"Constant": {"Int": 0}}]},
                        {"LessThan": [{"Variable": "y"}, {"Variable": "x"}]}
                    ]},
                    {"Constant": {"Bool": false}}
                ]}
            ]}
        }]}
    "#});
    match v {
        Verdict::Counterexample { truths } => {
            assert!(!truths.is_empty());
            assert!(!truths.contains(&"false".to_string()));
        }
        other => panic!("expected a counterexample, got {:?}", other),
    }
}

#[test]
fn test_equality_substitution_closes() {
    expect_proved(indoc! {r#"
        {"assertions": [{"name": "five_is_not_negative", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Implies": [
                    {"Equal": [{"Variable": "x"}, {"Constant": {"Int": 5}}]},
                    {"Not": {"LessThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}}
                ]}
            ]}
        }]}
    "#});
}

#[test]
fn test_trichotomy_needs_a_split() {
    expect_proved(indoc! {r#"
        {"assertions": [{"name": "trichotomy", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Or": [
                    {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]},
                    {"LessThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]},
                    {"Equal": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}
                ]}
            ]}
        }]}
    "#});
}

#[test]
fn test_nominal_invariant_is_known() {
    expect_proved(indoc! {r#"
        {"declarations": [
            {"kind": "type", "name": "nat", "var": {"var_type": "Int", "name": "n"},
             "invariant": [{"GreaterThanOrEqual": [{"Variable": "n"}, {"Constant": {"Int": 0}}]}]}
        ],
        "assertions": [{"name": "nat_is_non_negative", "body":
            {"Forall": [[{"var_type": {"Nominal": "nat"}, "name": "k"}],
                {"GreaterThan": [{"Add": [{"Variable": "k"}, {"Constant": {"Int": 1}}]}, {"Constant": {"Int": 0}}]}
            ]}
        }]}
    "#});
}

#[test]
fn test_function_contract_is_used() {
    expect_proved(indoc! {r#"
        {"declarations": [
            {"kind": "function", "name": "inc",
             "params": [{"var_type": "Int", "name": "v"}],
             "returns": [{"var_type": "Int", "name": "r"}],
             "requires": [{"GreaterThanOrEqual": [{"Variable": "v"}, {"Constant": {"Int": 0}}]}],
             "ensures": [{"Equal": [{"Variable": "r"}, {"Add": [{"Variable": "v"}, {"Constant": {"Int": 1}}]}]}]}
        ],
        "assertions": [{"name": "inc_grows", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Implies": [
                    {"GreaterThanOrEqual": [{"Variable": "x"}, {"Constant": {"Int": 0}}]},
                    {"GreaterThan": [
                        {"Invoke": {"name": "inc", "selector": 0, "args": [{"Variable": "x"}]}},
                        {"Variable": "x"}
                    ]}
                ]}
            ]}
        }]}
    "#});
}

#[test]
fn test_macro_is_expanded() {
    expect_proved(indoc! {r#"
        {"declarations": [
            {"kind": "macro", "name": "positive",
             "params": [{"var_type": "Int", "name": "v"}],
             "body": {"GreaterThan": [{"Variable": "v"}, {"Constant": {"Int": 0}}]}}
        ],
        "assertions": [{"name": "positive_is_at_least_one", "body":
            {"Forall": [[{"var_type": "Int", "name": "x"}],
                {"Implies": [
                    {"Invoke": {"name": "positive", "selector": 0, "args": [{"Variable": "x"}]}},
                    {"GreaterThanOrEqual": [{"Variable": "x"}, {"Constant": {"Int": 1}}]}
                ]}
            ]}
        }]}
    "#});
}

#[test]
fn test_resolution_error_is_isolated() {
    let all = verdicts(indoc! {r#"
        {"assertions": [
            {"name": "uses_missing", "body":
                {"Forall": [[{"var_type": "Int", "name": "x"}],
                    {"GreaterThanOrEqual": [
                        {"Invoke": {"name": "missing", "selector": 0, "args": [{"Variable": "x"}]}},
                        {"Constant": {"Int": 0}}
                    ]}
                ]}
            },
            {"name": "trivial", "body":
                {"Forall": [[{"var_type": "Int", "name": "x"}],
                    {"GreaterThanOrEqual": [{"Variable": "x"}, {"Variable": "x"}]}
                ]}
            }
        ]}
    "#});
    assert_eq!(all.len(), 2);
    assert!(matches!(all[0], Verdict::ResolutionError { .. }));
    assert!(all[1].is_proved());
}

#[test]
fn test_tiny_budget_is_reported() {
    let config = ProverConfig {
        max_steps: 1,
        ..ProverConfig::default()
    };
    let reports = check_unit_with(
        indoc! {r#"
            {"assertions": [{"name": "needs_steps", "body":
                {"Forall": [[{"var_type": "Int", "name": "x"}],
                    {"Implies": [
                        {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 1}}]},
                        {"GreaterThan": [{"Variable": "x"}, {"Constant": {"Int": 0}}]}
                    ]}
                ]}
            }]}
        "#},
        config,
    );
    assert_eq!(
        reports[0].verdict,
        Verdict::Inconclusive {
            reason: "step budget of 1 exhausted".to_string()
        }
    );
}

#[test]
fn test_no_witness_in_an_empty_type() {
    let v = verdict(indoc! {r#"
        {"declarations": [
            {"kind": "type", "name": "empty", "var": {"var_type": "Int", "name": "n"},
             "invariant": [
                {"GreaterThan": [{"Variable": "n"}, {"Constant": {"Int": 0}}]},
                {"LessThan": [{"Variable": "n"}, {"Constant": {"Int": 0}}]}
             ]}
        ],
        "assertions": [{"name": "empty_has_a_value", "body":
            {"Exists": [[{"var_type": {"Nominal": "empty"}, "name": "e"}],
                {"Or": [
                    {"GreaterThanOrEqual": [{"Variable": "e"}, {"Constant": {"Int": 0}}]},
                    {"LessThan": [{"Variable": "e"}, {"Constant": {"Int": 0}}]}
                ]}
            ]}
        }]}
    "#});
    assert!(!v.is_proved(), "proved a witness for an empty type");
}

const LOOP: &str = r#"{"kind": "type", "name": "Loop", "var": {"var_type":
    {"Record": {"fields": [{"name": "f", "field_type": {"Nominal": "Loop"}}], "open": false}},
    "name": "l"}, "invariant": []}"#;

#[test]
fn test_no_witness_in_a_void_record() {
    let unit = format!(
        r#"{{"declarations": [{}], "assertions": [{{"name": "loop_has_a_value", "body":
            {{"Exists": [[{{"var_type": {{"Nominal": "Loop"}}, "name": "l"}}],
                {{"Constant": {{"Bool": true}}}}]}}}}]}}"#,
        LOOP
    );
    assert!(!verdict(&unit).is_proved());
}

#[test]
fn test_void_record_has_no_values() {
    let unit = format!(
        r#"{{"declarations": [{}], "assertions": [{{"name": "loop_is_void", "body":
            {{"Not": {{"Exists": [[{{"var_type": {{"Nominal": "Loop"}}, "name": "l"}}],
                {{"Constant": {{"Bool": true}}}}]}}}}}}]}}"#,
        LOOP
    );
    expect_proved(&unit);
}
