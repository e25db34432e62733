mod support;

use prov_core::{PlanDefinition, PlanError};
use support::Produce;

#[test]
fn empty_plan_is_rejected() {
    assert_eq!(PlanDefinition::builder().build().unwrap_err(), PlanError::Empty);
}

#[test]
fn duplicate_step_names_are_rejected() {
    let err = PlanDefinition::builder().step(Produce::new("a", &[], &["x"]))
                                       .step(Produce::new("a", &["x"], &["y"]))
                                       .build()
                                       .unwrap_err();
    assert_eq!(err, PlanError::DuplicateStep("a".into()));
}

#[test]
fn a_key_has_a_single_writer() {
    let err = PlanDefinition::builder().step(Produce::new("a", &[], &["x"]))
                                       .step(Produce::new("b", &[], &["x"]))
                                       .build()
                                       .unwrap_err();
    assert_eq!(err,
               PlanError::DuplicateWrite { key: "x".into(),
                                           first: "a".into(),
                                           second: "b".into() });
}

#[test]
fn reads_must_come_from_earlier_steps() {
    // b lee lo que escribe c, que va después
    let err = PlanDefinition::builder().step(Produce::new("a", &[], &["x"]))
                                       .step(Produce::new("b", &["y"], &["z"]))
                                       .step(Produce::new("c", &["x"], &["y"]))
                                       .build()
                                       .unwrap_err();
    assert_eq!(err,
               PlanError::UnresolvedRead { step: "b".into(),
                                           key: "y".into() });

    let self_read = PlanDefinition::builder().step(Produce::new("a", &["x"], &["x"])).build();
    assert!(matches!(self_read, Err(PlanError::UnresolvedRead { .. })));
}

#[test]
fn initial_keys_satisfy_reads() {
    let plan = PlanDefinition::builder().initial_key("seed")
                                        .step(Produce::new("a", &["seed"], &["x"]))
                                        .build()
                                        .unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.initial_keys(), &["seed".to_string()]);
}

#[test]
fn valid_plan_exposes_order_and_hash() {
    let plan = PlanDefinition::builder().step(Produce::new("a", &[], &["x"]))
                                        .step(Produce::new("b", &["x"], &["y", "z"]))
                                        .step(Produce::new("c", &["x", "z"], &["w"]))
                                        .build()
                                        .unwrap();
    assert_eq!(plan.step_names(), vec!["a", "b", "c"]);
    assert_eq!(plan.definition_hash().len(), 64);
    assert!(format!("{plan:?}").contains("definition_hash"));
}
