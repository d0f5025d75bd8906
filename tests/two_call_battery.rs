//! End-to-end batteries against the in-memory enumeration endpoint.
//!
//! Covers the full battery shape (call counts and code order), per-set
//! independence of the insufficiency probes, zero-capacity precedence, and
//! battery idempotence.

mod common;

use sutlab::script::{EndpointMisbehavior, EndpointSet, VecEndpoint};
use sutlab::{
    BatteryConfig, CheckError, FlagSetGenerator, NamedFlag, ResultCode,
};

#[test]
fn conformant_two_set_battery_is_eight_calls() {
    common::init_test_logging();
    // Two sets, both counts > 1: 1 discovery + 1 exact + 2 insufficient
    // + 2*2 zero-capacity sub-cases.
    let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![10, 20]);
    let mut calls = 0usize;
    let report = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| {
            calls += 1;
            endpoint.call(r)
        })
        .expect("battery");
    assert_eq!(calls, 8);
    assert_eq!(report.calls_made(), 8);
    assert!(!report.has_warnings());
    assert!(!report.has_inconclusive());
    assert_eq!(report.discovered[0].count, 3);
    assert_eq!(report.discovered[1].count, 2);
}

#[test]
fn single_element_set_yields_inconclusive_probe() {
    common::init_test_logging();
    // The modes set holds one element: its insufficiency probe cannot run.
    let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![10]);
    let report = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect("battery");
    assert!(report.has_inconclusive());
    // 1 + 1 + 1 (formats only) + 4 zero sub-cases.
    assert_eq!(report.calls_made(), 7);
}

#[test]
fn accepting_insufficient_formats_is_caught() {
    common::init_test_logging();
    let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![10, 20])
        .with_misbehavior(EndpointMisbehavior::AcceptInsufficient(EndpointSet::Formats));
    let err = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect_err("must fail");
    match &err {
        CheckError::Protocol {
            step,
            expected,
            actual,
            ..
        } => {
            assert!(step.contains("formats"), "step was: {step}");
            assert_eq!(*expected, ResultCode::SizeInsufficient);
            assert_eq!(*actual, ResultCode::Success);
        }
        other => panic!("wrong error class: {other}"),
    }
}

#[test]
fn accepting_insufficient_modes_is_caught_independently() {
    common::init_test_logging();
    // The formats set conforms; its passing probe must not mask the modes
    // set's bug.
    let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![10, 20])
        .with_misbehavior(EndpointMisbehavior::AcceptInsufficient(EndpointSet::Modes));
    let err = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect_err("must fail");
    match &err {
        CheckError::Protocol { step, .. } => {
            assert!(step.contains("modes"), "step was: {step}");
        }
        other => panic!("wrong error class: {other}"),
    }
}

#[test]
fn broken_zero_precedence_is_caught() {
    common::init_test_logging();
    let mut endpoint = VecEndpoint::new(vec![1, 2, 3], vec![10, 20])
        .with_misbehavior(EndpointMisbehavior::ZeroOverrideBroken);
    let err = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect_err("must fail");
    match &err {
        CheckError::Protocol {
            step,
            expected,
            actual,
            ..
        } => {
            assert!(step.contains("under-allocated"), "step was: {step}");
            assert_eq!(*expected, ResultCode::Success);
            assert_eq!(*actual, ResultCode::SizeInsufficient);
        }
        other => panic!("wrong error class: {other}"),
    }
}

#[test]
fn rejected_count_query_is_caught_at_discovery() {
    common::init_test_logging();
    let mut endpoint = VecEndpoint::new(vec![1], vec![2])
        .with_misbehavior(EndpointMisbehavior::RejectCountQuery);
    let err = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect_err("must fail");
    // ValidationFailure is in the fatal class.
    assert!(err.is_fatal(), "got: {err}");
}

#[test]
fn count_drift_is_caught_on_the_exact_call() {
    common::init_test_logging();
    let mut endpoint =
        VecEndpoint::new(vec![1, 2, 3], vec![10, 20]).with_misbehavior(EndpointMisbehavior::CountDrift);
    let err = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect_err("must fail");
    assert!(err.to_string().contains("drift"), "got: {err}");
}

#[test]
fn battery_is_idempotent_against_a_conformant_endpoint() {
    common::init_test_logging();
    let run = || {
        let mut endpoint = VecEndpoint::new(vec![5, 6, 7, 8], vec![1, 2, 3]);
        VecEndpoint::spec()
            .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
            .expect("battery")
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn empty_endpoint_warns_and_stops() {
    common::init_test_logging();
    let mut endpoint = VecEndpoint::new(Vec::new(), Vec::new());
    let report = VecEndpoint::spec()
        .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
        .expect("battery");
    assert!(report.has_warnings());
    assert_eq!(report.calls_made(), 0);
}

#[test]
fn empty_endpoint_fails_when_declared_nonempty() {
    common::init_test_logging();
    let mut endpoint = VecEndpoint::new(Vec::new(), Vec::new());
    let config = BatteryConfig::new().with_empty_counts_fatal();
    let err = VecEndpoint::spec()
        .run_battery(&config, |r| endpoint.call(r))
        .expect_err("must fail");
    assert!(matches!(err, CheckError::EmptyResults { .. }), "got: {err}");
}

#[test]
fn battery_per_flag_combination() {
    common::init_test_logging();
    // A scenario commonly reruns the battery once per flag combination; the
    // generator and the oracle compose without shared state.
    const CREATE_FLAGS: &[NamedFlag] = &[
        NamedFlag::new(0x1, "PROTECTED"),
        NamedFlag::new(0x2, "TRANSIENT"),
    ];
    let mut batteries = 0;
    let mut generator = FlagSetGenerator::including_empty(CREATE_FLAGS);
    while generator.advance() {
        let combination = generator.current();
        let mut endpoint = VecEndpoint::new(vec![1, 2], vec![3, 4]);
        let report = VecEndpoint::spec()
            .run_battery(&BatteryConfig::new(), |r| endpoint.call(r))
            .unwrap_or_else(|e| panic!("battery under {combination}: {e}"));
        assert_eq!(report.calls_made(), 8);
        batteries += 1;
    }
    assert_eq!(batteries, 4);
}
