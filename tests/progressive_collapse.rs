#![warn(clippy::pedantic)]

use collapsex::scenarios::{pratt_bridge, simple_span};
use collapsex::stiffness::{apply_constraints, assemble_global_stiffness};
use collapsex::{
    run, CollapseMethod, ConfigError, Frame, Material, Scenario, SimulationConfig,
    SimulationError, SimulationResult, Termination,
};
use nalgebra::DVector;

/// The two-span frame with one grade shared by both members, at the given yield stress.
fn simple_span_with_yield(yield_stress: f64) -> Frame {
    let mut frame = simple_span().expect("simple span builds");
    let grade = frame
        .member(0)
        .expect("member 0 exists")
        .material();
    frame
        .update_material(grade, Material::s275().with_yield_stress(yield_stress))
        .expect("shared grade update succeeds");
    frame
}

/// Pratt bridge whose verticals fail under any load, starting a failure cascade.
fn weakened_bridge() -> Frame {
    let mut frame = pratt_bridge().expect("pratt bridge builds");
    let grade = frame
        .member(12)
        .expect("vertical exists")
        .material();
    let vertical = frame
        .material(grade)
        .expect("vertical grade exists")
        .with_yield_stress(1.0);
    frame
        .update_material(grade, vertical)
        .expect("vertical grade update succeeds");
    frame
}

fn never_detecting(max_steps: usize) -> SimulationConfig {
    SimulationConfig::default()
        .with_method(CollapseMethod::Threshold)
        .with_collapse_threshold(-999.0)
        .with_max_steps(max_steps)
}

fn assert_energy_invariants(result: &SimulationResult) {
    for state in &result.energy_history {
        let sum: f64 = state
            .member_states
            .iter()
            .map(|member| member.strain_energy)
            .sum();
        assert!((state.total_energy - sum).abs() <= 1.0e-10);
        assert!(state
            .member_states
            .iter()
            .all(|member| member.strain_energy >= 0.0));
    }
    for record in &result.entropy_history {
        let active = record.active_members();
        let bound = if active > 1 { (active as f64).ln() } else { 0.0 };
        assert!(record.entropy >= 0.0);
        assert!(record.entropy <= bound + 1.0e-12);
    }
}

#[test]
fn weak_member_triggers_threshold_collapse() {
    let mut frame = simple_span().expect("simple span builds");
    let weak = frame
        .add_material(Material::s275().with_yield_stress(1.0))
        .expect("weak grade is valid");
    frame
        .assign_material(0, weak)
        .expect("grade assignment succeeds");
    let config = SimulationConfig::default()
        .with_collapse_method("threshold")
        .expect("threshold is a known method")
        .with_collapse_threshold(-0.01)
        .with_max_steps(50);

    let result = run(frame, &config).expect("simulation completes");

    assert!(result.collapse_detected);
    assert!(result.collapse_step.is_some());
    assert_eq!(result.termination, Termination::Collapsed);
    assert_eq!(result.failed_sequence.first(), Some(&0));
    assert_eq!(result.entropy_history.len(), result.energy_history.len());
}

#[test]
fn indestructible_frame_runs_to_the_step_limit() {
    let frame = simple_span_with_yield(1.0e20);
    let config = SimulationConfig::default()
        .with_collapse_method("zscore")
        .expect("zscore is a known method")
        .with_max_steps(10);

    let result = run(frame, &config).expect("simulation completes");

    assert!(!result.collapse_detected);
    assert_eq!(result.collapse_step, None);
    assert!(result.failed_sequence.is_empty());
    assert_eq!(result.energy_history.len(), 10);
    assert_eq!(result.termination, Termination::MaxStepsReached);
    assert_energy_invariants(&result);
}

#[test]
fn identical_inputs_give_identical_histories() {
    let config = never_detecting(25);
    let first = run(weakened_bridge(), &config).expect("first run completes");
    let second = run(weakened_bridge(), &config).expect("second run completes");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("result serializes"),
        serde_json::to_string(&second).expect("result serializes")
    );
}

#[test]
fn failures_are_permanent() {
    let result = run(weakened_bridge(), &never_detecting(25)).expect("simulation completes");
    assert!(!result.failed_sequence.is_empty());
    assert_energy_invariants(&result);

    let mut seen = result.failed_sequence.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), result.failed_sequence.len());

    for id in &result.failed_sequence {
        let flags: Vec<bool> = result
            .energy_history
            .iter()
            .map(|state| {
                state
                    .member_states
                    .iter()
                    .find(|member| member.member_id == *id)
                    .expect("every member has a snapshot")
                    .failed
            })
            .collect();
        if let Some(first) = flags.iter().position(|failed| *failed) {
            assert!(flags[first..].iter().all(|failed| *failed));
        }
    }
    for state in &result.energy_history {
        for member in state.member_states.iter().filter(|member| member.failed) {
            assert!(result.failed_sequence.contains(&member.member_id));
            assert!(member.strain_energy.abs() < f64::EPSILON);
        }
    }
}

#[test]
fn unknown_detection_method_is_a_configuration_error() {
    assert_eq!(
        SimulationConfig::default().with_collapse_method("entropy"),
        Err(ConfigError::UnknownCollapseMethod("entropy".to_string()))
    );
    assert!(matches!(
        SimulationConfig::from_toml_str("collapse_method = \"entropy\""),
        Err(ConfigError::Parse(_))
    ));

    let invalid = SimulationConfig::default().with_collapse_threshold(0.0);
    assert_eq!(
        run(simple_span().expect("simple span builds"), &invalid),
        Err(SimulationError::Config(ConfigError::NonNegativeThreshold(0.0)))
    );
}

#[test]
fn every_scenario_runs() {
    for scenario in Scenario::ALL {
        let config = scenario.default_config().with_max_steps(20);
        let frame = scenario.build().expect("scenario frame builds");
        let name = frame.name().to_string();

        let result = run(frame, &config).expect("scenario simulation completes");

        assert_eq!(result.frame_name, name);
        assert!(result.steps_run() >= 1 && result.steps_run() <= 20);
        assert_eq!(result.entropy_history.len(), result.energy_history.len());
        assert_energy_invariants(&result);
    }
    assert!("nonexistent_scenario".parse::<Scenario>().is_err());
}

#[test]
fn scenario_stiffness_is_symmetric_and_constrained() {
    for scenario in Scenario::ALL {
        let frame = scenario.build().expect("scenario frame builds");
        let mut stiffness = assemble_global_stiffness(&frame).expect("assembly succeeds");
        for row in 0..stiffness.nrows() {
            for col in 0..row {
                assert!((stiffness[(row, col)] - stiffness[(col, row)]).abs() < 1.0e-6);
            }
        }

        let mut load = DVector::from_element(frame.dof_count(), 1.0);
        apply_constraints(&frame, &mut stiffness, &mut load).expect("constraints apply");
        for node in frame.nodes() {
            let base = frame.dof_base(node.id()).expect("node is known");
            for dof in node.restrained_dofs() {
                let index = base + dof.index();
                assert!(stiffness.row(index).iter().enumerate().all(|(col, value)| {
                    if col == index {
                        (value - 1.0).abs() < f64::EPSILON
                    } else {
                        value.abs() < f64::EPSILON
                    }
                }));
                assert!(stiffness.column(index).iter().enumerate().all(|(row, value)| {
                    row == index || value.abs() < f64::EPSILON
                }));
                assert!(load[index].abs() < f64::EPSILON);
            }
        }
    }
}
