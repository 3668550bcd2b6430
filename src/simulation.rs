//! The progressive collapse loop.
//!
//! Each step solves the current topology, records the energy state and its
//! entropy, asks the detector about the whole entropy history, applies the
//! failure criterion and, if anything failed, diffuses the stranded energy.
//! The entropy of a step is always computed before that step's
//! redistribution; the redistributed state then replaces the step's entry in
//! the energy history.

use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::detection::CollapseDetector;
use crate::entropy::compute_entropy;
use crate::equilibrium::solve;
use crate::errors::{ConfigError, SimulationError};
use crate::failure::evaluate_failures;
use crate::frame::{Frame, MemberId};
use crate::redistribution::redistribute;
use crate::state::{EnergyState, EntropyRecord, SimulationResult, Termination};

/// A simulation run that owns its frame and history.
///
/// Steps are strictly sequential because a failure at one step changes the
/// stiffness used by the next. Independent runs share nothing.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Frame being driven to collapse; only failure flags change.
    frame: Frame,
    /// Validated options.
    config: SimulationConfig,
    /// Detector built from `config`.
    detector: CollapseDetector,
    /// One energy state per solved step.
    energy_history: Vec<EnergyState>,
    /// One entropy record per solved step.
    entropy_history: Vec<EntropyRecord>,
    /// Member ids in failure order.
    failed_sequence: Vec<MemberId>,
    /// Entropy of the last solved step, zero before the first.
    previous_entropy: f64,
    /// Set once the run has ended.
    termination: Option<Termination>,
    /// Step reported with the termination.
    collapse_step: Option<usize>,
}

impl Simulation {
    /// Prepare a run.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in `config`; nothing is solved.
    pub fn new(frame: Frame, config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = config.detector();
        Ok(Self {
            frame,
            config,
            detector,
            energy_history: Vec::new(),
            entropy_history: Vec::new(),
            failed_sequence: Vec::new(),
            previous_entropy: 0.0,
            termination: None,
            collapse_step: None,
        })
    }

    /// Frame in its current, partially failed, state.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Options of this run.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Energy states recorded so far.
    #[must_use]
    pub fn energy_history(&self) -> &[EnergyState] {
        &self.energy_history
    }

    /// Entropy records recorded so far.
    #[must_use]
    pub fn entropy_history(&self) -> &[EntropyRecord] {
        &self.entropy_history
    }

    /// Members in the order they failed.
    #[must_use]
    pub fn failed_sequence(&self) -> &[MemberId] {
        &self.failed_sequence
    }

    /// Terminal outcome, once reached.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Advance by one step.
    ///
    /// Returns the terminal outcome once the run has ended; calling again
    /// after that returns the same outcome without doing any work.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Frame`] when the frame is malformed.
    pub fn step(&mut self) -> Result<Option<Termination>, SimulationError> {
        if let Some(termination) = self.termination {
            return Ok(Some(termination));
        }

        let step = self.energy_history.len();
        let equilibrium = solve(&self.frame, step, self.config.load_factor(step))?;
        let record = compute_entropy(&equilibrium.energy, self.previous_entropy);
        debug!(
            step,
            entropy = record.entropy,
            delta_entropy = record.delta_entropy,
            active_members = record.active_members(),
            "entropy recorded"
        );
        self.previous_entropy = record.entropy;
        self.energy_history.push(equilibrium.energy.clone());
        self.entropy_history.push(record);

        if let Some(collapse_step) = self.detector.detect(&self.entropy_history) {
            return Ok(Some(self.finish(Termination::Collapsed, Some(collapse_step))));
        }

        let newly_failed = evaluate_failures(&mut self.frame, &equilibrium)?;
        self.failed_sequence.extend_from_slice(&newly_failed);

        if self.frame.all_failed() {
            return Ok(Some(self.finish(Termination::AllFailed, Some(step))));
        }

        if !newly_failed.is_empty() {
            let redistributed =
                redistribute(&self.frame, &equilibrium.energy, self.config.redistribution_dt)?;
            if let Some(current) = self.energy_history.last_mut() {
                *current = redistributed;
            }
        }

        if self.energy_history.len() >= self.config.max_steps {
            return Ok(Some(self.finish(Termination::MaxStepsReached, None)));
        }
        Ok(None)
    }

    /// Step until the run terminates and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Frame`] when the frame is malformed.
    pub fn run(mut self) -> Result<SimulationResult, SimulationError> {
        let termination = loop {
            if let Some(termination) = self.step()? {
                break termination;
            }
        };
        Ok(self.build_result(termination))
    }

    /// The result of a run that has terminated, `None` while it is still going.
    #[must_use]
    pub fn into_result(self) -> Option<SimulationResult> {
        let termination = self.termination?;
        Some(self.build_result(termination))
    }

    /// Record the terminal outcome.
    fn finish(&mut self, termination: Termination, collapse_step: Option<usize>) -> Termination {
        info!(
            frame = self.frame.name(),
            ?termination,
            collapse_step,
            steps = self.energy_history.len(),
            failed = self.failed_sequence.len(),
            "simulation finished"
        );
        self.termination = Some(termination);
        self.collapse_step = collapse_step;
        termination
    }

    /// Move the histories into a result record.
    fn build_result(self, termination: Termination) -> SimulationResult {
        SimulationResult {
            frame_name: self.frame.name().to_string(),
            energy_history: self.energy_history,
            entropy_history: self.entropy_history,
            collapse_detected: termination != Termination::MaxStepsReached,
            collapse_step: self.collapse_step,
            failed_sequence: self.failed_sequence,
            termination,
        }
    }
}

/// Run `frame` to termination under `config`.
///
/// # Examples
/// ```
/// use collapsex::scenarios::simple_span;
/// use collapsex::{run, SimulationConfig, Termination};
///
/// let config = SimulationConfig::default().with_max_steps(5);
/// let result = run(simple_span().expect("frame"), &config).expect("run");
/// assert_eq!(result.termination, Termination::MaxStepsReached);
/// assert_eq!(result.steps_run(), 5);
/// assert!(result.failed_sequence.is_empty());
/// ```
///
/// # Errors
///
/// Returns [`SimulationError::Config`] before any step when `config` is
/// invalid, or [`SimulationError::Frame`] when the frame is malformed.
pub fn run(frame: Frame, config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    Simulation::new(frame, config.clone())?.run()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::CollapseMethod;
    use crate::frame::Material;
    use crate::geometry::{point, Dof};

    /// Pinned-pinned span loaded at node 1, which sits `split` metres from the left end.
    fn span(split: f64, weak_member: Option<MemberId>) -> Frame {
        let mut frame = Frame::new("span");
        let steel = frame.add_material(Material::s275()).expect("grade");
        frame.add_node(0, point(0.0, 0.0, 0.0)).expect("node");
        frame.add_node(1, point(split, 0.0, 0.0)).expect("node");
        frame.add_node(2, point(10.0, 0.0, 0.0)).expect("node");
        frame.add_member(0, 0, 1, steel).expect("member");
        frame.add_member(1, 1, 2, steel).expect("member");
        frame.set_support(0, &[Dof::Ux, Dof::Uy]).expect("pin");
        frame.set_support(2, &[Dof::Ux, Dof::Uy]).expect("pin");
        frame.add_load(1, Dof::Uy, -50_000.0).expect("load");
        if let Some(member) = weak_member {
            let weak = frame
                .add_material(Material::s275().with_yield_stress(1.0))
                .expect("grade");
            frame.assign_material(member, weak).expect("assignment");
        }
        frame
    }

    fn threshold_config() -> SimulationConfig {
        SimulationConfig::default()
            .with_method(CollapseMethod::Threshold)
            .with_collapse_threshold(-0.01)
            .with_max_steps(50)
    }

    #[test]
    fn invalid_configuration_is_rejected_before_any_step() {
        let config = SimulationConfig::default().with_max_steps(0);
        assert_eq!(
            Simulation::new(span(5.0, None), config.clone()).err(),
            Some(ConfigError::NonPositiveMaxSteps)
        );
        assert_eq!(
            run(span(5.0, None), &config).err(),
            Some(SimulationError::Config(ConfigError::NonPositiveMaxSteps))
        );
    }

    #[test]
    fn stepping_stops_at_the_first_terminal_outcome() {
        let mut simulation =
            Simulation::new(span(5.0, Some(0)), threshold_config()).expect("simulation");
        assert_eq!(simulation.termination(), None);

        assert_eq!(simulation.step().expect("step 0"), None);
        assert_eq!(simulation.failed_sequence(), &[0]);
        assert!(simulation.frame().member(0).expect("member").is_failed());

        assert_eq!(
            simulation.step().expect("step 1"),
            Some(Termination::Collapsed)
        );
        assert_eq!(
            simulation.step().expect("after the end"),
            Some(Termination::Collapsed)
        );
        assert_eq!(simulation.energy_history().len(), 2);

        let result = simulation.into_result().expect("terminated");
        assert!(result.collapse_detected);
        assert_eq!(result.collapse_step, Some(1));
        assert_eq!(result.failed_sequence, vec![0]);
        assert_eq!(result.entropy_history.len(), 2);
    }

    #[test]
    fn entropy_is_recorded_before_redistribution() {
        // Unequal spans give unequal energies; half a step of diffusion evens them out.
        let config = threshold_config().with_redistribution_dt(0.5);
        let mut simulation = Simulation::new(span(4.0, Some(0)), config).expect("simulation");
        simulation.step().expect("step 0");

        let energy = &simulation.energy_history()[0];
        assert_relative_eq!(
            energy.member_states[0].strain_energy,
            energy.member_states[1].strain_energy,
            max_relative = 1.0e-9
        );
        let record = &simulation.entropy_history()[0];
        assert!(record.entropy < 2.0_f64.ln() - 1.0e-3);
        assert_ne!(*record, compute_entropy(energy, 0.0));
    }

    #[test]
    fn every_member_failing_ends_the_run() {
        let mut frame = span(5.0, None);
        let grade = frame.member(0).expect("member").material();
        frame
            .update_material(grade, Material::s275().with_yield_stress(1.0))
            .expect("update");
        let result = run(frame, &threshold_config()).expect("run");
        assert_eq!(result.termination, Termination::AllFailed);
        assert!(result.collapse_detected);
        assert_eq!(result.collapse_step, Some(0));
        assert_eq!(result.failed_sequence, vec![0, 1]);
        assert_eq!(result.steps_run(), 1);
    }

    #[test]
    fn incremental_loading_scales_the_energy() {
        let config = SimulationConfig::default()
            .with_max_steps(3)
            .with_load_factor(0.5, 0.5);
        let result = run(span(5.0, None), &config).expect("run");
        assert_eq!(result.termination, Termination::MaxStepsReached);
        let totals: Vec<f64> = result
            .energy_history
            .iter()
            .map(|state| state.total_energy)
            .collect();
        assert_relative_eq!(totals[1], 4.0 * totals[0], max_relative = 1.0e-9);
        assert_relative_eq!(totals[2], 9.0 * totals[0], max_relative = 1.0e-9);
        assert_relative_eq!(result.entropy_history[2].delta_entropy, 0.0, epsilon = 1.0e-9);
    }
}
