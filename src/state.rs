//! Per-step snapshots and the final simulation record.
//!
//! Everything here is plain data produced by the simulation loop and handed
//! to reporting code; records are never modified once created.

use serde::Serialize;

use crate::frame::MemberId;

/// Snapshot of one member at one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberState {
    /// Member the snapshot belongs to.
    pub member_id: MemberId,
    /// Elastic strain energy in joules, never negative.
    pub strain_energy: f64,
    /// Signed axial force in newtons, tension positive.
    pub axial_force: f64,
    /// Elongation along the member axis in metres.
    pub deformation: f64,
    /// Whether the member had failed when the snapshot was taken.
    pub failed: bool,
}

impl MemberState {
    /// Snapshot of a failed member: no energy, no force, no deformation.
    #[must_use]
    pub fn failed(member_id: MemberId) -> Self {
        Self {
            member_id,
            strain_energy: 0.0,
            axial_force: 0.0,
            deformation: 0.0,
            failed: true,
        }
    }
}

/// Energy distribution across the frame at one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnergyState {
    /// Step index.
    pub step: usize,
    /// Sum of the member strain energies.
    pub total_energy: f64,
    /// Member snapshots in frame order.
    pub member_states: Vec<MemberState>,
}

impl EnergyState {
    /// Build a state whose total is the sum of the member energies.
    #[must_use]
    pub fn new(step: usize, member_states: Vec<MemberState>) -> Self {
        let total_energy = member_states.iter().map(|state| state.strain_energy).sum();
        Self {
            step,
            total_energy,
            member_states,
        }
    }

    /// Snapshots of the members that had not failed.
    pub fn active(&self) -> impl Iterator<Item = &MemberState> + '_ {
        self.member_states.iter().filter(|state| !state.failed)
    }

    /// Snapshot of a specific member.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<&MemberState> {
        self.member_states.iter().find(|state| state.member_id == id)
    }
}

/// Entropy metrics for one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntropyRecord {
    /// Step index.
    pub step: usize,
    /// Shannon entropy of the energy distribution in nats.
    pub entropy: f64,
    /// Change from the previous step's entropy; may be negative.
    pub delta_entropy: f64,
    /// `(member, p_i)` pairs for every active member, in frame order.
    pub energy_distribution: Vec<(MemberId, f64)>,
}

impl EntropyRecord {
    /// Number of members that took part in the distribution.
    #[must_use]
    pub fn active_members(&self) -> usize {
        self.energy_distribution.len()
    }
}

/// How a simulation run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The collapse detector flagged a step.
    Collapsed,
    /// Every member failed.
    AllFailed,
    /// The step budget ran out.
    MaxStepsReached,
}

/// Complete output of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    /// Name of the simulated frame.
    pub frame_name: String,
    /// Energy state of every step, post-redistribution where it applied.
    pub energy_history: Vec<EnergyState>,
    /// Entropy record of every step.
    pub entropy_history: Vec<EntropyRecord>,
    /// Whether collapse was detected or every member failed.
    pub collapse_detected: bool,
    /// Step at which collapse was declared.
    pub collapse_step: Option<usize>,
    /// Member ids in the order they failed.
    pub failed_sequence: Vec<MemberId>,
    /// Terminal outcome of the run.
    pub termination: Termination,
}

impl SimulationResult {
    /// Number of steps that were solved.
    #[must_use]
    pub fn steps_run(&self) -> usize {
        self.energy_history.len()
    }

    /// Entropy record of the last solved step.
    #[must_use]
    pub fn final_entropy(&self) -> Option<&EntropyRecord> {
        self.entropy_history.last()
    }
}
