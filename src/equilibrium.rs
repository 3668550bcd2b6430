//! Linear equilibrium solve and per-member energy recovery.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::SimulationError;
use crate::frame::{Frame, MemberId};
use crate::state::{EnergyState, MemberState};
use crate::stiffness::{
    apply_constraints, assemble_global_stiffness, local_stiffness, transformation_matrix,
    ElementVector,
};

/// LU pivots smaller than this fraction of the largest pivot mark the system as near-singular.
const PIVOT_RATIO_LIMIT: f64 = 1.0e-12;

/// How the displacement vector was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolveMethod {
    /// LU factorisation of a well-conditioned system.
    Direct,
    /// Minimum-norm least squares through an SVD.
    LeastSquares,
}

/// Internal response of one active member in its local axes.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberResponse {
    /// Member the response belongs to.
    pub member: MemberId,
    /// Local end displacements.
    pub displacements: ElementVector,
    /// Local end forces, `k_local * displacements`.
    pub forces: ElementVector,
}

impl MemberResponse {
    /// Signed axial force, tension positive.
    ///
    /// The far-end component of the local force vector is used so that an
    /// elongating member reports a positive value.
    #[must_use]
    pub fn axial_force(&self) -> f64 {
        self.forces[6]
    }

    /// Larger-magnitude end moment about the local z axis.
    #[must_use]
    pub fn max_end_moment(&self) -> f64 {
        self.forces[5].abs().max(self.forces[11].abs())
    }

    /// Elongation along the member axis.
    #[must_use]
    pub fn deformation(&self) -> f64 {
        self.displacements[6] - self.displacements[0]
    }

    /// Strain energy `u . f / 2`, clamped at zero to absorb rounding noise.
    #[must_use]
    pub fn strain_energy(&self) -> f64 {
        (0.5 * self.displacements.dot(&self.forces)).max(0.0)
    }
}

/// Everything produced by one equilibrium solve.
#[derive(Clone, Debug)]
pub struct Equilibrium {
    /// Global displacement vector.
    pub displacements: DVector<f64>,
    /// Responses of the members that were active during the solve.
    pub responses: Vec<MemberResponse>,
    /// Energy snapshot for the step.
    pub energy: EnergyState,
    /// Path taken by the linear solver.
    pub method: SolveMethod,
}

/// Assemble the global load vector with every magnitude scaled by `load_factor`.
///
/// # Errors
///
/// Returns [`SimulationError::Frame`] when a load targets an unknown node.
pub fn build_load_vector(frame: &Frame, load_factor: f64) -> Result<DVector<f64>, SimulationError> {
    let mut load = DVector::zeros(frame.dof_count());
    for entry in frame.loads() {
        let index = frame.dof_base(entry.node)? + entry.dof.index();
        load[index] += entry.magnitude * load_factor;
    }
    Ok(load)
}

/// Solve `K u = F`, falling back to minimum-norm least squares for singular systems.
///
/// A degenerate topology is expected once enough members have failed, so a
/// singular matrix is not an error.
///
/// # Errors
///
/// Returns [`SimulationError::LeastSquares`] only if the SVD cannot be applied.
pub fn solve_system(
    stiffness: &DMatrix<f64>,
    load: &DVector<f64>,
) -> Result<(DVector<f64>, SolveMethod), SimulationError> {
    if load.is_empty() {
        return Ok((DVector::zeros(0), SolveMethod::Direct));
    }

    let lu = stiffness.clone().lu();
    let pivots = lu.u().diagonal().abs();
    let pivot_ratio = pivots.min() / pivots.max();
    if pivot_ratio > PIVOT_RATIO_LIMIT {
        if let Some(solution) = lu.solve(load) {
            if solution.iter().all(|value| value.is_finite()) {
                return Ok((solution, SolveMethod::Direct));
            }
        }
    }

    warn!(pivot_ratio, "stiffness matrix is singular; using least squares");
    let size = stiffness.nrows().max(stiffness.ncols());
    let svd = stiffness.clone().svd(true, true);
    let cutoff = svd.singular_values.max() * size as f64 * f64::EPSILON;
    let solution = svd
        .solve(load, cutoff)
        .map_err(SimulationError::LeastSquares)?;
    Ok((solution, SolveMethod::LeastSquares))
}

/// Recover the local response of an active member from global displacements.
///
/// # Errors
///
/// Returns [`SimulationError::Frame`] when the member is unknown.
pub fn member_response(
    frame: &Frame,
    member: MemberId,
    displacements: &DVector<f64>,
) -> Result<MemberResponse, SimulationError> {
    let geometry = frame.member_geometry(member)?;
    let material = frame.member_material(member)?;

    let mut global = ElementVector::zeros();
    for (local, index) in geometry.dof_map().iter().enumerate() {
        global[local] = displacements[*index];
    }
    let local_displacements = transformation_matrix(&geometry.axis) * global;
    let forces = local_stiffness(material, geometry.length) * local_displacements;

    Ok(MemberResponse {
        member,
        displacements: local_displacements,
        forces,
    })
}

/// Solve the current topology for one step.
///
/// Failed members are reported with zero energy, force and deformation. The
/// total energy is the sum of the member energies in member order.
///
/// # Errors
///
/// Returns [`SimulationError`] when the frame is malformed.
pub fn solve(frame: &Frame, step: usize, load_factor: f64) -> Result<Equilibrium, SimulationError> {
    let mut stiffness = assemble_global_stiffness(frame)?;
    let mut load = build_load_vector(frame, load_factor)?;
    apply_constraints(frame, &mut stiffness, &mut load)?;
    let (displacements, method) = solve_system(&stiffness, &load)?;

    let mut responses = Vec::with_capacity(frame.active_member_count());
    let mut member_states = Vec::with_capacity(frame.member_count());
    for member in frame.members() {
        if member.is_failed() {
            member_states.push(MemberState::failed(member.id()));
            continue;
        }
        let response = member_response(frame, member.id(), &displacements)?;
        member_states.push(MemberState {
            member_id: member.id(),
            strain_energy: response.strain_energy(),
            axial_force: response.axial_force(),
            deformation: response.deformation(),
            failed: false,
        });
        responses.push(response);
    }

    let energy = EnergyState::new(step, member_states);
    debug!(
        step,
        load_factor,
        ?method,
        total_energy = energy.total_energy,
        "equilibrium solved"
    );

    Ok(Equilibrium {
        displacements,
        responses,
        energy,
        method,
    })
}
