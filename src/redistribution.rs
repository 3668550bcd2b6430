//! Post-failure energy diffusion.
//!
//! Members that share a node are coupled; the energy vector then takes one
//! explicit Euler step of
//!
//! ```text
//! dU_i/dt = sum_j alpha_ij (U_j - U_i)
//! ```
//!
//! The coupling `alpha_ij` is the harmonic mean of the two axial stiffnesses,
//! scaled by the largest row sum so that `dt <= 1` never overshoots. The
//! scaling preserves the ordering between paths: a stiffer neighbour still
//! draws more energy. Total energy is not conserved exactly.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::errors::FrameError;
use crate::frame::{Frame, MemberId};
use crate::state::{EnergyState, MemberState};

/// Harmonic mean of two stiffnesses, zero when either is zero.
#[must_use]
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum > 0.0 {
        2.0 * a * b / sum
    } else {
        0.0
    }
}

/// Normalized coupling matrix between the listed members.
///
/// Row and column `i` correspond to `members[i]`. Two members are coupled once
/// if they share at least one node; the diagonal is zero.
///
/// # Errors
///
/// Returns [`FrameError::UnknownMember`] when an id is not part of `frame`.
pub fn coupling_matrix(frame: &Frame, members: &[MemberId]) -> Result<DMatrix<f64>, FrameError> {
    let n = members.len();
    let stiffness = members
        .iter()
        .map(|id| frame.axial_stiffness(*id))
        .collect::<Result<Vec<f64>, FrameError>>()?;

    let mut coupling = DMatrix::zeros(n, n);
    for (i, id) in members.iter().enumerate() {
        for neighbour in frame.adjacent_members(*id)? {
            if let Some(j) = members.iter().position(|other| *other == neighbour) {
                coupling[(i, j)] = harmonic_mean(stiffness[i], stiffness[j]);
            }
        }
    }

    let largest_row = coupling
        .row_iter()
        .map(|row| row.sum())
        .fold(0.0_f64, f64::max);
    if largest_row > 0.0 {
        coupling /= largest_row;
    }
    Ok(coupling)
}

/// Advance the energy distribution of `state` by one diffusion step.
///
/// Members flagged as failed in `state` are neither sources nor receivers and
/// keep zero energy. Everything else in the snapshot is carried over; only the
/// strain energies and the total change.
///
/// # Errors
///
/// Returns [`FrameError`] when `state` refers to members that are not in `frame`.
pub fn redistribute(frame: &Frame, state: &EnergyState, dt: f64) -> Result<EnergyState, FrameError> {
    let active: Vec<MemberId> = state.active().map(|member| member.member_id).collect();
    if active.is_empty() {
        return Ok(state.clone());
    }

    let coupling = coupling_matrix(frame, &active)?;
    let energy = DVector::from_iterator(
        active.len(),
        state.active().map(|member| member.strain_energy),
    );

    // Graph Laplacian form: dU/dt = -(D - A) U.
    let degree = DMatrix::from_diagonal(&coupling.column_sum());
    let laplacian = degree - &coupling;
    let updated = &energy - (laplacian * &energy) * dt;

    let member_states: Vec<MemberState> = state
        .member_states
        .iter()
        .map(|member| {
            let strain_energy = active
                .iter()
                .position(|id| *id == member.member_id)
                .map_or(member.strain_energy, |i| updated[i].max(0.0));
            MemberState {
                strain_energy,
                ..member.clone()
            }
        })
        .collect();

    let redistributed = EnergyState::new(state.step, member_states);
    debug!(
        step = state.step,
        dt,
        before = state.total_energy,
        after = redistributed.total_energy,
        "energy redistributed"
    );
    Ok(redistributed)
}
