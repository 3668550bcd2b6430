//! Information-theoretic measures of the energy distribution.
//!
//! The distribution over active members is treated as a probability vector
//! `p_i = U_i / sum(U)`. High entropy means the load is shared evenly; a sharp
//! drop means energy is concentrating in a few members.

use crate::frame::MemberId;
use crate::state::{EnergyState, EntropyRecord};

/// Shannon entropy `-sum(p ln p)` in nats, skipping non-positive terms.
#[must_use]
pub fn shannon_entropy(fractions: &[f64]) -> f64 {
    -fractions
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>()
}

/// Compute the entropy record of `state` relative to the previous step's entropy.
///
/// Only members that had not failed take part. When their total energy is
/// zero the record has `S = 0`, `dS = -previous_entropy` and every active
/// member gets a zero fraction.
///
/// # Examples
/// ```
/// use collapsex::entropy::compute_entropy;
/// use collapsex::{EnergyState, MemberState};
///
/// let state = EnergyState::new(
///     0,
///     (0..4)
///         .map(|id| MemberState {
///             member_id: id,
///             strain_energy: 250.0,
///             axial_force: 0.0,
///             deformation: 0.0,
///             failed: false,
///         })
///         .collect(),
/// );
/// let record = compute_entropy(&state, 0.0);
/// assert!((record.entropy - 4.0_f64.ln()).abs() < 1e-12);
/// ```
#[must_use]
pub fn compute_entropy(state: &EnergyState, previous_entropy: f64) -> EntropyRecord {
    let total: f64 = state.active().map(|member| member.strain_energy).sum();

    if total > 0.0 {
        let energy_distribution: Vec<(MemberId, f64)> = state
            .active()
            .map(|member| (member.member_id, member.strain_energy / total))
            .collect();
        let fractions: Vec<f64> = energy_distribution.iter().map(|(_, p)| *p).collect();
        let entropy = shannon_entropy(&fractions);
        EntropyRecord {
            step: state.step,
            entropy,
            delta_entropy: entropy - previous_entropy,
            energy_distribution,
        }
    } else {
        EntropyRecord {
            step: state.step,
            entropy: 0.0,
            delta_entropy: -previous_entropy,
            energy_distribution: state.active().map(|member| (member.member_id, 0.0)).collect(),
        }
    }
}

/// Largest possible entropy with `active_members` members, `ln n`.
#[must_use]
pub fn max_entropy(active_members: usize) -> f64 {
    if active_members <= 1 {
        0.0
    } else {
        (active_members as f64).ln()
    }
}

/// Entropy scaled to `[0, 1]` by [`max_entropy`]; zero when the maximum is zero.
#[must_use]
pub fn normalized_entropy(record: &EntropyRecord, active_members: usize) -> f64 {
    let maximum = max_entropy(active_members);
    if maximum == 0.0 {
        0.0
    } else {
        (record.entropy / maximum).clamp(0.0, 1.0)
    }
}

/// Gini coefficient of the energy fractions.
///
/// `0` for a uniform distribution, approaching `1` as all energy gathers in
/// one member. Empty or all-zero distributions give `0`.
#[must_use]
pub fn gini_coefficient(record: &EntropyRecord) -> f64 {
    let mut values: Vec<f64> = record.energy_distribution.iter().map(|(_, p)| *p).collect();
    let sum: f64 = values.iter().sum();
    if values.is_empty() || sum == 0.0 {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);

    let n = values.len() as f64;
    let weighted: f64 = values
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1) as f64 * p)
        .sum();
    (2.0 * weighted / (n * sum) - (n + 1.0) / n).clamp(0.0, 1.0)
}

/// The `top_n` members with the largest share, largest first.
///
/// Members with equal shares keep their order in the record.
#[must_use]
pub fn most_localized_members(record: &EntropyRecord, top_n: usize) -> Vec<(MemberId, f64)> {
    let mut ranked = record.energy_distribution.clone();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n);
    ranked
}
