//! Member capacity check.
//!
//! A member fails when its combined extreme-fibre stress reaches the yield
//! stress of its grade:
//!
//! ```text
//! sigma = |N| / A + M_max * c / I,   c = sqrt(I / A)
//! ```
//!
//! where `M_max` is the larger end moment. Pure axial and pure bending
//! failure are the special cases with `M_max = 0` and `N = 0`.

use tracing::info;

use crate::equilibrium::{Equilibrium, MemberResponse};
use crate::errors::FrameError;
use crate::frame::{Frame, Material, MemberId};

/// Stress components at the most stressed fibre of a member.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StressCheck {
    /// `|N| / A` in pascals.
    pub axial: f64,
    /// `M_max * c / I` in pascals.
    pub bending: f64,
    /// Yield stress of the member's grade.
    pub capacity: f64,
}

impl StressCheck {
    /// Evaluate the criterion for one response.
    #[must_use]
    pub fn new(response: &MemberResponse, material: &Material) -> Self {
        Self {
            axial: response.axial_force().abs() / material.area,
            bending: response.max_end_moment() * material.extreme_fibre()
                / material.moment_of_inertia,
            capacity: material.yield_stress,
        }
    }

    /// Combined axial and bending stress.
    #[must_use]
    pub fn combined(&self) -> f64 {
        self.axial + self.bending
    }

    /// Ratio of demand to capacity.
    #[must_use]
    pub fn utilisation(&self) -> f64 {
        self.combined() / self.capacity
    }

    /// Whether the member fails.
    #[must_use]
    pub fn fails(&self) -> bool {
        self.combined() >= self.capacity
    }
}

/// Check every member that was active during `equilibrium` and mark failures.
///
/// Returns the ids that failed in this call, in ascending order. Members that
/// had already failed are never revisited.
///
/// # Errors
///
/// Returns [`FrameError`] when a response refers to an unknown member.
pub fn evaluate_failures(
    frame: &mut Frame,
    equilibrium: &Equilibrium,
) -> Result<Vec<MemberId>, FrameError> {
    let mut newly_failed = Vec::new();
    for response in &equilibrium.responses {
        if frame.member(response.member)?.is_failed() {
            continue;
        }
        let check = StressCheck::new(response, frame.member_material(response.member)?);
        if check.fails() {
            info!(
                member = response.member,
                step = equilibrium.energy.step,
                stress = check.combined(),
                capacity = check.capacity,
                "member failed"
            );
            newly_failed.push(response.member);
        }
    }
    newly_failed.sort_unstable();
    for id in &newly_failed {
        frame.mark_failed(*id)?;
    }
    Ok(newly_failed)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::equilibrium::solve;
    use crate::geometry::{point, Dof};
    use crate::stiffness::ElementVector;

    fn response(axial: f64, start_moment: f64, end_moment: f64) -> MemberResponse {
        let mut forces = ElementVector::zeros();
        forces[0] = -axial;
        forces[6] = axial;
        forces[5] = start_moment;
        forces[11] = end_moment;
        MemberResponse {
            member: 0,
            displacements: ElementVector::zeros(),
            forces,
        }
    }

    #[test]
    fn combined_stress_adds_axial_and_bending() {
        let material = Material::s275();
        let check = StressCheck::new(&response(-10_000.0, 500.0, -2_000.0), &material);
        assert_relative_eq!(check.axial, 10_000.0 / 0.01);
        assert_relative_eq!(check.bending, 2_000.0 * 0.1 / 1.0e-4, max_relative = 1.0e-12);
        assert_relative_eq!(check.combined(), 1.0e6 + 2.0e6, max_relative = 1.0e-12);
        assert!(!check.fails());
    }

    #[test]
    fn criterion_triggers_at_capacity() {
        let material = Material::s275().with_yield_stress(1.0e6);
        assert!(StressCheck::new(&response(20_000.0, 0.0, 0.0), &material).fails());
        assert!(!StressCheck::new(&response(5_000.0, 0.0, 0.0), &material).fails());
        assert!(!StressCheck::new(&response(0.0, 0.0, 500.0), &material).fails());
        assert!(StressCheck::new(&response(0.0, 0.0, -2_000.0), &material).fails());
        assert!(StressCheck::new(&response(-6_000.0, 500.0, 0.0), &material).fails());
    }

    fn two_span(weak_member: Option<MemberId>) -> Frame {
        let mut frame = Frame::new("two span");
        let steel = frame.add_material(Material::s275()).expect("grade");
        frame.add_node(0, point(0.0, 0.0, 0.0)).expect("node");
        frame.add_node(1, point(5.0, 0.0, 0.0)).expect("node");
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

    #[test]
    fn weak_member_fails_and_is_marked() {
        let mut frame = two_span(Some(0));
        let equilibrium = solve(&frame, 0, 1.0).expect("solve");
        let failed = evaluate_failures(&mut frame, &equilibrium).expect("evaluation");
        assert_eq!(failed, vec![0]);
        assert!(frame.member(0).expect("member").is_failed());
        assert!(!frame.member(1).expect("member").is_failed());
    }

    #[test]
    fn strong_frame_does_not_fail() {
        let mut frame = two_span(None);
        let equilibrium = solve(&frame, 0, 1.0).expect("solve");
        let failed = evaluate_failures(&mut frame, &equilibrium).expect("evaluation");
        assert!(failed.is_empty());
    }

    #[test]
    fn newly_failed_ids_are_sorted() {
        let mut frame = two_span(None);
        let grade = frame.member(0).expect("member").material();
        frame
            .update_material(grade, Material::s275().with_yield_stress(1.0))
            .expect("update");
        let equilibrium = solve(&frame, 0, 1.0).expect("solve");
        let failed = evaluate_failures(&mut frame, &equilibrium).expect("evaluation");
        assert_eq!(failed, vec![0, 1]);
        assert!(frame.all_failed());

        // A second pass with the stale responses reports nothing new.
        let again = evaluate_failures(&mut frame, &equilibrium).expect("evaluation");
        assert!(again.is_empty());
    }
}
