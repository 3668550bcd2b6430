use std::fmt;

use collapsex::entropy::{gini_coefficient, most_localized_members, normalized_entropy};
use collapsex::{SimulationResult, Termination};

/// Number of members listed as the most loaded.
const TOP_MEMBERS: usize = 3;

/// Text rendering of a finished run.
struct Summary<'a>(&'a SimulationResult);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        writeln!(f, "Progressive collapse of {}", result.frame_name)?;
        writeln!(f, "Steps run: {}", result.steps_run())?;

        let outcome = match result.termination {
            Termination::Collapsed => "collapse detected from the entropy history",
            Termination::AllFailed => "every member failed",
            Termination::MaxStepsReached => "step budget exhausted without collapse",
        };
        writeln!(f, "Outcome: {outcome}")?;
        match result.collapse_step {
            Some(step) => writeln!(f, "Collapse step: {step}")?,
            None => writeln!(f, "Collapse step: none")?,
        }

        if result.failed_sequence.is_empty() {
            writeln!(f, "Failure sequence: none")?;
        } else {
            let ids: Vec<String> = result.failed_sequence.iter().map(ToString::to_string).collect();
            writeln!(f, "Failure sequence: {}", ids.join(" -> "))?;
        }

        // Entropy is in nats; the normalized value is relative to ln(active members).
        writeln!(f)?;
        writeln!(f, "{:>5}  {:>10}  {:>10}  {:>6}", "step", "S", "dS", "active")?;
        for record in &result.entropy_history {
            writeln!(
                f,
                "{:>5}  {:>10.6}  {:>+10.6}  {:>6}",
                record.step,
                record.entropy,
                record.delta_entropy,
                record.active_members()
            )?;
        }

        if let Some(last) = result.final_entropy() {
            writeln!(f)?;
            writeln!(
                f,
                "Final entropy: {:.6} nats (normalized {:.3}), Gini {:.3}",
                last.entropy,
                normalized_entropy(last, last.active_members()),
                gini_coefficient(last)
            )?;
            for (member, share) in most_localized_members(last, TOP_MEMBERS) {
                writeln!(f, "  member {member:>3}: {:.1}% of the energy", share * 100.0)?;
            }
        }
        Ok(())
    }
}

/// Render a textual summary of a simulation run.
#[must_use]
pub fn render_summary(result: &SimulationResult) -> String {
    Summary(result).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use collapsex::{EnergyState, EntropyRecord};

    #[test]
    fn formats_human_readable_report() {
        let result = SimulationResult {
            frame_name: "two span".to_string(),
            energy_history: vec![EnergyState::new(0, Vec::new()), EnergyState::new(1, Vec::new())],
            entropy_history: vec![
                EntropyRecord {
                    step: 0,
                    entropy: 2.0_f64.ln(),
                    delta_entropy: 2.0_f64.ln(),
                    energy_distribution: vec![(0, 0.5), (1, 0.5)],
                },
                EntropyRecord {
                    step: 1,
                    entropy: 0.0,
                    delta_entropy: -(2.0_f64.ln()),
                    energy_distribution: vec![(1, 1.0)],
                },
            ],
            collapse_detected: true,
            collapse_step: Some(1),
            failed_sequence: vec![0],
            termination: Termination::Collapsed,
        };
        let report = render_summary(&result);
        assert!(report.contains("Progressive collapse of two span"));
        assert!(report.contains("Steps run: 2"));
        assert!(report.contains("Collapse step: 1"));
        assert!(report.contains("Failure sequence: 0"));
        assert!(report.contains("-0.693147"));
        assert!(report.contains("member   1: 100.0% of the energy"));
    }
}
