use crate::constants::{thresholds, units};
use crate::entities::{ConcentrationFeedback, FeedbackType};

/// Assess the single-spin PRP concentration against the therapeutic window
pub fn concentration_feedback(final_prp_concentration_per_ul: f64, double_spin_enabled: bool) -> ConcentrationFeedback {
    let millions = final_prp_concentration_per_ul / units::MILLION;
    let lead = format!("Your initial PRP has a concentration of {:.2}M platelets/µL.", millions);

    if final_prp_concentration_per_ul < thresholds::OPTIMAL_MIN_PLATELETS_PER_UL {
        let advice = if double_spin_enabled {
            "A double-spin protocol is required to reach the therapeutic concentration."
        } else {
            "Consider a higher concentration or alternative treatment."
        };
        ConcentrationFeedback {
            feedback_type: FeedbackType::Warning,
            message: format!("{} This is below the therapeutic window. {}", lead, advice),
        }
    } else if final_prp_concentration_per_ul > thresholds::OPTIMAL_MAX_PLATELETS_PER_UL {
        ConcentrationFeedback {
            feedback_type: FeedbackType::Info,
            message: format!(
                "{} This is above the optimal window. The treatment plan adds the required PPP to dilute the final mixture to the target {:.1}M/µL concentration.",
                lead,
                thresholds::OPTIMAL_MAX_PLATELETS_PER_UL / units::MILLION
            ),
        }
    } else {
        ConcentrationFeedback {
            feedback_type: FeedbackType::Success,
            message: format!("{} This is within the optimal therapeutic window. Excellent!", lead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_below_window() {
        let feedback = concentration_feedback(400_000.0, true);
        assert_eq!(feedback.feedback_type, FeedbackType::Warning);
        assert!(feedback.message.contains("0.40M"));
        assert!(feedback.message.contains("double-spin"));
    }

    #[test]
    fn test_feedback_below_window_without_double_spin() {
        let feedback = concentration_feedback(400_000.0, false);
        assert_eq!(feedback.feedback_type, FeedbackType::Warning);
        assert!(feedback.message.contains("alternative treatment"));
    }

    #[test]
    fn test_feedback_above_window() {
        let feedback = concentration_feedback(3_500_000.0, true);
        assert_eq!(feedback.feedback_type, FeedbackType::Info);
        assert!(feedback.message.contains("3.50M"));
        assert!(feedback.message.contains("1.5M/µL"));
    }

    #[test]
    fn test_feedback_within_window() {
        let feedback = concentration_feedback(1_400_000.0, true);
        assert_eq!(feedback.feedback_type, FeedbackType::Success);
        assert!(feedback.message.contains("1.40M"));
    }

    #[test]
    fn test_feedback_window_edges_are_optimal() {
        assert_eq!(concentration_feedback(1_000_000.0, true).feedback_type, FeedbackType::Success);
        assert_eq!(concentration_feedback(1_500_000.0, true).feedback_type, FeedbackType::Success);
    }
}
