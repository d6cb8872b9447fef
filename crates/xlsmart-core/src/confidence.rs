//! Mapping-confidence normalization and the manual-review business rule.
//!
//! The "confidence < 80 ⇒ manual review" rule used to be duplicated across
//! several functions; it lives here and only here.

use crate::models::MappingStatus;

/// Confidence threshold (0–100 scale) below which a mapping requires
/// manual review.
pub const MANUAL_REVIEW_THRESHOLD: f32 = 80.0;

/// Normalize a confidence value onto the 0–100 scale.
///
/// LLM responses report confidence inconsistently: sometimes as a fraction
/// (0.92), sometimes as a percentage (92). Values at or below 1.0 are
/// treated as fractions and scaled; everything is clamped into [0, 100].
/// Non-finite input normalizes to 0.
pub fn normalize_confidence(raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw.abs() <= 1.0 { raw * 100.0 } else { raw };
    scaled.clamp(0.0, 100.0)
}

/// Whether a (normalized) confidence requires manual review.
pub fn requires_manual_review(confidence: f32) -> bool {
    confidence < MANUAL_REVIEW_THRESHOLD
}

/// Derive the initial mapping status from a normalized confidence.
pub fn initial_mapping_status(confidence: f32) -> MappingStatus {
    if requires_manual_review(confidence) {
        MappingStatus::ManualReview
    } else {
        MappingStatus::AutoMapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_are_scaled() {
        assert_eq!(normalize_confidence(0.92), 92.0);
        assert_eq!(normalize_confidence(0.5), 50.0);
        assert_eq!(normalize_confidence(1.0), 100.0);
        assert_eq!(normalize_confidence(0.0), 0.0);
    }

    #[test]
    fn percentages_pass_through() {
        assert_eq!(normalize_confidence(92.0), 92.0);
        assert_eq!(normalize_confidence(80.0), 80.0);
        assert_eq!(normalize_confidence(1.5), 1.5);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(normalize_confidence(150.0), 100.0);
        assert_eq!(normalize_confidence(-5.0), 0.0);
        assert_eq!(normalize_confidence(-0.5), 0.0);
    }

    #[test]
    fn non_finite_normalizes_to_zero() {
        assert_eq!(normalize_confidence(f32::NAN), 0.0);
        assert_eq!(normalize_confidence(f32::INFINITY), 0.0);
        assert_eq!(normalize_confidence(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn threshold_boundary() {
        assert!(requires_manual_review(79.999));
        assert!(!requires_manual_review(80.0));
        assert!(!requires_manual_review(100.0));
        assert!(requires_manual_review(0.0));
    }

    #[test]
    fn initial_status_follows_threshold() {
        assert_eq!(initial_mapping_status(92.0), MappingStatus::AutoMapped);
        assert_eq!(initial_mapping_status(80.0), MappingStatus::AutoMapped);
        assert_eq!(initial_mapping_status(79.0), MappingStatus::ManualReview);
    }

    #[test]
    fn normalize_then_threshold_on_fractional_input() {
        // 0.85 as reported by the LLM means 85%, above the threshold
        let c = normalize_confidence(0.85);
        assert!(!requires_manual_review(c));
        // 0.6 means 60%, below
        let c = normalize_confidence(0.6);
        assert!(requires_manual_review(c));
    }
}
