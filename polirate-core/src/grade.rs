//! Activity and influence grades
//!
//! Gamification labels derived from a user's points (activity) and follower
//! count (influence). Thresholds are inclusive lower bounds.

use serde::Serialize;

/// Points awarded for writing a post
pub const POINTS_POST: i64 = 10;

/// Points awarded for writing a comment
pub const POINTS_COMMENT: i64 = 2;

/// Points awarded for a first rating of a politician
pub const POINTS_RATING: i64 = 5;

const ACTIVITY_TIERS: [(i64, &str); 6] = [
    (0, "ML1"),
    (100, "ML2"),
    (500, "ML3"),
    (2_000, "ML4"),
    (5_000, "ML5"),
    (10_000, "ML6"),
];

const INFLUENCE_TIERS: [(i64, &str); 6] = [
    (0, "Wanderer"),
    (10, "Citizen"),
    (50, "Envoy"),
    (200, "Knight"),
    (500, "Baron"),
    (1_000, "Lord"),
];

/// A resolved grade with progress toward the next one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
    /// 1-based tier number
    pub level: u8,
    pub label: &'static str,
    /// Value the grade was computed from
    pub value: i64,
    /// Threshold of the next tier, `None` at the top
    pub next_threshold: Option<i64>,
    /// Fraction of the way from this tier to the next (1.0 at the top)
    pub progress: f64,
}

fn resolve(tiers: &[(i64, &'static str)], value: i64) -> Grade {
    let value = value.max(0);
    let idx = tiers
        .iter()
        .rposition(|(threshold, _)| value >= *threshold)
        .unwrap_or(0);

    let (floor, label) = tiers[idx];
    let next_threshold = tiers.get(idx + 1).map(|(t, _)| *t);
    let progress = match next_threshold {
        Some(next) => (value - floor) as f64 / (next - floor) as f64,
        None => 1.0,
    };

    Grade {
        level: idx as u8 + 1,
        label,
        value,
        next_threshold,
        progress,
    }
}

/// Activity grade (ML1–ML6) from accumulated points.
pub fn activity_grade(points: i64) -> Grade {
    resolve(&ACTIVITY_TIERS, points)
}

/// Influence grade (Wanderer → Lord) from follower count.
pub fn influence_grade(followers: i64) -> Grade {
    resolve(&INFLUENCE_TIERS, followers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_thresholds() {
        assert_eq!(activity_grade(0).label, "ML1");
        assert_eq!(activity_grade(99).label, "ML1");
        assert_eq!(activity_grade(100).label, "ML2");
        assert_eq!(activity_grade(1_999).label, "ML3");
        assert_eq!(activity_grade(2_000).label, "ML4");
        assert_eq!(activity_grade(10_000).label, "ML6");
        assert_eq!(activity_grade(1_000_000).level, 6);
    }

    #[test]
    fn influence_thresholds() {
        assert_eq!(influence_grade(0).label, "Wanderer");
        assert_eq!(influence_grade(10).label, "Citizen");
        assert_eq!(influence_grade(199).label, "Envoy");
        assert_eq!(influence_grade(500).label, "Baron");
        assert_eq!(influence_grade(1_000).label, "Lord");
    }

    #[test]
    fn negative_values_clamp() {
        let g = activity_grade(-5);
        assert_eq!(g.label, "ML1");
        assert_eq!(g.value, 0);
    }

    #[test]
    fn progress_toward_next() {
        let g = activity_grade(50);
        assert_eq!(g.next_threshold, Some(100));
        assert!((g.progress - 0.5).abs() < f64::EPSILON);

        let g = influence_grade(5_000);
        assert_eq!(g.next_threshold, None);
        assert_eq!(g.progress, 1.0);
    }
}
