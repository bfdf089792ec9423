//! AI evaluation scores and citizen rating values

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Evaluation dimension scored by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationCategory {
    Integrity,
    Competence,
    Communication,
    LegislativeActivity,
    PublicService,
}

impl EvaluationCategory {
    pub const ALL: [Self; 5] = [
        Self::Integrity,
        Self::Competence,
        Self::Communication,
        Self::LegislativeActivity,
        Self::PublicService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integrity => "integrity",
            Self::Competence => "competence",
            Self::Communication => "communication",
            Self::LegislativeActivity => "legislative_activity",
            Self::PublicService => "public_service",
        }
    }
}

impl std::str::FromStr for EvaluationCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "category",
                value: s.to_owned(),
            })
    }
}

/// Model score in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct EvaluationScore(f64);

impl EvaluationScore {
    pub fn new(v: f64) -> Result<Self, ValidationError> {
        if !v.is_finite() || !(0.0..=100.0).contains(&v) {
            return Err(ValidationError::OutOfRange {
                field: "score",
                min: 0,
                max: 100,
            });
        }
        Ok(Self(v))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Mean of category scores rounded to one decimal, `None` when empty.
pub fn overall_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Citizen star rating in 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RatingScore(i16);

impl RatingScore {
    pub fn new(v: i64) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&v) {
            return Err(ValidationError::OutOfRange {
                field: "score",
                min: 1,
                max: 5,
            });
        }
        Ok(Self(v as i16))
    }

    pub fn value(&self) -> i16 {
        self.0
    }
}

/// Maximum length of the comment attached to a rating
pub const MAX_RATING_COMMENT_LEN: usize = 500;

/// Optional free text attached to a rating; blank becomes `None`.
pub fn rating_comment(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(text) = s.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_RATING_COMMENT_LEN {
        return Err(ValidationError::TooLong {
            field: "comment",
            max: MAX_RATING_COMMENT_LEN,
        });
    }
    Ok(Some(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names() {
        assert_eq!(
            "legislative_activity".parse::<EvaluationCategory>().unwrap(),
            EvaluationCategory::LegislativeActivity
        );
        assert!("charisma".parse::<EvaluationCategory>().is_err());
    }

    #[test]
    fn evaluation_score_bounds() {
        assert!(EvaluationScore::new(0.0).is_ok());
        assert!(EvaluationScore::new(100.0).is_ok());
        assert!(EvaluationScore::new(100.5).is_err());
        assert!(EvaluationScore::new(-1.0).is_err());
        assert!(EvaluationScore::new(f64::NAN).is_err());
    }

    #[test]
    fn overall_is_rounded_mean() {
        assert_eq!(overall_score(&[]), None);
        assert_eq!(overall_score(&[80.0, 70.0, 75.0]), Some(75.0));
        assert_eq!(overall_score(&[66.0, 67.0, 67.0]), Some(66.7));
    }

    #[test]
    fn rating_score_bounds() {
        assert_eq!(RatingScore::new(5).unwrap().value(), 5);
        assert!(RatingScore::new(0).is_err());
        assert!(RatingScore::new(6).is_err());
    }

    #[test]
    fn rating_comment_rules() {
        assert_eq!(rating_comment(None).unwrap(), None);
        assert_eq!(rating_comment(Some("   ")).unwrap(), None);
        assert_eq!(rating_comment(Some(" ok ")).unwrap().as_deref(), Some("ok"));
        assert!(rating_comment(Some(&"x".repeat(501))).is_err());
    }
}
