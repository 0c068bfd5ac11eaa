use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A patient's score for one appointment: 1.0 to 5.0 in half-point steps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("rating must be between 1.0 and 5.0 in steps of 0.5, got {0}")]
pub struct RatingError(pub f64);

impl Rating {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 5.0;
    pub const STEP: f64 = 0.5;

    pub fn new(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() || value < Self::MIN || value > Self::MAX {
            return Err(RatingError(value));
        }
        let halves = value / Self::STEP;
        if halves.fract() != 0.0 {
            return Err(RatingError(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Allowed ratings, best first.
    pub fn choices() -> Vec<Rating> {
        let steps = ((Self::MAX - Self::MIN) / Self::STEP) as u32;
        (0..=steps)
            .map(|i| Rating(Self::MAX - f64::from(i) * Self::STEP))
            .collect()
    }
}

impl TryFrom<f64> for Rating {
    type Error = RatingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Mean of the given ratings, rounded to two decimals (the precision of
/// `doctor.avg_rating`). `None` when there are no ratings.
pub fn average_rating<I>(ratings: I) -> Option<f64>
where
    I: IntoIterator<Item = Rating>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), r| (sum + r.value(), count + 1));

    if count == 0 {
        return None;
    }

    Some(round_average(sum / f64::from(count)))
}

pub fn round_average(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_half_steps_in_range() {
        for value in [1.0, 1.5, 3.0, 4.5, 5.0] {
            assert!(Rating::new(value).is_ok(), "{} should be accepted", value);
        }
    }

    #[test]
    fn rejects_out_of_range_and_off_step_values() {
        for value in [0.0, 0.5, 5.5, 3.3, -1.0, f64::NAN, f64::INFINITY] {
            assert!(Rating::new(value).is_err(), "{} should be rejected", value);
        }
    }

    #[test]
    fn choices_run_from_five_down_to_one() {
        let choices: Vec<f64> = Rating::choices().into_iter().map(f64::from).collect();
        assert_eq!(choices, vec![5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0, 1.5, 1.0]);
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average_rating(Vec::new()), None);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let ratings = [5.0, 4.0, 4.0].map(|v| Rating::new(v).unwrap());
        assert_eq!(average_rating(ratings), Some(4.33));

        let ratings = [5.0, 4.0].map(|v| Rating::new(v).unwrap());
        assert_eq!(average_rating(ratings), Some(4.5));
    }

    #[test]
    fn deserializes_only_valid_values() {
        let ok: Rating = serde_json::from_str("4.5").unwrap();
        assert_eq!(ok.value(), 4.5);
        assert!(serde_json::from_str::<Rating>("4.2").is_err());
        assert_eq!(ok.to_string(), "4.5");
    }
}
