//! Age bucketing used as the join key for income imputation

use serde::Serialize;

/// Ordered age ranges.
///
/// The second bucket spans 25 to 34 inclusive; there is no separate
/// 30~34 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeBucket {
    UpTo24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    From65,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 6] = [
        AgeBucket::UpTo24,
        AgeBucket::From25To34,
        AgeBucket::From35To44,
        AgeBucket::From45To54,
        AgeBucket::From55To64,
        AgeBucket::From65,
    ];

    /// Label matching the range the bucket actually covers.
    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::UpTo24 => "0~24",
            AgeBucket::From25To34 => "25~34",
            AgeBucket::From35To44 => "35~44",
            AgeBucket::From45To54 => "45~54",
            AgeBucket::From55To64 => "55~64",
            AgeBucket::From65 => "65~",
        }
    }

    /// Label used by earlier reports, where the 25-34 range was called "25~29".
    pub fn legacy_label(&self) -> &'static str {
        match self {
            AgeBucket::From25To34 => "25~29",
            other => other.label(),
        }
    }
}

impl std::fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Map an age to its bucket.
///
/// Missing and NaN ages have no bucket and return `None`. Preparation
/// imputes age before bucketing, so it never relies on this branch.
pub fn bucket_age(age: Option<f64>) -> Option<AgeBucket> {
    let age = age.filter(|a| !a.is_nan())?;

    // Closed ranges; anything outside them, including fractional ages
    // between two ranges, falls through to the oldest bucket.
    let bucket = if age < 25.0 {
        AgeBucket::UpTo24
    } else if (25.0..=34.0).contains(&age) {
        AgeBucket::From25To34
    } else if (35.0..=44.0).contains(&age) {
        AgeBucket::From35To44
    } else if (45.0..=54.0).contains(&age) {
        AgeBucket::From45To54
    } else if (55.0..=64.0).contains(&age) {
        AgeBucket::From55To64
    } else {
        AgeBucket::From65
    };

    Some(bucket)
}
