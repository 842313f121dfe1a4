//! Factor classification: raw measurement → ordinal grade.
//!
//! Every classifier is a pure, total function with fixed thresholds. The
//! boundaries are deliberately uneven in places (slope at exactly 15 %,
//! population at 50/51) and are kept as they are.

use crate::error::MeasurementError;
use crate::factors::{Factor, FactorSet, Grade};

/// Land cover code of the bare-area class.
pub const BARE_AREA_CODE: i64 = 200;

/// Aspect value reported for flat cells.
pub const FLAT_ASPECT: f64 = -1.0;

/// Land cover: bare area grades 1, every other class grades 3.
pub fn landcover_grade(code: i64) -> Grade {
    if code == BARE_AREA_CODE {
        Grade::ONE
    } else {
        Grade::THREE
    }
}

/// Aspect in degrees clockwise from north; negative values mark flat cells.
///
/// | range            | grade |
/// |------------------|-------|
/// | < 0              | 0     |
/// | [0, 22.5)        | 3     |
/// | [22.5, 67.5)     | 2     |
/// | [67.5, 112.5)    | 1     |
/// | [112.5, 292.5)   | 0     |
/// | [292.5, 337.5)   | 2     |
/// | otherwise        | 3     |
///
/// The north arm only tests `== 0`; (0, 22.5) is caught by the final arm and
/// lands on the same grade. Left as is pending a decision on whether the
/// north band was meant to be `[0, 22.5)`.
pub fn aspect_grade(degrees: f64) -> Grade {
    if degrees < 0.0 {
        Grade::ZERO
    } else if degrees == 0.0 {
        Grade::THREE
    } else if (22.5..67.5).contains(&degrees) {
        Grade::TWO
    } else if (67.5..112.5).contains(&degrees) {
        Grade::ONE
    } else if (112.5..292.5).contains(&degrees) {
        // SE, S, SW and W all grade 0.
        Grade::ZERO
    } else if (292.5..337.5).contains(&degrees) {
        Grade::TWO
    } else {
        Grade::THREE
    }
}

/// Shared 0 / 1 / 2 / 3+ mapping for proximity counts.
fn count_grade(count: u64) -> Grade {
    match count {
        0 => Grade::ZERO,
        1 => Grade::ONE,
        2 => Grade::TWO,
        _ => Grade::THREE,
    }
}

pub fn infrastructure_grade(count: u64) -> Grade {
    count_grade(count)
}

pub fn keyfeatures_grade(count: u64) -> Grade {
    count_grade(count)
}

pub fn accidents_grade(count: u64) -> Grade {
    count_grade(count)
}

pub fn poi_grade(count: u64) -> Grade {
    count_grade(count)
}

pub fn rivers_grade(count: u64) -> Grade {
    count_grade(count)
}

/// Slope in percent. Exactly 0 grades 0, steeper than 15 grades 1,
/// strictly between 10 and 15 grades 2, everything else (including 15 and
/// the (0, 10] band) grades 3.
pub fn slope_grade(percent: f64) -> Grade {
    if percent == 0.0 {
        Grade::ZERO
    } else if percent > 15.0 {
        Grade::ONE
    } else if percent > 10.0 && percent < 15.0 {
        Grade::TWO
    } else {
        Grade::THREE
    }
}

/// Population points within the buffer: 0 → 0, 1..=50 → 1, 51..=100 → 2,
/// more → 3.
pub fn population_grade(count: u64) -> Grade {
    match count {
        0 => Grade::ZERO,
        1..=50 => Grade::ONE,
        51..=100 => Grade::TWO,
        _ => Grade::THREE,
    }
}

/// Grade one raw value according to its factor.
///
/// Count factors require a non-negative whole number; land cover requires a
/// whole number. Anything else is reported rather than coerced.
pub fn classify(factor: Factor, raw: f64) -> Result<Grade, MeasurementError> {
    let invalid = || MeasurementError::InvalidValue {
        field: factor.field().to_string(),
        value: raw.to_string(),
    };
    if !raw.is_finite() {
        return Err(invalid());
    }
    let as_count = || {
        if raw >= 0.0 && raw.fract() == 0.0 {
            Ok(raw as u64)
        } else {
            Err(invalid())
        }
    };

    let grade = match factor {
        Factor::LandCover => {
            if raw.fract() != 0.0 {
                return Err(invalid());
            }
            landcover_grade(raw as i64)
        }
        Factor::Aspect => aspect_grade(raw),
        Factor::Infrastructure => infrastructure_grade(as_count()?),
        Factor::KeyFeatures => keyfeatures_grade(as_count()?),
        Factor::Accidents => accidents_grade(as_count()?),
        Factor::Poi => poi_grade(as_count()?),
        Factor::Rivers => rivers_grade(as_count()?),
        Factor::Slope => slope_grade(raw),
        Factor::Population => population_grade(as_count()?),
    };
    Ok(grade)
}

/// Grade all nine values. Fails on the first unusable value so that a
/// feature is either fully graded or not graded at all.
pub fn classify_all(values: &FactorSet<f64>) -> Result<FactorSet<Grade>, MeasurementError> {
    let mut grades = FactorSet::<Grade>::default();
    for (factor, &raw) in values.iter() {
        grades[factor] = classify(factor, raw)?;
    }
    Ok(grades)
}
