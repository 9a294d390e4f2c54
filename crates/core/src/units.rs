//! Height/weight normalisation and BMI.
//!
//! Vitals are captured as free text ("170cm", "Height: 1.70 m", "154lbs", "70"), so the
//! parsers accept labels, units and a comma decimal separator. The two heuristics below are
//! kept exactly as clinics already rely on them:
//!
//! - a unitless height above 3.0 is centimetres, otherwise metres
//! - a unitless weight is kilograms

use crate::schema::PLACEHOLDER;

/// Heights above this many metres are implausible.
pub const MAX_PLAUSIBLE_HEIGHT_METERS: f64 = 3.0;

/// Exact conversion factor from pounds to kilograms.
pub const KG_PER_POUND: f64 = 0.45359237;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UnitError {
    #[error("no numeric value in '{0}'")]
    UnparsableNumeric(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

pub type UnitResult<T> = std::result::Result<T, UnitError>;

/// Parses a free-text height into metres.
///
/// # Errors
///
/// Returns `UnitError::UnparsableNumeric` when no number can be read, and
/// `UnitError::OutOfRange` for non-positive heights or explicit metres above
/// [`MAX_PLAUSIBLE_HEIGHT_METERS`].
pub fn parse_height_meters(input: &str) -> UnitResult<f64> {
    let cleaned = strip_label(input, "height");

    let meters = if cleaned.contains("cm") {
        numeric_run(&cleaned)? / 100.0
    } else if cleaned.contains('m') {
        let value = numeric_run(&cleaned)?;
        if value > MAX_PLAUSIBLE_HEIGHT_METERS {
            return Err(UnitError::OutOfRange(format!(
                "{value} m is not a plausible height"
            )));
        }
        value
    } else {
        let value = numeric_run(&cleaned)?;
        if value > MAX_PLAUSIBLE_HEIGHT_METERS {
            value / 100.0
        } else {
            value
        }
    };

    ensure_positive(meters, "height")
}

/// Parses a free-text weight into kilograms.
///
/// # Errors
///
/// Returns `UnitError::UnparsableNumeric` when no number can be read, and
/// `UnitError::OutOfRange` for non-positive weights.
pub fn parse_weight_kg(input: &str) -> UnitResult<f64> {
    let cleaned = strip_label(input, "weight");
    let value = numeric_run(&cleaned)?;

    let kg = if cleaned.contains("lb") {
        value * KG_PER_POUND
    } else {
        value
    };

    ensure_positive(kg, "weight")
}

/// Computes a BMI string with one decimal place.
///
/// # Errors
///
/// Propagates parse failures of either input, and returns `UnitError::OutOfRange` when the
/// result is not a finite positive number.
pub fn compute_bmi(height: &str, weight: &str) -> UnitResult<String> {
    let meters = parse_height_meters(height)?;
    let kg = parse_weight_kg(weight)?;
    let bmi = kg / (meters * meters);

    if !bmi.is_finite() || bmi <= 0.0 {
        return Err(UnitError::OutOfRange(format!("bmi {bmi}")));
    }

    // Ties round away from zero (24.25 -> 24.3).
    let rounded = (bmi * 10.0).round() / 10.0;
    Ok(format!("{rounded:.1}"))
}

/// Computes BMI, or returns the trimmed `fallback` (else `"N/A"`) when it cannot.
///
/// Failures are recovered here and only logged.
pub fn compute_bmi_or_fallback(height: &str, weight: &str, fallback: &str) -> String {
    match compute_bmi(height, weight) {
        Ok(bmi) => bmi,
        Err(e) => {
            tracing::debug!(height, weight, error = %e, "bmi not computed, using fallback");
            let fallback = fallback.trim();
            if fallback.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                fallback.to_string()
            }
        }
    }
}

fn strip_label(input: &str, label: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .replace(label, "")
        .replace(':', "")
        .trim()
        .to_string()
}

/// Keeps digits, `.`, `,` and `-`, then reads the residue as a decimal with `,` as `.`.
fn numeric_run(input: &str) -> UnitResult<f64> {
    let residue: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if residue.is_empty() {
        return Err(UnitError::UnparsableNumeric(input.to_string()));
    }

    residue
        .parse::<f64>()
        .map_err(|_| UnitError::UnparsableNumeric(input.to_string()))
}

fn ensure_positive(value: f64, what: &str) -> UnitResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(UnitError::OutOfRange(format!("{what} must be positive")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_inputs() {
        assert_eq!(compute_bmi_or_fallback("170cm", "70kg", ""), "24.2");
    }

    #[test]
    fn exact_ties_round_up() {
        assert_eq!(compute_bmi_or_fallback("200cm", "97kg", ""), "24.3");
        assert_eq!(compute_bmi("2", "99").unwrap(), "24.8");
    }

    #[test]
    fn metres_and_pounds() {
        assert_eq!(compute_bmi_or_fallback("1.70m", "154lbs", ""), "24.2");
    }

    #[test]
    fn falls_back_to_trimmed_text_then_placeholder() {
        assert_eq!(compute_bmi_or_fallback("", "", "22.0"), "22.0");
        assert_eq!(compute_bmi_or_fallback("", "", "  22.0 "), "22.0");
        assert_eq!(compute_bmi_or_fallback("", "", ""), "N/A");
        assert_eq!(compute_bmi_or_fallback("tall", "heavy", "   "), "N/A");
    }

    #[test]
    fn labels_and_comma_decimals_are_accepted() {
        assert_eq!(parse_height_meters("Height: 170 cm").unwrap(), 1.7);
        assert_eq!(parse_height_meters("1,70 m").unwrap(), 1.7);
        assert_eq!(parse_weight_kg("Weight: 70 KG").unwrap(), 70.0);
    }

    #[test]
    fn unitless_height_switches_to_centimetres_above_three() {
        assert_eq!(parse_height_meters("1.8").unwrap(), 1.8);
        assert_eq!(parse_height_meters("3").unwrap(), 3.0);
        assert_eq!(parse_height_meters("180").unwrap(), 1.8);
    }

    #[test]
    fn explicit_metres_above_three_are_rejected() {
        assert!(matches!(
            parse_height_meters("170m"),
            Err(UnitError::OutOfRange(_))
        ));
        assert_eq!(compute_bmi_or_fallback("170m", "70kg", "23.1"), "23.1");
    }

    #[test]
    fn unitless_weight_is_kilograms() {
        assert_eq!(parse_weight_kg("70").unwrap(), 70.0);
        assert!((parse_weight_kg("100 lbs").unwrap() - 45.359237).abs() < 1e-9);
    }

    #[test]
    fn non_positive_or_missing_numbers_fail() {
        assert!(matches!(
            parse_weight_kg("0 kg"),
            Err(UnitError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_height_meters("cm"),
            Err(UnitError::UnparsableNumeric(_))
        ));
        assert!(matches!(
            parse_height_meters("1.7.0"),
            Err(UnitError::UnparsableNumeric(_))
        ));
    }
}
