use crate::error::{EtlError, Result};

/// Unit suffixes found in weather-underground style spreadsheet cells
const UNIT_SUFFIXES: [&str; 7] = [" °F", "°F", " %", " mph", " in", " w/m²", " W/m²"];

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Strip a known unit suffix and parse the remaining number.
///
/// `column` is only used to build the error.
pub fn strip_unit_suffix(column: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let number = UNIT_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed)
        .trim();

    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EtlError::Parse {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
        assert!((fahrenheit_to_celsius(-40.0) - -40.0).abs() < 1e-9);
    }

    #[test]
    fn test_strip_unit_suffix() {
        assert_eq!(strip_unit_suffix("Temperature", "53.2 °F").unwrap(), 53.2);
        assert_eq!(strip_unit_suffix("Humidity", "87 %").unwrap(), 87.0);
        assert_eq!(strip_unit_suffix("Speed", "3.1 mph").unwrap(), 3.1);
        assert_eq!(strip_unit_suffix("Pressure", "29.94 in").unwrap(), 29.94);
        assert_eq!(strip_unit_suffix("Solar", "112.5 w/m²").unwrap(), 112.5);
        assert_eq!(strip_unit_suffix("UV", "2").unwrap(), 2.0);
    }

    #[test]
    fn test_strip_unit_suffix_rejects_garbage() {
        let err = strip_unit_suffix("Speed", "calm mph").unwrap_err();
        match err {
            EtlError::Parse { column, value } => {
                assert_eq!(column, "Speed");
                assert_eq!(value, "calm mph");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
