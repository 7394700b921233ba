use crate::error::{EtlError, Result};
use crate::models::{Document, RawTable, StationMetadata};
use crate::readers::StationRegistry;
use crate::utils::constants::RAW_ID_FIELD;
use crate::utils::timestamps::{format_timestamp, parse_timestamp};
use crate::utils::units::{fahrenheit_to_celsius, strip_unit_suffix};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

const TIME_FORMATS: [&str; 4] = ["%I:%M %p", "%I:%M:%S %p", "%H:%M:%S", "%H:%M"];

/// Numeric columns of a weather-underground style export and their output field.
/// Temperatures are converted to Celsius, everything else keeps its unit.
const MEASUREMENTS: [(&str, &str, bool); 10] = [
    ("Temperature", "temperature", true),
    ("Dew Point", "dew_point", true),
    ("Humidity", "humidity", false),
    ("Speed", "wind_speed_mph", false),
    ("Gust", "wind_gust_mph", false),
    ("Pressure", "pressure_inhg", false),
    ("Precip. Rate.", "precip_rate_in", false),
    ("Precip. Accum.", "precip_accum_in", false),
    ("UV", "uv", false),
    ("Solar", "solar_wm2", false),
];

const REQUIRED_COLUMNS: [&str; 4] = ["Time", "Temperature", "Dew Point", "Humidity"];

/// Converts the older spreadsheet layout (unit-suffixed text cells, Fahrenheit)
/// into nested documents keyed by `_raw_id`.
pub struct LegacyConverter<'a> {
    registry: &'a StationRegistry,
}

impl<'a> LegacyConverter<'a> {
    pub fn new(registry: &'a StationRegistry) -> Self {
        Self { registry }
    }

    /// Convert a parsed spreadsheet; the station is inferred from `file_name`.
    pub fn convert(&self, table: &RawTable, file_name: &str) -> Result<Vec<Document>> {
        let station = self.registry.find_in_file_name(file_name)?;
        info!(
            file_name,
            station = %station.station_id,
            rows = table.len(),
            "Converting legacy spreadsheet"
        );

        for column in REQUIRED_COLUMNS {
            if table.column_index(column).is_none() {
                return Err(EtlError::InvalidFormat(format!(
                    "Legacy spreadsheet {} has no '{}' column",
                    file_name, column
                )));
            }
        }

        let mut documents = Vec::with_capacity(table.len());
        for row in &table.rows {
            if row.iter().all(Value::is_null) {
                continue;
            }
            documents.push(self.convert_row(table, row, station)?);
        }

        debug!(documents = documents.len(), "Legacy conversion finished");
        Ok(documents)
    }

    fn convert_row(
        &self,
        table: &RawTable,
        row: &[Value],
        station: &StationMetadata,
    ) -> Result<Document> {
        let cell = |name: &str| table.column_index(name).map(|idx| &row[idx]);

        let timestamp = format_timestamp(&row_timestamp(cell("Date"), cell("Time"))?);

        let mut weather = serde_json::Map::new();
        weather.insert("timestamp".to_string(), Value::from(timestamp.clone()));
        if let Some(direction) = cell("Wind") {
            weather.insert("wind_direction".to_string(), direction.clone());
        }
        for (column, field, is_fahrenheit) in MEASUREMENTS {
            let Some(value) = cell(column) else {
                continue;
            };
            let parsed = match measurement(column, value)? {
                Some(v) if is_fahrenheit => round(fahrenheit_to_celsius(v)),
                Some(v) => v,
                None => {
                    weather.insert(field.to_string(), Value::Null);
                    continue;
                }
            };
            weather.insert(field.to_string(), json!(parsed));
        }

        let mut document = Document::new();
        for (name, value) in station.metadata_columns() {
            document.insert(name.to_string(), value);
        }
        document.insert(
            RAW_ID_FIELD.to_string(),
            Value::from(format!("{}:{}", station.station_id, timestamp)),
        );
        document.insert("location".to_string(), station.location());
        document.insert("weather_data".to_string(), Value::Object(weather));

        Ok(document)
    }
}

/// Numeric value of a measurement cell; `None` for an empty cell.
fn measurement(column: &str, value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => strip_unit_suffix(column, s).map(Some),
        other => Err(EtlError::Parse {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

fn row_timestamp(date: Option<&Value>, time: Option<&Value>) -> Result<DateTime<Utc>> {
    let time = time.unwrap_or(&Value::Null);
    let parse_error = || EtlError::Parse {
        column: "Time".to_string(),
        value: match time {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };

    let Some(date) = date else {
        return parse_timestamp(time).ok_or_else(parse_error);
    };

    let day = parse_timestamp(date)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| EtlError::Parse {
            column: "Date".to_string(),
            value: date.to_string(),
        })?;
    let clock = time_of_day(time).ok_or_else(parse_error)?;

    Ok(Utc.from_utc_datetime(&day.and_time(clock)))
}

fn time_of_day(value: &Value) -> Option<NaiveTime> {
    if let Value::String(s) = value {
        let trimmed = s.trim();
        if let Some(t) = TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        {
            return Some(t);
        }
    }
    parse_timestamp(value).map(|dt| dt.time())
}

fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn legacy_table(rows: Vec<Vec<Value>>) -> RawTable {
        let mut table = RawTable::new(
            [
                "Date",
                "Time",
                "Temperature",
                "Dew Point",
                "Humidity",
                "Wind",
                "Speed",
                "Gust",
                "Pressure",
                "Solar",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        for row in rows {
            table.push_row(row);
        }
        table
    }

    fn sample_row(time: &str, temperature: &str) -> Vec<Value> {
        vec![
            json!("2024-10-01"),
            json!(time),
            json!(temperature),
            json!("50.0 °F"),
            json!("87 %"),
            json!("WSW"),
            json!("3.1 mph"),
            json!("5.0 mph"),
            json!("29.94 in"),
            json!("0.00 w/m²"),
        ]
    }

    #[test]
    fn test_convert_rows() {
        let registry = StationRegistry::builtin();
        let converter = LegacyConverter::new(&registry);
        let table = legacy_table(vec![
            sample_row("12:04 AM", "32.0 °F"),
            vec![Value::Null; 10],
            sample_row("1:09 PM", "212 °F"),
        ]);

        let docs = converter.convert(&table, "Ichtegem_2024-10.xlsx").unwrap();
        assert_eq!(docs.len(), 2);

        let first = &docs[0];
        assert_eq!(first["StationID"], json!("IICHTE19"));
        assert_eq!(first["_raw_id"], json!("IICHTE19:2024-10-01T00:04:00.000Z"));
        assert_eq!(first["location"]["city"], json!("Ichtegem"));
        assert_eq!(first["weather_data"]["temperature"], json!(0.0));
        assert_eq!(first["weather_data"]["dew_point"], json!(10.0));
        assert_eq!(first["weather_data"]["humidity"], json!(87.0));
        assert_eq!(first["weather_data"]["wind_direction"], json!("WSW"));
        assert_eq!(first["weather_data"]["pressure_inhg"], json!(29.94));

        assert_eq!(docs[1]["weather_data"]["temperature"], json!(100.0));
        assert_eq!(
            docs[1]["weather_data"]["timestamp"],
            json!("2024-10-01T13:09:00.000Z")
        );
    }

    #[test]
    fn test_unknown_station_fails_hard() {
        let registry = StationRegistry::builtin();
        let converter = LegacyConverter::new(&registry);
        let table = legacy_table(vec![sample_row("12:04 AM", "32.0 °F")]);

        let err = converter.convert(&table, "Brussels.xlsx").unwrap_err();
        assert!(matches!(err, EtlError::UnknownStation(_)));
    }

    #[test]
    fn test_bad_suffix_is_parse_error() {
        let registry = StationRegistry::builtin();
        let converter = LegacyConverter::new(&registry);
        let table = legacy_table(vec![sample_row("12:04 AM", "warm °F")]);

        let err = converter.convert(&table, "Ichtegem.xlsx").unwrap_err();
        match err {
            EtlError::Parse { column, .. } => assert_eq!(column, "Temperature"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_column() {
        let registry = StationRegistry::builtin();
        let converter = LegacyConverter::new(&registry);
        let table = RawTable::new(vec!["Time".to_string()]);

        assert!(matches!(
            converter.convert(&table, "Ichtegem.xlsx"),
            Err(EtlError::InvalidFormat(_))
        ));
    }
}
