use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider forecast payload.
///
/// Only the parts the enrichment reads are typed; every other provider field
/// is carried through untouched in `extra`. `D` is the per-day record, so the
/// same shape describes both the raw and the enriched forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastResponse<D = ForecastDay> {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    pub forecast: Forecast<D>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type EnrichedForecast = ForecastResponse<EnrichedForecastDay>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationInfo {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurrentConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_day: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CurrentConditions {
    pub fn condition_text(&self) -> Option<&str> {
        self.condition.as_ref().and_then(|c| c.text.as_deref())
    }

    pub fn is_daytime(&self) -> bool {
        self.is_day == Some(1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast<D> {
    pub forecastday: Vec<D>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    /// ISO calendar date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<Vec<HourlyReading>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ForecastDay {
    /// Readings that carry a temperature, in provider order
    pub fn temperature_series(&self) -> Vec<(&str, f64)> {
        self.hour
            .iter()
            .flatten()
            .filter_map(|h| h.temp_f.map(|t| (h.time.as_str(), t)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyReading {
    /// `YYYY-MM-DD HH:MM`
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_f: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A provider day plus the locally derived fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedForecastDay {
    #[serde(flatten)]
    pub day: ForecastDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_pretty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<String>,
}

impl<D> ForecastResponse<D> {
    /// Rebuild the forecast with each day transformed by `f`, keeping provider order
    pub fn map_days<E, F>(self, f: F) -> ForecastResponse<E>
    where
        F: FnMut(D) -> E,
    {
        ForecastResponse {
            location: self.location,
            current: self.current,
            forecast: Forecast {
                forecastday: self.forecast.forecastday.into_iter().map(f).collect(),
                extra: self.forecast.extra,
            },
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "location": {"name": "Seattle", "region": "Washington"},
            "current": {"temp_f": 55.0, "is_day": 1, "condition": {"text": "Partly cloudy", "code": 1003}},
            "forecast": {"forecastday": [
                {
                    "date": "2024-03-09",
                    "day": {"maxtemp_f": 58.1},
                    "hour": [
                        {"time": "2024-03-09 00:00", "temp_f": 47.3, "humidity": 80},
                        {"time": "2024-03-09 01:00"},
                        {"time": "2024-03-09 02:00", "temp_f": 46.0}
                    ]
                }
            ]}
        })
    }

    #[test]
    fn test_parses_typed_fields() {
        let parsed: ForecastResponse = serde_json::from_value(sample()).unwrap();
        assert_eq!(parsed.location.name, "Seattle");
        assert_eq!(parsed.current.condition_text(), Some("Partly cloudy"));
        assert!(parsed.current.is_daytime());
        assert_eq!(parsed.forecast.forecastday.len(), 1);

        let day = &parsed.forecast.forecastday[0];
        assert_eq!(day.date, "2024-03-09");
        assert_eq!(day.hour.as_ref().map(Vec::len), Some(3));
        assert_eq!(day.hour.as_ref().unwrap()[1].temp_f, None);
    }

    #[test]
    fn test_temperature_series_skips_missing_readings() {
        let parsed: ForecastResponse = serde_json::from_value(sample()).unwrap();
        let series = parsed.forecast.forecastday[0].temperature_series();
        assert_eq!(
            series,
            vec![("2024-03-09 00:00", 47.3), ("2024-03-09 02:00", 46.0)]
        );
    }

    #[test]
    fn test_provider_fields_survive_enrichment() {
        let parsed: ForecastResponse = serde_json::from_value(sample()).unwrap();
        let enriched: EnrichedForecast = parsed.map_days(|day| EnrichedForecastDay {
            day,
            date_pretty: Some("March 9, 2024".to_string()),
            chart_image: None,
        });

        let out = serde_json::to_value(&enriched).unwrap();
        assert_eq!(out["location"]["region"], "Washington");
        assert_eq!(out["current"]["condition"]["code"], 1003);
        assert_eq!(out["forecast"]["forecastday"][0]["day"]["maxtemp_f"], 58.1);
        assert_eq!(out["forecast"]["forecastday"][0]["hour"][0]["humidity"], 80);
        assert_eq!(out["forecast"]["forecastday"][0]["date_pretty"], "March 9, 2024");
        assert!(out["forecast"]["forecastday"][0].get("chart_image").is_none());
    }

    #[test]
    fn test_missing_location_is_rejected() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("location");
        assert!(serde_json::from_value::<ForecastResponse>(value).is_err());
    }
}
