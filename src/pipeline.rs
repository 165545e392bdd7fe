use crate::chart::ChartGenerator;
use crate::dates;
use crate::error::{AppError, Result};
use crate::fetcher::Fetcher;
use crate::models::{EnrichedForecast, EnrichedForecastDay, ForecastResponse};
use crate::theme::{self, ThemeTag};
use crate::timestamp;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

/// A submitted lookup after input normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub query: String,
    pub days: i32,
}

impl ForecastRequest {
    /// Trim the location and parse the day count.
    ///
    /// A blank location is rejected; a day count that does not parse falls
    /// back to `default_days` instead of failing the request. Any integer is
    /// passed on as-is, the provider decides which counts it accepts.
    pub fn from_form(location: &str, days: Option<&str>, default_days: i32) -> Result<Self> {
        let query = location.trim();
        if query.is_empty() {
            return Err(AppError::Validation(
                "Please enter a city name or ZIP code.".to_string(),
            ));
        }

        Ok(Self {
            query: query.to_string(),
            days: parse_days(days, default_days),
        })
    }
}

pub fn parse_days(raw: Option<&str>, default_days: i32) -> i32 {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(default_days)
}

/// Where a request ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing submitted yet
    Idle,
    Ready {
        forecast: EnrichedForecast,
        theme: ThemeTag,
    },
    Failed {
        error: String,
    },
}

/// What the presentation layer receives.
///
/// Serializes as `{query, forecast, error, days, theme, map_timestamp}`; at
/// most one of `forecast` and `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub query: String,
    pub days: i32,
    pub map_timestamp: String,
    pub outcome: Outcome,
}

impl PipelineResult {
    pub fn forecast(&self) -> Option<&EnrichedForecast> {
        match &self.outcome {
            Outcome::Ready { forecast, .. } => Some(forecast),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn theme(&self) -> Option<ThemeTag> {
        match &self.outcome {
            Outcome::Ready { theme, .. } => Some(*theme),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ResultView<'a> {
    query: &'a str,
    forecast: Option<&'a EnrichedForecast>,
    error: Option<&'a str>,
    days: i32,
    theme: Option<ThemeTag>,
    map_timestamp: &'a str,
}

impl Serialize for PipelineResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ResultView {
            query: &self.query,
            forecast: self.forecast(),
            error: self.error(),
            days: self.days,
            theme: self.theme(),
            map_timestamp: &self.map_timestamp,
        }
        .serialize(serializer)
    }
}

pub struct Pipeline {
    fetcher: Fetcher,
    charts: ChartGenerator,
    default_days: i32,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, charts: ChartGenerator, default_days: i32) -> Self {
        Self {
            fetcher,
            charts,
            default_days,
        }
    }

    /// Run one request to completion. `location` is `None` when nothing was
    /// submitted. Every failure ends up as the result's error message.
    pub async fn run(&self, location: Option<&str>, days: Option<&str>) -> PipelineResult {
        let map_timestamp = timestamp::map_timestamp();

        let Some(location) = location else {
            return PipelineResult {
                query: String::new(),
                days: self.default_days,
                map_timestamp,
                outcome: Outcome::Idle,
            };
        };

        let request = match ForecastRequest::from_form(location, days, self.default_days) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejected request: {}", e);
                return PipelineResult {
                    query: location.trim().to_string(),
                    days: parse_days(days, self.default_days),
                    map_timestamp,
                    outcome: Outcome::Failed {
                        error: e.to_string(),
                    },
                };
            }
        };

        let forecast = match self.fetcher.fetch(&request.query, request.days).await {
            Ok(forecast) => forecast,
            Err(e) => {
                info!("Forecast for '{}' unavailable: {}", request.query, e);
                return PipelineResult {
                    query: request.query,
                    days: request.days,
                    map_timestamp,
                    outcome: Outcome::Failed {
                        error: e.to_string(),
                    },
                };
            }
        };

        let (forecast, theme) = self.enrich(forecast);

        PipelineResult {
            query: request.query,
            days: request.days,
            map_timestamp: timestamp::map_timestamp(),
            outcome: Outcome::Ready { forecast, theme },
        }
    }

    /// Attach pretty dates and charts to each day, then classify the theme.
    ///
    /// A chart that fails to render only drops that day's image.
    pub fn enrich(&self, forecast: ForecastResponse) -> (EnrichedForecast, ThemeTag) {
        let location = forecast.location.name.clone();

        let enriched = forecast.map_days(|day| {
            let date_pretty = dates::prettify(&day.date);
            let chart_image = match self.charts.render(&day, &location) {
                Ok(chart) => chart,
                Err(e) => {
                    warn!("No chart for {} on {}: {}", location, day.date, e);
                    None
                }
            };

            EnrichedForecastDay {
                day,
                date_pretty: Some(date_pretty),
                chart_image,
            }
        });

        let theme = theme::classify(&enriched.current);
        debug!(
            "Enriched {} day(s) for {}, theme {}",
            enriched.forecast.forecastday.len(),
            location,
            theme
        );

        (enriched, theme)
    }
}
