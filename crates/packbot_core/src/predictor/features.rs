use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;

/// Raw `/predict` payload. Every field is optional on the wire so that a
/// missing value surfaces as a validation error instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub transportation_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingFeatures {
    pub temperature: f64,
    pub humidity: f64,
    pub transportation_time: f64,
    pub month: u32,
    /// Monday is 0.
    pub dayofweek: u32,
    pub dayofyear: u32,
    pub is_month_start: u32,
    pub is_month_end: u32,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<NaiveDate, PredictError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| PredictError::InvalidDate(raw.to_string()))
}

impl PackagingFeatures {
    pub fn from_request(req: &PredictRequest) -> Result<Self, PredictError> {
        let date = parse_date(req.date.as_deref().unwrap_or_default())?;
        Ok(Self::from_parts(
            date,
            req.temperature
                .ok_or(PredictError::MissingField("temperature"))?,
            req.humidity.ok_or(PredictError::MissingField("humidity"))?,
            req.transportation_time
                .ok_or(PredictError::MissingField("transportation_time"))?,
        ))
    }

    pub fn from_parts(
        date: NaiveDate,
        temperature: f64,
        humidity: f64,
        transportation_time: f64,
    ) -> Self {
        let is_month_end = date.succ_opt().map_or(true, |next| next.month() != date.month());
        Self {
            temperature,
            humidity,
            transportation_time,
            month: date.month(),
            dayofweek: date.weekday().num_days_from_monday(),
            dayofyear: date.ordinal(),
            is_month_start: u32::from(date.day() == 1),
            is_month_end: u32::from(is_month_end),
        }
    }

    pub fn numerical(&self) -> [f64; 4] {
        [
            self.temperature,
            self.humidity,
            self.transportation_time,
            f64::from(self.dayofyear),
        ]
    }

    pub fn categorical(&self) -> [u32; 4] {
        [
            self.month,
            self.dayofweek,
            self.is_month_start,
            self.is_month_end,
        ]
    }
}
