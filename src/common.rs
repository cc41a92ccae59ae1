//! Small helpers shared by services and handlers

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::errors::ServiceError;

/// Deserializes a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// JSON body extractor whose rejections use the API error shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError {
                message: "Dados inválidos".to_string(),
                details: Some(rejection.body_text()),
            })?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections use the API error shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError {
                message: "Parâmetros de consulta inválidos".to_string(),
                details: Some(rejection.body_text()),
            })?;
        Ok(Self(value))
    }
}

/// Path parameter extractor whose rejections use the API error shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError {
                message: "Identificador inválido".to_string(),
                details: Some(rejection.body_text()),
            })?;
        Ok(Self(value))
    }
}

/// Parses a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::bad_request(format!("Data inválida: {}", value)))
}

/// First day of the month `offset` months before the month of `date`
pub fn month_start(date: NaiveDate, offset: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 - offset as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(date)
}

/// First day of the month after the month of `date`
pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + 1;
    NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(date)
}

const LIKE_ESCAPE: char = '\\';

/// Escapes `%`, `_` and the escape character itself so they match literally
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match on a text column
pub fn contains_ci<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Treats blank strings as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        color: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.color, None);

        let null: Patch = serde_json::from_str(r#"{"color": null}"#).unwrap();
        assert_eq!(null.color, Some(None));

        let set: Patch = serde_json::from_str(r#"{"color": "Preta"}"#).unwrap();
        assert_eq!(set.color, Some(Some("Preta".to_string())));
    }

    #[test]
    fn month_arithmetic_crosses_year_boundaries() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 17).unwrap();
        assert_eq!(month_start(date, 0), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(month_start(date, 5), NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert_eq!(
            next_month_start(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("Honda CG"), "Honda CG");
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date("2025-03-09").is_ok());
        assert!(parse_date("09/03/2025").is_err());
    }
}
