//! Reports API endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use salesweb_core::{
    Currency, Dimension, Interval, RecordKind, Report, ReportFilter, ReportRequest, SalesFormat,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query string shared by all report endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub interval: Option<String>,
    pub dimension: Option<String>,
    pub currency: Option<String>,
    pub company_id: Option<String>,
    pub split_percent: Option<String>,
}

fn parse_date(field: &str, value: Option<&str>) -> ApiResult<NaiveDate> {
    let value = value.ok_or_else(|| ApiError::bad_request(format!("{} is required", field)))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("{} '{}' is not a YYYY-MM-DD date", field, value)))
}

fn parse_kind(kind: &str) -> ApiResult<RecordKind> {
    kind.parse::<RecordKind>().map_err(|_| ApiError::NotFound {
        resource: format!("report '{}'", kind),
    })
}

impl ReportQuery {
    /// Validate the query into an engine request
    pub fn into_request(self, kind: RecordKind) -> ApiResult<ReportRequest> {
        let start = parse_date("start_date", self.start_date.as_deref())?;
        let end = parse_date("end_date", self.end_date.as_deref())?;
        let mut filter = ReportFilter::new(start, end)?;

        if let Some(currency) = self.currency.filter(|c| !c.is_empty()) {
            filter = filter.with_currency(Currency::parse(&currency)?.code());
        }
        if let Some(company) = self.company_id.filter(|c| !c.is_empty()) {
            filter = filter.with_company(company);
        }

        let mut request = ReportRequest::new(kind, filter);
        if let Some(interval) = self.interval {
            request = request.with_interval(interval.parse::<Interval>().map_err(ApiError::bad_request)?);
        }
        if let Some(dimension) = self.dimension {
            request = request.with_dimension(dimension.parse::<Dimension>().map_err(ApiError::bad_request)?);
        }
        if let Some(split) = self.split_percent {
            let split = split
                .parse::<Decimal>()
                .map_err(|_| ApiError::bad_request(format!("split_percent '{}' is not a number", split)))?;
            request = request.with_split_percent(split);
        }
        Ok(request)
    }
}

/// JSON report for one record kind
pub async fn api_report(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Report>> {
    let request = query.into_request(parse_kind(&kind)?)?;
    Ok(Json(state.engine.report(&request).await?))
}

/// CSV download, one row per record
pub async fn api_report_csv(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = query.into_request(parse_kind(&kind)?)?;
    let export = state.engine.csv_export(&request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.content,
    ))
}

pub async fn api_sales_format(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<SalesFormat>> {
    let request = query.into_request(parse_kind(&kind)?)?;
    Ok(Json(state.engine.sales_format(&request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: &str, end: &str) -> ReportQuery {
        ReportQuery {
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_into_request() {
        let mut q = query("2024-01-01", "2024-03-31");
        q.interval = Some("weekly".to_string());
        q.dimension = Some("ref_code".to_string());
        q.currency = Some("usd".to_string());
        q.split_percent = Some("12.5".to_string());

        let request = q.into_request(RecordKind::Referrals).unwrap();
        assert_eq!(request.interval, Some(Interval::Weekly));
        assert_eq!(request.dimension, Some(Dimension::RefCode));
        assert_eq!(request.filter.currency.as_deref(), Some("USD"));
        assert_eq!(request.split_percent, Some(Decimal::new(125, 1)));
    }

    #[test]
    fn test_into_request_errors() {
        let missing = ReportQuery::default().into_request(RecordKind::Payments).unwrap_err();
        assert!(matches!(missing, ApiError::BadRequest { .. }));

        let inverted = query("2024-02-01", "2024-01-01").into_request(RecordKind::Payments).unwrap_err();
        assert!(matches!(inverted, ApiError::Core(_)));

        let mut bad_interval = query("2024-01-01", "2024-01-31");
        bad_interval.interval = Some("hourly".to_string());
        assert!(matches!(
            bad_interval.into_request(RecordKind::Payments),
            Err(ApiError::BadRequest { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_not_found() {
        assert!(matches!(parse_kind("invoices"), Err(ApiError::NotFound { .. })));
        assert_eq!(parse_kind("Payments").unwrap(), RecordKind::Payments);
    }
}
