//! Report routes - JSON reports, CSV downloads and the sales format

pub mod api;

pub use api::{api_report, api_report_csv, api_sales_format, ReportQuery};
