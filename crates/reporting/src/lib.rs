//! Dashboard analytics and reporting — aggregation, overview views,
//! lifetime-value accumulation, and CSV export.

pub mod aggregate;
pub mod export;
pub mod ltv;
pub mod overview;

pub use aggregate::{bucket_key, category_histogram, status_trend, ChurnTrend, StatusTrend};
pub use ltv::{accumulate, filter_customers, CustomerValue};
pub use overview::{enrollment_overview, renewal_overview, EnrollmentOverview, RenewalOverview};
