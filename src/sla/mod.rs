//! SLA computation.
//!
//! - `calculator`: (priority, severity, now) → target date
//! - `compliance`: risk scan and compliance stats over a batch of issues
//! - `report`: fetch the batch through an executor, then aggregate

pub mod calculator;
pub mod compliance;
pub mod report;

pub use calculator::{SlaTarget, calculate_target, target_hours};
pub use compliance::{ComplianceBucket, RiskEntry, SlaStats, check_risk, compute_stats};
pub use report::{RiskReport, RiskRequest, StatsReport, StatsRequest, risk_report, stats_report};
