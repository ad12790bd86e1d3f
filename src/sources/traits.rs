use std::time::Duration;

use crate::errors::PlannerResult;

/// One periodically refreshed dashboard section. The scheduler owns a
/// thread per source; `refresh` performs a full fetch-then-patch cycle
/// and reports failure instead of panicking.
#[cfg_attr(test, mockall::automock)]
pub trait DashboardSource: Send {
    /// Name used in scheduler log lines.
    fn name(&self) -> &'static str;

    /// Log stream receiving this source's per-cycle diagnostics.
    fn log_stream(&self) -> &'static str;

    /// Wait between refresh cycles.
    fn interval(&self) -> Duration;

    /// One fetch-then-patch cycle.
    fn refresh(&self) -> PlannerResult<()>;
}
