#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Database connection string.
    pub database_url: String,

    // =========================
    // Planning session configuration
    // =========================
    /// Minutes a draft planning session stays valid before the expiry sweep
    /// marks it `expired`. Keeps stale drafts from pinning engineer calendars
    /// forever via the virtual-assignment overlay.
    pub session_ttl_minutes: u64,

    // =========================
    // HTTP / SSE configuration
    // =========================
    /// Interval between `event: ping` keepalives on an idle
    /// `/api/sync/stream` connection.
    pub sse_keepalive_secs: u64,

    // =========================
    // Scheduling window configuration
    // =========================
    /// Width, in days, of the `[today, due_date]` search window used for
    /// `general` work when no due date is set.
    pub general_work_window_days: i64,

    /// Travel time, in minutes, assumed between two data centers with no
    /// `DistanceEntry` on record.
    pub default_travel_fallback_minutes: u32,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://scheduler_dev.db".to_string());

        Self {
            database_url,
            session_ttl_minutes: 30,
            sse_keepalive_secs: 30,
            general_work_window_days: 30,
            default_travel_fallback_minutes: 60,
        }
    }
}
