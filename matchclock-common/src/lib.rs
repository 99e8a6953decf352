pub mod team;

pub mod match_snapshot;

pub mod bundles;

pub mod config;

pub mod clock_display {
    use core::time::Duration;

    pub const MAX_STRINGABLE_SECS: u64 = 5999;

    /// Formats a duration as `MM:SS`, saturating at `99:59`
    pub fn mm_ss(time: Duration) -> String {
        let secs = time.as_secs().min(MAX_STRINGABLE_SECS);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

}
