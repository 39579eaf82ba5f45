use std::time::Instant;

use tracing::warn;

/// Wall-clock plus CPU-time measurement for request windows.
///
/// The CPU reading comes from the process-wide CPU clock, so overlapping
/// CPU-heavy requests can attribute more CPU than wall time to a single
/// window on multi-core hosts. `CPUTimeMs` is informational, not a bound.
#[derive(Debug)]
pub struct TimingSource {
    cpu_supported: bool,
}

/// One open measurement window. Handles are independent values — concurrent
/// windows share nothing but the read-only process CPU counter.
#[derive(Debug, Clone, Copy)]
pub struct TimingHandle {
    started: Instant,
    cpu_start_ns: Option<u64>,
}

impl TimingSource {
    /// Probes the CPU clock once. If it is unavailable, every window falls
    /// back to reporting wall time for both fields and a single warning is
    /// logged here — never per request, never mid-request.
    pub fn new() -> Self {
        let cpu_supported = cpu_clock_ns().is_some();
        if !cpu_supported {
            warn!("process CPU clock unavailable; CPUTimeMs will mirror TotalTimeMs");
        }
        Self { cpu_supported }
    }

    /// Whether real CPU time is being measured, or wall time is duplicated.
    pub fn cpu_supported(&self) -> bool {
        self.cpu_supported
    }

    /// Opens a measurement window.
    pub fn start(&self) -> TimingHandle {
        TimingHandle {
            started: Instant::now(),
            cpu_start_ns: if self.cpu_supported {
                cpu_clock_ns()
            } else {
                None
            },
        }
    }

    /// Closes a window, returning `(total_ms, cpu_ms)`. Both values are
    /// non-negative; this never fails mid-request.
    pub fn stop(&self, handle: TimingHandle) -> (f64, f64) {
        let total_ms = handle.started.elapsed().as_secs_f64() * 1000.0;
        let cpu_ms = match (handle.cpu_start_ns, cpu_clock_ns()) {
            (Some(start), Some(end)) => end.saturating_sub(start) as f64 / 1_000_000.0,
            _ => total_ms,
        };
        (total_ms, cpu_ms)
    }
}

impl Default for TimingSource {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Platform CPU clock ──────────────────────────────────────────

#[cfg(unix)]
fn cpu_clock_ns() -> Option<u64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc == 0 {
        Some(ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn cpu_clock_ns() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn window_reports_non_negative_times() {
        let timing = TimingSource::new();
        let handle = timing.start();
        let (total_ms, cpu_ms) = timing.stop(handle);
        assert!(total_ms >= 0.0);
        assert!(cpu_ms >= 0.0);
    }

    #[test]
    fn wall_time_spans_a_sleep() {
        let timing = TimingSource::new();
        let handle = timing.start();
        std::thread::sleep(Duration::from_millis(15));
        let (total_ms, _) = timing.stop(handle);
        assert!(total_ms >= 15.0, "measured {total_ms}ms for a 15ms sleep");
    }

    #[test]
    fn concurrent_windows_are_independent() {
        let timing = TimingSource::new();
        let outer = timing.start();
        let inner = timing.start();
        std::thread::sleep(Duration::from_millis(5));
        let (inner_ms, _) = timing.stop(inner);
        std::thread::sleep(Duration::from_millis(5));
        let (outer_ms, _) = timing.stop(outer);
        assert!(outer_ms > inner_ms);
    }

    #[cfg(unix)]
    #[test]
    fn cpu_clock_is_available_on_unix() {
        assert!(TimingSource::new().cpu_supported());
    }
}
