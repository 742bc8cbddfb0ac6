//! Process-CPU stopwatch for benchmark operators.
//!
//! Reads `CLOCK_PROCESS_CPUTIME_ID` so the measurements ignore frequency
//! scaling, power states, and time spent preempted by other processes.
//! Resolution is the kernel's clock granularity, well under a millisecond.

#[cfg(unix)]
pub struct Timer {
    start_time: libc::timespec,
    end_time: libc::timespec,
}

#[cfg(unix)]
impl Timer {
    pub fn new() -> Self {
        let zero = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        Self {
            start_time: zero,
            end_time: zero,
        }
    }

    #[inline]
    pub fn start(&mut self) {
        self.start_time = now();
    }

    #[inline]
    pub fn stop(&mut self) {
        self.end_time = now();
    }

    /// Elapsed time between the last `start` and `stop`, in seconds.
    pub fn elapsed_s(&self) -> f64 {
        (self.end_time.tv_sec - self.start_time.tv_sec) as f64
            + (self.end_time.tv_nsec - self.start_time.tv_nsec) as f64 / 1e9
    }

    /// Elapsed time between the last `start` and `stop`, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        (self.end_time.tv_sec - self.start_time.tv_sec) as f64 * 1e3
            + (self.end_time.tv_nsec - self.start_time.tv_nsec) as f64 / 1e6
    }
}

#[cfg(unix)]
fn now() -> libc::timespec {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid out-pointer for the duration of the call and
    // CLOCK_PROCESS_CPUTIME_ID is a valid clock id on every Unix target.
    unsafe {
        libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts);
    }
    ts
}

/// Wall-clock fallback for hosts without a process-CPU clock.
#[cfg(not(unix))]
pub struct Timer {
    start_time: std::time::Instant,
    elapsed: std::time::Duration,
}

#[cfg(not(unix))]
impl Timer {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            elapsed: std::time::Duration::ZERO,
        }
    }

    #[inline]
    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    #[inline]
    pub fn stop(&mut self) {
        self.elapsed = self.start_time.elapsed();
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e3
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
