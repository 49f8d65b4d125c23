//! Process resource sampling attached to every session frame.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Resource usage at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    /// Resident memory of the process in bytes.
    pub memory_bytes: Option<u64>,
    /// Process CPU usage since the previous sample, in percent of one core.
    pub cpu_percent: Option<f64>,
}

/// Source of [`ResourceSample`]s.
pub trait ResourceSampler: Send + Sync {
    /// Take a sample.
    fn sample(&self) -> ResourceSample;
}

/// Sampler that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSampler;

impl ResourceSampler for NullSampler {
    fn sample(&self) -> ResourceSample {
        ResourceSample::default()
    }
}

/// Samples the current process through the operating system.
///
/// Memory is the resident set size. CPU is derived from the change in user
/// plus system time between two consecutive samples, so the first sample
/// never carries a CPU figure.
#[derive(Debug, Default)]
pub struct ProcessSampler {
    last: Mutex<Option<(Instant, Duration)>>,
}

impl ProcessSampler {
    /// Create a sampler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceSampler for ProcessSampler {
    fn sample(&self) -> ResourceSample {
        let now = Instant::now();
        let cpu = cpu_time();

        let cpu_percent = {
            let mut last = self.last.lock();
            let percent = match (*last, cpu) {
                (Some((then, cpu_then)), Some(cpu_now)) => {
                    let wall = now.saturating_duration_since(then);
                    (!wall.is_zero()).then(|| {
                        cpu_now.saturating_sub(cpu_then).as_secs_f64() / wall.as_secs_f64() * 100.0
                    })
                }
                _ => None,
            };
            if let Some(cpu_now) = cpu {
                *last = Some((now, cpu_now));
            }
            percent
        };

        ResourceSample {
            memory_bytes: resident_memory(),
            cpu_percent,
        }
    }
}

#[cfg(unix)]
fn rusage() -> Option<libc::rusage> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the provided struct.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: zero-initialized and filled in by a successful getrusage.
    Some(unsafe { usage.assume_init() })
}

#[cfg(unix)]
fn cpu_time() -> Option<Duration> {
    let usage = rusage()?;
    Some(timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
fn cpu_time() -> Option<Duration> {
    None
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

#[cfg(target_os = "linux")]
fn resident_memory() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // SAFETY: sysconf has no preconditions.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(pages * page_size as u64)
}

// Peak rather than current RSS, the closest getrusage offers.
#[cfg(all(unix, not(target_os = "linux")))]
fn resident_memory() -> Option<u64> {
    let maxrss = rusage()?.ru_maxrss.max(0) as u64;
    if cfg!(target_os = "macos") {
        Some(maxrss)
    } else {
        Some(maxrss * 1024)
    }
}

#[cfg(not(unix))]
fn resident_memory() -> Option<u64> {
    None
}
