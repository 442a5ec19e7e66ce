use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use config::ConfigError;

use crate::config::StabilitySettings;
use crate::error::{Error, ErrorCode};

/// Shared flag that aborts an in-flight stability wait.
///
/// Cloned handles observe the same flag; raising it wakes any sleeper at once.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        let (raised, wakeup) = &*self.inner;
        *raised.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless raised first. Returns `true` when interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (raised, wakeup) = &*self.inner;
        let guard = raised.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wakeup
            .wait_timeout_while(guard, duration, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Decides when a file has stopped growing by polling its size with backoff.
pub struct StabilityDetector {
    settings: StabilitySettings,
    interrupt: Interrupt,
}

impl StabilityDetector {
    pub fn new(settings: StabilitySettings) -> Self {
        Self {
            settings,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn settings(&self) -> &StabilitySettings {
        &self.settings
    }

    /// Block until the size of `path` has been unchanged for the configured
    /// number of consecutive observations. Returns the stable size.
    pub fn wait_for(&self, path: &Path) -> Result<u64, Error> {
        self.wait_with(path, || fs::metadata(path).map(|metadata| metadata.len()))
    }

    pub(crate) fn wait_with<F>(&self, path: &Path, mut probe: F) -> Result<u64, Error>
    where
        F: FnMut() -> io::Result<u64>,
    {
        let base = self.settings.base_interval();
        let max_interval = self.settings.max_interval().ok_or_else(|| {
            Error::Config(ConfigError::Message(format!(
                "Stability interval cap overflows: {} ms x {}",
                self.settings.base_interval_ms, self.settings.max_interval_factor
            )))
        })?;

        let mut previous_size: Option<u64> = None;
        let mut unchanged = 0u32;
        let mut checks = 0u32;
        let mut interval = base;

        loop {
            let size = probe().map_err(|e| {
                Error::with_source(
                    ErrorCode::FileHandlingFailed,
                    format!("Exception during file stability check for file: {}", path.display()),
                    e,
                )
            })?;
            checks += 1;

            if previous_size != Some(size) {
                unchanged = 0;
                previous_size = Some(size);
                interval = base;
            } else {
                unchanged += 1;
                if unchanged >= self.settings.required_unchanged {
                    info!("File stable: {} ({} bytes)", path.display(), size);
                    return Ok(size);
                }
                interval = backed_off(interval, self.settings.backoff_factor, max_interval);
            }

            if checks >= self.settings.max_checks {
                return Err(Error::handling(
                    ErrorCode::StabilityChecksExceeded,
                    format!("Total checks exceeded for file: {}", path.display()),
                ));
            }

            debug!("Sleep with interval {:?} for {}", interval, path.display());
            if self.interrupt.sleep(interval) {
                return Err(Error::handling(
                    ErrorCode::FileHandlingFailed,
                    format!("Stability check interrupted for file: {}", path.display()),
                ));
            }
        }
    }
}

/// `interval * factor`, capped. Factors that do not yield a valid duration
/// (NaN, infinite, negative) jump straight to the cap.
fn backed_off(interval: Duration, factor: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * factor).map_or(cap, |next| next.min(cap))
}
