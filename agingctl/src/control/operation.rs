//! The validated write path for the aging level

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use agingctl_common::{
    DeviceHandle, FunctionAddress, AGING_LEVEL_OFFSET, AGING_LEVEL_WORD, FG_IMA_DEFAULT,
};
use log::{error, info, warn};

use super::status::StatusMessage;
use crate::accessor::SramAccessor;
use crate::domain::{AgingLevel, ModuleError};

/// Result of a control operation that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The accessor accepted the write; the stored level now matches
    Applied {
        level: AgingLevel,
        rc: i32,
        status: StatusMessage,
    },
    /// The accessor returned a negative code; stored level untouched
    AccessorFailed { rc: i32, status: StatusMessage },
}

impl ControlOutcome {
    /// Control-command return code: `0` applied, `1` accessor failure
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Applied { .. } => 0,
            Self::AccessorFailed { .. } => 1,
        }
    }

    #[must_use]
    pub fn status(&self) -> &StatusMessage {
        match self {
            Self::Applied { status, .. } | Self::AccessorFailed { status, .. } => status,
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Shared state of the control path: stored level and captured handle
///
/// The level lock is held across the accessor call, so concurrent
/// operations (the capture callback and an external command) serialize and
/// the stored level always names the last value the hardware accepted.
pub struct ControlContext {
    level: Mutex<AgingLevel>,
    handle: AtomicU64,
    accessor: Arc<dyn SramAccessor>,
    write_fn: FunctionAddress,
}

impl ControlContext {
    #[must_use]
    pub fn new(
        accessor: Arc<dyn SramAccessor>,
        write_fn: FunctionAddress,
        level: AgingLevel,
    ) -> Self {
        Self {
            level: Mutex::new(level),
            handle: AtomicU64::new(0),
            accessor,
            write_fn,
        }
    }

    /// Currently stored aging level
    #[must_use]
    pub fn level(&self) -> AgingLevel {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently captured device handle, null before capture
    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle(self.handle.load(Ordering::Acquire))
    }

    /// Store a captured handle, returning the previous one
    pub fn capture(&self, handle: DeviceHandle) -> DeviceHandle {
        DeviceHandle(self.handle.swap(handle.0, Ordering::AcqRel))
    }

    /// Write `requested` through the accessor using the current handle.
    ///
    /// On success the stored level becomes `requested`. When `reply` is
    /// given, the padded status message is copied into it.
    pub fn apply(&self, requested: AgingLevel, reply: Option<&mut [u8]>) -> ControlOutcome {
        let mut stored = self.level.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = self.write_locked(&mut stored, requested);
        drop(stored);

        if let Some(out) = reply {
            outcome.status().copy_to(out);
        }
        outcome
    }

    /// Parse and validate a raw control argument, then [`apply`](Self::apply) it.
    ///
    /// # Errors
    /// Returns [`ModuleError::OutOfRange`] without writing or touching the
    /// stored level when the argument names a level above 5
    pub fn apply_arg(
        &self,
        arg: Option<&str>,
        reply: Option<&mut [u8]>,
    ) -> Result<ControlOutcome, ModuleError> {
        let requested = AgingLevel::parse_arg(arg)
            .inspect_err(|e| warn!("Rejected control request: {e}"))?;
        Ok(self.apply(requested, reply))
    }

    /// Re-apply the stored level, as done right after capture
    pub fn apply_stored(&self) -> ControlOutcome {
        let mut stored = self.level.lock().unwrap_or_else(PoisonError::into_inner);
        let requested = *stored;
        self.write_locked(&mut stored, requested)
    }

    fn write_locked(&self, stored: &mut AgingLevel, requested: AgingLevel) -> ControlOutcome {
        let handle = self.handle();
        let value = [requested.get()];
        let rc = self.accessor.sram_write(
            self.write_fn,
            handle,
            AGING_LEVEL_WORD,
            AGING_LEVEL_OFFSET,
            &value,
            FG_IMA_DEFAULT,
        );

        if rc < 0 {
            let status = StatusMessage::format(format_args!("error, rc={rc}\n"));
            error!(
                "fg_sram_write {} (device {handle})",
                status.as_str().trim_end()
            );
            ControlOutcome::AccessorFailed { rc, status }
        } else {
            *stored = requested;
            let status = StatusMessage::format(format_args!(
                "success, set batt_aging_level to {requested}\n"
            ));
            info!("fg_sram_write {}", status.as_str().trim_end());
            ControlOutcome::Applied {
                level: requested,
                rc,
                status,
            }
        }
    }
}
