//! Module lifecycle: resolve, arm, capture, control, teardown
//!
//! ```text
//! init ──▶ Resolving ──▶ Armed ──(first fg_sram_read)──▶ Captured
//!            │             │                               │
//!            ✗ abort       └──────────── exit() ───────────┴──▶ Shutdown
//! ```
//!
//! The capture callback disarms itself before doing anything else, takes
//! the device handle from the intercepted call's first argument, and
//! immediately re-applies the stored aging level through it.

use std::sync::{Arc, Mutex, PoisonError};

use agingctl_common::{
    DeviceHandle, FunctionAddress, SRAM_READ_ARG_COUNT, SRAM_READ_SYMBOL, SRAM_WRITE_SYMBOL,
};
use log::{debug, info, warn};

use crate::accessor::SramAccessor;
use crate::control::{ControlContext, ControlOutcome};
use crate::domain::{AgingLevel, Lifecycle, ModuleError};
use crate::hook::{HookFn, HookFrame, InterceptionTable};
use crate::provision::ServiceScript;
use crate::symbols::{resolve, SymbolResolver};

/// What the host provides to the module
#[derive(Clone)]
pub struct HostEnv {
    pub resolver: Arc<dyn SymbolResolver>,
    pub accessor: Arc<dyn SramAccessor>,
    pub hooks: Arc<InterceptionTable>,
}

/// Start-up options beyond the argument string
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// Companion script to provision before anything else; `None` skips it
    pub provision: Option<ServiceScript>,
}

struct Shared {
    control: ControlContext,
    phase: Mutex<Lifecycle>,
}

impl Shared {
    fn phase(&self) -> Lifecycle {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, next: Lifecycle) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Lifecycle {} -> {next}", *phase);
        *phase = next;
    }

    /// Move `from → to` only if still in `from`
    fn advance(&self, from: Lifecycle, to: Lifecycle) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != from {
            return false;
        }
        debug!("Lifecycle {from} -> {to}");
        *phase = to;
        true
    }
}

/// A loaded aging-level module
pub struct AgingModule {
    shared: Arc<Shared>,
    hooks: Arc<InterceptionTable>,
    callback: Arc<HookFn>,
    read_fn: FunctionAddress,
    write_fn: FunctionAddress,
}

impl AgingModule {
    /// Load the module.
    ///
    /// Order: provisioning (if configured), start-up argument, resolution of
    /// `fg_sram_write` and `fg_sram_read`, then arming the capture hook on
    /// the read accessor. Nothing is armed unless both symbols resolved.
    ///
    /// # Errors
    /// - [`ModuleError::ProvisioningFailure`] if the companion script cannot be written
    /// - [`ModuleError::OutOfRange`] if the start-up level is above 5
    /// - [`ModuleError::SymbolNotFound`] if either accessor is missing
    /// - [`ModuleError::HookInstallFailed`] if the read accessor cannot be armed
    pub fn init(
        env: &HostEnv,
        options: &ModuleOptions,
        args: Option<&str>,
    ) -> Result<Self, ModuleError> {
        if let Some(script) = &options.provision {
            script.ensure()?;
        }

        let level = AgingLevel::parse_arg(args)?;
        info!("Initial aging level {level}");

        let phase = Mutex::new(Lifecycle::Resolving);
        debug!(
            "Lifecycle {} -> {}",
            Lifecycle::Uninitialized,
            Lifecycle::Resolving
        );
        let write_fn = resolve(env.resolver.as_ref(), SRAM_WRITE_SYMBOL)?;
        let read_fn = resolve(env.resolver.as_ref(), SRAM_READ_SYMBOL)?;

        let shared = Arc::new(Shared {
            control: ControlContext::new(Arc::clone(&env.accessor), write_fn, level),
            phase,
        });

        let cb_shared = Arc::clone(&shared);
        let callback: Arc<HookFn> =
            Arc::new(move |frame: &HookFrame<'_>| on_sram_read(&cb_shared, frame));
        env.hooks
            .arm(read_fn, Arc::clone(&callback), SRAM_READ_ARG_COUNT)?;
        shared.set_phase(Lifecycle::Armed);

        info!("Module loaded: {SRAM_READ_SYMBOL} at {read_fn}, {SRAM_WRITE_SYMBOL} at {write_fn}");
        Ok(Self {
            shared,
            hooks: Arc::clone(&env.hooks),
            callback,
            read_fn,
            write_fn,
        })
    }

    /// Control command.
    ///
    /// Returns `-1` when the argument is out of range (nothing written, no
    /// output), `0` when the level was applied, `1` when the accessor
    /// failed. In the last two cases the status text is copied into `out`.
    pub fn control(&self, args: Option<&str>, out: Option<&mut [u8]>) -> i64 {
        match self.control_outcome(args, out) {
            Ok(outcome) => outcome.code(),
            Err(_) => -1,
        }
    }

    /// Control command with the typed result
    ///
    /// # Errors
    /// Returns [`ModuleError::OutOfRange`] for levels above 5
    pub fn control_outcome(
        &self,
        args: Option<&str>,
        out: Option<&mut [u8]>,
    ) -> Result<ControlOutcome, ModuleError> {
        self.shared.control.apply_arg(args, out)
    }

    /// Teardown. Always disarms, always succeeds, safe to repeat.
    ///
    /// Only this module's own callback is removed; a hook armed at the same
    /// target by a module loaded afterwards stays in place.
    pub fn exit(&self) -> i64 {
        self.hooks.disarm_if(self.read_fn, &self.callback);
        if self.shared.phase() != Lifecycle::Shutdown {
            self.shared.set_phase(Lifecycle::Shutdown);
            info!("Module unloaded");
        }
        0
    }

    #[must_use]
    pub fn phase(&self) -> Lifecycle {
        self.shared.phase()
    }

    #[must_use]
    pub fn level(&self) -> AgingLevel {
        self.shared.control.level()
    }

    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        self.shared.control.handle()
    }

    /// Whether this module's capture hook is still armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.hooks.is_armed_with(self.read_fn, &self.callback)
    }

    #[must_use]
    pub fn read_fn(&self) -> FunctionAddress {
        self.read_fn
    }

    #[must_use]
    pub fn write_fn(&self) -> FunctionAddress {
        self.write_fn
    }
}

impl Drop for AgingModule {
    fn drop(&mut self) {
        // No callback may outlive the module.
        self.hooks.disarm_if(self.read_fn, &self.callback);
    }
}

/// Capture-and-apply, run before the first `fg_sram_read` body
fn on_sram_read(shared: &Shared, frame: &HookFrame<'_>) {
    if !frame.disarm() {
        debug!("Capture already taken by another call, skipping");
        return;
    }

    let handle = DeviceHandle(frame.arg(0));
    let previous = shared.control.capture(handle);
    if !previous.is_null() {
        warn!("Replacing previously captured device {previous}");
    }
    shared.advance(Lifecycle::Armed, Lifecycle::Captured);
    info!("Captured fuel-gauge device {handle}");

    shared.control.apply_stored();
}
