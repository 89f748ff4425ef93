//! Interception table
//!
//! Callers that want a function to be hookable dispatch through
//! [`InterceptionTable::invoke`] instead of calling it directly. The table
//! is the indirection: when the target is armed, the callback runs first
//! with the call's arguments, then the original body runs unconditionally.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use agingctl_common::{CallArgs, FunctionAddress, MAX_HOOK_ARGS};
use log::{debug, info};

use crate::domain::HookError;

/// Callback run before an armed target's original body
pub type HookFn = dyn Fn(&HookFrame<'_>) + Send + Sync;

struct Hook {
    callback: Arc<HookFn>,
    arg_count: usize,
}

/// What a callback sees of the call it intercepted
pub struct HookFrame<'a> {
    target: FunctionAddress,
    args: CallArgs,
    table: &'a InterceptionTable,
    hook: &'a Arc<Hook>,
}

impl HookFrame<'_> {
    #[must_use]
    pub fn target(&self) -> FunctionAddress {
        self.target
    }

    /// Positional argument, `0` past the armed argument count
    #[must_use]
    pub fn arg(&self, index: usize) -> u64 {
        self.args.get(index).unwrap_or(0)
    }

    #[must_use]
    pub fn args(&self) -> &CallArgs {
        &self.args
    }

    /// Remove the hook that produced this frame.
    ///
    /// Returns `true` only for the one frame that actually removed it.
    /// Frames racing on the same hook (concurrent or re-entrant calls that
    /// entered before removal) get `false`, as do frames whose hook was
    /// already removed or replaced by a later `arm`.
    pub fn disarm(&self) -> bool {
        self.table.remove_if_current(self.target, self.hook)
    }
}

/// Indirection table of armed interception points, keyed by target address
#[derive(Default)]
pub struct InterceptionTable {
    hooks: RwLock<HashMap<FunctionAddress, Arc<Hook>>>,
}

impl InterceptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `callback` before `target`, observing the first `arg_count` arguments.
    ///
    /// Arming the same callback twice is a no-op.
    ///
    /// # Errors
    /// - [`HookError::InvalidTarget`] for address zero
    /// - [`HookError::InvalidArgCount`] outside `1..=MAX_HOOK_ARGS`
    /// - [`HookError::AlreadyArmed`] if another callback holds the target
    pub fn arm(
        &self,
        target: FunctionAddress,
        callback: Arc<HookFn>,
        arg_count: usize,
    ) -> Result<(), HookError> {
        if target.is_null() {
            return Err(HookError::InvalidTarget(target));
        }
        if arg_count == 0 || arg_count > MAX_HOOK_ARGS {
            return Err(HookError::InvalidArgCount(arg_count));
        }

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = hooks.get(&target) {
            if Arc::ptr_eq(&existing.callback, &callback) {
                debug!("{target} already armed with this callback");
                return Ok(());
            }
            return Err(HookError::AlreadyArmed(target));
        }

        let hook = Hook {
            callback,
            arg_count,
        };
        hooks.insert(target, Arc::new(hook));
        info!("Armed interception at {target} ({arg_count} args)");
        Ok(())
    }

    /// Remove whatever is armed at `target`.
    ///
    /// Safe from inside a callback and safe to repeat. Returns whether a
    /// hook was removed. Calls already past the dispatch point still finish
    /// their callback and original body.
    pub fn disarm(&self, target: FunctionAddress) -> bool {
        let removed = self
            .hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&target)
            .is_some();
        if removed {
            info!("Disarmed interception at {target}");
        } else {
            debug!("Disarm at {target}: not armed");
        }
        removed
    }

    /// Remove the hook at `target` only if it runs `callback`.
    ///
    /// A hook armed later by someone else at the same target stays in place.
    pub fn disarm_if(&self, target: FunctionAddress, callback: &Arc<HookFn>) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        match hooks.get(&target) {
            Some(current) if Arc::ptr_eq(&current.callback, callback) => {
                hooks.remove(&target);
                drop(hooks);
                info!("Disarmed interception at {target}");
                true
            }
            Some(_) => {
                debug!("Disarm at {target}: armed by another callback, left in place");
                false
            }
            None => {
                debug!("Disarm at {target}: not armed");
                false
            }
        }
    }

    #[must_use]
    pub fn is_armed(&self, target: FunctionAddress) -> bool {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&target)
    }

    /// Whether `target` is armed with exactly `callback`
    #[must_use]
    pub fn is_armed_with(&self, target: FunctionAddress, callback: &Arc<HookFn>) -> bool {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .is_some_and(|hook| Arc::ptr_eq(&hook.callback, callback))
    }

    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Call `target` through the table.
    ///
    /// If armed, the callback runs first with the first `arg_count`
    /// arguments. `original` always runs afterwards and its result is
    /// returned; callbacks observe, they never short-circuit.
    pub fn invoke<R>(
        &self,
        target: FunctionAddress,
        args: &CallArgs,
        original: impl FnOnce(&CallArgs) -> R,
    ) -> R {
        // Clone out and release the lock so the callback may disarm.
        let hook = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .cloned();

        if let Some(hook) = hook {
            let frame = HookFrame {
                target,
                args: args.truncated(hook.arg_count),
                table: self,
                hook: &hook,
            };
            (hook.callback)(&frame);
        }

        original(args)
    }

    fn remove_if_current(&self, target: FunctionAddress, hook: &Arc<Hook>) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        match hooks.get(&target) {
            Some(current) if Arc::ptr_eq(current, hook) => {
                hooks.remove(&target);
                drop(hooks);
                info!("Disarmed interception at {target} from its callback");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const TARGET: FunctionAddress = FunctionAddress(0xffff_ffc0_10a1_b2c0);

    fn counting() -> (Arc<AtomicUsize>, Arc<HookFn>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let cb: Arc<HookFn> = Arc::new(move |_frame: &HookFrame<'_>| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, cb)
    }

    #[test]
    fn test_unarmed_runs_original_only() {
        let table = InterceptionTable::new();
        let original = |args: &CallArgs| args.get(0).unwrap() + 1;
        let rc = table.invoke(TARGET, &CallArgs::new(&[1]), original);
        assert_eq!(rc, 2);
    }

    #[test]
    fn test_callback_runs_before_original() {
        let table = InterceptionTable::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        table
            .arm(
                TARGET,
                Arc::new(move |_: &HookFrame<'_>| o.lock().unwrap().push("callback")),
                6,
            )
            .unwrap();

        let original = |_: &CallArgs| order.lock().unwrap().push("original");
        table.invoke(TARGET, &CallArgs::new(&[0; 6]), original);
        assert_eq!(*order.lock().unwrap(), vec!["callback", "original"]);
    }

    #[test]
    fn test_callback_sees_only_armed_arg_count() {
        let table = InterceptionTable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        table
            .arm(
                TARGET,
                Arc::new(move |f: &HookFrame<'_>| {
                    s.lock().unwrap().extend_from_slice(f.args().as_slice());
                    assert_eq!(f.arg(5), 0);
                }),
                2,
            )
            .unwrap();

        let full = table.invoke(TARGET, &CallArgs::new(&[10, 20, 30, 40]), CallArgs::len);
        assert_eq!(full, 4, "original must receive every argument");
        assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_arm_rejects_null_target_and_bad_arg_count() {
        let table = InterceptionTable::new();
        let (_, cb) = counting();
        assert_eq!(
            table.arm(FunctionAddress(0), Arc::clone(&cb), 6),
            Err(HookError::InvalidTarget(FunctionAddress(0)))
        );
        assert_eq!(
            table.arm(TARGET, Arc::clone(&cb), 0),
            Err(HookError::InvalidArgCount(0))
        );
        assert_eq!(table.arm(TARGET, cb, 13), Err(HookError::InvalidArgCount(13)));
        assert_eq!(table.armed_count(), 0);
    }

    #[test]
    fn test_no_silent_double_arm() {
        let table = InterceptionTable::new();
        let (hits, cb) = counting();
        let (_, other) = counting();

        table.arm(TARGET, Arc::clone(&cb), 6).unwrap();
        table.arm(TARGET, Arc::clone(&cb), 6).unwrap();
        assert_eq!(
            table.arm(TARGET, other, 6),
            Err(HookError::AlreadyArmed(TARGET))
        );

        table.invoke(TARGET, &CallArgs::new(&[]), |_| ());
        assert_eq!(
            hits.load(Ordering::SeqCst),
            1,
            "same callback must be installed once"
        );
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let table = InterceptionTable::new();
        let (hits, cb) = counting();
        table.arm(TARGET, cb, 6).unwrap();

        assert!(table.disarm(TARGET));
        assert!(!table.disarm(TARGET));
        assert!(!table.is_armed(TARGET));

        table.invoke(TARGET, &CallArgs::new(&[]), |_| ());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_self_disarm_fires_once_and_original_completes() {
        let table = InterceptionTable::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        table
            .arm(
                TARGET,
                Arc::new(move |f: &HookFrame<'_>| {
                    assert!(f.disarm());
                    assert!(!f.disarm());
                    h.fetch_add(1, Ordering::SeqCst);
                }),
                6,
            )
            .unwrap();

        let mut originals = 0;
        for _ in 0..3 {
            table.invoke(TARGET, &CallArgs::new(&[7]), |_| originals += 1);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(originals, 3);
    }

    #[test]
    fn test_reentrant_call_after_self_disarm_skips_callback() {
        let table = Arc::new(InterceptionTable::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let inner = Arc::downgrade(&table);
        table
            .arm(
                TARGET,
                Arc::new(move |f: &HookFrame<'_>| {
                    f.disarm();
                    h.fetch_add(1, Ordering::SeqCst);
                    // Re-enter the intercepted function from inside the callback.
                    if let Some(t) = inner.upgrade() {
                        t.invoke(TARGET, &CallArgs::new(&[]), |_| ());
                    }
                }),
                6,
            )
            .unwrap();

        table.invoke(TARGET, &CallArgs::new(&[]), |_| ());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarm_if_leaves_other_callback_armed() {
        let table = InterceptionTable::new();
        let (_, old) = counting();
        let (hits, new) = counting();

        table.arm(TARGET, Arc::clone(&old), 6).unwrap();
        assert!(table.disarm_if(TARGET, &old));
        table.arm(TARGET, Arc::clone(&new), 6).unwrap();

        assert!(!table.disarm_if(TARGET, &old));
        assert!(table.is_armed_with(TARGET, &new));
        assert!(!table.is_armed_with(TARGET, &old));

        table.invoke(TARGET, &CallArgs::new(&[]), |_| ());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_frame_does_not_remove_new_hook() {
        let table = InterceptionTable::new();
        let stale = Arc::new(Mutex::new(None::<bool>));
        let s = Arc::clone(&stale);
        let (_, replacement) = counting();
        let replacement_for_cb = Arc::clone(&replacement);
        let table_ref: &'static InterceptionTable = Box::leak(Box::new(table));

        table_ref
            .arm(
                TARGET,
                Arc::new(move |f: &HookFrame<'_>| {
                    // Someone else disarms and re-arms while we are in flight.
                    table_ref.disarm(TARGET);
                    table_ref
                        .arm(TARGET, Arc::clone(&replacement_for_cb), 6)
                        .unwrap();
                    *s.lock().unwrap() = Some(f.disarm());
                }),
                6,
            )
            .unwrap();

        table_ref.invoke(TARGET, &CallArgs::new(&[]), |_| ());
        assert_eq!(*stale.lock().unwrap(), Some(false));
        assert!(table_ref.is_armed(TARGET));
    }
}
