//! Call gate for the resolved SRAM write accessor

use std::sync::Arc;

use agingctl_common::{DeviceHandle, FunctionAddress};

/// Invokes the host's `fg_sram_write` at a resolved address.
///
/// Mirrors the host signature
/// `int fg_sram_write(struct fg_dev *, u16 address, u8 offset, u8 *val, int len, int flags)`,
/// with `len` implied by `value`. Negative return values are errno codes.
/// A null `device` is passed through untouched; surfacing that as an error
/// is the host's job.
pub trait SramAccessor: Send + Sync {
    fn sram_write(
        &self,
        target: FunctionAddress,
        device: DeviceHandle,
        address: u16,
        offset: u8,
        value: &[u8],
        flags: i32,
    ) -> i32;
}

impl<T: SramAccessor + ?Sized> SramAccessor for Arc<T> {
    fn sram_write(
        &self,
        target: FunctionAddress,
        device: DeviceHandle,
        address: u16,
        offset: u8,
        value: &[u8],
        flags: i32,
    ) -> i32 {
        (**self).sram_write(target, device, address, offset, value, flags)
    }
}
