//! Simulated fuel-gauge host
//!
//! Plays the kernel side for the `simulate` command and the integration
//! tests: it publishes `fg_sram_read` / `fg_sram_write` in a symbol table,
//! keeps SRAM contents in memory, and performs its own legitimate reads of
//! the read accessor through the shared [`InterceptionTable`], which is
//! where the module's capture hook fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use agingctl_common::{
    CallArgs, DeviceHandle, FunctionAddress, FG_IMA_DEFAULT, SRAM_READ_SYMBOL, SRAM_WRITE_SYMBOL,
};
use log::{debug, trace};

use crate::accessor::SramAccessor;
use crate::hook::InterceptionTable;
use crate::module::HostEnv;
use crate::symbols::SymbolTable;

pub const SIM_READ_FN: FunctionAddress = FunctionAddress(0xffff_ffc0_10a1_b2c0);
pub const SIM_WRITE_FN: FunctionAddress = FunctionAddress(0xffff_ffc0_10a1_b5e0);
pub const SIM_DEVICE: DeviceHandle = DeviceHandle(0xffff_ff80_3a4c_1000);

/// One accepted SRAM write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SramWrite {
    pub device: DeviceHandle,
    pub address: u16,
    pub offset: u8,
    pub value: Vec<u8>,
    pub flags: i32,
}

/// In-memory fuel gauge with one device
pub struct SimulatedFuelGauge {
    device: DeviceHandle,
    sram: Mutex<HashMap<(u16, u8), u8>>,
    writes: Mutex<Vec<SramWrite>>,
    write_attempts: AtomicUsize,
    original_reads: AtomicUsize,
    fail_next: AtomicI32,
}

impl Default for SimulatedFuelGauge {
    fn default() -> Self {
        Self::new(SIM_DEVICE)
    }
}

impl SimulatedFuelGauge {
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            device,
            sram: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            write_attempts: AtomicUsize::new(0),
            original_reads: AtomicUsize::new(0),
            fail_next: AtomicI32::new(0),
        }
    }

    #[must_use]
    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    /// Symbol table exposing both accessors
    #[must_use]
    pub fn symbols() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.insert(SRAM_READ_SYMBOL, SIM_READ_FN);
        table.insert(SRAM_WRITE_SYMBOL, SIM_WRITE_FN);
        table
    }

    /// Host environment wired to this gauge and `hooks`
    #[must_use]
    pub fn host_env(self: &Arc<Self>, hooks: Arc<InterceptionTable>) -> HostEnv {
        HostEnv {
            resolver: Arc::new(Self::symbols()),
            accessor: Arc::clone(self) as Arc<dyn SramAccessor>,
            hooks,
        }
    }

    /// Make the next write fail with `rc` (a negative errno)
    pub fn fail_next_write(&self, rc: i32) {
        self.fail_next.store(rc, Ordering::SeqCst);
    }

    /// A legitimate host call to `fg_sram_read`, routed through `hooks`.
    ///
    /// Returns the accessor result and the bytes read.
    pub fn read_sram(
        &self,
        hooks: &InterceptionTable,
        address: u16,
        offset: u8,
        len: usize,
    ) -> (i32, Vec<u8>) {
        // Sign-extended, as a register would hold it
        #[allow(clippy::cast_sign_loss)]
        let flags = i64::from(FG_IMA_DEFAULT) as u64;
        let args = CallArgs::new(&[
            self.device.0,
            u64::from(address),
            u64::from(offset),
            0,
            len as u64,
            flags,
        ]);
        hooks.invoke(SIM_READ_FN, &args, |_| self.read_body(address, offset, len))
    }

    fn read_body(&self, address: u16, offset: u8, len: usize) -> (i32, Vec<u8>) {
        self.original_reads.fetch_add(1, Ordering::SeqCst);
        let sram = self.sram.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes: Vec<u8> = (0..len)
            .map(|i| {
                #[allow(clippy::cast_possible_truncation)]
                let off = offset.wrapping_add(i as u8);
                sram.get(&(address, off)).copied().unwrap_or(0)
            })
            .collect();
        trace!("fg_sram_read word {address} offset {offset}: {bytes:?}");
        (0, bytes)
    }

    /// Current SRAM byte
    #[must_use]
    pub fn peek(&self, address: u16, offset: u8) -> Option<u8> {
        self.sram
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(address, offset))
            .copied()
    }

    /// How many times the original read body ran
    #[must_use]
    pub fn original_reads(&self) -> usize {
        self.original_reads.load(Ordering::SeqCst)
    }

    /// Every write call, accepted or not
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Accepted writes, in order
    #[must_use]
    pub fn writes(&self) -> Vec<SramWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SramAccessor for SimulatedFuelGauge {
    fn sram_write(
        &self,
        target: FunctionAddress,
        device: DeviceHandle,
        address: u16,
        offset: u8,
        value: &[u8],
        flags: i32,
    ) -> i32 {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        if target != SIM_WRITE_FN {
            debug!("fg_sram_write called through {target}, not the published entry");
            return -libc::EFAULT;
        }
        if device.is_null() || device != self.device {
            debug!("fg_sram_write with unknown device {device}");
            return -libc::ENODEV;
        }
        let injected = self.fail_next.swap(0, Ordering::SeqCst);
        if injected < 0 {
            return injected;
        }

        let mut sram = self.sram.lock().unwrap_or_else(PoisonError::into_inner);
        for (i, byte) in value.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let off = offset.wrapping_add(i as u8);
            sram.insert((address, off), *byte);
        }
        drop(sram);

        let write = SramWrite {
            device,
            address,
            offset,
            value: value.to_vec(),
            flags,
        };
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
        0
    }
}
