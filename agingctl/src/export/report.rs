//! JSON session report

use std::io::Write;

use agingctl_common::DeviceHandle;
use anyhow::{Context, Result};
use serde::Serialize;

use crate::control::ControlOutcome;
use crate::domain::{AgingLevel, Lifecycle};

/// One step of a session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    /// A host call to the read accessor and what its original body returned
    HostRead {
        thread: usize,
        rc: i32,
        value: Vec<u8>,
    },
    /// A control command and what it returned
    Control {
        arg: Option<String>,
        code: i64,
        status: Option<String>,
    },
    /// A teardown call
    Teardown { code: i64, armed_after: bool },
}

impl ReportEvent {
    /// Build a control event from a command result
    #[must_use]
    pub fn control(arg: Option<&str>, outcome: Option<&ControlOutcome>) -> Self {
        Self::Control {
            arg: arg.map(str::to_string),
            code: outcome.map_or(-1, ControlOutcome::code),
            status: outcome.map(|o| o.status().as_str().trim_end().to_string()),
        }
    }
}

/// Everything recorded for one simulated session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub version: &'static str,
    pub initial_level: AgingLevel,
    pub events: Vec<ReportEvent>,
    pub final_level: AgingLevel,
    pub captured_handle: Option<DeviceHandle>,
    pub phase: Lifecycle,
}

impl SessionReport {
    #[must_use]
    pub fn new(initial_level: AgingLevel) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            initial_level,
            events: Vec::new(),
            final_level: initial_level,
            captured_handle: None,
            phase: Lifecycle::Uninitialized,
        }
    }

    pub fn push(&mut self, event: ReportEvent) {
        self.events.push(event);
    }

    /// Record the final module state
    pub fn finish(&mut self, level: AgingLevel, handle: DeviceHandle, phase: Lifecycle) {
        self.final_level = level;
        self.captured_handle = (!handle.is_null()).then_some(handle);
        self.phase = phase;
    }

    /// Write as pretty JSON
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn export<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)
            .context("Failed to write session report")?;
        Ok(())
    }
}
