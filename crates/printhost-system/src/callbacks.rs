// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy traits the printer application plugs into the system.
//
// Each trait has a blanket impl for matching closures, so applications can
// pass `Arc::new(|...| ...)` where a full type would be overkill. The system
// clones these out of its lock as `Arc`s and calls them after releasing it.

use std::io::{Read, Write};

use printhost_core::error::Result;
use printhost_core::types::DriverInfo;

use crate::snapshot::SystemSnapshot;

// ---------------------------------------------------------------------------
// MIME filters
// ---------------------------------------------------------------------------

/// Everything a filter needs to convert one document.
pub struct FilterContext<'a> {
    /// Job the document belongs to.
    pub job_id: i32,
    /// Source MIME type of `input`.
    pub format: &'static str,
    /// Document bytes to convert.
    pub input: &'a mut dyn Read,
    /// Converted output (device data or raster stream).
    pub output: &'a mut dyn Write,
}

/// Converts document data from one MIME type to another.
pub trait FilterCallback: Send + Sync {
    /// Run the conversion; `false` aborts the job.
    fn filter(&self, ctx: &mut FilterContext<'_>) -> bool;
}

impl<F> FilterCallback for F
where
    F: Fn(&mut FilterContext<'_>) -> bool + Send + Sync,
{
    fn filter(&self, ctx: &mut FilterContext<'_>) -> bool {
        self(ctx)
    }
}

/// Sniffs the MIME type of a document from its first bytes.
pub trait MimeDetector: Send + Sync {
    fn detect(&self, header: &[u8]) -> Option<&'static str>;
}

impl<F> MimeDetector for F
where
    F: Fn(&[u8]) -> Option<&'static str> + Send + Sync,
{
    fn detect(&self, header: &[u8]) -> Option<&'static str> {
        self(header)
    }
}

// ---------------------------------------------------------------------------
// Request operations
// ---------------------------------------------------------------------------

/// The parts of a client request an operation handler may inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    /// IPP operation code.
    pub operation_id: u16,
    /// Resource path the request targets ("/ipp/system", "/ipp/print/foo").
    pub resource: String,
    /// Authenticated user, if any.
    pub username: Option<String>,
}

/// Handles vendor or otherwise unsupported IPP operations.
pub trait OperationHandler: Send + Sync {
    /// Return `true` if the request was handled.
    fn handle(&self, request: &ClientRequest) -> bool;
}

impl<F> OperationHandler for F
where
    F: Fn(&ClientRequest) -> bool + Send + Sync,
{
    fn handle(&self, request: &ClientRequest) -> bool {
        self(request)
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Device-specific settings a driver factory fills in for a new printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverData {
    pub make_and_model: String,
    /// Native document format the device accepts.
    pub format: String,
    /// Pages per minute, for the printer's status page.
    pub ppm: u32,
}

/// Maps an IEEE-1284 device ID to the name of a registered driver.
pub trait DriverLookup: Send + Sync {
    fn driver_for(&self, device_id: &str) -> Option<String>;
}

impl<F> DriverLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn driver_for(&self, device_id: &str) -> Option<String> {
        self(device_id)
    }
}

/// Initializes driver data for a printer created with a given driver.
pub trait DriverFactory: Send + Sync {
    fn create(&self, driver: &DriverInfo, device_uri: &str) -> Option<DriverData>;
}

impl<F> DriverFactory for F
where
    F: Fn(&DriverInfo, &str) -> Option<DriverData> + Send + Sync,
{
    fn create(&self, driver: &DriverInfo, device_uri: &str) -> Option<DriverData> {
        self(driver, device_uri)
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Writes a snapshot of the system configuration to durable storage.
pub trait SaveHandler: Send + Sync {
    fn save(&self, snapshot: &SystemSnapshot) -> Result<()>;
}

impl<F> SaveHandler for F
where
    F: Fn(&SystemSnapshot) -> Result<()> + Send + Sync,
{
    fn save(&self, snapshot: &SystemSnapshot) -> Result<()> {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_filters_see_the_context() {
        let upper = |ctx: &mut FilterContext<'_>| {
            let mut buf = String::new();
            if ctx.input.read_to_string(&mut buf).is_err() {
                return false;
            }
            ctx.output.write_all(buf.to_uppercase().as_bytes()).is_ok()
        };

        let mut input: &[u8] = b"hello";
        let mut output = Vec::new();
        let mut ctx = FilterContext {
            job_id: 1,
            format: "text/plain",
            input: &mut input,
            output: &mut output,
        };

        assert!(upper.filter(&mut ctx));
        assert_eq!(output, b"HELLO");
    }

    #[test]
    fn closure_operation_handler() {
        let handler = |req: &ClientRequest| req.operation_id == 0x4000;
        let req = ClientRequest {
            operation_id: 0x4000,
            resource: "/ipp/system".into(),
            username: None,
        };
        assert!(handler.handle(&req));
    }
}
