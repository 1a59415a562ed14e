// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printhost-system — The shared system object and the machinery around it:
// listening sockets, MIME filters, firmware version export, DNS-SD
// advertisement, device discovery, and the accept loop.

pub mod callbacks;
pub mod devices;
pub mod dnssd;
pub mod filters;
pub mod listeners;
pub mod server;
pub mod snapshot;
pub mod system;
pub mod versions;

pub use callbacks::{
    ClientRequest, DriverData, DriverFactory, DriverLookup, FilterCallback, FilterContext,
    MimeDetector, OperationHandler, SaveHandler,
};
pub use devices::{
    DeviceId, DeviceInfo, DeviceSource, DeviceTypes, default_device_sources, list_devices,
    parse_1284_id,
};
#[cfg(feature = "dnssd")]
pub use devices::DnsSdDeviceSource;
pub use dnssd::{DnsSdRegistrar, DnsSdService, NoopRegistrar};
pub use filters::{FilterRegistry, PWG_RASTER};
pub use listeners::{
    AddressFamily, AddressResolver, ListenAddress, ListenTarget, MAX_LISTENERS, SystemResolver,
};
pub use server::{ConnectionHandler, Peer, StatusPageHandler};
pub use snapshot::SystemSnapshot;
pub use system::{StringField, System, default_hostname, noop_registrar};
pub use versions::{AttributeGroup, AttributeValue, MAX_VERSIONS};
