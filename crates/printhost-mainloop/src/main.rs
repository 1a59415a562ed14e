// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printhost — Generic printer application entry point.

use std::sync::Arc;

use printhost_core::types::DriverInfo;
use printhost_mainloop::{LocalOps, mainloop};
use printhost_system::{DriverData, PWG_RASTER, parse_1284_id};

fn main() {
    let drivers = vec![
        DriverInfo::new("pwg_common-300dpi", "Generic PWG Raster 300dpi"),
        DriverInfo::new("pwg_common-600dpi", "Generic PWG Raster 600dpi"),
    ];
    let factory = Arc::new(|driver: &DriverInfo, _device_uri: &str| {
        Some(DriverData {
            make_and_model: driver.description.clone(),
            format: PWG_RASTER.to_owned(),
            ppm: 8,
        })
    });
    let lookup = Arc::new(|device_id: &str| {
        parse_1284_id(device_id)
            .supports("PWGRaster")
            .then(|| "pwg_common-300dpi".to_owned())
    });

    let ops = LocalOps::new(drivers, factory).with_lookup(lookup);
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(mainloop(&args, env!("CARGO_PKG_VERSION"), &ops));
}
