// Copyright 2017 The Australian National University
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # upsilon_gc
//!
//! Per-type reference layout metadata for a tracing collector.
//!
//! The type loader describes each type symbolically (`common::GCType`),
//! compiles the description into a packed, immutable descriptor
//! (`objectmodel::GCDesc`) and registers it in a global table keyed by
//! type ID (`objectmodel::GlobalDescTable`). Tracers then read the
//! descriptor lock-free to count and locate the reference slots of any
//! instance. The `handles` module pins down the callback and
//! store/manager vocabulary the surrounding runtime uses to drive scans.

#[macro_use]
extern crate upsilon_utils as utils;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate stderrlog;

pub mod common;
pub mod objectmodel;
pub mod handles;

pub use common::GCType;
pub use common::RefPattern;
pub use common::GCTYPE_INIT_ID;
pub use objectmodel::GCDesc;
pub use objectmodel::GCSeries;
pub use objectmodel::SeriesItem;
pub use objectmodel::SeriesBlock;
pub use objectmodel::PtrRun;
pub use objectmodel::GlobalDescTable;
pub use objectmodel::TypeID;
pub use objectmodel::N_TYPES;

/// initializes the descriptor subsystem. Call once before registering
/// types; extra calls are ignored.
pub fn gc_init() {
    objectmodel::GlobalDescTable::init();
}

/// compiles a type's layout and publishes it under the type's own id.
/// Returns None for types without reference slots.
pub fn register_type(ty: &GCType) -> Option<&'static GCDesc> {
    match ty.encode() {
        Some(desc) => Some(GlobalDescTable::insert(ty.id, desc)),
        None => None
    }
}

/// starts logging at the given verbosity (0 = error .. 4 = trace)
pub fn start_logging(verbosity: usize) {
    match stderrlog::new().verbosity(verbosity).init() {
        Ok(()) => info!("logger initialized"),
        Err(e) => error!("failed to init logger, probably already initialized: {:?}", e)
    }
}

/// starts logging at trace level
pub fn start_logging_trace() {
    start_logging(4);
}
