// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Interpose Toolkit
//!
//! Ready-made collaborators for [`interpose_core`] sessions:
//!
//! - [`PerformanceMonitor`]: timing statistics per operation kind or property
//! - [`PropertyFilter`]: a gate admitting a fixed set of properties
//! - [`init_logging`]: `tracing` subscriber setup for hosts

pub mod filter;
pub mod logging;
pub mod perf;

pub use filter::PropertyFilter;
pub use logging::{init_logging, init_logging_with};
pub use perf::{OperationStats, PerformanceMonitor, PerformanceReport, ReportEntry};
