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

//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "interpose_core=info,interpose_toolkit=info";

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with(DEFAULT_FILTER)
}

/// Like [`init_logging`], with explicit fallback directives.
pub fn init_logging_with(default_directives: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // One global subscriber per process.
        let _ = init_logging();
        assert!(init_logging().is_err());
    }

    #[test]
    fn test_invalid_directives_rejected() {
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_logging_with("interpose_core=loud").is_err());
        }
    }
}
