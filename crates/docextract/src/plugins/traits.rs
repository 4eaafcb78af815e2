//! Base trait shared by all extensions.

use crate::Result;

/// Identity and lifecycle of an extension.
///
/// `initialize` runs once when the orchestrator is built and `shutdown` when
/// [`crate::Orchestrator::shutdown`] is called. Both default to no-ops.
pub trait Plugin: Send + Sync {
    /// Unique, whitespace-free name.
    fn name(&self) -> &str;

    /// Version string. OCR backends report the engine version here, which
    /// strict engine versioning folds into cache keys.
    fn version(&self) -> String;

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Probe {
        shutdowns: AtomicUsize,
    }

    impl Plugin for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn version(&self) -> String {
            format!("probe {}", env!("CARGO_PKG_VERSION"))
        }

        fn shutdown(&self) -> Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_defaults_are_noops() {
        let probe = Probe::default();
        assert!(probe.initialize().is_ok());
        assert!(probe.description().is_empty());
        assert!(probe.version().starts_with("probe "));
    }

    #[test]
    fn test_shutdown_override_runs_each_call() {
        let probe = Probe::default();
        probe.shutdown().unwrap();
        probe.shutdown().unwrap();
        assert_eq!(probe.shutdowns.load(Ordering::SeqCst), 2);
    }
}
