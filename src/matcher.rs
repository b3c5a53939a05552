//! Driver that scans a program's call sites against the catalog
//!
//! Functions → call sites → signatures → rules, all sequential. Catalog,
//! signatures and calls are read-only, so the order of records only depends
//! on the order the decompiler reports functions and calls.

use crate::call::Call;
use crate::catalog::SignatureCatalog;
use crate::decompiler::{Decompiler, FunctionInfo};
use crate::report::{MatchRecord, MatchSink};
use crate::signature::{MatchError, Signature};
use serde::Serialize;

/// Counters for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub functions_scanned: usize,
    /// Library and thunk functions
    pub functions_skipped: usize,
    pub functions_failed: usize,
    pub calls: usize,
    pub matches: usize,
}

/// Which functions a scan leaves out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Statically linked library code
    pub skip_library: bool,
    /// Import stubs and other dynamically linked trampolines
    pub skip_thunk: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_library: true,
            skip_thunk: true,
        }
    }
}

impl ScanOptions {
    pub fn skips(&self, function: &FunctionInfo) -> bool {
        (self.skip_library && function.is_library) || (self.skip_thunk && function.is_thunk)
    }
}

/// Matches calls against every signature of a catalog
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    catalog: &'a SignatureCatalog,
    options: ScanOptions,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a SignatureCatalog) -> Self {
        Self::with_options(catalog, ScanOptions::default())
    }

    pub fn with_options(catalog: &'a SignatureCatalog, options: ScanOptions) -> Self {
        Self { catalog, options }
    }

    /// Signatures matching one call, in catalog order
    pub fn match_call(&self, call: &Call) -> Result<Vec<&'a Signature>, MatchError> {
        let mut matched = Vec::new();
        for signature in self.catalog {
            if signature.matches(call)? {
                matched.push(signature);
            }
        }
        Ok(matched)
    }

    /// Scan every eligible function and report each match to `sink`
    ///
    /// Library and thunk functions are skipped unless the options say
    /// otherwise. A function that fails to decompile is logged and skipped.
    ///
    /// # Errors
    /// Aborts with [`MatchError`] if a signature uses an element that cannot
    /// be evaluated.
    pub fn scan(
        &self,
        decompiler: &dyn Decompiler,
        sink: &mut dyn MatchSink,
    ) -> Result<ScanSummary, MatchError> {
        let mut summary = ScanSummary::default();

        for function in decompiler.functions() {
            if self.options.skips(&function) {
                tracing::debug!("Skipping library/thunk function: {}", function.name);
                summary.functions_skipped += 1;
                continue;
            }

            tracing::debug!("Decompiling function: {}", function.name);

            let raw_calls = match decompiler.decompile(&function) {
                Ok(calls) => calls,
                Err(e) => {
                    tracing::warn!("Failed to decompile: {} ({})", function.name, e.reason);
                    summary.functions_failed += 1;
                    continue;
                }
            };
            summary.functions_scanned += 1;

            for raw in &raw_calls {
                let call = Call::from_raw(raw, decompiler);
                summary.calls += 1;

                for signature in self.match_call(&call)? {
                    tracing::info!("MATCH: [{}] {}", signature.filename(), call);
                    sink.add(MatchRecord::new(&call, signature));
                    summary.matches += 1;
                }
            }
        }

        Ok(summary)
    }
}
