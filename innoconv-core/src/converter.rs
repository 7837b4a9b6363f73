//! Conversion facade.
//!
//! Runs the pipeline stages once, in order, over a whole dump:
//! split, parse, infer, resolve, plan, rewrite.

use tracing::{debug, info};

use crate::Result;
use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::graph::DependencyGraph;
use crate::inference::ForeignKeyInferencer;
use crate::models::Statement;
use crate::parser::parse_dump;
use crate::plan::EmissionPlan;
use crate::report::ConversionReport;
use crate::rewriter::DumpRewriter;
use crate::splitter::split;

/// Converted dump text together with its report.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The converted dump
    pub output: String,
    /// Summary of what was converted
    pub report: ConversionReport,
}

/// Converts MyISAM dumps to the configured engine with inferred foreign keys.
///
/// # Example
///
/// ```rust
/// use innoconv_core::Converter;
///
/// let dump = "CREATE TABLE drivers (driverId int PRIMARY KEY) ENGINE=MyISAM;\n\
///             CREATE TABLE races (raceId int PRIMARY KEY, driverId int) ENGINE=MyISAM;\n";
/// let conversion = Converter::with_defaults().convert(dump)?;
///
/// assert!(conversion.output.contains("REFERENCES `drivers` (`driverId`)"));
/// assert_eq!(conversion.report.inlined.len(), 1);
/// # Ok::<(), innoconv_core::ConvertError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Converts a whole dump.
    ///
    /// # Errors
    /// Returns an error when the configuration is invalid, when quoting or a
    /// block comment is left open, or when two tables share a name. No
    /// partial output is produced in those cases.
    pub fn convert(&self, dump: &str) -> Result<Conversion> {
        self.config
            .validate()
            .map_err(|e| ConvertError::configuration(e.to_string()))?;

        let statements: Vec<Statement<'_>> =
            split(dump).collect::<std::result::Result<_, _>>()?;
        debug!("Split dump into {} statements", statements.len());

        let parsed = parse_dump(&statements)?;
        info!(
            "Parsed {} of {} CREATE TABLE statements",
            parsed.tables.len(),
            parsed.create_table_count()
        );

        let outcome = ForeignKeyInferencer::new(&self.config).infer(&parsed.tables);
        info!(
            "Inferred {} foreign keys ({} skipped)",
            outcome.candidates.len(),
            outcome.skipped.len()
        );

        let resolution = DependencyGraph::build(&parsed.tables, &outcome.candidates).resolve();
        if resolution.is_cyclic() {
            info!(
                "Detected {} foreign keys on reference cycles",
                resolution.cyclic_edges().len()
            );
        }

        let plan = EmissionPlan::build(&parsed.tables, &outcome.candidates, &resolution);
        info!(
            "Planned {} inline and {} deferred constraints",
            plan.inline_count(),
            plan.deferred().len()
        );

        let output = DumpRewriter::new(&self.config).rewrite(&parsed, &plan);

        let mut report = ConversionReport::new(&self.config.target_engine);
        report.statement_count = statements.len();
        report.create_table_count = parsed.create_table_count();
        report.table_count = parsed.tables.len();
        report.skipped_statements = parsed.skipped;
        report.skipped_inferences = outcome.skipped;
        report.inlined = plan.inlined().cloned().collect();
        report.deferred = plan.deferred().to_vec();
        report.cyclic_edges = resolution.cyclic_edges().to_vec();
        report.table_order = resolution.order().to_vec();

        Ok(Conversion { output, report })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
