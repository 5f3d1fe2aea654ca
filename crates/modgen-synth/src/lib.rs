//! modgen Synthesizer
//!
//! Turns a [`TranslationUnit`] into modularization boilerplate:
//!
//! - `<module>_stubs.c` - stub definitions for declared but undefined functions
//! - `<module>_api.h` - forwarding declarations for defined functions
//! - `<module>_ops.c` - optional function-pointer ops table
//! - a JSON manifest listing what each input generated

pub mod manifest;
pub mod plan;
pub mod render;
pub mod writer;

pub use manifest::{Manifest, ModuleRecord};
pub use plan::ModularizationPlan;
pub use render::ModuleNames;
pub use writer::GeneratedFile;

use modgen_core::config::SynthesisConfig;
use modgen_core::{Result, TranslationUnit};
use std::path::Path;
use tracing::{debug, info, warn, Span};
use writer::OutputWriter;

/// Boilerplate synthesizer
pub struct Synthesizer {
    config: SynthesisConfig,
    span: Span,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default(), Span::current())
    }
}

impl Synthesizer {
    pub fn new(config: SynthesisConfig, span: Span) -> Self {
        Self { config, span }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Compute the plan for a unit
    pub fn plan<'u>(&self, unit: &'u TranslationUnit) -> ModularizationPlan<'u> {
        ModularizationPlan::from_unit(unit)
    }

    /// Render the files for a unit without touching the filesystem
    pub fn render(&self, unit: &TranslationUnit) -> Vec<GeneratedFile> {
        let _enter = self.span.enter();
        let plan = self.plan(unit);
        let names = ModuleNames::for_unit(unit);
        let mut files = Vec::new();

        files.push(GeneratedFile::new(
            names.stubs_file(),
            render::render_stubs(unit, &plan, &names, self.config.stub_policy),
        ));

        let emit_ops = render::wants_ops(&self.config, &plan);
        if self.config.emit_ops_table && !emit_ops {
            warn!(
                "No definitions in {}, skipping ops table",
                unit.source_file_name()
            );
        }

        files.push(GeneratedFile::new(
            names.header_file(),
            render::render_header(unit, &plan, &names, emit_ops),
        ));

        if emit_ops {
            files.push(GeneratedFile::new(
                names.ops_file(),
                render::render_ops(unit, &plan, &names),
            ));
        }

        files
    }

    /// Generate the boilerplate for a unit into `output_dir`.
    ///
    /// Nothing is written when a target belongs to someone else. Modules of
    /// other inputs in the same directory are left alone.
    pub fn synthesize(&self, unit: &TranslationUnit, output_dir: &Path) -> Result<ModuleRecord> {
        let _enter = self.span.enter();
        let plan = self.plan(unit);
        debug!(
            "Plan for {}: {} stubs, {} forwards",
            unit.source_file_name(),
            plan.stubs.len(),
            plan.forwards.len()
        );

        let files = self.render(unit);

        let mut record = ModuleRecord::new(unit.source_file_name());
        record.files = files.iter().map(|f| f.name.clone()).collect();
        record.stubs = plan.stubs.iter().map(|s| s.name.clone()).collect();
        record.forwards = plan.forwards.iter().map(|s| s.name.clone()).collect();

        let writer = OutputWriter::new(output_dir, &self.config.manifest_name, &unit.source);
        let previous = writer.previous_manifest()?;
        writer.check_conflicts(previous.as_ref(), &record, &files)?;

        if plan.is_empty() {
            info!("No functions found in {}", unit.source_file_name());
        }

        let manifest = writer.write(previous.as_ref(), &record, &files)?;
        info!(
            "Generated {} files for {} in {} ({} modules recorded)",
            files.len(),
            unit.source_file_name(),
            output_dir.display(),
            manifest.modules.len()
        );
        Ok(record)
    }
}
