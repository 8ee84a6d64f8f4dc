//! Renderers for audit reports.

use std::io::Write;

use crate::types::{AuditReport, TemplateResults, Violation};

/// Errors that can occur while rendering a report.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RenderError {
    /// No renderer is registered under this key.
    #[error("unsupported output format `{format}` (supported: {})", .supported.join(", "))]
    #[diagnostic(
        code(cfn_audit::render::unsupported_format),
        help("pass one of the supported keys with --format or audit.output_format")
    )]
    UnsupportedFormat {
        /// The requested key.
        format: String,
        /// Every registered key.
        supported: Vec<&'static str>,
    },

    /// Writing to the output failed.
    #[error("failed to write report: {0}")]
    #[diagnostic(code(cfn_audit::render::io))]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("failed to serialize report: {0}")]
    #[diagnostic(code(cfn_audit::render::json))]
    Json(#[from] serde_json::Error),
}

/// Writes an [`AuditReport`] in one output format.
pub trait Renderer {
    /// Renders the report to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or serialization fails.
    fn render(&self, report: &AuditReport, out: &mut dyn Write) -> Result<(), RenderError>;
}

type RendererFactory = fn() -> Box<dyn Renderer>;

static RENDERERS: &[(&str, RendererFactory)] = &[("txt", text_renderer), ("json", json_renderer)];

fn text_renderer() -> Box<dyn Renderer> {
    Box::new(TextRenderer)
}

fn json_renderer() -> Box<dyn Renderer> {
    Box::new(JsonRenderer)
}

/// Returns every registered format key.
#[must_use]
pub fn supported_formats() -> Vec<&'static str> {
    RENDERERS.iter().map(|(key, _)| *key).collect()
}

/// Looks up the renderer registered under `format`.
///
/// # Errors
///
/// Returns [`RenderError::UnsupportedFormat`] for an unknown key.
pub fn renderer_for(format: &str) -> Result<Box<dyn Renderer>, RenderError> {
    RENDERERS
        .iter()
        .find(|(key, _)| *key == format)
        .map(|(_, factory)| factory())
        .ok_or_else(|| RenderError::UnsupportedFormat {
            format: format.to_string(),
            supported: supported_formats(),
        })
}

const RULE: &str = "------------------------------------------------------------";

/// Human-readable report, one block per template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn render_template(result: &TemplateResults, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "{RULE}")?;
        writeln!(out, "{}", result.filename().display())?;

        for violation in result.file_results.violations() {
            writeln!(out, "{RULE}")?;
            Self::render_violation(violation, out)?;
        }

        writeln!(out)?;
        writeln!(out, "Failures count: {}", result.file_results.failure_count())?;
        writeln!(out, "Warnings count: {}", result.file_results.warning_count())?;
        Ok(())
    }

    fn render_violation(violation: &Violation, out: &mut dyn Write) -> std::io::Result<()> {
        let label = if violation.is_failing() { "FAIL" } else { "WARN" };
        writeln!(out, "| {label} {}", violation.id())?;
        writeln!(out, "|")?;
        if !violation.logical_resource_ids().is_empty() {
            writeln!(
                out,
                "| Resources: [{}]",
                violation.logical_resource_ids().join(", ")
            )?;
            writeln!(out, "|")?;
        }
        writeln!(out, "| {}", violation.message())?;
        Ok(())
    }
}

impl Renderer for TextRenderer {
    fn render(&self, report: &AuditReport, out: &mut dyn Write) -> Result<(), RenderError> {
        for result in report.results() {
            Self::render_template(result, out)?;
        }
        Ok(())
    }
}

/// Machine-readable report: a JSON array of per-template results.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, report: &AuditReport, out: &mut dyn Write) -> Result<(), RenderError> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        Ok(())
    }
}
