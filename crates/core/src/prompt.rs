//! Instruction text sent to the completion service.

use crate::types::{GenerationContext, TopicSpec};
use std::fmt::Write;

/// Build the role preamble for a context.
pub fn role_preamble(context: &GenerationContext) -> String {
    format!(
        "Act as the CSO of a {} company. Revenue: {}.",
        context.industry(),
        context.revenue()
    )
}

/// Build the full instruction for a topic.
///
/// The role preamble comes first, then the topic template, then an
/// emission context block when emission figures are available.
pub fn build_instruction(topic: &TopicSpec, context: &GenerationContext) -> String {
    let mut instruction = role_preamble(context);
    instruction.push_str("\n\n");
    instruction.push_str(topic.instruction_template.trim());

    if let Some(emissions) = context.emissions.as_ref().filter(|e| !e.is_empty()) {
        let industry = emissions
            .industry
            .as_deref()
            .unwrap_or_else(|| context.industry());
        let region = emissions.region.as_deref().unwrap_or("N/A");

        // Writing to a String cannot fail.
        let _ = write!(
            instruction,
            "\n\nContext: Current carbon emission data\n\
             - Total Emissions: {} tCO2e\n\
             - Scope 1: {} tCO2e\n\
             - Scope 2: {} tCO2e\n\
             - Industry: {}\n\
             - Region: {}",
            fmt_figure(emissions.total_tco2e),
            fmt_figure(emissions.scope1),
            fmt_figure(emissions.scope2),
            industry,
            region,
        );
    }

    instruction
}

fn fmt_figure(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => "N/A".to_string(),
    }
}

/// Instruction template for a table with two labelled rows and three columns.
pub fn table_template(table_no: usize, task: &str, rows: [&str; 2], columns: [&str; 3]) -> String {
    format!(
        "Task: Generate Table {table_no} ({task}).\n\
         Format: Pure text (||| separator).\n\
         Row 1: {}\n\
         Row 2: {}\n\
         Columns: {} ||| {} ||| {}",
        rows[0], rows[1], columns[0], columns[1], columns[2]
    )
}
