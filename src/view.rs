//! What the user surface shows for a given workflow state.

use std::fmt::Write as _;

use crate::state_machine::CaptionWorkflow;

pub const EMPTY_RESULTS_HINT: &str = "Results will appear here after generation.";
pub const LOADING_HINT: &str = "Generating alt text...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsPanel {
    Loading,
    Caption {
        preview: Option<String>,
        lines: Vec<String>,
    },
    Empty,
    /// Nothing to show beside the error message.
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub inputs_enabled: bool,
    pub submit_enabled: bool,
    pub cancel_enabled: bool,
    pub submit_label: &'static str,
}

pub fn results_panel(workflow: &CaptionWorkflow) -> ResultsPanel {
    if workflow.is_busy() {
        return ResultsPanel::Loading;
    }
    if let Some(result) = workflow.result() {
        return ResultsPanel::Caption {
            preview: workflow.preview().map(str::to_string),
            lines: result.display_lines(),
        };
    }
    if workflow.error().is_none() && workflow.preview().is_none() {
        ResultsPanel::Empty
    } else {
        ResultsPanel::Hidden
    }
}

pub fn controls(workflow: &CaptionWorkflow) -> Controls {
    let busy = workflow.is_busy();
    Controls {
        inputs_enabled: !busy,
        submit_enabled: !busy && !workflow.credential().is_empty() && workflow.file().is_some(),
        cancel_enabled: !busy,
        submit_label: if busy { "Generating..." } else { "Generate" },
    }
}

/// Plain-text rendering of the whole surface.
pub fn render(workflow: &CaptionWorkflow) -> String {
    let mut out = String::new();
    let credential = if workflow.credential().is_empty() {
        "(not set)"
    } else {
        "********"
    };
    let file = workflow
        .file()
        .map(|file| format!("{} ({}, {} bytes)", file.name, file.media_type, file.len()))
        .unwrap_or_else(|| "(none)".to_string());
    let controls = controls(workflow);

    let _ = writeln!(out, "State:      {}", workflow.state().label());
    let _ = writeln!(out, "API key:    {credential}");
    let _ = writeln!(out, "Image:      {file}");
    if let Some(error) = workflow.error() {
        let _ = writeln!(out, "Error:      {error}");
    }
    let _ = writeln!(
        out,
        "Actions:    [{}{}] [Cancel{}]",
        controls.submit_label,
        if controls.submit_enabled { "" } else { " (disabled)" },
        if controls.cancel_enabled { "" } else { " (disabled)" },
    );

    match results_panel(workflow) {
        ResultsPanel::Loading => {
            let _ = writeln!(out, "{LOADING_HINT}");
        }
        ResultsPanel::Caption { preview, lines } => {
            let _ = writeln!(out, "Result");
            if let Some(preview) = preview {
                let _ = writeln!(out, "  Preview:  {preview}");
            }
            let _ = writeln!(out, "  Generated Alt Text:");
            for line in lines {
                let _ = writeln!(out, "    {line}");
            }
        }
        ResultsPanel::Empty => {
            let _ = writeln!(out, "{EMPTY_RESULTS_HINT}");
        }
        ResultsPanel::Hidden => {}
    }
    out
}
