//! Parameter override files.
//!
//! Reads the flat subset of the ROS 2 parameter file format that operators
//! export from a running node:
//!
//! ```yaml
//! /robot_node:
//!   ros__parameters:
//!     max_speed: 5.0
//!     waypoints:
//!     - a
//!     - b
//! ```
//!
//! All whitespace except newlines is insignificant. A line ending in `:` opens
//! a list whose `-` items are rejoined as `a,b`, which is the array text the
//! codec already understands. There are no comments, quotes or nested maps.

use std::path::Path;

use tracing::{debug, warn};

use super::codec::{CoercionMode, encode_from_text};
use super::overlay::{OverlayStore, PendingValue};
use super::store::ParameterSet;
use crate::error::LoadError;

const PARAMS_KEY: &str = "ros__parameters:";

/// One `name: value` assignment read from a parameter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEntry {
    /// 1-based line of the assignment (the list header for list values).
    pub line: usize,
    pub name: String,
    pub text: String,
}

/// What happened to the entries of a loaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub staged: Vec<String>,
    /// Names that the selected node does not have.
    pub skipped: Vec<String>,
}

pub fn read_parameter_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a parameter document into assignments for `node`.
pub fn parse_document(text: &str, node: &str) -> Result<Vec<LoadEntry>, LoadError> {
    let lines: Vec<(usize, String)> = text
        .split('\n')
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.chars().filter(|c| !c.is_whitespace()).collect()))
        .filter(|(_, line): &(usize, String)| !line.is_empty())
        .collect();

    let mut pos = skip_header(&lines, node)?;
    let mut entries = Vec::new();

    while pos < lines.len() {
        let (line_no, line) = &lines[pos];
        pos += 1;

        if line.starts_with('-') {
            return Err(LoadError::Malformed {
                line: *line_no,
                reason: format!("list item '{line}' outside of a list"),
            });
        }

        if let Some(name) = line.strip_suffix(':') {
            let name = checked_name(name, *line_no)?;
            let mut items = Vec::new();
            while let Some((_, item)) = lines.get(pos).filter(|(_, l)| l.starts_with('-')) {
                items.push(item[1..].to_string());
                pos += 1;
            }
            entries.push(LoadEntry {
                line: *line_no,
                name,
                text: items.join(","),
            });
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(LoadError::Malformed {
                line: *line_no,
                reason: format!("expected 'name: value', found '{line}'"),
            });
        };
        entries.push(LoadEntry {
            line: *line_no,
            name: checked_name(name, *line_no)?,
            text: value.to_string(),
        });
    }

    debug!(node, entries = entries.len(), "Parsed parameter document");
    Ok(entries)
}

/// Returns the index of the first body line.
fn skip_header(lines: &[(usize, String)], node: &str) -> Result<usize, LoadError> {
    let first = lines.first().map(|(_, l)| l.as_str());
    let second = lines.get(1).map(|(_, l)| l.as_str());

    match (first, second) {
        (Some(PARAMS_KEY), _) => Ok(1),
        (Some(header), Some(PARAMS_KEY)) => {
            let selector = header.strip_suffix(':').unwrap_or(header);
            if matches_node(selector, node) {
                Ok(2)
            } else {
                Err(LoadError::NodeMismatch {
                    found: selector.to_string(),
                    node: node.to_string(),
                })
            }
        }
        (Some(header), _)
            if header
                .strip_suffix(':')
                .is_some_and(|selector| same_node(selector, node)) =>
        {
            Ok(1)
        }
        _ => Ok(0),
    }
}

fn checked_name(name: &str, line: usize) -> Result<String, LoadError> {
    if name.is_empty() {
        return Err(LoadError::Malformed {
            line,
            reason: "missing parameter name".to_string(),
        });
    }
    Ok(name.to_string())
}

fn absolute(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}

fn same_node(selector: &str, node: &str) -> bool {
    absolute(selector) == absolute(node)
}

/// Check whether a node selector matches the given node name.
///
/// Selectors:
/// - `/**`: matches any node
/// - `/some_ns/**`: matches any node under `/some_ns/`
/// - `/ns/*`: matches nodes directly under `/ns/`
/// - `/node_name`: exact match
///
/// The leading `/` is optional on both sides.
fn matches_node(selector: &str, node: &str) -> bool {
    let selector = absolute(selector);
    let node = absolute(node);

    if selector == "/**" {
        return true;
    }

    if let Some(prefix) = selector.strip_suffix("/**") {
        return node.starts_with(&format!("{prefix}/"));
    }

    if let Some(prefix) = selector.strip_suffix("/*") {
        return node
            .strip_prefix(&format!("{prefix}/"))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'));
    }

    selector == node
}

/// Encode every entry against the node's current values and stage them.
///
/// Nothing is staged unless every entry encodes. Names the node does not have
/// are reported as skipped.
pub fn stage_entries(
    entries: &[LoadEntry],
    parameters: &ParameterSet,
    overlay: &mut OverlayStore,
    mode: CoercionMode,
) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    let mut encoded: Vec<(&str, PendingValue)> = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(current) = parameters.value(&entry.name) else {
            warn!(name = %entry.name, line = entry.line, "Skipping unknown parameter");
            report.skipped.push(entry.name.clone());
            continue;
        };
        let pending =
            encode_from_text(current, &entry.text, mode).map_err(|source| LoadError::Value {
                line: entry.line,
                name: entry.name.clone(),
                source,
            })?;
        encoded.push((&entry.name, pending));
    }

    for (name, pending) in encoded {
        overlay.set(name, pending);
        report.staged.push(name.to_string());
    }
    Ok(report)
}
