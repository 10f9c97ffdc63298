//! Review warning retrieval and grouping.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::command::{CommandError, HostCommand};
use crate::host::HostSession;
use crate::host::document::{Document, Warning};

/// `get_warnings`: report the document's review warnings, grouped by
/// description.
pub struct GetWarningsCommand;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WarningsParams {
    warning_type_filter: Vec<String>,
    include_element_ids: bool,
    /// 0 means unlimited. Applied before grouping.
    limit: usize,
}

impl Default for WarningsParams {
    fn default() -> Self {
        Self {
            warning_type_filter: Vec::new(),
            include_element_ids: true,
            limit: 0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WarningsResult {
    model_name: String,
    total_warning_count: usize,
    filtered_warning_count: usize,
    warning_groups: Vec<WarningGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WarningGroup {
    description: String,
    count: usize,
    severity: String,
    total_failing_element_count: usize,
    /// Omitted (null) when the caller asked for counts only.
    warnings: Option<Vec<WarningDetail>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WarningDetail {
    description: String,
    failing_elements: Vec<FailingElement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FailingElement {
    id: String,
    category: String,
    name: String,
    type_name: String,
}

fn failing_element(document: &Document, id: i64) -> FailingElement {
    match document.element(id) {
        Some(element) => FailingElement {
            id: id.to_string(),
            category: element.category.display_name().to_string(),
            name: element.name.clone(),
            type_name: element
                .type_name
                .clone()
                .unwrap_or_else(|| element.name.clone()),
        },
        None => FailingElement {
            id: id.to_string(),
            category: "Unknown".to_string(),
            name: "Unknown".to_string(),
            type_name: "Unknown".to_string(),
        },
    }
}

fn warning_detail(document: &Document, warning: &Warning) -> WarningDetail {
    WarningDetail {
        description: warning.description.clone(),
        failing_elements: warning
            .failing_elements
            .iter()
            .map(|id| failing_element(document, *id))
            .collect(),
    }
}

impl HostCommand for GetWarningsCommand {
    fn name(&self) -> &'static str {
        "get_warnings"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "warningTypeFilter": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "includeElementIds": { "type": "boolean" },
                "limit": { "type": "integer", "minimum": 0 },
            }
        }))
    }

    fn run(&self, parameters: Value, host: &mut HostSession) -> Result<Value, CommandError> {
        let params: WarningsParams = serde_json::from_value(parameters)?;
        let document = host.require_document()?;

        let all = document.warnings();
        let filters: Vec<String> = params
            .warning_type_filter
            .iter()
            .map(|filter| filter.to_lowercase())
            .collect();

        let mut filtered: Vec<&Warning> = all
            .iter()
            .filter(|warning| {
                filters.is_empty() || {
                    let description = warning.description.to_lowercase();
                    filters.iter().any(|filter| description.contains(filter))
                }
            })
            .collect();
        if params.limit > 0 && filtered.len() > params.limit {
            filtered.truncate(params.limit);
        }
        let filtered_count = filtered.len();

        // Group by description, first-seen order.
        let mut grouped: Vec<(String, Vec<&Warning>)> = Vec::new();
        for warning in filtered {
            match grouped
                .iter_mut()
                .find(|(description, _)| *description == warning.description)
            {
                Some((_, members)) => members.push(warning),
                None => grouped.push((warning.description.clone(), vec![warning])),
            }
        }

        let mut warning_groups: Vec<WarningGroup> = grouped
            .into_iter()
            .map(|(description, members)| WarningGroup {
                count: members.len(),
                severity: members
                    .first()
                    .map_or("Warning", |warning| warning.severity.as_str())
                    .to_string(),
                total_failing_element_count: members
                    .iter()
                    .map(|warning| warning.failing_elements.len())
                    .sum(),
                warnings: params.include_element_ids.then(|| {
                    members
                        .iter()
                        .map(|warning| warning_detail(document, warning))
                        .collect()
                }),
                description,
            })
            .collect();
        // Stable sort keeps first-seen order within equal counts.
        warning_groups.sort_by(|a, b| b.count.cmp(&a.count));

        serde_json::to_value(WarningsResult {
            model_name: document.title().to_string(),
            total_warning_count: all.len(),
            filtered_warning_count: filtered_count,
            warning_groups,
        })
        .map_err(|err| CommandError::failed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::document::Document;

    fn run(session: &mut HostSession, parameters: Value) -> Value {
        GetWarningsCommand.run(parameters, session).unwrap()
    }

    #[test]
    fn groups_by_description_ordered_by_count() {
        let mut session = HostSession::new(Document::sample());
        let result = run(&mut session, json!({}));

        assert_eq!(result["ModelName"], json!("Sample House"));
        assert_eq!(result["TotalWarningCount"], json!(3));
        assert_eq!(result["FilteredWarningCount"], json!(3));

        let groups = result["WarningGroups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0]["Description"],
            json!("Elements have duplicate 'Mark' values.")
        );
        assert_eq!(groups[0]["Count"], json!(2));
        assert_eq!(groups[0]["TotalFailingElementCount"], json!(4));
        assert_eq!(groups[0]["Severity"], json!("Warning"));
        assert_eq!(groups[1]["Count"], json!(1));
    }

    #[test]
    fn includes_failing_element_details_by_default() {
        let mut session = HostSession::new(Document::sample());
        let result = run(&mut session, json!({}));

        let details = result["WarningGroups"][0]["Warnings"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        let first = &details[0]["FailingElements"][0];
        assert_eq!(first["Id"], json!("201"));
        assert_eq!(first["Category"], json!("Doors"));
        assert_eq!(first["TypeName"], json!("Single-Flush"));
    }

    #[test]
    fn counts_only_when_element_ids_excluded() {
        let mut session = HostSession::new(Document::sample());
        let result = run(&mut session, json!({"includeElementIds": false}));
        assert_eq!(result["WarningGroups"][0]["Warnings"], Value::Null);
    }

    #[test]
    fn filters_by_description_substring() {
        let mut session = HostSession::new(Document::sample());
        let result = run(
            &mut session,
            json!({"warningTypeFilter": ["off axis"], "includeElementIds": false}),
        );

        assert_eq!(result["TotalWarningCount"], json!(3));
        assert_eq!(result["FilteredWarningCount"], json!(1));
        let groups = result["WarningGroups"].as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert!(
            groups[0]["Description"]
                .as_str()
                .unwrap()
                .contains("off axis")
        );
    }

    #[test]
    fn limit_applies_before_grouping() {
        let mut session = HostSession::new(Document::sample());
        let result = run(&mut session, json!({"limit": 1, "includeElementIds": false}));
        assert_eq!(result["FilteredWarningCount"], json!(1));
        assert_eq!(result["WarningGroups"].as_array().unwrap().len(), 1);
        assert_eq!(result["WarningGroups"][0]["Count"], json!(1));
    }

    #[test]
    fn unknown_failing_elements_are_reported_as_unknown() {
        let mut document = Document::new("Orphans");
        document.add_warning(Warning::new(
            "Element is orphaned.",
            crate::host::document::WarningSeverity::Error,
            vec![999],
        ));
        let mut session = HostSession::new(document);

        let result = run(&mut session, json!({}));
        let first = &result["WarningGroups"][0]["FailingElements"];
        assert!(first.is_null());
        let detail = &result["WarningGroups"][0]["Warnings"][0]["FailingElements"][0];
        assert_eq!(detail["Category"], json!("Unknown"));
        assert_eq!(result["WarningGroups"][0]["Severity"], json!("Error"));
    }

    #[test]
    fn requires_an_open_document() {
        let mut session = HostSession::empty();
        let err = GetWarningsCommand.run(json!({}), &mut session).unwrap_err();
        assert_eq!(err.to_string(), "No active document found.");
    }
}
