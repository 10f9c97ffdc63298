//! Hide, show, isolate, and reset element visibility in the active view.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::command::{CommandError, HostCommand};
use crate::host::HostSession;
use crate::host::document::{BuiltInCategory, ElementId};

const DEFAULT_LIMIT: usize = 1000;

/// `hide_isolate_elements`: change element visibility in the active view,
/// targeting explicit ids or whole categories.
pub struct HideIsolateCommand;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VisibilityParams {
    element_ids: Vec<ElementId>,
    model_category_list: Vec<String>,
    annotation_category_list: Vec<String>,
    operation: Operation,
    temporary: bool,
    limit: usize,
}

impl Default for VisibilityParams {
    fn default() -> Self {
        Self {
            element_ids: Vec::new(),
            model_category_list: Vec::new(),
            annotation_category_list: Vec::new(),
            operation: Operation::Hide,
            temporary: true,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Hide,
    Show,
    Isolate,
    Reset,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Isolate => "isolate",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct VisibilityResult {
    view_id: ElementId,
    view_name: String,
    operation: String,
    temporary: bool,
    /// -1 signals a full reset rather than a per-element count.
    affected_elements_count: i64,
    processed_element_ids: Vec<ElementId>,
}

/// Parse the caller's category names, falling back to the given defaults when
/// the list is empty. Unparseable names are skipped.
fn parse_categories(names: &[String], defaults: &[BuiltInCategory]) -> Vec<BuiltInCategory> {
    if names.is_empty() {
        return defaults.to_vec();
    }
    names
        .iter()
        .filter_map(|name| BuiltInCategory::parse(name))
        .collect()
}

impl HostCommand for HideIsolateCommand {
    fn name(&self) -> &'static str {
        "hide_isolate_elements"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "elementIds": {
                    "type": "array",
                    "items": { "type": "integer" }
                },
                "modelCategoryList": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "annotationCategoryList": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "operation": { "enum": ["hide", "show", "isolate", "reset"] },
                "temporary": { "type": "boolean" },
                "limit": { "type": "integer", "minimum": 0 },
            }
        }))
    }

    fn run(&self, parameters: Value, host: &mut HostSession) -> Result<Value, CommandError> {
        let params: VisibilityParams = serde_json::from_value(parameters)?;
        let document = host.require_document_mut()?;

        let result = document.transaction("Hide/Isolate Elements", |doc| {
            let targets: Vec<ElementId> = if params.element_ids.is_empty() {
                let mut categories: HashSet<BuiltInCategory> =
                    parse_categories(&params.model_category_list, BuiltInCategory::DEFAULT_MODEL)
                        .into_iter()
                        .collect();
                categories.extend(parse_categories(
                    &params.annotation_category_list,
                    BuiltInCategory::DEFAULT_ANNOTATION,
                ));

                // When no requested name parsed, fall back to every element
                // rather than silently matching nothing.
                let mut ids: Vec<ElementId> = doc
                    .instances()
                    .filter(|element| {
                        categories.is_empty() || categories.contains(&element.category)
                    })
                    .map(|element| element.id)
                    .collect();
                if params.limit > 0 && ids.len() > params.limit {
                    ids.truncate(params.limit);
                }
                ids
            } else {
                params.element_ids.clone()
            };

            let all_instance_ids: Vec<ElementId> =
                doc.instances().map(|element| element.id).collect();

            let Some(view) = doc.active_view_mut() else {
                return Err(CommandError::failed("No active view found."));
            };

            let affected: i64 = match params.operation {
                Operation::Hide => {
                    view.hide(&targets);
                    targets.len() as i64
                }
                Operation::Show => {
                    view.unhide(&targets);
                    targets.len() as i64
                }
                Operation::Isolate => {
                    if params.temporary {
                        view.isolate_temporary(targets.iter().copied());
                    } else {
                        // Permanent isolation hides everything else.
                        let target_set: HashSet<ElementId> = targets.iter().copied().collect();
                        let others: Vec<ElementId> = all_instance_ids
                            .iter()
                            .copied()
                            .filter(|id| !target_set.contains(id))
                            .collect();
                        view.hide(&others);
                    }
                    targets.len() as i64
                }
                Operation::Reset => {
                    if params.temporary {
                        view.disable_temporary_mode();
                    } else {
                        view.clear_hidden();
                        view.clear_overrides();
                    }
                    -1
                }
            };

            Ok(VisibilityResult {
                view_id: view.id,
                view_name: view.name.clone(),
                operation: params.operation.as_str().to_string(),
                temporary: params.temporary,
                affected_elements_count: affected,
                processed_element_ids: targets,
            })
        })?;

        serde_json::to_value(result).map_err(|err| CommandError::failed(err.to_string()))
    }
}
