//! Element search by query string and filter type.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::command::{CommandError, HostCommand};
use crate::host::HostSession;
use crate::host::document::{BuiltInCategory, Element, ElementId, Location};

const DEFAULT_LIMIT: usize = 100;

/// `get_element_id`: find elements matching a query string, optionally
/// restricted to one category.
pub struct ElementSearchCommand;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    query: String,
    filter_type: FilterType,
    limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            filter_type: FilterType::All,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FilterType {
    All,
    Walls,
    Doors,
    Windows,
    Furniture,
    #[serde(alias = "volumeofinterest")]
    Scopebox,
    Levels,
    Views,
    Grids,
}

impl FilterType {
    fn category(self) -> Option<BuiltInCategory> {
        match self {
            Self::All => None,
            Self::Walls => Some(BuiltInCategory::Walls),
            Self::Doors => Some(BuiltInCategory::Doors),
            Self::Windows => Some(BuiltInCategory::Windows),
            Self::Furniture => Some(BuiltInCategory::Furniture),
            Self::Scopebox => Some(BuiltInCategory::VolumeOfInterest),
            Self::Levels => Some(BuiltInCategory::Levels),
            Self::Views => Some(BuiltInCategory::Views),
            Self::Grids => Some(BuiltInCategory::Grids),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ElementInfo {
    id: ElementId,
    unique_id: String,
    name: String,
    category: String,
    properties: BTreeMap<String, String>,
}

/// Parameters surfaced for every element, when present.
const COMMON_PARAMETERS: [&str; 5] = ["Comments", "Mark", "Level", "Family", "Type"];

impl ElementInfo {
    fn from_element(element: &Element) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("ElementId".to_string(), element.id.to_string());

        match element.location {
            Some(Location::Point { x, y, z }) => {
                properties.insert("LocationX".to_string(), format!("{x:.2}"));
                properties.insert("LocationY".to_string(), format!("{y:.2}"));
                properties.insert("LocationZ".to_string(), format!("{z:.2}"));
            }
            Some(location @ Location::Curve { start, end }) => {
                properties.insert(
                    "Start".to_string(),
                    format!("{:.2}, {:.2}, {:.2}", start[0], start[1], start[2]),
                );
                properties.insert(
                    "End".to_string(),
                    format!("{:.2}, {:.2}, {:.2}", end[0], end[1], end[2]),
                );
                if let Some(length) = location.length() {
                    properties.insert("Length".to_string(), format!("{length:.2}"));
                }
            }
            None => {}
        }

        for name in COMMON_PARAMETERS {
            if let Some(value) = element.parameters.get(name) {
                properties.insert(name.to_string(), value.display());
            }
        }

        // Scope boxes expose their full parameter set.
        if element.category == BuiltInCategory::VolumeOfInterest {
            for (name, value) in &element.parameters {
                properties
                    .entry(name.clone())
                    .or_insert_with(|| value.display());
            }
        }

        Self {
            id: element.id,
            unique_id: element.unique_id.clone(),
            name: element.name.clone(),
            category: element.category.display_name().to_string(),
            properties,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    elements: Vec<ElementInfo>,
    count: usize,
}

fn matches_query(element: &Element, query: &str) -> bool {
    if element.name.to_lowercase().contains(query) {
        return true;
    }
    if element
        .category
        .display_name()
        .to_lowercase()
        .contains(query)
    {
        return true;
    }
    element.parameters.values().any(|value| {
        value
            .as_text()
            .is_some_and(|text| text.to_lowercase().contains(query))
    })
}

impl HostCommand for ElementSearchCommand {
    fn name(&self) -> &'static str {
        "get_element_id"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn parameter_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "filterType": {
                    "enum": [
                        "all", "walls", "doors", "windows", "furniture",
                        "scopebox", "volumeofinterest", "levels", "views", "grids"
                    ]
                },
                "limit": { "type": "integer", "minimum": 1 },
            }
        }))
    }

    fn run(&self, parameters: Value, host: &mut HostSession) -> Result<Value, CommandError> {
        let params: SearchParams = serde_json::from_value(parameters)?;
        let query = params.query.to_lowercase();
        let category = params.filter_type.category();
        let document = host.require_document()?;

        let mut elements = Vec::new();
        for element in document.instances() {
            // Deleted elements keep an invalid id; skip them.
            if element.id <= 0 {
                continue;
            }
            if let Some(category) = category
                && element.category != category
            {
                continue;
            }
            if !query.is_empty() && !matches_query(element, &query) {
                continue;
            }

            elements.push(ElementInfo::from_element(element));
            if elements.len() >= params.limit {
                break;
            }
        }

        let count = elements.len();
        serde_json::to_value(SearchResult { elements, count })
            .map_err(|err| CommandError::failed(err.to_string()))
    }
}
