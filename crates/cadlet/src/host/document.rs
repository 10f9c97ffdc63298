//! In-memory model of the host document.
//!
//! Carries just enough state for the access commands to be real: elements
//! with categories, parameters and locations, review warnings, and views
//! with per-view visibility state. The real host owns the equivalent data
//! behind its API; here it lives behind the executor thread and is only ever
//! touched by commands.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

pub type ElementId = i64;

/// Built-in host categories, keyed by their `OST_*` names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltInCategory {
    Walls,
    Doors,
    Windows,
    Furniture,
    Columns,
    Floors,
    Roofs,
    Stairs,
    StructuralFraming,
    Ceilings,
    MepSpaces,
    Rooms,
    VolumeOfInterest,
    Levels,
    Views,
    Grids,
    Dimensions,
    TextNotes,
    GenericAnnotation,
    WallTags,
    DoorTags,
    WindowTags,
    RoomTags,
    AreaTags,
    SpaceTags,
    ViewportLabels,
    TitleBlocks,
}

impl BuiltInCategory {
    /// Model categories targeted when a visibility call names none.
    pub const DEFAULT_MODEL: &'static [Self] = &[
        Self::Walls,
        Self::Doors,
        Self::Windows,
        Self::Furniture,
        Self::Columns,
        Self::Floors,
        Self::Roofs,
        Self::Stairs,
        Self::StructuralFraming,
        Self::Ceilings,
        Self::MepSpaces,
        Self::Rooms,
    ];

    /// Annotation categories targeted when a visibility call names none.
    pub const DEFAULT_ANNOTATION: &'static [Self] = &[
        Self::Dimensions,
        Self::TextNotes,
        Self::GenericAnnotation,
        Self::WallTags,
        Self::DoorTags,
        Self::WindowTags,
        Self::RoomTags,
        Self::AreaTags,
        Self::SpaceTags,
        Self::ViewportLabels,
        Self::TitleBlocks,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Walls => "OST_Walls",
            Self::Doors => "OST_Doors",
            Self::Windows => "OST_Windows",
            Self::Furniture => "OST_Furniture",
            Self::Columns => "OST_Columns",
            Self::Floors => "OST_Floors",
            Self::Roofs => "OST_Roofs",
            Self::Stairs => "OST_Stairs",
            Self::StructuralFraming => "OST_StructuralFraming",
            Self::Ceilings => "OST_Ceilings",
            Self::MepSpaces => "OST_MEPSpaces",
            Self::Rooms => "OST_Rooms",
            Self::VolumeOfInterest => "OST_VolumeOfInterest",
            Self::Levels => "OST_Levels",
            Self::Views => "OST_Views",
            Self::Grids => "OST_Grids",
            Self::Dimensions => "OST_Dimensions",
            Self::TextNotes => "OST_TextNotes",
            Self::GenericAnnotation => "OST_GenericAnnotation",
            Self::WallTags => "OST_WallTags",
            Self::DoorTags => "OST_DoorTags",
            Self::WindowTags => "OST_WindowTags",
            Self::RoomTags => "OST_RoomTags",
            Self::AreaTags => "OST_AreaTags",
            Self::SpaceTags => "OST_SpaceTags",
            Self::ViewportLabels => "OST_ViewportLabels",
            Self::TitleBlocks => "OST_TitleBlocks",
        }
    }

    /// Category name as the host displays it to users.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Walls => "Walls",
            Self::Doors => "Doors",
            Self::Windows => "Windows",
            Self::Furniture => "Furniture",
            Self::Columns => "Columns",
            Self::Floors => "Floors",
            Self::Roofs => "Roofs",
            Self::Stairs => "Stairs",
            Self::StructuralFraming => "Structural Framing",
            Self::Ceilings => "Ceilings",
            Self::MepSpaces => "Spaces",
            Self::Rooms => "Rooms",
            Self::VolumeOfInterest => "Volumes",
            Self::Levels => "Levels",
            Self::Views => "Views",
            Self::Grids => "Grids",
            Self::Dimensions => "Dimensions",
            Self::TextNotes => "Text Notes",
            Self::GenericAnnotation => "Generic Annotations",
            Self::WallTags => "Wall Tags",
            Self::DoorTags => "Door Tags",
            Self::WindowTags => "Window Tags",
            Self::RoomTags => "Room Tags",
            Self::AreaTags => "Area Tags",
            Self::SpaceTags => "Space Tags",
            Self::ViewportLabels => "Viewport Labels",
            Self::TitleBlocks => "Title Blocks",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let all = [
            Self::Walls,
            Self::Doors,
            Self::Windows,
            Self::Furniture,
            Self::Columns,
            Self::Floors,
            Self::Roofs,
            Self::Stairs,
            Self::StructuralFraming,
            Self::Ceilings,
            Self::MepSpaces,
            Self::Rooms,
            Self::VolumeOfInterest,
            Self::Levels,
            Self::Views,
            Self::Grids,
            Self::Dimensions,
            Self::TextNotes,
            Self::GenericAnnotation,
            Self::WallTags,
            Self::DoorTags,
            Self::WindowTags,
            Self::RoomTags,
            Self::AreaTags,
            Self::SpaceTags,
            Self::ViewportLabels,
            Self::TitleBlocks,
        ];
        all.into_iter().find(|category| category.key() == key)
    }
}

impl std::fmt::Display for BuiltInCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for BuiltInCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for BuiltInCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Self::parse(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown built-in category `{key}`")))
    }
}

/// A single element parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl ParameterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Render the way the host formats property values (two decimals for
    /// numbers).
    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Number(value) => format!("{value:.2}"),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Point { x: f64, y: f64, z: f64 },
    Curve { start: [f64; 3], end: [f64; 3] },
}

impl Location {
    pub fn length(&self) -> Option<f64> {
        match self {
            Self::Point { .. } => None,
            Self::Curve { start, end } => {
                let dx = end[0] - start[0];
                let dy = end[1] - start[1];
                let dz = end[2] - start[2];
                Some((dx * dx + dy * dy + dz * dz).sqrt())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub unique_id: String,
    pub name: String,
    pub category: BuiltInCategory,
    #[serde(default)]
    pub is_element_type: bool,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Element {
    pub fn new(id: ElementId, name: impl Into<String>, category: BuiltInCategory) -> Self {
        Self {
            id,
            unique_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            category,
            is_element_type: false,
            type_name: None,
            parameters: BTreeMap::new(),
            location: None,
        }
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn as_element_type(mut self) -> Self {
        self.is_element_type = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Warning,
    Error,
}

impl WarningSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

/// A review warning raised by the host against one or more elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub description: String,
    pub severity: WarningSeverity,
    #[serde(default)]
    pub failing_elements: Vec<ElementId>,
}

impl Warning {
    pub fn new(
        description: impl Into<String>,
        severity: WarningSeverity,
        failing_elements: Vec<ElementId>,
    ) -> Self {
        Self {
            description: description.into(),
            severity,
            failing_elements,
        }
    }
}

/// Per-view visibility state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub id: ElementId,
    pub name: String,
    #[serde(default)]
    hidden: HashSet<ElementId>,
    #[serde(default)]
    overridden: HashSet<ElementId>,
    /// When set, only these elements are visible (temporary hide/isolate
    /// mode).
    #[serde(default)]
    temporary_isolation: Option<HashSet<ElementId>>,
}

impl View {
    pub fn new(id: ElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hidden: HashSet::new(),
            overridden: HashSet::new(),
            temporary_isolation: None,
        }
    }

    pub fn hide(&mut self, ids: &[ElementId]) {
        self.hidden.extend(ids.iter().copied());
    }

    pub fn unhide(&mut self, ids: &[ElementId]) {
        for id in ids {
            self.hidden.remove(id);
        }
    }

    pub fn clear_hidden(&mut self) {
        self.hidden.clear();
    }

    pub fn isolate_temporary(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.temporary_isolation = Some(ids.into_iter().collect());
    }

    pub fn disable_temporary_mode(&mut self) {
        self.temporary_isolation = None;
    }

    pub fn temporary_mode_active(&self) -> bool {
        self.temporary_isolation.is_some()
    }

    pub fn set_override(&mut self, id: ElementId) {
        self.overridden.insert(id);
    }

    pub fn clear_overrides(&mut self) {
        self.overridden.clear();
    }

    pub fn has_override(&self, id: ElementId) -> bool {
        self.overridden.contains(&id)
    }

    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Effective visibility: not hidden, and inside the temporary isolation
    /// set when that mode is active.
    pub fn is_visible(&self, id: ElementId) -> bool {
        if self.hidden.contains(&id) {
            return false;
        }
        match &self.temporary_isolation {
            Some(isolated) => isolated.contains(&id),
            None => true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The open host document: elements, warnings, and views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DocumentData", into = "DocumentData")]
pub struct Document {
    title: String,
    elements: BTreeMap<ElementId, Element>,
    warnings: Vec<Warning>,
    views: BTreeMap<ElementId, View>,
    active_view: Option<ElementId>,
}

/// Flat serialized form, friendlier for hand-written model fixtures.
#[derive(Serialize, Deserialize)]
struct DocumentData {
    title: String,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    warnings: Vec<Warning>,
    #[serde(default)]
    views: Vec<View>,
    #[serde(default)]
    active_view: Option<ElementId>,
}

impl From<DocumentData> for Document {
    fn from(data: DocumentData) -> Self {
        let first_view = data.views.first().map(|view| view.id);
        Self {
            title: data.title,
            elements: data
                .elements
                .into_iter()
                .map(|element| (element.id, element))
                .collect(),
            warnings: data.warnings,
            views: data.views.into_iter().map(|view| (view.id, view)).collect(),
            active_view: data.active_view.or(first_view),
        }
    }
}

impl From<Document> for DocumentData {
    fn from(document: Document) -> Self {
        Self {
            title: document.title,
            elements: document.elements.into_values().collect(),
            warnings: document.warnings,
            views: document.views.into_values().collect(),
            active_view: document.active_view,
        }
    }
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            elements: BTreeMap::new(),
            warnings: Vec::new(),
            views: BTreeMap::new(),
            active_view: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn insert_element(&mut self, element: Element) {
        self.elements.insert(element.id, element);
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Every element, ordered by id.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Placed elements only (element types filtered out), ordered by id.
    pub fn instances(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .values()
            .filter(|element| !element.is_element_type)
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Register a view. The first registered view becomes active.
    pub fn add_view(&mut self, view: View) {
        let id = view.id;
        self.views.insert(id, view);
        if self.active_view.is_none() {
            self.active_view = Some(id);
        }
    }

    pub fn set_active_view(&mut self, id: ElementId) -> bool {
        if self.views.contains_key(&id) {
            self.active_view = Some(id);
            true
        } else {
            false
        }
    }

    pub fn active_view(&self) -> Option<&View> {
        self.active_view.and_then(|id| self.views.get(&id))
    }

    pub fn active_view_mut(&mut self) -> Option<&mut View> {
        let id = self.active_view?;
        self.views.get_mut(&id)
    }

    /// Run `op` atomically: on error or unwind the document is restored to
    /// its prior state before the result propagates.
    pub fn transaction<T, E>(
        &mut self,
        name: &str,
        op: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        tracing::debug!(transaction = name, "transaction started");
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| op(self))) {
            Ok(Ok(value)) => {
                tracing::debug!(transaction = name, "transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                *self = snapshot;
                tracing::debug!(transaction = name, "transaction rolled back");
                Err(err)
            }
            Err(panic) => {
                *self = snapshot;
                tracing::error!(transaction = name, "transaction aborted by panic");
                std::panic::resume_unwind(panic);
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Small demo model used by `cadletd` when no model file is given.
    pub fn sample() -> Self {
        let mut document = Document::new("Sample House");

        document.insert_element(Element::new(10, "Level 1", BuiltInCategory::Levels));
        document.insert_element(Element::new(20, "A", BuiltInCategory::Grids));
        document.insert_element(Element::new(21, "B", BuiltInCategory::Grids));

        document.insert_element(
            Element::new(101, "Basic Wall - Generic 200mm", BuiltInCategory::Walls)
                .with_type_name("Generic 200mm")
                .with_parameter("Mark", "W-01")
                .with_parameter("Comments", "exterior")
                .with_parameter("Level", "Level 1")
                .with_location(Location::Curve {
                    start: [0.0, 0.0, 0.0],
                    end: [8.0, 0.0, 0.0],
                }),
        );
        document.insert_element(
            Element::new(102, "Basic Wall - Generic 200mm", BuiltInCategory::Walls)
                .with_type_name("Generic 200mm")
                .with_parameter("Mark", "W-02")
                .with_parameter("Comments", "exterior")
                .with_location(Location::Curve {
                    start: [8.0, 0.0, 0.0],
                    end: [8.0, 6.0, 0.0],
                }),
        );
        document.insert_element(
            Element::new(103, "Interior Wall - Partition", BuiltInCategory::Walls)
                .with_type_name("Partition")
                .with_parameter("Mark", "W-03")
                .with_parameter("Comments", "interior")
                .with_location(Location::Curve {
                    start: [2.0, 0.0, 0.0],
                    end: [2.0, 6.0, 0.0],
                }),
        );

        document.insert_element(
            Element::new(201, "Single-Flush 0915 x 2134mm", BuiltInCategory::Doors)
                .with_type_name("Single-Flush")
                .with_parameter("Mark", "D-01")
                .with_location(Location::Point {
                    x: 4.0,
                    y: 0.0,
                    z: 0.0,
                }),
        );
        document.insert_element(
            Element::new(301, "Fixed 0915 x 1220mm", BuiltInCategory::Windows)
                .with_type_name("Fixed")
                .with_parameter("Mark", "D-01")
                .with_location(Location::Point {
                    x: 6.0,
                    y: 0.0,
                    z: 1.0,
                }),
        );
        document.insert_element(
            Element::new(401, "Desk 1525 x 762mm", BuiltInCategory::Furniture)
                .with_type_name("Desk")
                .with_location(Location::Point {
                    x: 3.0,
                    y: 3.0,
                    z: 0.0,
                }),
        );
        document.insert_element(
            Element::new(501, "Scope Box 1", BuiltInCategory::VolumeOfInterest)
                .with_parameter("Name", "Scope Box 1")
                .with_parameter("Height", 3.5),
        );

        // An element type, invisible to instance queries.
        document.insert_element(
            Element::new(900, "Generic 200mm", BuiltInCategory::Walls).as_element_type(),
        );

        document.insert_element(Element::new(
            1000,
            "Level 1 Floor Plan",
            BuiltInCategory::Views,
        ));
        document.add_view(View::new(1000, "Level 1 Floor Plan"));

        document.add_warning(Warning::new(
            "Elements have duplicate 'Mark' values.",
            WarningSeverity::Warning,
            vec![201, 301],
        ));
        document.add_warning(Warning::new(
            "Elements have duplicate 'Mark' values.",
            WarningSeverity::Warning,
            vec![102, 103],
        ));
        document.add_warning(Warning::new(
            "Wall is slightly off axis and may cause inaccuracies.",
            WarningSeverity::Warning,
            vec![101],
        ));

        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keys_round_trip() {
        for category in BuiltInCategory::DEFAULT_MODEL
            .iter()
            .chain(BuiltInCategory::DEFAULT_ANNOTATION)
        {
            assert_eq!(BuiltInCategory::parse(category.key()), Some(*category));
        }
        assert_eq!(BuiltInCategory::parse("OST_Nonsense"), None);
    }

    #[test]
    fn parameter_values_display_like_the_host() {
        assert_eq!(ParameterValue::from("exterior").display(), "exterior");
        assert_eq!(ParameterValue::from(42i64).display(), "42");
        assert_eq!(ParameterValue::from(3.14159).display(), "3.14");
    }

    #[test]
    fn curve_length() {
        let location = Location::Curve {
            start: [0.0, 0.0, 0.0],
            end: [3.0, 4.0, 0.0],
        };
        assert_eq!(location.length(), Some(5.0));

        let point = Location::Point {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        };
        assert_eq!(point.length(), None);
    }

    #[test]
    fn instances_skip_element_types() {
        let document = Document::sample();
        assert!(document.elements().any(|element| element.is_element_type));
        assert!(document.instances().all(|element| !element.is_element_type));
    }

    #[test]
    fn first_view_becomes_active() {
        let mut document = Document::new("Test");
        document.add_view(View::new(1, "Plan"));
        document.add_view(View::new(2, "Section"));
        assert_eq!(document.active_view().map(|view| view.id), Some(1));

        assert!(document.set_active_view(2));
        assert_eq!(document.active_view().map(|view| view.id), Some(2));
        assert!(!document.set_active_view(99));
    }

    #[test]
    fn visibility_honors_temporary_isolation() {
        let mut view = View::new(1, "Plan");
        assert!(view.is_visible(101));

        view.hide(&[101]);
        assert!(!view.is_visible(101));
        view.unhide(&[101]);
        assert!(view.is_visible(101));

        view.isolate_temporary([101]);
        assert!(view.is_visible(101));
        assert!(!view.is_visible(102));
        view.disable_temporary_mode();
        assert!(view.is_visible(102));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut document = Document::sample();
        let result: Result<(), &str> = document.transaction("test", |doc| {
            if let Some(view) = doc.active_view_mut() {
                view.hide(&[101, 102]);
            }
            Err("boom")
        });
        assert!(result.is_err());
        let view = document.active_view().expect("sample has a view");
        assert_eq!(view.hidden_count(), 0);
    }

    #[test]
    fn transaction_commits_on_success() {
        let mut document = Document::sample();
        let result: Result<(), &str> = document.transaction("test", |doc| {
            if let Some(view) = doc.active_view_mut() {
                view.hide(&[101]);
            }
            Ok(())
        });
        assert!(result.is_ok());
        let view = document.active_view().expect("sample has a view");
        assert!(view.is_hidden(101));
    }

    #[test]
    fn document_json_round_trips() {
        let document = Document::sample();
        let json = serde_json::to_string(&document).unwrap();
        let loaded = Document::from_json(&json).unwrap();

        assert_eq!(loaded.title(), document.title());
        assert_eq!(loaded.elements().count(), document.elements().count());
        assert_eq!(loaded.warnings().len(), document.warnings().len());
        assert_eq!(
            loaded.active_view().map(|view| view.id),
            document.active_view().map(|view| view.id)
        );
    }

    #[test]
    fn document_loads_from_a_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            serde_json::to_string_pretty(&Document::sample()).unwrap(),
        )
        .unwrap();

        let loaded = Document::from_path(&path).unwrap();
        assert_eq!(loaded.title(), "Sample House");
    }

    #[test]
    fn fixture_parsing_reports_bad_categories() {
        let err = Document::from_json(
            r#"{"title": "Bad", "elements": [{"id": 1, "unique_id": "u", "name": "x", "category": "OST_Bogus"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("OST_Bogus"));
    }
}
