//! JSON manifest acquisition.
//!
//! A manifest is what an external harvester writes after reading entity
//! declarations: names, doc comments, declared types and annotations, with no
//! interpretation applied.
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "name": "User",
//!       "doc": "Application users.\n@table t_user",
//!       "annotations": [{ "name": "index", "attributes": { "columns": "email", "unique": "true" } }],
//!       "fields": [
//!         { "name": "id", "type": "Long", "annotations": [{ "name": "id" }, { "name": "generated" }] },
//!         { "name": "roles", "type": "Set", "element_type": "Role",
//!           "annotations": [{ "name": "many_to_many" }] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{Annotation, EntitySource, FieldSource};

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Entity declarations.
    #[serde(default)]
    pub entities: Vec<ManifestEntity>,
}

/// One entity declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntity {
    /// Entity type name.
    pub name: String,
    /// Raw doc comment.
    #[serde(default)]
    pub doc: Option<String>,
    /// Entity-level annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Field declarations.
    #[serde(default)]
    pub fields: Vec<ManifestField>,
}

impl ManifestEntity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn field(mut self, field: ManifestField) -> Self {
        self.fields.push(field);
        self
    }
}

/// One field declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestField {
    /// Field identifier.
    pub name: String,
    /// Declared type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Generic element type of a collection.
    #[serde(default)]
    pub element_type: Option<String>,
    /// Raw doc comment.
    #[serde(default)]
    pub doc: Option<String>,
    /// Field-level annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ManifestField {
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn element(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

impl EntitySource for ManifestEntity {
    type Field = ManifestField;

    fn name(&self) -> &str {
        &self.name
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn fields(&self) -> &[ManifestField] {
        &self.fields
    }
}

impl FieldSource for ManifestField {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_manifest() {
        let json = r#"{
            "entities": [{
                "name": "User",
                "annotations": [{ "name": "table", "attributes": { "name": "t_user" } }],
                "fields": [
                    { "name": "id", "type": "Long", "annotations": [{ "name": "id" }] },
                    { "name": "roles", "type": "Set", "element_type": "Role" }
                ]
            }]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let user = &manifest.entities[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.annotations[0].attr("name"), Some("t_user"));
        assert_eq!(user.fields[0].type_name, "Long");
        assert_eq!(user.fields[1].element_type.as_deref(), Some("Role"));
        assert!(user.fields[1].annotations.is_empty());
    }
}
