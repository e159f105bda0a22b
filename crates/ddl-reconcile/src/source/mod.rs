//! Declared-model acquisition.
//!
//! The engine never looks at how entity declarations were harvested. An
//! acquisition method (static analysis, reflection, a manifest file) only
//! has to expose each entity through [`EntitySource`] and [`FieldSource`];
//! [`build_model`] is the one construction path that turns those into
//! [`DeclaredEntity`] values.
//!
//! # Annotation vocabulary
//!
//! | target | annotation      | attributes                                            |
//! |--------|-----------------|-------------------------------------------------------|
//! | entity | `table`         | `name`                                                |
//! | entity | `index`         | `columns` (comma separated), `unique`, `name`, `type` |
//! | entity | `foreign_key`   | `column`, `references` (`table.column`), `name`       |
//! | field  | `id`            |                                                       |
//! | field  | `generated`     |                                                       |
//! | field  | `column`        | `name`, `nullable`, `length`, `precision`, `scale`    |
//! | field  | `comment`       | `value`                                               |
//! | field  | `transient`     |                                                       |
//! | field  | `many_to_one`   | `target`                                              |
//! | field  | `one_to_one`    | `target`, `mapped_by`                                 |
//! | field  | `join_column`   | `name`, `referenced`                                  |
//! | field  | `one_to_many`   | `target`, `mapped_by`                                 |
//! | field  | `many_to_many`  | `target`, `mapped_by`                                 |
//! | field  | `join_table`    | `name`, `join_column`, `inverse_join_column`          |
//!
//! A doc comment line of the form `@table <name>` is a table-name hint,
//! used when no `table` annotation is present.

pub mod manifest;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::model::{
    CollectionRelation, DeclaredEntity, DeclaredField, FieldKind, ForeignKeyDefinition,
    IndexDefinition, IndexType, ManyToManyDescriptor, ToOneRelation,
};
use crate::naming;

const TABLE_HINT: &str = "@table";

/// A single annotation with string attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation name.
    pub name: String,
    /// Attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    /// Creates an annotation with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Gets an attribute value.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Capability interface over one harvested entity declaration.
pub trait EntitySource {
    /// Field declaration type.
    type Field: FieldSource;

    /// Entity type name.
    fn name(&self) -> &str;

    /// Raw doc comment, if any.
    fn doc(&self) -> Option<&str>;

    /// Entity-level annotations.
    fn annotations(&self) -> &[Annotation];

    /// Field declarations in order.
    fn fields(&self) -> &[Self::Field];
}

/// Capability interface over one harvested field declaration.
pub trait FieldSource {
    /// Field identifier.
    fn name(&self) -> &str;

    /// Declared type name.
    fn type_name(&self) -> &str;

    /// Generic element type for collection-typed fields.
    fn element_type(&self) -> Option<&str>;

    /// Raw doc comment, if any.
    fn doc(&self) -> Option<&str>;

    /// Field-level annotations.
    fn annotations(&self) -> &[Annotation];
}

fn find<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.name == name)
}

/// Splits a doc comment into its table hint and the remaining text.
fn split_doc(doc: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(doc) = doc else {
        return (None, None);
    };
    let mut hint = None;
    let mut text = Vec::new();
    for line in doc.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix(TABLE_HINT) {
            Some(rest) if rest.starts_with(char::is_whitespace) => {
                hint = Some(rest.trim().to_string());
            }
            _ => text.push(line),
        }
    }
    let text = if text.is_empty() {
        None
    } else {
        Some(text.join(" "))
    };
    (hint, text)
}

fn parse_bool(context: &str, key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(ReconcileError::metadata(
            context,
            format!("attribute '{key}' expects a boolean, got '{other}'"),
        )),
    }
}

fn parse_u32(context: &str, key: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        ReconcileError::metadata(
            context,
            format!("attribute '{key}' expects a non-negative integer, got '{value}'"),
        )
    })
}

fn parse_index_type(context: &str, value: &str) -> Result<IndexType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "btree" => Ok(IndexType::BTree),
        "hash" => Ok(IndexType::Hash),
        "fulltext" | "full_text" => Ok(IndexType::FullText),
        other => Err(ReconcileError::metadata(
            context,
            format!("unknown index type '{other}'"),
        )),
    }
}

fn build_index(context: &str, annotation: &Annotation) -> Result<IndexDefinition> {
    let columns: Vec<String> = annotation
        .attr("columns")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(ReconcileError::metadata(context, "index without columns"));
    }
    let mut index = IndexDefinition::new(columns);
    if let Some(name) = annotation.attr("name") {
        index = index.named(name);
    }
    if let Some(unique) = annotation.attr("unique") {
        index.unique = parse_bool(context, "unique", unique)?;
    }
    if let Some(kind) = annotation.attr("type") {
        index.index_type = parse_index_type(context, kind)?;
    }
    Ok(index)
}

fn build_foreign_key(context: &str, annotation: &Annotation) -> Result<ForeignKeyDefinition> {
    let column = annotation
        .attr("column")
        .ok_or_else(|| ReconcileError::metadata(context, "foreign_key without 'column'"))?;
    let references = annotation
        .attr("references")
        .ok_or_else(|| ReconcileError::metadata(context, "foreign_key without 'references'"))?;
    let (table, referenced) = references.split_once('.').ok_or_else(|| {
        ReconcileError::metadata(
            context,
            format!("'references' must be 'table.column', got '{references}'"),
        )
    })?;
    let mut fk = ForeignKeyDefinition::new(column, table, referenced);
    if let Some(name) = annotation.attr("name") {
        fk = fk.named(name);
    }
    Ok(fk)
}

fn field_kind<F: FieldSource>(field: &F) -> FieldKind {
    let annotations = field.annotations();
    if find(annotations, "transient").is_some() {
        return FieldKind::Transient;
    }
    if let Some(m2m) = find(annotations, "many_to_many") {
        let join_table = find(annotations, "join_table");
        return FieldKind::Collection(CollectionRelation {
            element_type: field.element_type().map(str::to_string),
            many_to_many: Some(ManyToManyDescriptor {
                target: m2m.attr("target").map(str::to_string),
                owning: m2m.attr("mapped_by").is_none(),
                join_table: join_table.and_then(|a| a.attr("name")).map(str::to_string),
                join_column: join_table
                    .and_then(|a| a.attr("join_column"))
                    .map(str::to_string),
                inverse_join_column: join_table
                    .and_then(|a| a.attr("inverse_join_column"))
                    .map(str::to_string),
            }),
        });
    }
    if find(annotations, "one_to_many").is_some() || field.element_type().is_some() {
        return FieldKind::Collection(CollectionRelation {
            element_type: field.element_type().map(str::to_string),
            many_to_many: None,
        });
    }
    let to_one = find(annotations, "many_to_one").or_else(|| find(annotations, "one_to_one"));
    if let Some(relation) = to_one {
        // The mapped-by side of a one-to-one holds no column.
        if relation.attr("mapped_by").is_some() {
            return FieldKind::Transient;
        }
        let join = find(annotations, "join_column");
        return FieldKind::ToOne(ToOneRelation {
            target: relation
                .attr("target")
                .unwrap_or_else(|| field.type_name())
                .to_string(),
            join_column: join.and_then(|a| a.attr("name")).map(str::to_string),
            referenced_column: join.and_then(|a| a.attr("referenced")).map(str::to_string),
        });
    }
    FieldKind::Column
}

fn build_field<F: FieldSource>(entity: &str, field: &F) -> Result<DeclaredField> {
    let context = format!("{entity}.{}", field.name());
    let annotations = field.annotations();
    let column = find(annotations, "column");
    let (_, doc) = split_doc(field.doc());

    let mut declared = DeclaredField::new(field.name(), field.type_name());
    declared.kind = field_kind(field);
    if let FieldKind::ToOne(_) = declared.kind {
        // Replaced by the target's key type during resolution.
        declared.logical_type = "Long".to_string();
    }
    if let Some(name) = column.and_then(|c| c.attr("name")) {
        declared.column_name = name.to_string();
    }
    if find(annotations, "id").is_some() {
        declared = declared.primary_key();
    }
    if find(annotations, "generated").is_some() {
        declared.auto_increment = true;
    }
    if let Some(column) = column {
        if let Some(nullable) = column.attr("nullable") {
            declared.nullable =
                parse_bool(&context, "nullable", nullable)? && !declared.primary_key;
        }
        if let Some(length) = column.attr("length").or_else(|| column.attr("precision")) {
            declared.length = Some(parse_u32(&context, "length", length)?);
        }
        if let Some(scale) = column.attr("scale") {
            declared.scale = Some(parse_u32(&context, "scale", scale)?);
        }
    }
    declared.comment = find(annotations, "comment")
        .and_then(|c| c.attr("value"))
        .map(str::to_string)
        .or(doc);
    Ok(declared)
}

/// Builds one entity, resolving its table name from the explicit override,
/// then the doc-comment hint, then the type name.
pub fn build_entity<E: EntitySource>(source: &E) -> Result<DeclaredEntity> {
    let annotations = source.annotations();
    let (hint, doc) = split_doc(source.doc());
    let table_name = find(annotations, "table")
        .and_then(|t| t.attr("name"))
        .map(str::to_string)
        .or(hint)
        .unwrap_or_else(|| naming::to_table_name(source.name()));

    let mut entity = DeclaredEntity::new(source.name()).table(table_name);
    entity.comment = doc;
    for field in source.fields() {
        entity.fields.push(build_field(source.name(), field)?);
    }
    for annotation in annotations {
        match annotation.name.as_str() {
            "index" => entity.indexes.push(build_index(source.name(), annotation)?),
            "foreign_key" => entity
                .foreign_keys
                .push(build_foreign_key(source.name(), annotation)?),
            _ => {}
        }
    }
    Ok(entity)
}

/// Rejects a model in which two entities resolve to the same table name.
pub fn ensure_unique_tables(entities: &[DeclaredEntity]) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for entity in entities {
        if let Some(first) = seen.insert(entity.table_name.as_str(), entity.identifier.as_str()) {
            return Err(ReconcileError::DuplicateTable {
                table: entity.table_name.clone(),
                first: first.to_string(),
                second: entity.identifier.clone(),
            });
        }
    }
    Ok(())
}

/// Builds the declared model, rejecting duplicate resolved table names.
pub fn build_model<E: EntitySource>(sources: &[E]) -> Result<Vec<DeclaredEntity>> {
    let entities = sources
        .iter()
        .map(build_entity)
        .collect::<Result<Vec<_>>>()?;
    ensure_unique_tables(&entities)?;
    for entity in &entities {
        debug!(entity = %entity.identifier, table = %entity.table_name, "Declared entity");
    }
    Ok(entities)
}
