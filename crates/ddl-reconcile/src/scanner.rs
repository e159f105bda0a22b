//! Many-to-many junction table scanner.
//!
//! Relationship fields are collected as directed edges first and only then
//! filtered down to the owning side, so the outcome never depends on the
//! order entities were declared in.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::DiffWarning;
use crate::model::{
    DeclaredEntity, DeclaredField, FieldKind, JunctionEndpoint, ManyToManyDescriptor,
    ManyToManyTable,
};
use crate::naming;

/// Output of a junction scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JunctionScan {
    /// Junction tables, deduplicated and sorted by name.
    pub tables: Vec<ManyToManyTable>,
    /// Relationship fields that were skipped.
    pub warnings: Vec<DiffWarning>,
}

/// One directed many-to-many edge.
struct Edge<'a> {
    entity: &'a DeclaredEntity,
    field: &'a DeclaredField,
    descriptor: &'a ManyToManyDescriptor,
    element_type: Option<&'a str>,
}

impl<'a> Edge<'a> {
    /// Type name reported when the target cannot be resolved.
    fn target_type(&self) -> Option<&'a str> {
        self.descriptor.target.as_deref().or(self.element_type)
    }

    /// Resolves the override first, then the collection element type.
    fn resolve_target(&self, entities: &'a [DeclaredEntity]) -> Option<&'a DeclaredEntity> {
        self.descriptor
            .target
            .as_deref()
            .and_then(|name| find_entity(entities, name))
            .or_else(|| {
                self.element_type
                    .and_then(|name| find_entity(entities, name))
            })
    }
}

/// Finds a declared entity by type identifier, then by table name.
pub(crate) fn find_entity<'a>(
    entities: &'a [DeclaredEntity],
    name: &str,
) -> Option<&'a DeclaredEntity> {
    entities
        .iter()
        .find(|e| e.identifier == name)
        .or_else(|| entities.iter().find(|e| e.table_name == name))
}

/// Key column and logical key type an endpoint is referenced by.
pub(crate) fn primary_key_of(entity: &DeclaredEntity) -> (String, String) {
    entity
        .primary_key_fields()
        .next()
        .map(|f| (f.column_name.clone(), f.logical_type.clone()))
        .unwrap_or_else(|| ("id".to_string(), "Long".to_string()))
}

fn collect_edges(entities: &[DeclaredEntity]) -> Vec<Edge<'_>> {
    let mut edges = Vec::new();
    for entity in entities {
        for field in &entity.fields {
            if let FieldKind::Collection(collection) = &field.kind {
                if let Some(descriptor) = &collection.many_to_many {
                    edges.push(Edge {
                        entity,
                        field,
                        descriptor,
                        element_type: collection.element_type.as_deref(),
                    });
                }
            }
        }
    }
    edges
}

fn endpoint(entity: &DeclaredEntity, column: String) -> JunctionEndpoint {
    let (referenced_column, key_type) = primary_key_of(entity);
    JunctionEndpoint {
        table: entity.table_name.clone(),
        column,
        referenced_column,
        key_type,
    }
}

/// Derives the junction tables implied by owning many-to-many fields.
///
/// Never fails: a field whose target cannot be resolved is skipped and
/// reported as [`DiffWarning::UnresolvedRelationship`].
#[must_use]
pub fn scan(entities: &[DeclaredEntity]) -> JunctionScan {
    let edges = collect_edges(entities);
    let mut tables: BTreeMap<String, ManyToManyTable> = BTreeMap::new();
    let mut warnings = Vec::new();

    for edge in edges.iter().filter(|e| e.descriptor.owning) {
        let Some(target) = edge.resolve_target(entities) else {
            warn!(
                entity = %edge.entity.identifier,
                field = %edge.field.identifier,
                target = ?edge.target_type(),
                "Skipping many-to-many field with unresolved target"
            );
            warnings.push(DiffWarning::UnresolvedRelationship {
                entity: edge.entity.identifier.clone(),
                field: edge.field.identifier.clone(),
                target: edge.target_type().map(str::to_string),
            });
            continue;
        };

        let owner = edge.entity;
        let name = edge.descriptor.join_table.clone().unwrap_or_else(|| {
            naming::junction_table_name(&owner.table_name, &target.table_name)
        });

        let owner_column = edge
            .descriptor
            .join_column
            .clone()
            .unwrap_or_else(|| naming::endpoint_column_name(&owner.table_name));
        let mut target_column = edge
            .descriptor
            .inverse_join_column
            .clone()
            .unwrap_or_else(|| naming::endpoint_column_name(&target.table_name));
        if target_column == owner_column && edge.descriptor.inverse_join_column.is_none() {
            // Self-referencing pair.
            target_column = naming::join_column_name(&edge.field.identifier);
        }

        let owner_end = endpoint(owner, owner_column);
        let target_end = endpoint(target, target_column);
        let (left, right) = if target_end.table < owner_end.table {
            (target_end, owner_end)
        } else {
            (owner_end, target_end)
        };

        if tables.contains_key(&name) {
            debug!(table = %name, field = %edge.field.identifier, "Junction table already derived");
            continue;
        }
        debug!(table = %name, left = %left.table, right = %right.table, "Derived junction table");
        tables.insert(
            name.clone(),
            ManyToManyTable {
                table_name: name,
                left,
                right,
                owner_entity: owner.identifier.clone(),
                owner_field: edge.field.identifier.clone(),
            },
        );
    }

    JunctionScan {
        tables: tables.into_values().collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> DeclaredEntity {
        DeclaredEntity::new("User").field(DeclaredField::new("id", "Long").primary_key())
    }

    fn role() -> DeclaredEntity {
        DeclaredEntity::new("Role").field(DeclaredField::new("id", "Integer").primary_key())
    }

    #[test]
    fn test_owning_side_synthesizes_once() {
        let entities = vec![
            user().field(DeclaredField::many_to_many(
                "roles",
                "Role",
                ManyToManyDescriptor::owning(),
            )),
            role().field(DeclaredField::many_to_many(
                "users",
                "User",
                ManyToManyDescriptor::inverse(),
            )),
        ];
        let scan = scan(&entities);
        assert_eq!(scan.tables.len(), 1);
        assert!(scan.warnings.is_empty());

        let junction = &scan.tables[0];
        assert_eq!(junction.table_name, "role_user");
        assert_eq!(junction.left.table, "role");
        assert_eq!(junction.left.column, "role_id");
        assert_eq!(junction.left.key_type, "Integer");
        assert_eq!(junction.right.table, "user");
        assert_eq!(junction.right.column, "user_id");
        assert_eq!(junction.owner_entity, "User");
        assert_eq!(junction.owner_field, "roles");
    }

    #[test]
    fn test_scan_direction_does_not_change_name() {
        let from_user = vec![
            user().field(DeclaredField::many_to_many(
                "roles",
                "Role",
                ManyToManyDescriptor::owning(),
            )),
            role(),
        ];
        let from_role = vec![
            user(),
            role().field(DeclaredField::many_to_many(
                "users",
                "User",
                ManyToManyDescriptor::owning(),
            )),
        ];
        let a = scan(&from_user);
        let b = scan(&from_role);
        assert_eq!(a.tables[0].table_name, b.tables[0].table_name);
        assert_eq!(a.tables[0].left, b.tables[0].left);
        assert_eq!(a.tables[0].right, b.tables[0].right);
    }

    #[test]
    fn test_unmarked_bidirectional_pair_deduplicates() {
        let entities = vec![
            user().field(DeclaredField::many_to_many(
                "roles",
                "Role",
                ManyToManyDescriptor::owning(),
            )),
            role().field(DeclaredField::many_to_many(
                "users",
                "User",
                ManyToManyDescriptor::owning(),
            )),
        ];
        let scan = scan(&entities);
        assert_eq!(scan.tables.len(), 1);
        assert_eq!(scan.tables[0].owner_field, "roles");
    }

    #[test]
    fn test_explicit_overrides() {
        let descriptor = ManyToManyDescriptor {
            target: Some("Role".to_string()),
            owning: true,
            join_table: Some("user_roles".to_string()),
            join_column: Some("uid".to_string()),
            inverse_join_column: Some("rid".to_string()),
        };
        let entities = vec![
            user().field(DeclaredField::many_to_many("roles", "Object", descriptor)),
            role(),
        ];
        let scan = scan(&entities);
        let junction = &scan.tables[0];
        assert_eq!(junction.table_name, "user_roles");
        assert_eq!(junction.left.column, "rid");
        assert_eq!(junction.right.column, "uid");
    }

    #[test]
    fn test_unresolved_override_falls_back_to_element_type() {
        let descriptor = ManyToManyDescriptor {
            target: Some("Missing".to_string()),
            ..ManyToManyDescriptor::owning()
        };
        let entities = vec![
            user().field(DeclaredField::many_to_many("roles", "Role", descriptor)),
            role(),
        ];
        let scan = scan(&entities);
        assert_eq!(scan.tables.len(), 1);
        assert_eq!(scan.tables[0].table_name, "role_user");
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn test_unresolved_override_and_element_type_reports_override() {
        let descriptor = ManyToManyDescriptor {
            target: Some("Missing".to_string()),
            ..ManyToManyDescriptor::owning()
        };
        let entities = vec![user().field(DeclaredField::many_to_many(
            "roles",
            "Group",
            descriptor,
        ))];
        let scan = scan(&entities);
        assert!(scan.tables.is_empty());
        assert_eq!(
            scan.warnings,
            vec![DiffWarning::UnresolvedRelationship {
                entity: "User".to_string(),
                field: "roles".to_string(),
                target: Some("Missing".to_string()),
            }]
        );
    }

    #[test]
    fn test_unresolved_target_is_skipped() {
        let entities = vec![user().field(DeclaredField::many_to_many(
            "groups",
            "Group",
            ManyToManyDescriptor::owning(),
        ))];
        let scan = scan(&entities);
        assert!(scan.tables.is_empty());
        assert_eq!(
            scan.warnings,
            vec![DiffWarning::UnresolvedRelationship {
                entity: "User".to_string(),
                field: "groups".to_string(),
                target: Some("Group".to_string()),
            }]
        );
    }

    #[test]
    fn test_self_reference_gets_distinct_columns() {
        let person = DeclaredEntity::new("Person")
            .field(DeclaredField::new("id", "Long").primary_key())
            .field(DeclaredField::many_to_many(
                "friends",
                "Person",
                ManyToManyDescriptor::owning(),
            ));
        let scan = scan(&[person]);
        let junction = &scan.tables[0];
        assert_eq!(junction.table_name, "person_person");
        assert_eq!(junction.left.column, "person_id");
        assert_eq!(junction.right.column, "friends_id");
    }
}
