//! Schema definitions as authored in extension manifests
//!
//! Definitions carry defaults and condition values as plain wire values; they
//! are decoded against the declared (or referenced) field type while
//! building, and the resulting schema is validated as a whole.

use property_value::{Value, ValueType};
use serde::Deserialize;
use std::collections::HashSet;

use crate::ids::{FieldId, SchemaGroupId, SchemaId};

use super::{
    Choice, Condition, LinkableFields, LinkableKind, Schema, SchemaField, SchemaGroup, UiHint,
};

/// Schema definition errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate group '{0}'")]
    DuplicateGroup(SchemaGroupId),

    #[error("Duplicate field '{field}' in group '{group}'")]
    DuplicateField { group: SchemaGroupId, field: FieldId },

    #[error("Invalid default for {group}/{field}: {reason}")]
    InvalidDefault {
        group: SchemaGroupId,
        field: FieldId,
        reason: String,
    },

    #[error("Condition in group '{group}' refers to unknown field '{target}'")]
    UnknownConditionField { group: SchemaGroupId, target: FieldId },

    #[error("Condition in group '{group}' on '{target}': {reason}")]
    InvalidCondition {
        group: SchemaGroupId,
        target: FieldId,
        reason: String,
    },

    #[error("Representative field '{field}' not found in group '{group}'")]
    UnknownRepresentative { group: SchemaGroupId, field: FieldId },

    #[error("Linkable {kind:?} field: {reason}")]
    Linkable { kind: LinkableKind, reason: String },
}

/// Schema definition as written in JSON
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDef {
    pub id: SchemaId,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub linkable: LinkableFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupDef {
    pub id: SchemaGroupId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub representative_field: Option<FieldId>,
    #[serde(default)]
    pub available_if: Option<ConditionDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub ui: Option<UiHint>,
    #[serde(default)]
    pub available_if: Option<ConditionDef>,
}

/// `{"field": "style", "value": "image"}`; the value is decoded with the
/// referenced field's type.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionDef {
    pub field: FieldId,
    pub value: serde_json::Value,
}

impl Schema {
    /// Parse and validate a JSON schema definition
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let def: SchemaDef = serde_json::from_str(json)?;
        Self::from_def(def)
    }

    /// Build and validate a schema from its definition
    pub fn from_def(def: SchemaDef) -> Result<Self, SchemaError> {
        // Field types must be known before condition values can be decoded.
        let declared: Vec<(SchemaGroupId, bool, Vec<(FieldId, ValueType)>)> = def
            .groups
            .iter()
            .map(|g| {
                (
                    g.id.clone(),
                    g.list,
                    g.fields
                        .iter()
                        .map(|f| (f.id.clone(), f.value_type.clone()))
                        .collect(),
                )
            })
            .collect();

        let mut groups = Vec::with_capacity(def.groups.len());
        for g in def.groups {
            let sibling_types: &[(FieldId, ValueType)] = declared
                .iter()
                .find(|(id, _, _)| id == &g.id)
                .map(|(_, _, fields)| fields.as_slice())
                .unwrap_or(&[]);

            let mut fields = Vec::with_capacity(g.fields.len());
            for f in g.fields {
                let default = match f.default {
                    Some(wire) if !wire.is_null() => Some(
                        Value::decode(&f.value_type, &wire).map_err(|e| SchemaError::InvalidDefault {
                            group: g.id.clone(),
                            field: f.id.clone(),
                            reason: e.to_string(),
                        })?,
                    ),
                    _ => None,
                };
                let available_if = match f.available_if {
                    Some(cond) => {
                        let target_type = sibling_types
                            .iter()
                            .find(|(id, _)| id == &cond.field)
                            .map(|(_, ty)| ty)
                            .ok_or_else(|| SchemaError::UnknownConditionField {
                                group: g.id.clone(),
                                target: cond.field.clone(),
                            })?;
                        Some(decode_condition(&g.id, cond, target_type)?)
                    }
                    None => None,
                };
                fields.push(SchemaField {
                    id: f.id,
                    value_type: f.value_type,
                    title: f.title,
                    description: f.description,
                    default,
                    prefix: f.prefix,
                    suffix: f.suffix,
                    min: f.min,
                    max: f.max,
                    choices: f.choices,
                    ui: f.ui,
                    available_if,
                });
            }

            let available_if = match g.available_if {
                Some(cond) => {
                    let target_type = declared
                        .iter()
                        .filter(|(_, list, _)| !list)
                        .flat_map(|(_, _, fields)| fields.iter())
                        .find(|(id, _)| id == &cond.field)
                        .map(|(_, ty)| ty)
                        .ok_or_else(|| SchemaError::UnknownConditionField {
                            group: g.id.clone(),
                            target: cond.field.clone(),
                        })?;
                    Some(decode_condition(&g.id, cond, target_type)?)
                }
                None => None,
            };

            groups.push(SchemaGroup {
                id: g.id,
                title: g.title,
                fields,
                is_list: g.list,
                representative_field: g.representative_field,
                available_if,
            });
        }

        Schema::new(def.id, groups, def.linkable)
    }
}

fn decode_condition(
    group: &SchemaGroupId,
    cond: ConditionDef,
    target_type: &ValueType,
) -> Result<Condition, SchemaError> {
    let value = Value::decode(target_type, &cond.value).map_err(|e| SchemaError::InvalidCondition {
        group: group.clone(),
        target: cond.field.clone(),
        reason: e.to_string(),
    })?;
    Ok(Condition {
        field: cond.field,
        value,
    })
}

/// Whole-schema consistency checks
pub(super) fn validate(schema: &Schema) -> Result<(), SchemaError> {
    let mut group_ids = HashSet::new();
    for group in schema.groups() {
        if !group_ids.insert(&group.id) {
            return Err(SchemaError::DuplicateGroup(group.id.clone()));
        }

        let mut field_ids = HashSet::new();
        for field in &group.fields {
            if !field_ids.insert(&field.id) {
                return Err(SchemaError::DuplicateField {
                    group: group.id.clone(),
                    field: field.id.clone(),
                });
            }
            if let Some(default) = &field.default {
                field.validate(default).map_err(|v| SchemaError::InvalidDefault {
                    group: group.id.clone(),
                    field: field.id.clone(),
                    reason: v.to_string(),
                })?;
            }
        }

        for field in &group.fields {
            if let Some(cond) = &field.available_if {
                let target = group.field(&cond.field).ok_or_else(|| {
                    SchemaError::UnknownConditionField {
                        group: group.id.clone(),
                        target: cond.field.clone(),
                    }
                })?;
                check_condition_type(&group.id, cond, &target.value_type)?;
            }
        }

        if let Some(cond) = &group.available_if {
            let target = schema
                .groups()
                .iter()
                .filter(|g| !g.is_list)
                .find_map(|g| g.field(&cond.field))
                .ok_or_else(|| SchemaError::UnknownConditionField {
                    group: group.id.clone(),
                    target: cond.field.clone(),
                })?;
            check_condition_type(&group.id, cond, &target.value_type)?;
        }

        if let Some(rep) = &group.representative_field {
            if !group.has_field(rep) {
                return Err(SchemaError::UnknownRepresentative {
                    group: group.id.clone(),
                    field: rep.clone(),
                });
            }
        }
    }

    for kind in [LinkableKind::LatLng, LinkableKind::Url] {
        let target = match kind {
            LinkableKind::LatLng => schema.linkable().latlng.as_ref(),
            LinkableKind::Url => schema.linkable().url.as_ref(),
        };
        let Some(target) = target else {
            continue;
        };
        let group = schema.group(&target.group).ok_or_else(|| SchemaError::Linkable {
            kind,
            reason: format!("group '{}' not found", target.group),
        })?;
        if group.is_list {
            return Err(SchemaError::Linkable {
                kind,
                reason: format!("group '{}' is a list", group.id),
            });
        }
        let field = group.field(&target.field).ok_or_else(|| SchemaError::Linkable {
            kind,
            reason: format!("field '{}' not found in group '{}'", target.field, group.id),
        })?;
        if field.value_type != kind.value_type() {
            return Err(SchemaError::Linkable {
                kind,
                reason: format!(
                    "field '{}' is {}, expected {}",
                    field.id,
                    field.value_type,
                    kind.value_type()
                ),
            });
        }
    }

    Ok(())
}

fn check_condition_type(
    group: &SchemaGroupId,
    cond: &Condition,
    target_type: &ValueType,
) -> Result<(), SchemaError> {
    let found = cond.value.value_type();
    if &found != target_type {
        return Err(SchemaError::InvalidCondition {
            group: group.clone(),
            target: cond.field.clone(),
            reason: format!("expected {}, got {}", target_type, found),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = r#"{
        "id": "reearth/marker",
        "groups": [{
            "id": "default",
            "title": "Marker",
            "fields": [
                {"id": "location", "type": "latlng", "title": "Location"},
                {"id": "style", "type": "string", "default": "point",
                 "choices": [{"key": "point", "label": "Point"}, {"key": "image", "label": "Icon"}]},
                {"id": "image", "type": "url", "ui": "image",
                 "available_if": {"field": "style", "value": "image"}},
                {"id": "pointSize", "type": "number", "default": 10, "min": 0, "suffix": "px"}
            ]
        }],
        "linkable": {"latlng": {"group": "default", "field": "location"}}
    }"#;

    #[test]
    fn test_from_json() {
        let schema = Schema::from_json(MARKER).unwrap();
        let group = schema.group(&"default".into()).unwrap();
        assert_eq!(group.fields.len(), 4);

        let image = group.field(&"image".into()).unwrap();
        assert_eq!(image.ui, Some(UiHint::Image));
        assert_eq!(
            image.available_if,
            Some(Condition::new("style", Value::String("image".into())))
        );
        assert_eq!(
            group.field(&"pointSize".into()).unwrap().default,
            Some(Value::Number(10.0))
        );
        assert!(schema.linkable_field(LinkableKind::LatLng).is_some());
    }

    #[test]
    fn test_default_must_decode() {
        let json = r#"{"id": "s", "groups": [{"id": "g", "fields": [
            {"id": "f", "type": "number", "default": "ten"}
        ]}]}"#;
        assert!(matches!(
            Schema::from_json(json),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_default_must_satisfy_bounds() {
        let json = r#"{"id": "s", "groups": [{"id": "g", "fields": [
            {"id": "f", "type": "number", "default": 2, "max": 1}
        ]}]}"#;
        assert!(matches!(
            Schema::from_json(json),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_condition_target_must_exist() {
        let json = r#"{"id": "s", "groups": [{"id": "g", "fields": [
            {"id": "f", "type": "bool", "available_if": {"field": "ghost", "value": true}}
        ]}]}"#;
        assert!(matches!(
            Schema::from_json(json),
            Err(SchemaError::UnknownConditionField { .. })
        ));
    }

    #[test]
    fn test_condition_value_uses_target_type() {
        let json = r#"{"id": "s", "groups": [{"id": "g", "fields": [
            {"id": "mode", "type": "number"},
            {"id": "f", "type": "bool", "available_if": {"field": "mode", "value": "one"}}
        ]}]}"#;
        assert!(matches!(
            Schema::from_json(json),
            Err(SchemaError::InvalidCondition { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"id": "s", "groups": [{"id": "g"}, {"id": "g"}]}"#;
        assert!(matches!(Schema::from_json(json), Err(SchemaError::DuplicateGroup(_))));

        let json = r#"{"id": "s", "groups": [{"id": "g", "fields": [
            {"id": "f", "type": "bool"}, {"id": "f", "type": "string"}
        ]}]}"#;
        assert!(matches!(Schema::from_json(json), Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_linkable_type_checked() {
        let json = r#"{"id": "s",
            "groups": [{"id": "g", "fields": [{"id": "f", "type": "string"}]}],
            "linkable": {"url": {"group": "g", "field": "f"}}}"#;
        assert!(matches!(Schema::from_json(json), Err(SchemaError::Linkable { .. })));
    }

    #[test]
    fn test_representative_must_exist() {
        let json = r#"{"id": "s", "groups": [{"id": "g", "list": true,
            "representative_field": "title", "fields": []}]}"#;
        assert!(matches!(
            Schema::from_json(json),
            Err(SchemaError::UnknownRepresentative { .. })
        ));
    }
}
