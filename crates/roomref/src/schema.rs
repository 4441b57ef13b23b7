//
// schema.rs
//
// Field schema model consumed by the dependency-closure resolver
//

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Field type as far as closure computation cares.
///
/// Only `Link`, `LookUp` and `Formula` fields can carry cross-document
/// references; every other type collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Link,
    LookUp,
    Formula,
    Other,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            FieldType::Link => "Link",
            FieldType::LookUp => "LookUp",
            FieldType::Formula => "Formula",
            FieldType::Other => "Other",
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unrecognized type names are legal schema content, not errors
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "Link" => FieldType::Link,
            "LookUp" => FieldType::LookUp,
            "Formula" => FieldType::Formula,
            _ => FieldType::Other,
        })
    }
}

/// Type-specific field properties.
///
/// Schema data is partial by nature: a field carries only the properties its
/// type uses, and stored schemas may predate the property they lack. Every
/// property is therefore optional and absence is never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperty {
    /// Link: the datasheet this field points into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_datasheet_id: Option<String>,
    /// Link: the mirrored field on the other side of the relation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brother_field_id: Option<String>,
    /// LookUp: the Link field this lookup reads through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_link_field_id: Option<String>,
    /// Formula: the raw expression text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// One field definition of a document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub property: FieldProperty,
}

/// A document's field schema, keyed by field id.
///
/// `IndexMap` preserves the stored field order so traversal over the schema
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    #[serde(rename = "fieldMap", default)]
    pub field_map: IndexMap<String, Field>,
}

impl DocumentSchema {
    /// Iterate fields of one type.
    pub fn fields_of_type(&self, ty: FieldType) -> impl Iterator<Item = &Field> {
        self.field_map.values().filter(move |f| f.ty == ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_from_unknown_name() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "id": "fldAAAAAAAAAA",
            "type": "SingleText",
        }))
        .unwrap();
        assert_eq!(field.ty, FieldType::Other);
        assert_eq!(field.property, FieldProperty::default());
    }

    #[test]
    fn test_link_field_deserialize() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "id": "fldAAAAAAAAAA",
            "type": "Link",
            "property": {
                "foreignDatasheetId": "dstBBB",
                "brotherFieldId": "fldBBBBBBBBBB",
            },
        }))
        .unwrap();
        assert_eq!(field.ty, FieldType::Link);
        assert_eq!(field.property.foreign_datasheet_id.as_deref(), Some("dstBBB"));
        assert_eq!(field.property.brother_field_id.as_deref(), Some("fldBBBBBBBBBB"));
        assert!(field.property.expression.is_none());
    }

    #[test]
    fn test_schema_preserves_field_order() {
        let schema: DocumentSchema = serde_json::from_value(serde_json::json!({
            "fieldMap": {
                "fldCCCCCCCCCC": { "id": "fldCCCCCCCCCC", "type": "Formula" },
                "fldAAAAAAAAAA": { "id": "fldAAAAAAAAAA", "type": "Link" },
                "fldBBBBBBBBBB": { "id": "fldBBBBBBBBBB", "type": "LookUp" },
            },
        }))
        .unwrap();
        let ids: Vec<&str> = schema.field_map.keys().map(String::as_str).collect();
        assert_eq!(ids, ["fldCCCCCCCCCC", "fldAAAAAAAAAA", "fldBBBBBBBBBB"]);
    }

    #[test]
    fn test_fields_of_type() {
        let schema: DocumentSchema = serde_json::from_value(serde_json::json!({
            "fieldMap": {
                "fldAAAAAAAAAA": { "id": "fldAAAAAAAAAA", "type": "Link" },
                "fldBBBBBBBBBB": { "id": "fldBBBBBBBBBB", "type": "LookUp" },
            },
        }))
        .unwrap();
        let links: Vec<&str> = schema
            .fields_of_type(FieldType::Link)
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(links, ["fldAAAAAAAAAA"]);
    }

    #[test]
    fn test_empty_schema() {
        let schema: DocumentSchema = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(schema.field_map.is_empty());
    }
}
