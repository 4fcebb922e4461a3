//! Normalized database schema description, as produced by an introspector.
//!
//! The client never introspects a database itself. A schema loaded from JSON
//! lets callers refuse calls against unknown tables or mutations on views
//! before anything goes over the wire.

use serde::{Deserialize, Serialize};

use crate::client::TableMethod;
use crate::error::{AetherError, AetherResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSchema {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub enums: Vec<EnumType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: String,
    /// Underlying type name, e.g. the enum name for enum columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udt_name: Option<String>,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

impl DatabaseSchema {
    pub fn from_json(text: &str) -> AetherResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AetherError::Validation(format!("Invalid schema description: {}", e)))
    }

    pub fn find_table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    pub fn find_enum(&self, schema: &str, name: &str) -> Option<&EnumType> {
        self.enums
            .iter()
            .find(|e| e.schema == schema && e.name == name)
    }

    /// Unknown tables are rejected for every method; views only allow reads.
    pub fn check_operation(&self, schema: &str, table: &str, method: TableMethod) -> AetherResult<&Table> {
        let found = self.find_table(schema, table).ok_or_else(|| {
            AetherError::Validation(format!("Unknown table '{}.{}'", schema, table))
        })?;
        if found.is_view && method.is_mutation() {
            return Err(AetherError::Validation(format!(
                "Cannot {} on view '{}.{}'",
                method, schema, table
            )));
        }
        Ok(found)
    }
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|k| k == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "tables": [
            {
                "name": "users",
                "schema": "public",
                "isView": false,
                "columns": [
                    {"name": "id", "dataType": "bigint", "udtName": "int8", "isNullable": false, "hasDefault": true},
                    {"name": "status", "dataType": "USER-DEFINED", "udtName": "user_status", "isNullable": true, "hasDefault": false}
                ],
                "primaryKeys": ["id"],
                "foreignKeys": []
            },
            {
                "name": "active_users",
                "schema": "public",
                "isView": true,
                "columns": [],
                "primaryKeys": [],
                "foreignKeys": []
            },
            {
                "name": "posts",
                "schema": "blog",
                "columns": [],
                "foreignKeys": [
                    {"column": "author_id", "targetSchema": "public", "targetTable": "users", "targetColumn": "id"}
                ]
            }
        ],
        "enums": [
            {"schema": "public", "name": "user_status", "values": ["active", "banned"]}
        ]
    }"#;

    #[test]
    fn test_parse_schema_description() {
        let schema = DatabaseSchema::from_json(SCHEMA).unwrap();
        assert_eq!(schema.tables.len(), 3);

        let users = schema.find_table("public", "users").unwrap();
        assert!(users.is_primary_key("id"));
        assert_eq!(users.column("status").unwrap().udt_name.as_deref(), Some("user_status"));
        assert!(users.column("missing").is_none());

        let posts = schema.find_table("blog", "posts").unwrap();
        assert!(!posts.is_view);
        assert_eq!(posts.foreign_keys[0].target_table, "users");

        let status = schema.find_enum("public", "user_status").unwrap();
        assert_eq!(status.values, vec!["active", "banned"]);
    }

    #[test]
    fn test_check_operation() {
        let schema = DatabaseSchema::from_json(SCHEMA).unwrap();

        assert!(schema.check_operation("public", "users", TableMethod::Delete).is_ok());
        assert!(schema
            .check_operation("public", "active_users", TableMethod::FindMany)
            .is_ok());

        let err = schema
            .check_operation("public", "active_users", TableMethod::Update)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Cannot update on view 'public.active_users'"
        );

        let err = schema
            .check_operation("public", "ghosts", TableMethod::FindMany)
            .unwrap_err();
        assert!(err.to_string().contains("Unknown table 'public.ghosts'"));
    }

    #[test]
    fn test_invalid_schema_json() {
        assert!(matches!(
            DatabaseSchema::from_json("{\"tables\": 3}"),
            Err(AetherError::Validation(_))
        ));
    }
}
