//! Query descriptors and positional parameter binding.
//!
//! # Responsibility
//! - Render select/count/delete statements for one entity table.
//! - Bind caller arguments to named parameters in declaration order.
//! - Render the insert/update statements used by persist and merge.
//!
//! # Invariants
//! - Conditions only reference attributes present in the entity metadata.
//! - Parameter `:name` is the attribute name of the condition it binds.
//! - No type checking happens here; SQLite reports mismatches.

use crate::model::metadata::EntityMetadata;
use crate::repo::error::DerivationReason;
use rusqlite::ToSql;
use std::collections::BTreeSet;

/// Shape of a query against one entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    SelectAll,
    SelectFiltered,
    Count,
    CountFiltered,
    DeleteAll,
    DeleteFiltered,
}

impl QueryForm {
    pub fn is_filtered(self) -> bool {
        matches!(
            self,
            Self::SelectFiltered | Self::CountFiltered | Self::DeleteFiltered
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SelectAll => "select_all",
            Self::SelectFiltered => "select_filtered",
            Self::Count => "count",
            Self::CountFiltered => "count_filtered",
            Self::DeleteAll => "delete_all",
            Self::DeleteFiltered => "delete_filtered",
        }
    }
}

/// One equality condition of a conjunctive predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub attribute: String,
    pub column: String,
}

/// Query against one entity table; values are bound separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    table: String,
    select_list: String,
    identifier_column: String,
    conditions: Vec<Condition>,
    form: QueryForm,
}

impl QueryDescriptor {
    /// Builds a descriptor for `form` filtered by `conditions` (AND-ed, in order).
    pub fn build<E>(
        metadata: &EntityMetadata<E>,
        conditions: &[String],
        form: QueryForm,
    ) -> Result<Self, DerivationReason> {
        if form.is_filtered() && conditions.is_empty() {
            return Err(DerivationReason::EmptyAttributeChain);
        }
        if !form.is_filtered() && !conditions.is_empty() {
            return Err(DerivationReason::UnexpectedConditions);
        }

        let mut seen = BTreeSet::new();
        let mut resolved = Vec::with_capacity(conditions.len());
        for name in conditions {
            let mapped = metadata
                .attribute(name)
                .ok_or_else(|| DerivationReason::UnknownAttribute(name.clone()))?;
            if !seen.insert(name.as_str()) {
                return Err(DerivationReason::DuplicateAttribute(name.clone()));
            }
            resolved.push(Condition {
                attribute: name.clone(),
                column: mapped.column.clone(),
            });
        }

        Ok(Self {
            table: metadata.table_name().to_string(),
            select_list: metadata.select_list(),
            identifier_column: metadata.identifier().column.clone(),
            conditions: resolved,
            form,
        })
    }

    pub fn form(&self) -> QueryForm {
        self.form
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Renders the SQL text with `:attribute` placeholders.
    pub fn sql(&self) -> String {
        let table = &self.table;
        let where_clause = self.where_clause();
        match self.form {
            QueryForm::SelectAll | QueryForm::SelectFiltered => format!(
                "SELECT {} FROM \"{table}\"{where_clause} ORDER BY \"{}\" ASC;",
                self.select_list, self.identifier_column
            ),
            QueryForm::Count | QueryForm::CountFiltered => {
                format!("SELECT COUNT(*) FROM \"{table}\"{where_clause};")
            }
            QueryForm::DeleteAll | QueryForm::DeleteFiltered => {
                format!("DELETE FROM \"{table}\"{where_clause};")
            }
        }
    }

    /// Pairs `args[i]` with `conditions[i]`.
    pub fn bind<'a>(&self, args: &[&'a dyn ToSql]) -> Result<BoundQuery<'a>, DerivationReason> {
        if args.len() != self.conditions.len() {
            return Err(DerivationReason::ArgumentCount {
                expected: self.conditions.len(),
                actual: args.len(),
            });
        }

        let params = self
            .conditions
            .iter()
            .zip(args.iter().copied())
            .map(|(condition, value)| (format!(":{}", condition.attribute), value))
            .collect();

        Ok(BoundQuery {
            sql: self.sql(),
            params,
        })
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        let predicate = self
            .conditions
            .iter()
            .map(|condition| format!("\"{}\" = :{}", condition.column, condition.attribute))
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(" WHERE {predicate}")
    }
}

/// SQL text plus its named parameters, ready for execution.
pub struct BoundQuery<'a> {
    sql: String,
    params: Vec<(String, &'a dyn ToSql)>,
}

impl<'a> BoundQuery<'a> {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Parameters in the shape `rusqlite` accepts for named binding.
    pub fn named_params(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect()
    }
}

/// Renders the insert statement for one entity.
///
/// The identifier column is left out when the store is expected to assign it.
pub fn insert_sql<E>(metadata: &EntityMetadata<E>, include_identifier: bool) -> String {
    let mapped: Vec<_> = metadata
        .attributes()
        .iter()
        .filter(|mapped| include_identifier || !mapped.attribute.identifier)
        .collect();

    if mapped.is_empty() {
        return format!("INSERT INTO \"{}\" DEFAULT VALUES;", metadata.table_name());
    }

    let columns = mapped
        .iter()
        .map(|mapped| format!("\"{}\"", mapped.column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = mapped
        .iter()
        .map(|mapped| format!(":{}", mapped.attribute.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders});",
        metadata.table_name()
    )
}

/// Renders the update statement for one entity, or `None` when it has no
/// attributes besides its identifier.
pub fn update_sql<E>(metadata: &EntityMetadata<E>) -> Option<String> {
    let assignments = metadata
        .value_attributes()
        .map(|mapped| format!("\"{}\" = :{}", mapped.column, mapped.attribute.name))
        .collect::<Vec<_>>();
    if assignments.is_empty() {
        return None;
    }

    let identifier = metadata.identifier();
    Some(format!(
        "UPDATE \"{}\" SET {} WHERE \"{}\" = :{};",
        metadata.table_name(),
        assignments.join(", "),
        identifier.column,
        identifier.attribute.name
    ))
}
