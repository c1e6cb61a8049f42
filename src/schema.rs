use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    driver::{Diagnostic, Driver, StmtHandle},
    options::StatementOptions,
    value::NullableValue,
    wire::{TypeCode, NUMBER_WIRE_SIZE},
    ErrorContext, Result, SqlCallError,
};

/// Metadata of one result column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Zero-based ordinal.
    pub position: usize,
    /// Name as reported by the engine, case preserved.
    pub name: String,
    pub type_code: TypeCode,
    /// Reported byte size; the wire size for numbers.
    pub size: usize,
    /// Numbers only.
    pub precision: i16,
    /// Numbers only.
    pub scale: i8,
}

/// Column metadata of an executed row-producing statement.
///
/// Names map to positions case-sensitively; when two columns share a name
/// the later one wins the lookup while both stay addressable by position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ColumnSchema>", into = "Vec<ColumnSchema>")]
pub struct ResultSchema {
    columns: Vec<ColumnSchema>,
    by_name: HashMap<String, usize>,
}

impl From<Vec<ColumnSchema>> for ResultSchema {
    fn from(columns: Vec<ColumnSchema>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.clone(), i))
            .collect();
        Self { columns, by_name }
    }
}

impl From<ResultSchema> for Vec<ColumnSchema> {
    fn from(schema: ResultSchema) -> Self {
        schema.columns
    }
}

impl ResultSchema {
    /// Queries the engine for the column metadata of an executed statement.
    ///
    /// Read-only against the engine: bound values are not touched.
    pub(crate) fn discover(
        driver: &dyn Driver,
        stmt: StmtHandle,
        sql: &str,
        options: &StatementOptions,
    ) -> Result<Self> {
        const OP: &str = "ResultSchema::discover";
        let driver_err = |diag: Diagnostic, ordinal: Option<usize>| {
            let mut ctx = ErrorContext::statement(sql);
            if let Some(ordinal) = ordinal {
                ctx = ctx.with("position", ordinal);
            }
            SqlCallError::driver(OP, diag).with_context(ctx)
        };

        let count = driver
            .column_count(stmt)
            .map_err(|diag| driver_err(diag, None))?;
        let mut columns = Vec::with_capacity(count);

        for ordinal in 1..=count {
            let type_code = driver
                .column_type(stmt, ordinal)
                .map_err(|diag| driver_err(diag, Some(ordinal)))?;
            let (size, precision, scale) = if type_code == TypeCode::NUMBER {
                let precision = driver
                    .column_precision(stmt, ordinal)
                    .map_err(|diag| driver_err(diag, Some(ordinal)))?;
                let scale = driver
                    .column_scale(stmt, ordinal)
                    .map_err(|diag| driver_err(diag, Some(ordinal)))?;
                (NUMBER_WIRE_SIZE, precision, scale)
            } else {
                let size = driver
                    .column_size(stmt, ordinal)
                    .map_err(|diag| driver_err(diag, Some(ordinal)))?;
                let size = if size == 0 {
                    options.default_text_size
                } else {
                    size
                };
                (size, 0, 0)
            };
            let name = driver
                .column_name(stmt, ordinal)
                .map_err(|diag| driver_err(diag, Some(ordinal)))?;

            if !NullableValue::supports_type(type_code) {
                return Err(SqlCallError::type_mismatch(
                    OP,
                    format!("unsupported engine data type {type_code}"),
                )
                .with_context(
                    ErrorContext::statement(sql)
                        .with("column", &name)
                        .with("position", ordinal),
                ));
            }

            columns.push(ColumnSchema {
                position: ordinal - 1,
                name,
                type_code,
                size,
                precision,
                scale,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(columns = columns.len(), statement = sql, "discovered result schema");

        Ok(Self::from(columns))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, position: usize) -> Option<&ColumnSchema> {
        self.columns.get(position)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnSchema> {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        schema::{ColumnSchema, ResultSchema},
        wire::TypeCode,
    };

    fn col(position: usize, name: &str) -> ColumnSchema {
        ColumnSchema {
            position,
            name: name.to_owned(),
            type_code: TypeCode::VARCHAR2,
            size: 10,
            precision: 0,
            scale: 0,
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let schema = ResultSchema::from(vec![col(0, "ID"), col(1, "name")]);
        assert_eq!(schema.position_of("ID"), Some(0));
        assert_eq!(schema.position_of("id"), None);
        assert_eq!(schema.position_of("name"), Some(1));
    }

    #[test]
    fn duplicate_names_keep_positions() {
        let schema = ResultSchema::from(vec![col(0, "X"), col(1, "X")]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.position_of("X"), Some(1));
        assert_eq!(schema.column(0).map(|c| c.name.as_str()), Some("X"));
    }

    #[test]
    fn serializes_as_column_list() {
        let schema = ResultSchema::from(vec![col(0, "ID")]);
        let json = serde_json::to_value(&schema).expect("must serialize");
        assert_eq!(json[0]["name"], "ID");
        assert_eq!(json[0]["type_code"], 1);
        let back: ResultSchema = serde_json::from_value(json).expect("must deserialize");
        assert_eq!(back, schema);
    }
}
