use crate::data_store::{DataStore, DataStoreError};

/// Star-schema tables the model is allowed to see, in catalog order.
pub const ALLOWED_TABLES: [&str; 5] = [
    "dim_card",
    "dim_customer",
    "dim_date",
    "dim_merchant",
    "fact_transactions",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Columns of the allow-listed tables, grouped per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    tables: Vec<TableSchema>,
}

impl SchemaDescriptor {
    /// Read the catalog for [`ALLOWED_TABLES`].
    ///
    /// Every allow-listed table is present in the result, even when the
    /// catalog has no columns for it; anything outside the list is dropped.
    pub async fn load(store: &dyn DataStore) -> Result<Self, DataStoreError> {
        let columns = store.catalog_columns(Some(&ALLOWED_TABLES[..])).await?;
        Ok(Self::from_columns(
            &ALLOWED_TABLES,
            columns
                .into_iter()
                .map(|c| (c.table_name, c.column_name, c.data_type)),
        ))
    }

    pub fn from_columns<I>(allowed: &[&str], columns: I) -> Self
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let mut tables: Vec<TableSchema> = allowed
            .iter()
            .map(|name| TableSchema {
                name: name.to_string(),
                columns: Vec::new(),
            })
            .collect();

        for (table_name, column_name, data_type) in columns {
            if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
                table.columns.push(ColumnSchema {
                    name: column_name,
                    data_type,
                });
            }
        }

        Self { tables }
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}
