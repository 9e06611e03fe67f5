use crate::schema::SchemaDescriptor;

/// Render the grounding prompt that asks the model for a single SQL query.
pub fn render_sql_prompt(schema: &SchemaDescriptor, question: &str, row_limit: u64) -> String {
    let tables = schema
        .tables()
        .iter()
        .map(|table| {
            let mut block = format!("{}:", table.name);
            for column in &table.columns {
                block.push_str(&format!("\n{} ({})", column.name, column.data_type));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a PostgreSQL expert. Given this star schema:\n\
         \n\
         {tables}\n\
         \n\
         Generate ONLY a valid PostgreSQL query for: \"{question}\"\n\
         \n\
         Rules:\n\
         - Return ONLY the SQL query, no explanations\n\
         - Use proper JOINs between fact_transactions and dimensions\n\
         - Limit results to {row_limit} rows if not aggregating\n\
         - Use appropriate aggregations for analytical queries"
    )
}
