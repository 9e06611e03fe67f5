use crate::data_store::{QueryResult, Row};
use crate::llm::LanguageModel;
use crate::pipeline::PipelineError;
use crate::translator::strip_fences;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
    #[serde(rename = "LineChart")]
    Line,
    #[serde(rename = "BarChart")]
    Bar,
    #[serde(rename = "PieChart")]
    Pie,
    #[serde(rename = "AreaChart")]
    Area,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChartDescriptor {
    pub chart_type: ChartType,
    pub data_key: String,
    pub value_keys: Vec<String>,
    pub title: String,
}

impl ChartDescriptor {
    /// Decode a model response, tolerating only surrounding whitespace and
    /// code fences.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(&strip_fences(text)).map_err(|e| {
            PipelineError::MalformedModelOutput(format!("Invalid chart configuration: {}", e))
        })
    }
}

pub fn render_chart_prompt(question: &str, fields: &[&str], sample: &Row) -> String {
    let sample = serde_json::Value::Object(sample.clone());
    format!(
        "Given this data from query \"{question}\":\n\
         \n\
         Columns: {columns}\n\
         Sample row: {sample}\n\
         \n\
         Return ONLY a JSON object with:\n\
         {{\n  \
           \"chartType\": \"LineChart|BarChart|PieChart|AreaChart\",\n  \
           \"dataKey\": \"x-axis field name\",\n  \
           \"valueKeys\": [\"metric1\", \"metric2\"],\n  \
           \"title\": \"Chart title\"\n\
         }}\n\
         \n\
         Choose the best chart type for this data. Return ONLY valid JSON.",
        columns = fields.join(", "),
    )
}

/// Asks the model to classify a query result into a chart.
pub struct ChartInference {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
}

impl ChartInference {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    pub async fn infer(
        &self,
        question: &str,
        result: &QueryResult,
    ) -> Result<ChartDescriptor, PipelineError> {
        let empty = Row::new();
        let sample = result.rows.first().unwrap_or(&empty);
        let prompt = render_chart_prompt(question, &result.field_names(), sample);

        let text = self
            .model
            .complete(&prompt, self.max_tokens)
            .await?
            .ok_or_else(|| {
                PipelineError::MalformedModelOutput(
                    "Chart response contained no text".to_string(),
                )
            })?;

        ChartDescriptor::parse(&text)
    }
}
