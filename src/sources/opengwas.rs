//! OpenGWAS metadata feed
//!
//! `GET {base}/gwasinfo` returns every dataset's metadata, either as a JSON
//! array of records or as an object keyed by dataset id. Records are
//! flattened into a [`Table`] whose columns are the union of all keys in
//! first-seen order.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value as JsonValue};
use tracing::info;

use crate::config::OpenGwasConfig;
use crate::table::{Table, Value};
use crate::utils::error::FetchError;
use crate::utils::strip_float_suffix;

/// Id fragment of the eQTL datasets that are left out of the metadata
pub const EQTL_ID_FRAGMENT: &str = "eqtl-a";

/// OpenGWAS API client
pub struct OpenGwasClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl OpenGwasClient {
    pub fn new(config: &OpenGwasConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(super::user_agent())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Fetch the metadata of every dataset
    pub async fn fetch_gwasinfo(&self) -> Result<Table, FetchError> {
        let url = format!("{}/gwasinfo", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body: JsonValue = response.json().await?;
        let table = gwasinfo_to_table(&body)?;
        info!(records = table.len(), columns = table.columns().len(), "Fetched OpenGWAS metadata");
        Ok(table)
    }
}

/// Flatten a `gwasinfo` response into a table with `id` first
pub fn gwasinfo_to_table(body: &JsonValue) -> Result<Table, FetchError> {
    let records: Vec<&Map<String, JsonValue>> = match body {
        JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_object).collect(),
        JsonValue::Object(by_id) => by_id.values().filter_map(JsonValue::as_object).collect(),
        _ => {
            return Err(FetchError::Decode(
                "gwasinfo response is neither an array nor an object".to_string(),
            ))
        }
    };

    let mut columns = vec!["id".to_string()];
    for record in &records {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for record in records {
        table.push_row(
            columns
                .iter()
                .map(|c| record.get(c).map_or(Value::Null, json_to_value))
                .collect(),
        );
    }
    Ok(table)
}

fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Drop eQTL datasets and strip the `.0` from publication ids
pub fn prepare_opengwas_metadata(table: &mut Table, pmid_column: Option<&str>) {
    let before = table.len();
    if let Some(id) = table.column_index("id") {
        table.retain_rows(|_, row| {
            row[id]
                .as_text()
                .map_or(true, |id| !id.contains(EQTL_ID_FRAGMENT))
        });
    }
    let removed = before - table.len();

    if let Some(column) = pmid_column {
        if let Some(idx) = table.column_index(column) {
            let cleaned: Vec<Value> = table
                .rows()
                .iter()
                .map(|row| match row[idx].as_text() {
                    Some(raw) => Value::raw(strip_float_suffix(raw.trim())),
                    None => Value::Null,
                })
                .collect();
            table.drop_columns(&[column]);
            let mut values = cleaned.into_iter();
            table.add_column(column, |_, _| values.next().unwrap_or(Value::Null));
            table.parse_numeric_column(column);
        }
    }

    info!(records = table.len(), removed_eqtl = removed, "Prepared OpenGWAS metadata");
}
