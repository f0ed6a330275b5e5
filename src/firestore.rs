//! Minimal Firestore REST document client.
//!
//! The health record lives in a single document per user, so only three
//! operations are needed: get, full replace, and field-masked patch
//! (Firestore's merge). Values are converted between plain JSON and
//! Firestore's typed wire format.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::FirebaseAuth;

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Deserialize)]
pub struct Document {
    pub name: String,
    pub fields: Option<Map<String, Value>>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
}

#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    auth: FirebaseAuth,
    project_id: String,
}

impl FirestoreClient {
    pub fn new(auth: FirebaseAuth, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            project_id: project_id.into(),
        }
    }

    fn documents_base(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            BASE_URL, self.project_id
        )
    }

    /// Fetch a document. `Ok(None)` when it does not exist.
    pub async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let token = self.auth.id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);

        let resp = self.client.get(&url).bearer_auth(&token).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("GET {} failed: {} - {}", path, status, body));
        }

        Ok(Some(resp.json().await?))
    }

    /// Merge `fields` into a document, creating it if needed. Only the
    /// masked field paths are touched; everything else on the document
    /// is left as-is.
    pub async fn patch_document(
        &self,
        path: &str,
        fields: Map<String, Value>,
        field_paths: &[&str],
    ) -> Result<Document> {
        let token = self.auth.id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);

        let mut req = self.client.patch(&url).bearer_auth(&token);
        for fp in field_paths {
            req = req.query(&[("updateMask.fieldPaths", *fp)]);
        }

        let resp = req.json(&json!({ "fields": fields })).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("PATCH {} failed: {} - {}", path, status, body));
        }

        Ok(resp.json().await?)
    }

    /// Replace a document wholesale (no update mask).
    pub async fn set_document(&self, path: &str, fields: Map<String, Value>) -> Result<Document> {
        let token = self.auth.id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);

        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("SET {} failed: {} - {}", path, status, body));
        }

        Ok(resp.json().await?)
    }
}

/// Plain JSON -> Firestore typed value.
pub fn to_wire_value(val: &Value) -> Value {
    match val {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore integers travel as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_wire_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": to_wire_fields(map) } }),
    }
}

/// Flat JSON object -> Firestore `fields` map.
pub fn to_wire_fields(obj: &Map<String, Value>) -> Map<String, Value> {
    obj.iter()
        .map(|(k, v)| (k.clone(), to_wire_value(v)))
        .collect()
}

/// Firestore typed value -> plain JSON.
pub fn from_wire_value(val: &Value) -> Value {
    let Some(obj) = val.as_object() else {
        return val.clone();
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| inner.clone(), |n| json!(n)),
        "doubleValue" | "booleanValue" | "stringValue" | "timestampValue" | "referenceValue" => {
            inner.clone()
        }
        "mapValue" => inner
            .get("fields")
            .map_or_else(|| json!({}), from_wire_fields),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(from_wire_value).collect())
                .unwrap_or_default();
            Value::Array(items)
        }
        _ => val.clone(),
    }
}

/// Firestore `fields` map -> flat JSON object.
pub fn from_wire_fields(fields: &Value) -> Value {
    match fields.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_wire_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

/// Parse a fetched document into a flat JSON object of its fields.
pub fn document_fields(doc: &Document) -> Value {
    match doc.fields {
        Some(ref fields) => from_wire_fields(&Value::Object(fields.clone())),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_preserves_scalars() {
        let original = json!({
            "waterIntake": 1500,
            "sleepHours": 7.5,
            "mentalHealthStatus": "Good",
            "completed": true,
            "note": null
        });
        let wire = to_wire_fields(original.as_object().unwrap());
        let back = from_wire_fields(&Value::Object(wire));
        assert_eq!(back, original);
    }

    #[test]
    fn wire_round_trip_preserves_nesting() {
        let original = json!({
            "entries": [ { "calories": 120.5, "name": "banana" } ],
            "meta": { "count": 1 }
        });
        let wire = to_wire_fields(original.as_object().unwrap());
        let back = from_wire_fields(&Value::Object(wire));
        assert_eq!(back, original);
    }

    #[test]
    fn integers_travel_as_strings() {
        let wire = to_wire_value(&json!(42));
        assert_eq!(wire, json!({ "integerValue": "42" }));
        assert_eq!(from_wire_value(&wire), json!(42));
    }
}
