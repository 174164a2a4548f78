use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::FirestoreConfig;

// ── Constants ────────────────────────────────────────────────────────────────

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const FIRESTORE_AUDIENCE: &str = "https://firestore.googleapis.com/";
const TOKEN_TTL_SECS: u64 = 3600;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to sign service-account token: {0}")]
    Auth(String),
    #[error("Firestore request failed: {0}")]
    Request(String),
    #[error("Firestore returned status {0}: {1}")]
    Status(u16, String),
    #[error("Undecodable Firestore response: {0}")]
    Decode(String),
}

// ── Query operators ──────────────────────────────────────────────────────────

/// Single-field comparison operators supported by `query_collection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl QueryOp {
    fn as_firestore(self) -> &'static str {
        match self {
            QueryOp::Eq => "EQUAL",
            QueryOp::Ne => "NOT_EQUAL",
            QueryOp::Gt => "GREATER_THAN",
            QueryOp::Gte => "GREATER_THAN_OR_EQUAL",
            QueryOp::Lt => "LESS_THAN",
            QueryOp::Lte => "LESS_THAN_OR_EQUAL",
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Thin document CRUD/query client over the Firestore REST API. Not wired
/// into any routed endpoint; provided as a capability for callers that need
/// persistence.
#[derive(Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    config: FirestoreConfig,
}

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    sub: String,
    aud: String,
    iat: u64,
    exp: u64,
}

impl FirestoreClient {
    pub fn new(http: reqwest::Client, config: FirestoreConfig) -> Self {
        Self { http, config }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_BASE_URL, self.config.project_id
        )
    }

    /// Mint a self-signed RS256 bearer token for the Firestore API. Minted
    /// per request; no token is cached between calls.
    fn bearer_token(&self) -> Result<String, StoreError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Auth(e.to_string()))?
            .as_secs();

        let claims = Claims {
            iss: self.config.client_email.clone(),
            sub: self.config.client_email.clone(),
            aud: FIRESTORE_AUDIENCE.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.config.private_key_id.clone());

        // Keys delivered through env vars usually carry escaped newlines.
        let pem = self.config.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| StoreError::Auth(e.to_string()))?;

        encode(&header, &claims, &key).map_err(|e| StoreError::Auth(e.to_string()))
    }

    /// Create a document, with an explicit id or a server-generated one.
    /// Returns the id of the created document.
    pub async fn add_document(
        &self,
        collection: &str,
        data: &Map<String, Value>,
        document_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let token = self.bearer_token()?;
        let url = format!("{}/{}", self.documents_url(), collection);

        let mut request = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "fields": to_firestore_fields(data) }));
        if let Some(id) = document_id {
            request = request.query(&[("documentId", id)]);
        }

        let body = send_checked(request).await?;
        let name = body
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| StoreError::Decode("document name missing".to_string()))?;
        Ok(document_id_from_name(name))
    }

    /// Fetch a document by id; `Ok(None)` when it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        let token = self.bearer_token()?;
        let url = format!("{}/{}/{}", self.documents_url(), collection, document_id);

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16(), text));
        }
        let body: Value =
            serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(from_firestore_fields(body.get("fields"))))
    }

    /// Partial merge: only the supplied keys are written, via an update mask.
    pub async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let token = self.bearer_token()?;
        let url = format!("{}/{}/{}", self.documents_url(), collection, document_id);

        let mask: Vec<(&str, &str)> = data
            .keys()
            .map(|key| ("updateMask.fieldPaths", key.as_str()))
            .collect();

        let request = self
            .http
            .patch(url)
            .bearer_auth(token)
            .query(&mask)
            .json(&json!({ "fields": to_firestore_fields(data) }));

        send_checked(request).await?;
        Ok(())
    }

    pub async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let token = self.bearer_token()?;
        let url = format!("{}/{}/{}", self.documents_url(), collection, document_id);
        send_checked(self.http.delete(url).bearer_auth(token)).await?;
        Ok(())
    }

    /// Single-field comparison query with an optional result limit. Each
    /// returned mapping carries its document id under the `id` key.
    pub async fn query_collection(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
        limit: Option<u32>,
    ) -> Result<Vec<Map<String, Value>>, StoreError> {
        let token = self.bearer_token()?;
        let url = format!("{}:runQuery", self.documents_url());
        let body = query_body(collection, field, op, value, limit);

        let response_body =
            send_checked(self.http.post(url).bearer_auth(token).json(&body)).await?;

        let entries = response_body
            .as_array()
            .ok_or_else(|| StoreError::Decode("expected a result array".to_string()))?;

        let mut results = Vec::new();
        for entry in entries {
            // Entries without a document are progress markers; skip them.
            let document = match entry.get("document") {
                Some(doc) => doc,
                None => continue,
            };
            let mut fields = from_firestore_fields(document.get("fields"));
            if let Some(name) = document.get("name").and_then(|n| n.as_str()) {
                fields.insert("id".to_string(), Value::from(document_id_from_name(name)));
            }
            results.push(fields);
        }
        Ok(results)
    }
}

async fn send_checked(request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
    let response = request
        .send()
        .await
        .map_err(|e| StoreError::Request(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| StoreError::Request(e.to_string()))?;
    if !status.is_success() {
        return Err(StoreError::Status(status.as_u16(), text));
    }
    serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
}

// ── Wire-format helpers ──────────────────────────────────────────────────────

fn document_id_from_name(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn query_body(
    collection: &str,
    field: &str,
    op: QueryOp,
    value: &Value,
    limit: Option<u32>,
) -> Value {
    let mut query = json!({
        "from": [{ "collectionId": collection }],
        "where": {
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": op.as_firestore(),
                "value": to_firestore_value(value),
            }
        }
    });
    if let Some(limit) = limit {
        query["limit"] = json!(limit);
    }
    json!({ "structuredQuery": query })
}

/// Encode a JSON value into Firestore's typed value representation. Integers
/// are strings on the wire.
fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

fn to_firestore_fields(map: &Map<String, Value>) -> Value {
    let fields: Map<String, Value> = map
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore_value(value)))
        .collect();
    Value::Object(fields)
}

fn from_firestore_value(value: &Value) -> Value {
    let map = match value.as_object() {
        Some(map) => map,
        None => return Value::Null,
    };
    if map.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(b) = map.get("booleanValue").and_then(|v| v.as_bool()) {
        return Value::from(b);
    }
    if let Some(raw) = map.get("integerValue") {
        // Sent as a JSON string, occasionally as a bare number.
        if let Some(i) = raw.as_str().and_then(|s| s.parse::<i64>().ok()) {
            return Value::from(i);
        }
        if let Some(i) = raw.as_i64() {
            return Value::from(i);
        }
    }
    if let Some(f) = map.get("doubleValue").and_then(|v| v.as_f64()) {
        return Value::from(f);
    }
    if let Some(s) = map.get("stringValue").and_then(|v| v.as_str()) {
        return Value::from(s);
    }
    if let Some(s) = map.get("timestampValue").and_then(|v| v.as_str()) {
        return Value::from(s);
    }
    if let Some(s) = map.get("referenceValue").and_then(|v| v.as_str()) {
        return Value::from(s);
    }
    if let Some(items) = map
        .get("arrayValue")
        .and_then(|v| v.get("values"))
        .and_then(|v| v.as_array())
    {
        return Value::Array(items.iter().map(from_firestore_value).collect());
    }
    if let Some(fields) = map.get("mapValue").and_then(|v| v.get("fields")) {
        return Value::Object(from_firestore_fields(Some(fields)));
    }
    Value::Null
}

fn from_firestore_fields(fields: Option<&Value>) -> Map<String, Value> {
    fields
        .and_then(|f| f.as_object())
        .map(|map| {
            map.iter()
                .map(|(key, value)| (key.clone(), from_firestore_value(value)))
                .collect()
        })
        .unwrap_or_default()
}

// ── Tests ────────────────────────────────────────────────────────────────────
