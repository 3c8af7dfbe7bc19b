//! Firestore REST note store.
//!
//! Talks to the v1 document API. Live queries are emulated by polling the
//! owner-scoped query and pushing a snapshot whenever the result changes.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{NoteStore, Subscription};
use crate::config::FirebaseConfig;
use crate::models::{Document, NoteFields, NoteId, Snapshot};
use crate::{Error, Result};

const NOTE_FIELD_PATHS: [&str; 4] = ["title", "content", "userId", "timestamp"];

#[derive(Clone)]
pub struct FirestoreNoteStore {
    config: FirebaseConfig,
    client: Client,
    id_token: Arc<RwLock<Option<String>>>,
}

impl FirestoreNoteStore {
    pub fn new(config: FirebaseConfig) -> Result<Self> {
        Ok(Self {
            config,
            client: Client::builder().build()?,
            id_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Authenticate requests with the signed-in user's id token.
    #[must_use]
    pub fn with_id_token(self, token: impl Into<String>) -> Self {
        self.set_id_token(Some(token.into()));
        self
    }

    /// Replace the id token, e.g. after a refresh. Clones share the token.
    pub fn set_id_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.id_token.write() {
            *guard = token;
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.config.documents_url(), self.config.collection)
    }

    fn document_url(&self, id: &NoteId) -> String {
        format!("{}/{}", self.collection_url(), id.as_str())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.config.api_key.as_str())]);
        let token = self.id_token.read().ok().and_then(|guard| guard.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn run_query(&self, owner_id: &str) -> Result<Snapshot> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.config.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "userId" },
                        "op": "EQUAL",
                        "value": { "stringValue": owner_id },
                    }
                }
            }
        });
        let request = self
            .client
            .post(format!("{}:runQuery", self.config.documents_url()))
            .json(&body);
        let response = check_response(self.authorize(request).send().await?).await?;

        let rows: Vec<QueryRow> = response.json().await?;
        Ok(Snapshot::new(
            rows.into_iter()
                .filter_map(|row| row.document)
                .map(RemoteDocument::into_document)
                .collect(),
        ))
    }
}

#[async_trait]
impl NoteStore for FirestoreNoteStore {
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription> {
        let initial = self
            .run_query(owner_id)
            .await
            .map_err(|error| Error::Subscription(error.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Ok(initial.clone()));

        let store = self.clone();
        let owner_id = owner_id.to_string();
        let interval = self.config.poll_interval;
        let task = tokio::spawn(async move {
            let mut last = initial;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if sender.is_closed() {
                    break;
                }
                match store.run_query(&owner_id).await {
                    Ok(snapshot) if snapshot == last => {}
                    Ok(snapshot) => {
                        if sender.send(Ok(snapshot.clone())).is_err() {
                            break;
                        }
                        last = snapshot;
                    }
                    Err(error) => {
                        tracing::warn!("Note poll failed: {}", error);
                        if sender
                            .send(Err(Error::Subscription(error.to_string())))
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Note listener for {} stopped", owner_id);
        });

        Ok(Subscription::with_task(receiver, task))
    }

    async fn fetch(&self, owner_id: &str) -> Result<Snapshot> {
        self.run_query(owner_id).await
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Document>> {
        let request = self.client.get(self.document_url(id));
        let response = self.authorize(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_response(response).await?;
        let document: RemoteDocument = response.json().await?;
        Ok(Some(document.into_document()))
    }

    async fn add(&self, fields: &NoteFields) -> Result<NoteId> {
        let request = self
            .client
            .post(self.collection_url())
            .json(&json!({ "fields": encode_fields(fields) }));
        let response = check_response(self.authorize(request).send().await?).await?;

        let created: RemoteDocument = response.json().await?;
        let id = document_id(&created.name);
        if id.is_empty() {
            return Err(Error::Store(
                "created document has no resource name".to_string(),
            ));
        }
        tracing::debug!("Created note {}", id);
        Ok(NoteId::new(id))
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<()> {
        let mut query: Vec<(&str, &str)> = NOTE_FIELD_PATHS
            .iter()
            .map(|path| ("updateMask.fieldPaths", *path))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let request = self
            .client
            .patch(self.document_url(id))
            .query(&query)
            .json(&json!({ "fields": encode_fields(fields) }));
        let response = self.authorize(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }
        check_response(response).await?;
        tracing::debug!("Updated note {}", id);
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        let request = self.client.delete(self.document_url(id));
        check_response(self.authorize(request).send().await?).await?;
        tracing::debug!("Deleted note {}", id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    document: Option<RemoteDocument>,
}

#[derive(Debug, Deserialize)]
struct RemoteDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RemoteDocument {
    fn into_document(self) -> Document {
        let fields = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect();
        Document::new(document_id(&self.name), fields)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

async fn check_response(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Store(describe_failure(status, &body)))
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorEnvelope {
        error: Some(error), ..
    }) = serde_json::from_str::<ErrorEnvelope>(body)
    {
        let message = error.message.unwrap_or_default();
        return match error.status {
            Some(code) if !message.is_empty() => format!("{message} ({code})"),
            Some(code) => code,
            None if !message.is_empty() => message,
            None => format!("HTTP {}", status.as_u16()),
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", crate::util::compact_text(trimmed), status.as_u16())
    }
}

/// Last path segment of a document resource name
fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or_default().to_string()
}

fn encode_fields(fields: &NoteFields) -> Value {
    json!({
        "title": { "stringValue": fields.title },
        "content": { "stringValue": fields.content },
        "userId": { "stringValue": fields.owner_id },
        "timestamp": { "integerValue": fields.timestamp.to_string() },
    })
}

/// Unwrap a typed Firestore value into plain JSON.
///
/// Unknown shapes pass through unchanged so they surface as malformed
/// documents instead of being silently coerced.
fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return value.clone();
    };

    if let Some(text) = typed.get("stringValue") {
        return text.clone();
    }
    if let Some(raw) = typed.get("integerValue") {
        return match raw {
            Value::String(text) => text
                .parse::<i64>()
                .map_or_else(|_| raw.clone(), Value::from),
            other => other.clone(),
        };
    }
    if let Some(number) = typed.get("doubleValue") {
        return number.clone();
    }
    if let Some(flag) = typed.get("booleanValue") {
        return flag.clone();
    }
    if typed.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(timestamp) = typed.get("timestampValue") {
        return timestamp.clone();
    }
    if let Some(map) = typed.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), decode_value(value)))
                    .collect::<Map<String, Value>>()
            })
            .unwrap_or_default();
        return Value::Object(fields);
    }
    if let Some(array) = typed.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }

    value.clone()
}
