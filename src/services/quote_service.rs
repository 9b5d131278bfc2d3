use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::config::NotificationConfig;
use crate::notify::{EmailMessage, Notifier};
use crate::storage::{ObjectStore, PutObject, StorageError, WriteCondition};

pub const UNKNOWN_TPA: &str = "unknown-tpa";
pub const UNKNOWN_EMPLOYER: &str = "unknown-employer";
const METADATA_FILENAME: &str = "submission-data.json";

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
}

/// A file part of a multipart submission, fully buffered
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteSubmission {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    pub tpa_id: String,
    pub employer_id: String,
}

impl Identifiers {
    /// Defaults, overridden by the caller's token, overridden in turn by explicit fields.
    pub fn resolve(identity: Option<&Identity>, fields: &Map<String, Value>) -> Self {
        let mut tpa_id = UNKNOWN_TPA.to_string();
        let mut employer_id = UNKNOWN_EMPLOYER.to_string();

        if let Some(identity) = identity {
            if let Some(t) = &identity.tpa_id {
                tpa_id = t.clone();
            }
            if let Some(e) = &identity.employer_id {
                employer_id = e.clone();
            }
        }

        if let Some(t) = field_str(fields, "tpa_id") {
            tpa_id = t;
        }
        if let Some(e) = field_str(fields, "employer_id") {
            employer_id = e;
        }

        Self { tpa_id, employer_id }
    }
}

fn field_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReceipt {
    pub message: String,
    pub quote_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_results: Option<BTreeMap<String, UploadResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub email_sent: bool,
    pub identifiers: Identifiers,
}

/// Reduce a client-supplied filename to its final path component
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

/// `filename`, or `filename` with a numeric suffix before its extension when already taken
fn unique_filename(taken: &mut HashSet<String>, filename: String) -> String {
    if taken.insert(filename.clone()) {
        return filename;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (filename.clone(), String::new()),
    };

    (2..)
        .map(|n| format!("{}-{}{}", stem, n, ext))
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or(filename)
}

/// Repeated form fields are reported as `field`, `field_2`, `field_3`, ...
fn result_key(results: &BTreeMap<String, UploadResult>, field: &str) -> String {
    if !results.contains_key(field) {
        return field.to_string();
    }

    (2..)
        .map(|n| format!("{}_{}", field, n))
        .find(|key| !results.contains_key(key))
        .unwrap_or_else(|| field.to_string())
}

fn key_segment(value: &str) -> String {
    value.replace(['/', '\\'], "-")
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Accepts quote submissions: stores files and metadata, then notifies staff.
#[derive(Clone)]
pub struct QuoteService {
    documents: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    notification: NotificationConfig,
    api_key: Option<String>,
}

impl QuoteService {
    pub fn new(
        documents: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        notification: NotificationConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            documents,
            notifier,
            notification,
            api_key,
        }
    }

    pub fn check_api_key(&self, provided: Option<&str>) -> Result<(), QuoteError> {
        match &self.api_key {
            Some(expected) if provided != Some(expected.as_str()) => Err(QuoteError::InvalidApiKey),
            _ => Ok(()),
        }
    }

    /// Parse a non-multipart body into submission fields. An empty body has no fields.
    pub fn parse_json_fields(body: &[u8]) -> Result<Map<String, Value>, QuoteError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(QuoteError::InvalidJson("expected a JSON object".to_string())),
            Err(e) => Err(QuoteError::InvalidJson(e.to_string())),
        }
    }

    fn submission_data(submission_id: &str, fields: Map<String, Value>, identifiers: &Identifiers) -> Map<String, Value> {
        let mut data = fields;
        data.insert("submissionId".into(), Value::String(submission_id.to_string()));
        data.insert(
            "submissionDate".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        data.insert("tpaId".into(), Value::String(identifiers.tpa_id.clone()));
        data.insert("employerId".into(), Value::String(identifiers.employer_id.clone()));
        data
    }

    fn submission_prefix(identifiers: &Identifiers, submission_id: &str) -> String {
        format!(
            "submissions/{}/{}/{}/",
            key_segment(&identifiers.tpa_id),
            key_segment(&identifiers.employer_id),
            key_segment(submission_id)
        )
    }

    pub async fn submit_multipart(
        &self,
        submission: QuoteSubmission,
        identity: Option<&Identity>,
    ) -> QuoteReceipt {
        let submission_id = format!("submission-{}", Uuid::new_v4());
        let identifiers = Identifiers::resolve(identity, &submission.fields);
        let prefix = Self::submission_prefix(&identifiers, &submission_id);

        info!(
            "Processing quote submission {} ({} fields, {} files) for {}/{}",
            submission_id,
            submission.fields.len(),
            submission.files.len(),
            identifiers.tpa_id,
            identifiers.employer_id
        );

        let data = Self::submission_data(&submission_id, submission.fields, &identifiers);

        let mut upload_results = BTreeMap::new();
        let mut taken = HashSet::from([METADATA_FILENAME.to_string()]);
        for file in submission.files {
            let filename = unique_filename(&mut taken, sanitize_filename(&file.filename));
            let size = file.content.len();
            let result = match self.upload(&prefix, &filename, &file.content_type, file.content).await {
                Ok(url) => UploadResult {
                    filename,
                    url: Some(url),
                    size: Some(size),
                    error: None,
                },
                Err(e) => {
                    error!("Error uploading {}: {}", file.field, e);
                    UploadResult {
                        filename,
                        url: None,
                        size: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            let key = result_key(&upload_results, &file.field);
            upload_results.insert(key, result);
        }

        let mut metadata = data.clone();
        metadata.insert(
            "files".into(),
            serde_json::to_value(&upload_results).unwrap_or(Value::Null),
        );
        if let Err(e) = self.store_metadata(&prefix, &metadata).await {
            error!("Error storing submission metadata for {}: {}", submission_id, e);
        }

        let email_sent = self.notify(&data, &upload_results, &prefix).await;

        QuoteReceipt {
            message: "Quote submitted successfully".to_string(),
            quote_id: submission_id,
            upload_results: Some(upload_results),
            note: None,
            email_sent,
            identifiers,
        }
    }

    pub async fn submit_json(&self, fields: Map<String, Value>, identity: Option<&Identity>) -> QuoteReceipt {
        let submission_id = format!("QUOTE-{}", Uuid::new_v4());
        let identifiers = Identifiers::resolve(identity, &fields);
        let prefix = Self::submission_prefix(&identifiers, &submission_id);

        info!(
            "Processing JSON quote submission {} for {}/{}",
            submission_id, identifiers.tpa_id, identifiers.employer_id
        );

        let data = Self::submission_data(&submission_id, fields, &identifiers);
        let email_sent = self.notify(&data, &BTreeMap::new(), &prefix).await;

        QuoteReceipt {
            message: "Quote submitted successfully".to_string(),
            quote_id: submission_id,
            upload_results: None,
            note: Some("Files can only be uploaded using multipart/form-data".to_string()),
            email_sent,
            identifiers,
        }
    }

    /// Store one file under `prefix`, then confirm it landed with the expected size.
    async fn upload(
        &self,
        prefix: &str,
        filename: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<String, StorageError> {
        let key = format!("{}{}", prefix, filename);
        let size = content.len();
        let checksum = format!("{:x}", Sha256::digest(&content));

        debug!("Uploading {} ({} bytes, {}) to {}", filename, size, content_type, key);

        let object = PutObject::new(content, content_type)
            .with_metadata("original-filename", filename)
            .with_metadata("content-type", content_type)
            .with_metadata("file-size", size.to_string())
            .with_metadata("sha256", checksum);

        self.documents.put(&key, object, WriteCondition::Always).await?;

        match self.documents.head(&key).await {
            Ok(Some(head)) if head.size != size as u64 => {
                warn!("Uploaded file size mismatch for {}: expected {}, got {}", key, size, head.size)
            }
            Ok(Some(_)) => {}
            Ok(None) => warn!("Uploaded object {} not visible after write", key),
            Err(e) => warn!("Error verifying upload of {}: {}", key, e),
        }

        Ok(format!("s3://{}/{}", self.documents.bucket(), key))
    }

    async fn store_metadata(&self, prefix: &str, metadata: &Map<String, Value>) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(metadata).map_err(anyhow::Error::new)?;
        self.upload(prefix, METADATA_FILENAME, "application/json", Bytes::from(body))
            .await
            .map(|_| ())
    }

    async fn notify(
        &self,
        data: &Map<String, Value>,
        uploads: &BTreeMap<String, UploadResult>,
        prefix: &str,
    ) -> bool {
        if !self.notification.enabled {
            debug!("Notifications disabled, skipping");
            return false;
        }

        let message = self.render_email(data, uploads, prefix);
        match self.notifier.send(&message).await {
            Ok(Some(message_id)) => {
                info!("Notification sent: {}", message_id);
                true
            }
            Ok(None) => false,
            Err(e) => {
                error!("Error sending notification: {}", e);
                false
            }
        }
    }

    pub fn render_email(
        &self,
        data: &Map<String, Value>,
        uploads: &BTreeMap<String, UploadResult>,
        prefix: &str,
    ) -> EmailMessage {
        fn text<'a>(data: &'a Map<String, Value>, key: &str) -> &'a str {
            data.get(key).and_then(Value::as_str).unwrap_or_default()
        }

        let mut fields_html = String::from("<h3>Form Fields:</h3><ul>");
        for (key, value) in data {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            fields_html.push_str(&format!("<li>{}: {}</li>", html_escape(key), html_escape(&rendered)));
        }
        fields_html.push_str("</ul>");

        let files_html = if uploads.is_empty() {
            "<p>No files were uploaded with this submission.</p>".to_string()
        } else {
            let mut html = String::from("<h3>Uploaded Files:</h3><ul>");
            for (field, upload) in uploads {
                let detail = match (upload.size, &upload.error) {
                    (Some(size), _) => format!("{} bytes", size),
                    (None, Some(err)) => format!("failed: {}", err),
                    (None, None) => "unknown size".to_string(),
                };
                html.push_str(&format!(
                    "<li>{}: {} ({})</li>",
                    html_escape(field),
                    html_escape(&upload.filename),
                    html_escape(&detail)
                ));
            }
            html.push_str("</ul>");
            html
        };

        let html_body = format!(
            "<html><head><title>New Quote Submission</title></head><body>\
             <h2>New Quote Submission Received</h2>\
             <p>A new quote has been submitted with the following details:</p>\
             <p><strong>Submission ID:</strong> {}</p>\
             <p><strong>Submission Date:</strong> {}</p>\
             <p><strong>TPA ID:</strong> {}</p>\
             <p><strong>Employer ID:</strong> {}</p>\
             {}{}\
             <p>The files have been stored with the path: {}</p>\
             </body></html>",
            html_escape(text(data, "submissionId")),
            html_escape(text(data, "submissionDate")),
            html_escape(text(data, "tpaId")),
            html_escape(text(data, "employerId")),
            fields_html,
            files_html,
            html_escape(prefix)
        );

        EmailMessage {
            from: self.notification.from.clone(),
            to: self.notification.to.clone(),
            subject: format!("{} - {}", self.notification.subject, text(data, "submissionId")),
            html_body,
        }
    }
}
