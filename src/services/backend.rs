use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;
use crate::schemas::account::{Account, AccountCreate, AccountUpdate};
use crate::schemas::attendance::{AttendancePayload, AttendanceRecord};
use crate::schemas::grade::{GradePayload, GradeRecord};
use crate::schemas::observed_value::{ObservedValuePayload, ObservedValueRecord};
use crate::schemas::student::{Student, StudentPayload};
use crate::schemas::subject::{Subject, SubjectPayload};

#[derive(Debug, Error)]
pub(crate) enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend returned an unexpected body: {0}")]
    Decode(String),
    #[error("backend returned no body")]
    EmptyBody,
}

impl BackendError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The school records backend. Storage lives behind it; this service never persists anything.
#[async_trait]
pub(crate) trait SchoolBackend: Send + Sync {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError>;
    async fn get_student(&self, id: &str) -> Result<Option<Student>, BackendError>;
    async fn create_student(&self, payload: &StudentPayload) -> Result<Student, BackendError>;
    async fn update_student(
        &self,
        id: &str,
        payload: &StudentPayload,
    ) -> Result<Student, BackendError>;
    async fn delete_student(&self, id: &str) -> Result<(), BackendError>;

    async fn grades_for_student(&self, student_id: &str) -> Result<Vec<GradeRecord>, BackendError>;
    async fn create_grade(&self, payload: &GradePayload) -> Result<GradeRecord, BackendError>;
    async fn update_grade(
        &self,
        id: &str,
        payload: &GradePayload,
    ) -> Result<GradeRecord, BackendError>;

    async fn attendance_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError>;
    async fn create_attendance(
        &self,
        payload: &AttendancePayload,
    ) -> Result<AttendanceRecord, BackendError>;

    async fn observed_values_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<ObservedValueRecord>, BackendError>;
    async fn create_observed_value(
        &self,
        payload: &ObservedValuePayload,
    ) -> Result<ObservedValueRecord, BackendError>;

    async fn list_subjects(&self) -> Result<Vec<Subject>, BackendError>;
    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, BackendError>;
    async fn create_subject(&self, payload: &SubjectPayload) -> Result<Subject, BackendError>;
    async fn update_subject(
        &self,
        id: &str,
        payload: &SubjectPayload,
    ) -> Result<Subject, BackendError>;
    async fn delete_subject(&self, id: &str) -> Result<(), BackendError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, BackendError>;
    async fn get_account(&self, id: &str) -> Result<Option<Account>, BackendError>;
    async fn create_account(&self, payload: &AccountCreate) -> Result<Account, BackendError>;
    async fn update_account(
        &self,
        id: &str,
        payload: &AccountUpdate,
    ) -> Result<Account, BackendError>;
    async fn delete_account(&self, id: &str) -> Result<(), BackendError>;

    /// `Ok(None)` when the backend rejects the credentials.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl HttpBackend {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = settings.backend();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .build()
            .map_err(|err| anyhow::anyhow!("Failed to build backend HTTP client: {err}"))?;

        Ok(Self::new(client, &backend.base_url))
    }

    pub(crate) fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<Value>, BackendError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let raw = response.text().await?;
        let parsed = if raw.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(&raw).map_err(|err| {
                BackendError::Decode(format!("{method} {path}: non-JSON body ({err})"))
            })?)
        };

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .map(extract_error_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            tracing::debug!(%method, path, status = status.as_u16(), %message, "Backend error");
            return Err(BackendError::Status { status: status.as_u16(), message });
        }

        Ok(parsed.map(unwrap_envelope))
    }

    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, BackendError> {
        match self.send::<()>(Method::GET, path, None).await {
            Ok(Some(value)) => decode(path, value).map(Some),
            Ok(None) => Ok(None),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BackendError> {
        match self.send::<()>(Method::GET, path, None).await? {
            Some(value) => decode(path, value),
            None => Ok(Vec::new()),
        }
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let value = self.send(method, path, Some(body)).await?.ok_or(BackendError::EmptyBody)?;
        decode(path, value)
    }

    async fn remove(&self, path: &str) -> Result<(), BackendError> {
        self.send::<()>(Method::DELETE, path, None).await.map(|_| ())
    }
}

#[async_trait]
impl SchoolBackend for HttpBackend {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        self.fetch_list("/students").await
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>, BackendError> {
        self.fetch_optional(&format!("/students/{id}")).await
    }

    async fn create_student(&self, payload: &StudentPayload) -> Result<Student, BackendError> {
        self.write(Method::POST, "/students", payload).await
    }

    async fn update_student(
        &self,
        id: &str,
        payload: &StudentPayload,
    ) -> Result<Student, BackendError> {
        self.write(Method::PUT, &format!("/students/{id}"), payload).await
    }

    async fn delete_student(&self, id: &str) -> Result<(), BackendError> {
        self.remove(&format!("/students/{id}")).await
    }

    async fn grades_for_student(&self, student_id: &str) -> Result<Vec<GradeRecord>, BackendError> {
        self.fetch_list(&format!("/grades/student/{student_id}")).await
    }

    async fn create_grade(&self, payload: &GradePayload) -> Result<GradeRecord, BackendError> {
        self.write(Method::POST, "/grades", payload).await
    }

    async fn update_grade(
        &self,
        id: &str,
        payload: &GradePayload,
    ) -> Result<GradeRecord, BackendError> {
        self.write(Method::PUT, &format!("/grades/{id}"), payload).await
    }

    async fn attendance_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        self.fetch_list(&format!("/attendance/student/{student_id}")).await
    }

    async fn create_attendance(
        &self,
        payload: &AttendancePayload,
    ) -> Result<AttendanceRecord, BackendError> {
        self.write(Method::POST, "/attendance", payload).await
    }

    async fn observed_values_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<ObservedValueRecord>, BackendError> {
        self.fetch_list(&format!("/observed-values/student/{student_id}")).await
    }

    async fn create_observed_value(
        &self,
        payload: &ObservedValuePayload,
    ) -> Result<ObservedValueRecord, BackendError> {
        self.write(Method::POST, "/observed-values", payload).await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, BackendError> {
        self.fetch_list("/subjects").await
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, BackendError> {
        self.fetch_optional(&format!("/subjects/{id}")).await
    }

    async fn create_subject(&self, payload: &SubjectPayload) -> Result<Subject, BackendError> {
        self.write(Method::POST, "/subjects", payload).await
    }

    async fn update_subject(
        &self,
        id: &str,
        payload: &SubjectPayload,
    ) -> Result<Subject, BackendError> {
        self.write(Method::PUT, &format!("/subjects/{id}"), payload).await
    }

    async fn delete_subject(&self, id: &str) -> Result<(), BackendError> {
        self.remove(&format!("/subjects/{id}")).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, BackendError> {
        self.fetch_list("/accounts").await
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, BackendError> {
        self.fetch_optional(&format!("/accounts/{id}")).await
    }

    async fn create_account(&self, payload: &AccountCreate) -> Result<Account, BackendError> {
        self.write(Method::POST, "/accounts", payload).await
    }

    async fn update_account(
        &self,
        id: &str,
        payload: &AccountUpdate,
    ) -> Result<Account, BackendError> {
        self.write(Method::PUT, &format!("/accounts/{id}"), payload).await
    }

    async fn delete_account(&self, id: &str) -> Result<(), BackendError> {
        self.remove(&format!("/accounts/{id}")).await
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, BackendError> {
        let credentials = Credentials { username, password };
        match self.send(Method::POST, "/auth/login", Some(&credentials)).await {
            Ok(Some(value)) => {
                let account = match value {
                    Value::Object(mut map) if map.contains_key("user") => {
                        map.remove("user").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                decode("/auth/login", account).map(Some)
            }
            Ok(None) => Ok(None),
            Err(err) if matches!(err.status(), Some(400 | 401 | 403 | 404)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.send::<()>(Method::GET, "/subjects", None).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|err| BackendError::Decode(format!("{path}: {err}")))
}

/// Responses come either bare or wrapped as `{ "data": ... }`.
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn extract_error_message(value: &Value) -> String {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
