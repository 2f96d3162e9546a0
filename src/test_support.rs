use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::api;
use crate::core::{bootstrap::SeedDirectory, config::Settings, security, state::AppState};
use crate::schemas::account::{Account, AccountCreate, AccountUpdate, Role};
use crate::schemas::attendance::{AttendancePayload, AttendanceRecord};
use crate::schemas::grade::{GradePayload, GradeRecord, SubjectRef};
use crate::schemas::observed_value::{ObservedRating, ObservedValuePayload, ObservedValueRecord};
use crate::schemas::student::{Student, StudentPayload};
use crate::schemas::subject::{Subject, SubjectPayload};
use crate::schemas::wire::RecordId;
use crate::services::backend::{BackendError, SchoolBackend};

const TEST_SECRET_KEY: &str = "test-secret";
const TEST_SEED_ACCOUNTS: &str = "principal:principal-pass:superadmin,mreyes:teacher-pass:teacher";

pub(crate) const LEARNER_LRN: &str = "120001090153";
pub(crate) const REGISTRAR_PASSWORD: &str = "registrar-pass";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) backend: Arc<InMemoryBackend>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("REPORTCARD_ENV", "test");
    std::env::set_var("REPORTCARD_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "ENVIRONMENT",
        "API_PREFIX",
        "PROJECT_NAME",
        "ACCESS_TOKEN_EXPIRE_MINUTES",
        "ALGORITHM",
        "BACKEND_API_URL",
        "BACKEND_TIMEOUT_SECONDS",
        "BACKEND_CORS_ORIGINS",
        "SEED_ACCOUNTS",
        "USER_MATCH_FIRST_NAME",
    ] {
        std::env::remove_var(key);
    }
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(|| {}).await
}

/// Like [`setup_test_context`], with `configure` run after the default test environment.
pub(crate) async fn setup_test_context_with(configure: impl FnOnce()) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    std::env::set_var("SEED_ACCOUNTS", TEST_SEED_ACCOUNTS);
    configure();

    let settings = Settings::load().expect("settings");
    let seeds = SeedDirectory::from_settings(&settings).expect("seed accounts");
    let backend = Arc::new(InMemoryBackend::with_fixtures());

    let state = AppState::new(settings, backend.clone(), seeds);
    let app = api::router::router(state.clone());

    TestContext { state, app, backend, _guard: guard }
}

pub(crate) fn bearer_token(username: &str, role: Role, settings: &Settings) -> String {
    security::create_access_token(username, role, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) fn student(id: &str, lrn: &str, first_name: &str, last_name: &str) -> Student {
    Student {
        id: RecordId::from(id),
        lrn: lrn.to_string(),
        first_name: first_name.to_string(),
        middle_name: None,
        last_name: last_name.to_string(),
        grade_level: Some("7".to_string()),
        section: Some("Sampaguita".to_string()),
        school_year: Some("2024-2025".to_string()),
    }
}

fn subject(id: &str, code: &str, name: &str) -> Subject {
    Subject {
        id: RecordId::from(id),
        code: Some(code.to_string()),
        name: name.to_string(),
        description: None,
    }
}

fn grade(id: &str, student_id: &str, subject_id: &str, name: &str, q: [f64; 4]) -> GradeRecord {
    GradeRecord {
        id: Some(RecordId::from(id)),
        student_id: Some(RecordId::from(student_id)),
        subject_id: Some(RecordId::from(subject_id)),
        subject_name: None,
        subject: Some(SubjectRef { name: Some(name.to_string()) }),
        q1: Some(q[0]),
        q2: Some(q[1]),
        q3: Some(q[2]),
        q4: Some(q[3]),
        final_rating: None,
    }
}

fn attendance(student_id: &str, month: &str, present: u32, absent: u32, tardy: u32) -> AttendanceRecord {
    AttendanceRecord {
        id: None,
        student_id: Some(RecordId::from(student_id)),
        month: month.to_string(),
        days_of_school: Some(present + absent),
        days_present: Some(present),
        days_absent: Some(absent),
        days_tardy: Some(tardy),
        times_tardy: None,
    }
}

fn account(id: &str, username: &str, role: Role) -> Account {
    Account {
        id: RecordId::from(id),
        username: username.to_string(),
        email: Some(format!("{username}@school.example")),
        role,
        is_active: true,
    }
}

#[derive(Default)]
struct Store {
    students: Vec<Student>,
    grades: Vec<GradeRecord>,
    attendance: Vec<AttendanceRecord>,
    observed_values: Vec<ObservedValueRecord>,
    subjects: Vec<Subject>,
    accounts: Vec<(Account, String)>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId::new(self.next_id.to_string())
    }
}

/// A records backend held in memory, with switchable outage.
pub(crate) struct InMemoryBackend {
    store: Mutex<Store>,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    /// Three learners, three subjects, and a complete record set for the first learner.
    pub(crate) fn with_fixtures() -> Self {
        let store = Store {
            students: vec![
                student("1", LEARNER_LRN, "Maria", "Clara"),
                student("2", "120001090154", "Jose", "Rizal"),
                student("3", "120001090155", "Andres", "Bonifacio"),
            ],
            grades: vec![
                grade("11", "1", "1", "Mathematics", [90.0, 88.0, 92.0, 85.0]),
                grade("12", "1", "2", "English", [80.0, 85.0, 78.0, 90.0]),
                grade("13", "1", "3", "Filipino", [74.0, 73.0, 75.0, 74.0]),
            ],
            attendance: vec![
                attendance("1", "June", 20, 1, 0),
                attendance("1", "July", 19, 2, 1),
            ],
            observed_values: vec![ObservedValueRecord {
                id: Some(RecordId::from("21")),
                student_id: Some(RecordId::from("1")),
                core_value: "Makatao".to_string(),
                behavior_statement: "Is sensitive to individual, social, and cultural differences"
                    .to_string(),
                q1: Some(ObservedRating::AlwaysObserved),
                q2: Some(ObservedRating::SometimesObserved),
                q3: None,
                q4: None,
            }],
            subjects: vec![
                subject("1", "MATH7", "Mathematics"),
                subject("2", "ENG7", "English"),
                subject("3", "FIL7", "Filipino"),
            ],
            accounts: vec![
                (account("1", "principal", Role::Superadmin), String::new()),
                (account("2", "registrar", Role::Admin), REGISTRAR_PASSWORD.to_string()),
                (account("3", "mreyes", Role::Teacher), String::new()),
                (account("4", LEARNER_LRN, Role::User), "learner-pass".to_string()),
            ],
            next_id: 100,
        };
        Self { store: Mutex::new(store), unavailable: AtomicBool::new(false) }
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().expect("store lock")
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Status { status: 502, message: "Bad Gateway".to_string() });
        }
        Ok(())
    }
}

fn not_found(what: &str) -> BackendError {
    BackendError::Status { status: 404, message: format!("{what} not found") }
}

fn matches(id: &Option<RecordId>, wanted: &str) -> bool {
    id.as_ref().is_some_and(|id| id.as_str() == wanted)
}

#[async_trait]
impl SchoolBackend for InMemoryBackend {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        self.check()?;
        Ok(self.store().students.clone())
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>, BackendError> {
        self.check()?;
        Ok(self.store().students.iter().find(|s| s.id.as_str() == id).cloned())
    }

    async fn create_student(&self, payload: &StudentPayload) -> Result<Student, BackendError> {
        self.check()?;
        let mut store = self.store();
        if store.students.iter().any(|s| s.lrn == payload.lrn) {
            return Err(BackendError::Status {
                status: 409,
                message: "LRN already exists".to_string(),
            });
        }
        let created = Student {
            id: store.next_id(),
            lrn: payload.lrn.clone(),
            first_name: payload.first_name.clone(),
            middle_name: payload.middle_name.clone(),
            last_name: payload.last_name.clone(),
            grade_level: payload.grade_level.clone(),
            section: payload.section.clone(),
            school_year: payload.school_year.clone(),
        };
        store.students.push(created.clone());
        Ok(created)
    }

    async fn update_student(
        &self,
        id: &str,
        payload: &StudentPayload,
    ) -> Result<Student, BackendError> {
        self.check()?;
        let mut store = self.store();
        let existing = store
            .students
            .iter_mut()
            .find(|s| s.id.as_str() == id)
            .ok_or_else(|| not_found("Student"))?;
        existing.lrn = payload.lrn.clone();
        existing.first_name = payload.first_name.clone();
        existing.middle_name = payload.middle_name.clone();
        existing.last_name = payload.last_name.clone();
        existing.grade_level = payload.grade_level.clone();
        existing.section = payload.section.clone();
        existing.school_year = payload.school_year.clone();
        Ok(existing.clone())
    }

    async fn delete_student(&self, id: &str) -> Result<(), BackendError> {
        self.check()?;
        let mut store = self.store();
        let before = store.students.len();
        store.students.retain(|s| s.id.as_str() != id);
        if store.students.len() == before {
            return Err(not_found("Student"));
        }
        Ok(())
    }

    async fn grades_for_student(&self, student_id: &str) -> Result<Vec<GradeRecord>, BackendError> {
        self.check()?;
        Ok(self
            .store()
            .grades
            .iter()
            .filter(|g| matches(&g.student_id, student_id))
            .cloned()
            .collect())
    }

    async fn create_grade(&self, payload: &GradePayload) -> Result<GradeRecord, BackendError> {
        self.check()?;
        let mut store = self.store();
        let subject = store
            .subjects
            .iter()
            .find(|s| s.id == payload.subject_id)
            .map(|s| SubjectRef { name: Some(s.name.clone()) });
        let created = GradeRecord {
            id: Some(store.next_id()),
            student_id: Some(payload.student_id.clone()),
            subject_id: Some(payload.subject_id.clone()),
            subject_name: None,
            subject,
            q1: payload.q1,
            q2: payload.q2,
            q3: payload.q3,
            q4: payload.q4,
            final_rating: None,
        };
        store.grades.push(created.clone());
        Ok(created)
    }

    async fn update_grade(
        &self,
        id: &str,
        payload: &GradePayload,
    ) -> Result<GradeRecord, BackendError> {
        self.check()?;
        let mut store = self.store();
        let existing = store
            .grades
            .iter_mut()
            .find(|g| matches(&g.id, id))
            .ok_or_else(|| not_found("Grade"))?;
        existing.q1 = payload.q1;
        existing.q2 = payload.q2;
        existing.q3 = payload.q3;
        existing.q4 = payload.q4;
        Ok(existing.clone())
    }

    async fn attendance_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        self.check()?;
        Ok(self
            .store()
            .attendance
            .iter()
            .filter(|a| matches(&a.student_id, student_id))
            .cloned()
            .collect())
    }

    async fn create_attendance(
        &self,
        payload: &AttendancePayload,
    ) -> Result<AttendanceRecord, BackendError> {
        self.check()?;
        let mut store = self.store();
        let created = AttendanceRecord {
            id: Some(store.next_id()),
            student_id: Some(payload.student_id.clone()),
            month: payload.month.clone(),
            days_of_school: payload.days_of_school,
            days_present: payload.days_present,
            days_absent: payload.days_absent,
            days_tardy: payload.days_tardy,
            times_tardy: None,
        };
        store.attendance.push(created.clone());
        Ok(created)
    }

    async fn observed_values_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<ObservedValueRecord>, BackendError> {
        self.check()?;
        Ok(self
            .store()
            .observed_values
            .iter()
            .filter(|v| matches(&v.student_id, student_id))
            .cloned()
            .collect())
    }

    async fn create_observed_value(
        &self,
        payload: &ObservedValuePayload,
    ) -> Result<ObservedValueRecord, BackendError> {
        self.check()?;
        let mut store = self.store();
        let created = ObservedValueRecord {
            id: Some(store.next_id()),
            student_id: Some(payload.student_id.clone()),
            core_value: payload.core_value.clone(),
            behavior_statement: payload.behavior_statement.clone(),
            q1: payload.q1,
            q2: payload.q2,
            q3: payload.q3,
            q4: payload.q4,
        };
        store.observed_values.push(created.clone());
        Ok(created)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, BackendError> {
        self.check()?;
        Ok(self.store().subjects.clone())
    }

    async fn get_subject(&self, id: &str) -> Result<Option<Subject>, BackendError> {
        self.check()?;
        Ok(self.store().subjects.iter().find(|s| s.id.as_str() == id).cloned())
    }

    async fn create_subject(&self, payload: &SubjectPayload) -> Result<Subject, BackendError> {
        self.check()?;
        let mut store = self.store();
        if payload.code.is_some() && store.subjects.iter().any(|s| s.code == payload.code) {
            return Err(BackendError::Status {
                status: 409,
                message: "Subject code already exists".to_string(),
            });
        }
        let created = Subject {
            id: store.next_id(),
            code: payload.code.clone(),
            name: payload.name.clone(),
            description: payload.description.clone(),
        };
        store.subjects.push(created.clone());
        Ok(created)
    }

    async fn update_subject(
        &self,
        id: &str,
        payload: &SubjectPayload,
    ) -> Result<Subject, BackendError> {
        self.check()?;
        let mut store = self.store();
        let existing = store
            .subjects
            .iter_mut()
            .find(|s| s.id.as_str() == id)
            .ok_or_else(|| not_found("Subject"))?;
        existing.code = payload.code.clone();
        existing.name = payload.name.clone();
        existing.description = payload.description.clone();
        Ok(existing.clone())
    }

    async fn delete_subject(&self, id: &str) -> Result<(), BackendError> {
        self.check()?;
        let mut store = self.store();
        let before = store.subjects.len();
        store.subjects.retain(|s| s.id.as_str() != id);
        if store.subjects.len() == before {
            return Err(not_found("Subject"));
        }
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, BackendError> {
        self.check()?;
        Ok(self.store().accounts.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, BackendError> {
        self.check()?;
        Ok(self.store().accounts.iter().find(|(a, _)| a.id.as_str() == id).map(|(a, _)| a.clone()))
    }

    async fn create_account(&self, payload: &AccountCreate) -> Result<Account, BackendError> {
        self.check()?;
        let mut store = self.store();
        if store.accounts.iter().any(|(a, _)| a.username == payload.username) {
            return Err(BackendError::Status {
                status: 409,
                message: "Username already exists".to_string(),
            });
        }
        let created = Account {
            id: store.next_id(),
            username: payload.username.clone(),
            email: payload.email.clone(),
            role: payload.role,
            is_active: payload.is_active,
        };
        store.accounts.push((created.clone(), payload.password.clone()));
        Ok(created)
    }

    async fn update_account(
        &self,
        id: &str,
        payload: &AccountUpdate,
    ) -> Result<Account, BackendError> {
        self.check()?;
        let mut store = self.store();
        let (existing, password) = store
            .accounts
            .iter_mut()
            .find(|(a, _)| a.id.as_str() == id)
            .ok_or_else(|| not_found("Account"))?;
        if let Some(username) = &payload.username {
            existing.username = username.clone();
        }
        if let Some(email) = &payload.email {
            existing.email = Some(email.clone());
        }
        if let Some(role) = payload.role {
            existing.role = role;
        }
        if let Some(is_active) = payload.is_active {
            existing.is_active = is_active;
        }
        if let Some(new_password) = &payload.password {
            *password = new_password.clone();
        }
        Ok(existing.clone())
    }

    async fn delete_account(&self, id: &str) -> Result<(), BackendError> {
        self.check()?;
        let mut store = self.store();
        let before = store.accounts.len();
        store.accounts.retain(|(a, _)| a.id.as_str() != id);
        if store.accounts.len() == before {
            return Err(not_found("Account"));
        }
        Ok(())
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, BackendError> {
        self.check()?;
        Ok(self
            .store()
            .accounts
            .iter()
            .find(|(a, stored)| a.username == username && !stored.is_empty() && stored == password)
            .map(|(a, _)| a.clone()))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.check()
    }
}
