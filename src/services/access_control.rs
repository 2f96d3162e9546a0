//! Role-based capability evaluation.
//!
//! Every decision is a pure function of the caller's [`AuthContext`] and the target record.
//! Unknown roles never reach this module: [`Role`] decoding already maps them to
//! [`Role::User`], so the most restrictive ruleset applies.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::schemas::account::{Account, Role};
use crate::schemas::student::Student;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    View,
    ViewReportCard,
    CreateGrade,
    CreateAttendance,
    CreateObservedValue,
    CreateStudent,
    EditStudent,
    DeleteStudent,
    CreateSubject,
    EditSubject,
    DeleteSubject,
    ViewReports,
    CreateAccount,
    EditAccount,
    DeleteAccount,
    ViewAccount,
}

impl Capability {
    pub fn token(self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::ViewReportCard => "view-report-card",
            Capability::CreateGrade => "create-grade",
            Capability::CreateAttendance => "create-attendance",
            Capability::CreateObservedValue => "create-observed-value",
            Capability::CreateStudent => "create-student",
            Capability::EditStudent => "edit-student",
            Capability::DeleteStudent => "delete-student",
            Capability::CreateSubject => "create-subject",
            Capability::EditSubject => "edit-subject",
            Capability::DeleteSubject => "delete-subject",
            Capability::ViewReports => "view-reports",
            Capability::CreateAccount => "create-account",
            Capability::EditAccount => "edit-account",
            Capability::DeleteAccount => "delete-account",
            Capability::ViewAccount => "view-account",
        }
    }
}

const USER_RULES: &[Capability] = &[Capability::View, Capability::ViewReportCard];

const TEACHER_RULES: &[Capability] = &[
    Capability::CreateGrade,
    Capability::CreateAttendance,
    Capability::CreateObservedValue,
];

const ADMIN_RULES: &[Capability] = &[
    Capability::CreateStudent,
    Capability::EditStudent,
    Capability::DeleteStudent,
    Capability::CreateSubject,
    Capability::EditSubject,
    Capability::DeleteSubject,
    Capability::ViewReports,
];

const SUPERADMIN_RULES: &[Capability] = &[
    Capability::CreateAccount,
    Capability::EditAccount,
    Capability::DeleteAccount,
    Capability::ViewAccount,
];

const STUDENT_SCOPE: &[Capability] = &[
    Capability::View,
    Capability::ViewReportCard,
    Capability::CreateGrade,
    Capability::CreateAttendance,
    Capability::CreateObservedValue,
    Capability::EditStudent,
    Capability::DeleteStudent,
    Capability::ViewReports,
];

const SUBJECT_SCOPE: &[Capability] = &[
    Capability::View,
    Capability::CreateSubject,
    Capability::EditSubject,
    Capability::DeleteSubject,
];

const ACCOUNT_SCOPE: &[Capability] = &[
    Capability::ViewAccount,
    Capability::CreateAccount,
    Capability::EditAccount,
    Capability::DeleteAccount,
];

/// Ordered set of capability tokens. Serializes as a JSON array of kebab-case names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    fn extend(&mut self, capabilities: &[Capability]) {
        self.0.extend(capabilities.iter().copied());
    }

    fn restrict_to(mut self, scope: &[Capability]) -> Self {
        self.0.retain(|capability| scope.contains(capability));
        self
    }

    fn without(mut self, capability: Capability) -> Self {
        self.0.remove(&capability);
        self
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity of the caller, passed explicitly into every decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self { username: username.into(), role }
    }
}

/// What a decision is about.
#[derive(Debug, Clone, Copy)]
pub enum AccessTarget<'a> {
    Student(&'a Student),
    Account(&'a Account),
    Subject,
    /// The role-wide scope: listings, dashboards and record creation.
    Collection,
}

/// The full ruleset a role starts from, before any record narrows it.
pub fn role_capabilities(role: Role) -> CapabilitySet {
    let mut set = CapabilitySet::empty();
    match role {
        Role::User => set.extend(USER_RULES),
        Role::Teacher => {
            set.extend(USER_RULES);
            set.extend(TEACHER_RULES);
        }
        Role::Admin => {
            set.extend(USER_RULES);
            set.extend(TEACHER_RULES);
            set.extend(ADMIN_RULES);
        }
        Role::Superadmin => {
            set.extend(USER_RULES);
            set.extend(TEACHER_RULES);
            set.extend(ADMIN_RULES);
            set.extend(SUPERADMIN_RULES);
        }
    }
    set
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessEvaluator {
    match_first_name: bool,
}

impl AccessEvaluator {
    /// `match_first_name` also lets a `user` account see a student whose first name equals
    /// the username, ignoring case. Off unless explicitly configured.
    pub const fn new(match_first_name: bool) -> Self {
        Self { match_first_name }
    }

    pub fn evaluate(&self, context: &AuthContext, target: AccessTarget<'_>) -> CapabilitySet {
        let ruleset = role_capabilities(context.role);

        match target {
            AccessTarget::Collection => ruleset,
            AccessTarget::Subject => ruleset.restrict_to(SUBJECT_SCOPE),
            AccessTarget::Student(student) => {
                if context.role == Role::User && !self.owns_student(context, student) {
                    return CapabilitySet::empty();
                }
                ruleset.restrict_to(STUDENT_SCOPE)
            }
            AccessTarget::Account(account) => {
                let scoped = ruleset.restrict_to(ACCOUNT_SCOPE);
                if account.role == Role::Superadmin {
                    scoped.without(Capability::DeleteAccount)
                } else {
                    scoped
                }
            }
        }
    }

    /// Whether `context` is the learner behind `student`.
    pub fn owns_student(&self, context: &AuthContext, student: &Student) -> bool {
        let username = context.username.as_str();
        if username.is_empty() {
            return false;
        }
        if !student.lrn.is_empty() && student.lrn == username {
            return true;
        }
        self.match_first_name
            && !student.first_name.is_empty()
            && student.first_name.to_lowercase() == username.to_lowercase()
    }

    /// Keeps the students the caller may view, in their original order.
    pub fn visible_students(&self, context: &AuthContext, students: Vec<Student>) -> Vec<Student> {
        students
            .into_iter()
            .filter(|student| {
                self.evaluate(context, AccessTarget::Student(student)).contains(Capability::View)
            })
            .collect()
    }
}

/// Evaluates with the default (LRN-only) learner matching.
pub fn evaluate_access(context: &AuthContext, target: AccessTarget<'_>) -> CapabilitySet {
    AccessEvaluator::default().evaluate(context, target)
}

pub fn visible_students(context: &AuthContext, students: Vec<Student>) -> Vec<Student> {
    AccessEvaluator::default().visible_students(context, students)
}
