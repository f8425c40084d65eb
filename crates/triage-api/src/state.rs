//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! `AppState` holds the three persistent stores (doctors, patients,
//! issues), the token service, and the optional external collaborators
//! (object store, Postgres pool). The in-memory stores are the serving
//! truth for a single node; when a database pool is configured, writes go
//! through to Postgres and the stores are hydrated from it on startup.
//!
//! The doctor and patient stores are the same [`CredentialStore`] type
//! instantiated at [`DoctorId`] and [`PatientId`] — two distinct types,
//! so credential flows, tokens, and issue ownership cannot mix the
//! partitions up.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use triage_auth::{TokenService, TokenSubject};
use triage_blob::ObjectStore;
use triage_core::{DoctorId, ImageRef, IssueId, PatientId, PrincipalId};
use triage_state::{IssueStatus, LifecycleError, ReviewNote, ReviewRecord};
use utoipa::ToSchema;
use uuid::Uuid;

// -- Principal Records --------------------------------------------------------

/// A stored principal with credential material, typed by its partition:
/// `PrincipalRecord<DoctorId>` and `PrincipalRecord<PatientId>` are
/// different types and never interchangeable.
///
/// Deliberately NOT `Serialize`: responses go through
/// [`PrincipalProfile`], so the password hash and refresh token cannot
/// leak into a response body by accident. `Debug` redacts both fields
/// for the same reason.
#[derive(Clone)]
pub struct PrincipalRecord<I: PrincipalId> {
    /// Unique identifier.
    pub id: I,
    /// Unique username (lowercased, trimmed).
    pub username: String,
    /// Unique email (lowercased, trimmed).
    pub email: String,
    /// Display name.
    pub fullname: String,
    /// Argon2id PHC hash of the password.
    pub password_hash: String,
    /// The single active refresh token, if logged in.
    pub refresh_token: Option<String>,
    /// When the principal registered.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl<I: PrincipalId> std::fmt::Debug for PrincipalRecord<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("fullname", &self.fullname)
            .field("password_hash", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl<I: PrincipalId> PrincipalRecord<I> {
    /// Project the record to its response-safe profile.
    pub fn profile(&self) -> PrincipalProfile {
        PrincipalProfile {
            id: self.id.uuid(),
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Project the record to a summary for issue views.
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id.uuid(),
            fullname: self.fullname.clone(),
            email: self.email.clone(),
        }
    }

    /// The identity fields tokens are minted for. The subject's role is
    /// implied by `I`.
    pub fn token_subject(&self) -> TokenSubject<I> {
        TokenSubject {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
        }
    }
}

/// A principal as returned by the API — no secret fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalProfile {
    /// Unique identifier.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub fullname: String,
    /// When the principal registered.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// The identity fields resolved onto issue views.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalSummary {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub fullname: String,
    /// Email address.
    pub email: String,
}

// -- Credential Store ---------------------------------------------------------

/// Registration failed because username or email is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateIdentity;

#[derive(Debug)]
struct CredentialIndex<I: PrincipalId> {
    by_id: HashMap<I, PrincipalRecord<I>>,
    username_to_id: HashMap<String, I>,
    email_to_id: HashMap<String, I>,
}

/// Store for one partition's principals, with username/email uniqueness
/// enforced at the store under a single write lock.
///
/// The id type parameter is the partition: `CredentialStore<DoctorId>`
/// cannot answer a lookup for a [`PatientId`].
#[derive(Debug)]
pub struct CredentialStore<I: PrincipalId> {
    inner: Arc<RwLock<CredentialIndex<I>>>,
}

impl<I: PrincipalId> Clone for CredentialStore<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: PrincipalId> Default for CredentialStore<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PrincipalId> CredentialStore<I> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CredentialIndex {
                by_id: HashMap::new(),
                username_to_id: HashMap::new(),
                email_to_id: HashMap::new(),
            })),
        }
    }

    /// Insert a new principal, rejecting duplicate username or email.
    ///
    /// The existence check and the insert happen under one write lock, so
    /// two concurrent registrations of the same username cannot both
    /// succeed.
    pub fn insert_unique(&self, record: PrincipalRecord<I>) -> Result<(), DuplicateIdentity> {
        let mut index = self.inner.write();
        if index.username_to_id.contains_key(&record.username)
            || index.email_to_id.contains_key(&record.email)
        {
            return Err(DuplicateIdentity);
        }
        index.username_to_id.insert(record.username.clone(), record.id);
        index.email_to_id.insert(record.email.clone(), record.id);
        index.by_id.insert(record.id, record);
        Ok(())
    }

    /// Retrieve a principal by id.
    pub fn get(&self, id: &I) -> Option<PrincipalRecord<I>> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// Find a principal by username or email (case-insensitive).
    pub fn find_by_identifier(&self, identifier: &str) -> Option<PrincipalRecord<I>> {
        let needle = identifier.trim().to_lowercase();
        let index = self.inner.read();
        let id = index
            .username_to_id
            .get(&needle)
            .or_else(|| index.email_to_id.get(&needle))?;
        index.by_id.get(id).cloned()
    }

    /// Replace the stored refresh token (login sets it, logout clears it).
    /// Last-write-wins: any previously issued refresh token is implicitly
    /// invalidated.
    pub fn set_refresh_token(
        &self,
        id: &I,
        token: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<PrincipalRecord<I>> {
        let mut index = self.inner.write();
        let record = index.by_id.get_mut(id)?;
        record.refresh_token = token;
        record.updated_at = now;
        Some(record.clone())
    }

    /// Number of stored principals.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Issue Record & Store -----------------------------------------------------

/// A stored issue with lifecycle state and ownership linkage.
///
/// Ownership and review linkage use the id newtypes: the owner is a
/// [`PatientId`] and the reviewer a [`DoctorId`], so the two can never
/// be swapped at a call site.
#[derive(Debug, Clone)]
pub struct IssueRecord {
    /// Unique identifier.
    pub id: IssueId,
    /// The owning patient. Immutable after creation.
    pub patient_id: PatientId,
    /// The reviewing doctor. Set exactly once, on review.
    pub doctor_id: Option<DoctorId>,
    /// Issue title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Reference to the uploaded image. Required and immutable.
    pub image_ref: ImageRef,
    /// The doctor's response, present once reviewed.
    pub response: Option<ReviewRecord>,
    /// Current lifecycle status.
    pub status: IssueStatus,
    /// When the issue was created.
    pub created_at: DateTime<Utc>,
    /// When the issue last changed.
    pub updated_at: DateTime<Utc>,
}

impl IssueRecord {
    /// Create a new open issue owned by `patient_id`.
    pub fn new(
        patient_id: PatientId,
        title: String,
        description: Option<String>,
        image_ref: ImageRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IssueId::new(),
            patient_id,
            doctor_id: None,
            title,
            description,
            image_ref,
            response: None,
            status: IssueStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a doctor's review: transition to `REVIEWED` and set the
    /// doctor and response fields together.
    ///
    /// Callers go through [`IssueStore::review`], which runs this under
    /// a single write lock so the fields change atomically and a second
    /// review cannot overwrite the first.
    pub fn apply_review(
        &mut self,
        doctor_id: DoctorId,
        note: ReviewNote,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.status = self.status.review()?;
        self.doctor_id = Some(doctor_id);
        self.response = Some(note.into_record(now));
        self.updated_at = now;
        Ok(())
    }
}

/// Why a review attempt did not take effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRejected {
    /// No issue with that id exists.
    #[error("issue not found")]
    Missing,
    /// The issue was already reviewed; the first review stands.
    #[error("issue has already been reviewed")]
    AlreadyReviewed,
}

impl From<LifecycleError> for ReviewRejected {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::AlreadyReviewed => Self::AlreadyReviewed,
        }
    }
}

/// Thread-safe in-memory issue store.
///
/// The lock is `parking_lot`, not `tokio::sync`, because it is never
/// held across `.await` points, and it never poisons. All listing
/// operations return newest-first, the order every caller wants.
#[derive(Debug, Default)]
pub struct IssueStore {
    issues: Arc<RwLock<HashMap<IssueId, IssueRecord>>>,
}

impl Clone for IssueStore {
    fn clone(&self) -> Self {
        Self {
            issues: Arc::clone(&self.issues),
        }
    }
}

impl IssueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue: at intake, and from the database during hydration.
    pub fn add(&self, record: IssueRecord) {
        self.issues.write().insert(record.id, record);
    }

    /// Retrieve an issue by id.
    pub fn get(&self, id: &IssueId) -> Option<IssueRecord> {
        self.issues.read().get(id).cloned()
    }

    /// All issues owned by `patient`, newest first.
    pub fn owned_by(&self, patient: PatientId) -> Vec<IssueRecord> {
        let mut owned: Vec<IssueRecord> = self
            .issues
            .read()
            .values()
            .filter(|issue| issue.patient_id == patient)
            .cloned()
            .collect();
        newest_first(&mut owned);
        owned
    }

    /// All issues still awaiting review, newest first.
    pub fn open(&self) -> Vec<IssueRecord> {
        let mut open: Vec<IssueRecord> = self
            .issues
            .read()
            .values()
            .filter(|issue| issue.status == IssueStatus::Open)
            .cloned()
            .collect();
        newest_first(&mut open);
        open
    }

    /// Record `doctor`'s review of an issue.
    ///
    /// Lookup, status guard, and mutation run under one write lock —
    /// the in-memory equivalent of a conditional UPDATE — so concurrent
    /// review attempts cannot both succeed and the doctor/response/
    /// status fields change together or not at all.
    pub fn review(
        &self,
        id: &IssueId,
        doctor: DoctorId,
        note: ReviewNote,
        now: DateTime<Utc>,
    ) -> Result<IssueRecord, ReviewRejected> {
        let mut issues = self.issues.write();
        let record = issues.get_mut(id).ok_or(ReviewRejected::Missing)?;
        record.apply_review(doctor, note, now)?;
        Ok(record.clone())
    }

    /// Number of stored issues.
    pub fn len(&self) -> usize {
        self.issues.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sort newest first.
fn newest_first(issues: &mut [IssueRecord]) {
    issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each store.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registered doctors.
    pub doctors: CredentialStore<DoctorId>,
    /// Registered patients.
    pub patients: CredentialStore<PatientId>,
    /// Submitted issues.
    pub issues: IssueStore,
    /// Issues and verifies session tokens.
    pub tokens: Arc<TokenService>,
    /// External image store. `None` means uploads are unavailable.
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// PostgreSQL pool for durable persistence. `None` means the API
    /// operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,
    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create a state with empty stores and no external collaborators.
    pub fn new(tokens: TokenService) -> Self {
        Self::with_parts(AppConfig::default(), tokens, None, None)
    }

    /// Create a state with the given configuration and collaborators.
    pub fn with_parts(
        config: AppConfig,
        tokens: TokenService,
        object_store: Option<Arc<dyn ObjectStore>>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            doctors: CredentialStore::new(),
            patients: CredentialStore::new(),
            issues: IssueStore::new(),
            tokens: Arc::new(tokens),
            object_store,
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a pool is available, so reads stay
    /// fast and synchronous afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let doctors = crate::db::principals::load_all::<DoctorId>(pool)
            .await
            .map_err(|e| format!("failed to load doctor records: {e}"))?;
        for record in doctors {
            if self.doctors.insert_unique(record).is_err() {
                tracing::error!("duplicate doctor identity in database — skipping record");
            }
        }

        let patients = crate::db::principals::load_all::<PatientId>(pool)
            .await
            .map_err(|e| format!("failed to load patient records: {e}"))?;
        for record in patients {
            if self.patients.insert_unique(record).is_err() {
                tracing::error!("duplicate patient identity in database — skipping record");
            }
        }

        let issues = crate::db::issues::load_all(pool)
            .await
            .map_err(|e| format!("failed to load issues: {e}"))?;
        let issue_count = issues.len();
        for record in issues {
            self.issues.add(record);
        }

        tracing::info!(
            doctors = self.doctors.len(),
            patients = self.patients.len(),
            issues = issue_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_auth::TokenConfig;
    use triage_core::Role;

    fn sample_principal<I: PrincipalId>(username: &str, email: &str) -> PrincipalRecord<I> {
        let now = Utc::now();
        PrincipalRecord {
            id: I::from_uuid(Uuid::new_v4()),
            username: username.to_string(),
            email: email.to_string(),
            fullname: "Test Person".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_issue(patient_id: PatientId) -> IssueRecord {
        IssueRecord::new(
            patient_id,
            "rash".to_string(),
            None,
            ImageRef::new("img1").unwrap(),
            Utc::now(),
        )
    }

    // -- IssueStore tests -----------------------------------------------------

    #[test]
    fn issue_store_add_and_get_roundtrip() {
        let store = IssueStore::new();
        let issue = sample_issue(PatientId::new());
        let id = issue.id;

        store.add(issue);
        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status, IssueStatus::Open);
    }

    #[test]
    fn issue_store_review_of_missing_issue_is_rejected() {
        let store = IssueStore::new();
        let outcome = store.review(
            &IssueId::new(),
            DoctorId::new(),
            ReviewNote::default(),
            Utc::now(),
        );
        assert_eq!(outcome.unwrap_err(), ReviewRejected::Missing);
    }

    #[test]
    fn issue_store_allows_exactly_one_review() {
        let store = IssueStore::new();
        let issue = sample_issue(PatientId::new());
        let id = issue.id;
        store.add(issue);

        let doctor = DoctorId::new();
        let reviewed = store
            .review(&id, doctor, ReviewNote::default(), Utc::now())
            .unwrap();
        assert_eq!(reviewed.status, IssueStatus::Reviewed);
        assert_eq!(reviewed.doctor_id, Some(doctor));

        let second = store.review(&id, DoctorId::new(), ReviewNote::default(), Utc::now());
        assert_eq!(second.unwrap_err(), ReviewRejected::AlreadyReviewed);

        // First review's fields survived.
        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.doctor_id, Some(doctor));
        assert_eq!(fetched.status, IssueStatus::Reviewed);
    }

    #[test]
    fn issue_store_owned_by_filters_and_orders_newest_first() {
        let store = IssueStore::new();
        let alice = PatientId::new();
        let carol = PatientId::new();
        let base = Utc::now();

        for (i, owner) in [(0, alice), (1, carol), (2, alice)] {
            let mut issue = sample_issue(owner);
            issue.title = format!("issue {i}");
            issue.created_at = base + chrono::Duration::seconds(i);
            store.add(issue);
        }

        let mine = store.owned_by(alice);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].title, "issue 2");
        assert_eq!(mine[1].title, "issue 0");
    }

    #[test]
    fn issue_store_open_excludes_reviewed() {
        let store = IssueStore::new();
        let first = sample_issue(PatientId::new());
        let second = sample_issue(PatientId::new());
        let first_id = first.id;
        store.add(first);
        store.add(second);

        store
            .review(&first_id, DoctorId::new(), ReviewNote::default(), Utc::now())
            .unwrap();

        let open = store.open();
        assert_eq!(open.len(), 1);
        assert!(open.iter().all(|issue| issue.status == IssueStatus::Open));
    }

    #[test]
    fn issue_store_clone_shares_underlying_data() {
        let store = IssueStore::new();
        store.add(sample_issue(PatientId::new()));

        let clone = store.clone();
        assert_eq!(clone.len(), 1);
        clone.add(sample_issue(PatientId::new()));
        assert_eq!(store.len(), 2);
    }

    // -- CredentialStore tests ------------------------------------------------

    #[test]
    fn credential_store_rejects_duplicate_username() {
        let store: CredentialStore<PatientId> = CredentialStore::new();
        store
            .insert_unique(sample_principal("alice", "alice@x.com"))
            .unwrap();
        assert_eq!(
            store.insert_unique(sample_principal("alice", "other@x.com")),
            Err(DuplicateIdentity)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn credential_store_rejects_duplicate_email() {
        let store: CredentialStore<PatientId> = CredentialStore::new();
        store
            .insert_unique(sample_principal("alice", "alice@x.com"))
            .unwrap();
        assert_eq!(
            store.insert_unique(sample_principal("bob", "alice@x.com")),
            Err(DuplicateIdentity)
        );
    }

    #[test]
    fn credential_store_finds_by_username_and_email() {
        let store: CredentialStore<PatientId> = CredentialStore::new();
        let record = sample_principal("alice", "alice@x.com");
        let id = record.id;
        store.insert_unique(record).unwrap();

        assert_eq!(store.find_by_identifier("alice").unwrap().id, id);
        assert_eq!(store.find_by_identifier("alice@x.com").unwrap().id, id);
        assert_eq!(store.find_by_identifier("  ALICE  ").unwrap().id, id);
        assert!(store.find_by_identifier("carol").is_none());
    }

    #[test]
    fn credential_store_set_refresh_token_roundtrip() {
        let store: CredentialStore<DoctorId> = CredentialStore::new();
        let record = sample_principal("bob", "bob@x.com");
        let id = record.id;
        store.insert_unique(record).unwrap();

        let updated = store
            .set_refresh_token(&id, Some("token-1".into()), Utc::now())
            .unwrap();
        assert_eq!(updated.refresh_token.as_deref(), Some("token-1"));

        // Last-write-wins.
        let updated = store
            .set_refresh_token(&id, Some("token-2".into()), Utc::now())
            .unwrap();
        assert_eq!(updated.refresh_token.as_deref(), Some("token-2"));

        let cleared = store.set_refresh_token(&id, None, Utc::now()).unwrap();
        assert!(cleared.refresh_token.is_none());
    }

    #[test]
    fn principal_debug_redacts_credentials() {
        let mut record = sample_principal::<PatientId>("alice", "alice@x.com");
        record.refresh_token = Some("refresh-jwt-value".into());
        let debug = format!("{record:?}");
        assert!(!debug.contains("argon2id"));
        assert!(!debug.contains("refresh-jwt-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn profile_projection_has_no_secret_fields() {
        let record = sample_principal::<PatientId>("alice", "alice@x.com");
        let profile = record.profile();
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("refresh"));
        assert!(json.contains("\"username\":\"alice\""));
    }

    #[test]
    fn token_subject_role_comes_from_the_id_type() {
        let doctor = sample_principal::<DoctorId>("bob", "bob@x.com");
        let subject = doctor.token_subject();
        assert_eq!(DoctorId::ROLE, Role::Doctor);
        assert_eq!(subject.id, doctor.id);
    }

    // -- AppState tests -------------------------------------------------------

    #[test]
    fn app_state_new_creates_empty_stores() {
        let state = AppState::new(TokenService::new(TokenConfig::fixture("a", "r")));
        assert!(state.doctors.is_empty());
        assert!(state.patients.is_empty());
        assert!(state.issues.is_empty());
        assert!(state.object_store.is_none());
        assert!(state.db_pool.is_none());
        assert_eq!(state.config.port, 8080);
    }

    #[test]
    fn partitions_are_independent() {
        let state = AppState::new(TokenService::new(TokenConfig::fixture("a", "r")));
        state
            .doctors
            .insert_unique(sample_principal("bob", "bob@x.com"))
            .unwrap();
        assert_eq!(state.doctors.len(), 1);
        assert!(state.patients.is_empty());
        // The same username registers independently under the other role.
        state
            .patients
            .insert_unique(sample_principal("bob", "bob@x.com"))
            .unwrap();
        assert_eq!(state.patients.len(), 1);
    }
}
