use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::{
    error::{AppError, Result},
    models::{CodePurpose, User, UserRole},
    stores::{CodeSender, CodeStore, CredentialStore},
    utils::{password, validation::normalize_email},
};

/// One-time codes live this long; afterwards they expire passively.
pub const CODE_TTL_MINUTES: i64 = 15;

/// Shown whenever the existence of an account must not be revealed.
pub const GENERIC_CODE_MESSAGE: &str =
    "If an account exists with this email, you will receive a verification code shortly.";

/// Role assignment policy: emails on the configured allow-list register
/// as admins. Built once at startup from `ADMIN_EMAILS`.
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    admins: HashSet<String>,
}

impl AdminPolicy {
    pub fn new(admins: HashSet<String>) -> Self {
        Self { admins }
    }

    pub fn role_for(&self, email: &str) -> UserRole {
        if self.admins.contains(email) {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }
}

/// Uniform over 000000..=999999, zero-padded to a fixed width.
fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..=999_999u32))
}

/// Orchestrates registration, login, code issuance/verification, and
/// password reset over the credential store, code store, and notification
/// sender. Each (email, purpose) pair moves through
/// NoCode -> CodeIssued -> Consumed | Expired | Superseded.
#[derive(Clone)]
pub struct AuthFlow {
    users: Arc<dyn CredentialStore>,
    codes: Arc<dyn CodeStore>,
    mailer: Arc<dyn CodeSender>,
    admins: AdminPolicy,
}

impl AuthFlow {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        codes: Arc<dyn CodeStore>,
        mailer: Arc<dyn CodeSender>,
        admins: AdminPolicy,
    ) -> Self {
        Self {
            users,
            codes,
            mailer,
            admins,
        }
    }

    /// Creates an unverified account and emails it a verification code.
    /// If the email is already taken, fails with Conflict. A delivery
    /// failure does not roll back the created user; the account can
    /// request a fresh code later.
    pub async fn register(&self, email: &str, pw: &str, name: Option<&str>) -> Result<User> {
        let email = normalize_email(email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        let role = self.admins.role_for(&email);
        let password_hash = password::hash(pw)?;

        let user = self.users.create(&email, name, &password_hash, role).await?;

        self.issue_code(&user.email, user.name.as_deref(), CodePurpose::EmailVerification)
            .await?;

        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable. An account
    /// with `email_verified` explicitly false is rejected before the
    /// password check; a NULL flag (legacy account) counts as verified.
    pub async fn login(&self, email: &str, pw: &str) -> Result<User> {
        let email = normalize_email(email);

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if user.email_verified == Some(false) {
            return Err(AppError::EmailNotVerified { email: user.email });
        }

        if !password::verify(pw, &user.password_hash) {
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    /// Issues (or reissues) a code for (email, purpose). Purpose-specific
    /// preconditions run before anything is persisted:
    /// - `password_reset`: silently succeeds for unknown accounts so the
    ///   endpoint cannot be used to enumerate users.
    /// - `email_verification`: the account must exist and not already be
    ///   verified.
    pub async fn send_code(&self, email: &str, purpose: CodePurpose) -> Result<()> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;

        match purpose {
            CodePurpose::PasswordReset => {
                let Some(user) = user else {
                    return Ok(());
                };
                self.issue_code(&email, user.name.as_deref(), purpose).await
            }
            CodePurpose::EmailVerification => {
                let user = user.ok_or_else(|| {
                    AppError::NotFound("No account found with this email.".to_string())
                })?;
                if user.email_verified == Some(true) {
                    return Err(AppError::Conflict("Email is already verified.".to_string()));
                }
                self.issue_code(&email, user.name.as_deref(), purpose).await
            }
        }
    }

    /// Consumes an email-verification code and flips the account's
    /// verified flag. Consumption is atomic: a code verifies exactly once,
    /// and a failed attempt leaves the stored code untouched.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User> {
        let email = normalize_email(email);

        self.codes
            .consume(&email, CodePurpose::EmailVerification, code)
            .await?
            .ok_or_else(invalid_or_expired)?;

        let user = self
            .users
            .set_email_verified(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        tracing::info!("Email verified for {}", email);

        Ok(user)
    }

    /// Always answers generically; a missing account is not an error.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.send_code(email, CodePurpose::PasswordReset).await
    }

    /// Consume-and-set in one flow: the code is atomically consumed first,
    /// so no other caller can reuse it while the new hash is written.
    pub async fn reset_password(&self, email: &str, code: &str, new_pw: &str) -> Result<()> {
        let email = normalize_email(email);

        self.codes
            .consume(&email, CodePurpose::PasswordReset, code)
            .await?
            .ok_or_else(invalid_or_expired)?;

        let password_hash = password::hash(new_pw)?;

        self.users
            .set_password_hash(&email, &password_hash)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        tracing::info!("Password reset for {}", email);

        Ok(())
    }

    /// Looks up the account behind a verified session.
    pub async fn current_user(&self, email: &str) -> Result<User> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
    }

    /// Generate, store (superseding any active code for the pair), then
    /// send. If delivery fails, the just-stored code is deleted so a code
    /// that was never received can never validate.
    async fn issue_code(
        &self,
        email: &str,
        name: Option<&str>,
        purpose: CodePurpose,
    ) -> Result<()> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

        self.codes.put(email, purpose, &code, expires_at).await?;

        if let Err(e) = self.mailer.send_code(email, &code, purpose, name).await {
            self.codes.delete_for(email, purpose).await?;
            return Err(e);
        }

        tracing::info!("Verification code sent to {}", email);

        Ok(())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

fn invalid_or_expired() -> AppError {
    AppError::Unauthorized("Invalid or expired code. Please request a new one.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationCode;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MemUsers {
        rows: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl CredentialStore for MemUsers {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn create(
            &self,
            email: &str,
            name: Option<&str>,
            password_hash: &str,
            role: UserRole,
        ) -> Result<User> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|u| u.email == email) {
                return Err(AppError::Conflict("Email already in use".to_string()));
            }
            let now = Utc::now();
            let user = User {
                id: rows.len() as i32 + 1,
                email: email.to_string(),
                name: name.map(str::to_string),
                password_hash: password_hash.to_string(),
                role,
                email_verified: Some(false),
                created_at: now,
                updated_at: now,
            };
            rows.push(user.clone());
            Ok(user)
        }

        async fn set_email_verified(&self, email: &str) -> Result<Option<User>> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows.iter_mut().find(|u| u.email == email);
            Ok(user.map(|u| {
                u.email_verified = Some(true);
                u.updated_at = Utc::now();
                u.clone()
            }))
        }

        async fn set_password_hash(
            &self,
            email: &str,
            password_hash: &str,
        ) -> Result<Option<User>> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows.iter_mut().find(|u| u.email == email);
            Ok(user.map(|u| {
                u.password_hash = password_hash.to_string();
                u.updated_at = Utc::now();
                u.clone()
            }))
        }
    }

    #[derive(Default)]
    struct MemCodes {
        rows: Mutex<Vec<VerificationCode>>,
    }

    impl MemCodes {
        fn insert_raw(&self, email: &str, purpose: CodePurpose, code: &str, expires_at: DateTime<Utc>) {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i32 + 1;
            rows.push(VerificationCode {
                id,
                email: email.to_string(),
                code: code.to_string(),
                purpose,
                expires_at,
                created_at: Utc::now(),
            });
        }

        fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CodeStore for MemCodes {
        async fn put(
            &self,
            email: &str,
            purpose: CodePurpose,
            code: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<VerificationCode> {
            let mut rows = self.rows.lock().unwrap();
            // Upsert keyed by (email, purpose), like the unique index.
            rows.retain(|c| !(c.email == email && c.purpose == purpose));
            let record = VerificationCode {
                id: rows.len() as i32 + 1,
                email: email.to_string(),
                code: code.to_string(),
                purpose,
                expires_at,
                created_at: Utc::now(),
            };
            rows.push(record.clone());
            Ok(record)
        }

        async fn consume(
            &self,
            email: &str,
            purpose: CodePurpose,
            code: &str,
        ) -> Result<Option<VerificationCode>> {
            let mut rows = self.rows.lock().unwrap();
            let now = Utc::now();
            let pos = rows.iter().position(|c| {
                c.email == email && c.purpose == purpose && c.code == code && c.expires_at > now
            });
            Ok(pos.map(|i| rows.remove(i)))
        }

        async fn delete_for(&self, email: &str, purpose: CodePurpose) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .retain(|c| !(c.email == email && c.purpose == purpose));
            Ok(())
        }

        async fn delete_expired(&self) -> Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            let now = Utc::now();
            rows.retain(|c| c.expires_at > now);
            Ok((before - rows.len()) as u64)
        }
    }

    #[derive(Default)]
    struct MemMailer {
        sent: Mutex<Vec<(String, String, CodePurpose)>>,
        fail: AtomicBool,
    }

    impl MemMailer {
        fn last_code(&self) -> String {
            self.sent.lock().unwrap().last().expect("no mail sent").1.clone()
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CodeSender for MemMailer {
        async fn send_code(
            &self,
            to: &str,
            code: &str,
            purpose: CodePurpose,
            _name: Option<&str>,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::ServiceUnavailable(
                    "Failed to send verification email. Please try again.".to_string(),
                ));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), code.to_string(), purpose));
            Ok(())
        }
    }

    struct Harness {
        flow: AuthFlow,
        users: Arc<MemUsers>,
        codes: Arc<MemCodes>,
        mailer: Arc<MemMailer>,
    }

    fn harness() -> Harness {
        harness_with_admins(HashSet::new())
    }

    fn harness_with_admins(admins: HashSet<String>) -> Harness {
        let users = Arc::new(MemUsers::default());
        let codes = Arc::new(MemCodes::default());
        let mailer = Arc::new(MemMailer::default());
        let flow = AuthFlow::new(
            users.clone(),
            codes.clone(),
            mailer.clone(),
            AdminPolicy::new(admins),
        );
        Harness {
            flow,
            users,
            codes,
            mailer,
        }
    }

    const PW: &str = "Abcd123!";

    #[test]
    fn generated_codes_are_six_zero_padded_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn register_issues_one_code_and_verify_flips_the_flag() {
        let h = harness();

        let user = h.flow.register("a@x.com", PW, Some("Ann")).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.email_verified, Some(false));
        assert_eq!(h.codes.count(), 1);

        let code = h.mailer.last_code();
        let verified = h.flow.verify_email("a@x.com", &code).await.unwrap();
        assert_eq!(verified.email_verified, Some(true));
        assert_eq!(h.codes.count(), 0, "code must be consumed");
    }

    #[tokio::test]
    async fn register_normalizes_the_email() {
        let h = harness();
        let user = h.flow.register("  Ann@X.COM ", PW, None).await.unwrap();
        assert_eq!(user.email, "ann@x.com");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let err = h.flow.register("A@x.com", PW, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_allowlist_assigns_the_admin_role() {
        let admins: HashSet<String> = ["boss@x.com".to_string()].into_iter().collect();
        let h = harness_with_admins(admins);

        let admin = h.flow.register("Boss@x.com", PW, None).await.unwrap();
        assert_eq!(admin.role, UserRole::Admin);

        let user = h.flow.register("a@x.com", PW, None).await.unwrap();
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn correct_code_with_wrong_purpose_fails() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();

        // The code was issued for email_verification.
        let err = h.flow.reset_password("a@x.com", &code, PW).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(h.codes.count(), 1, "failed attempt must not consume the code");
    }

    #[tokio::test]
    async fn a_code_verifies_exactly_once() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();

        h.flow.verify_email("a@x.com", &code).await.unwrap();
        let err = h.flow.verify_email("a@x.com", &code).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn a_new_request_supersedes_the_old_code() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let first = h.mailer.last_code();

        h.flow
            .send_code("a@x.com", CodePurpose::EmailVerification)
            .await
            .unwrap();
        let second = h.mailer.last_code();
        assert_eq!(h.codes.count(), 1, "only one active code per (email, purpose)");

        if first != second {
            let err = h.flow.verify_email("a@x.com", &first).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
        h.flow.verify_email("a@x.com", &second).await.unwrap();
    }

    #[tokio::test]
    async fn an_expired_code_is_unusable() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();

        // Replace the stored code with one already past its TTL.
        h.codes
            .delete_for("a@x.com", CodePurpose::EmailVerification)
            .await
            .unwrap();
        h.codes.insert_raw(
            "a@x.com",
            CodePurpose::EmailVerification,
            "123456",
            Utc::now() - Duration::minutes(1),
        );

        let err = h.flow.verify_email("a@x.com", "123456").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        assert_eq!(h.codes.delete_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_attempts_allow_retry_until_the_real_code_is_used() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(h.flow.verify_email("a@x.com", wrong).await.is_err());
        assert!(h.flow.verify_email("a@x.com", wrong).await.is_err());

        h.flow.verify_email("a@x.com", &code).await.unwrap();
    }

    #[tokio::test]
    async fn login_failure_is_generic_for_unknown_user_and_wrong_password() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();
        h.flow.verify_email("a@x.com", &code).await.unwrap();

        let unknown = h.flow.login("nobody@x.com", PW).await.unwrap_err();
        let wrong_pw = h.flow.login("a@x.com", "Wrong123!").await.unwrap_err();

        match (unknown, wrong_pw) {
            (AppError::Unauthorized(a), AppError::Unauthorized(b)) => {
                assert_eq!(a, b, "the two failures must be indistinguishable")
            }
            other => panic!("expected generic Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_rejects_unverified_accounts() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();

        let err = h.flow.login("a@x.com", PW).await.unwrap_err();
        assert!(matches!(err, AppError::EmailNotVerified { ref email } if email == "a@x.com"));
    }

    #[tokio::test]
    async fn legacy_accounts_without_the_flag_may_log_in() {
        let h = harness();
        let hash = password::hash(PW).unwrap();
        // Account predating email verification: flag is NULL.
        h.users.rows.lock().unwrap().push(User {
            id: 1,
            email: "old@x.com".to_string(),
            name: None,
            password_hash: hash,
            role: UserRole::User,
            email_verified: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        let user = h.flow.login("old@x.com", PW).await.unwrap();
        assert_eq!(user.email, "old@x.com");
    }

    #[tokio::test]
    async fn verified_accounts_log_in() {
        let h = harness();
        h.flow.register("a@x.com", PW, Some("Ann")).await.unwrap();
        let code = h.mailer.last_code();
        h.flow.verify_email("a@x.com", &code).await.unwrap();

        let user = h.flow.login("a@x.com", PW).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn send_code_for_unknown_user_depends_on_purpose() {
        let h = harness();

        let err = h
            .flow
            .send_code("nouser@x.com", CodePurpose::EmailVerification)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Forgot-password must not reveal whether the account exists.
        h.flow.forgot_password("nouser@x.com").await.unwrap();
        assert_eq!(h.mailer.sent_count(), 0);
        assert_eq!(h.codes.count(), 0);
    }

    #[tokio::test]
    async fn send_code_rejects_already_verified_accounts() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();
        h.flow.verify_email("a@x.com", &code).await.unwrap();

        let err = h
            .flow
            .send_code("a@x.com", CodePurpose::EmailVerification)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reset_password_swaps_which_password_verifies() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();
        let code = h.mailer.last_code();
        h.flow.verify_email("a@x.com", &code).await.unwrap();

        h.flow.forgot_password("a@x.com").await.unwrap();
        let reset_code = h.mailer.last_code();

        h.flow
            .reset_password("a@x.com", &reset_code, "NewPass1!")
            .await
            .unwrap();
        assert_eq!(h.codes.count(), 0, "reset code must be consumed");

        let err = h.flow.login("a@x.com", PW).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        h.flow.login("a@x.com", "NewPass1!").await.unwrap();
    }

    #[tokio::test]
    async fn reset_with_a_code_that_was_never_issued_fails() {
        let h = harness();
        h.flow.register("a@x.com", PW, None).await.unwrap();

        let err = h
            .flow
            .reset_password("a@x.com", "000000", "NewPass1!")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn delivery_failure_rolls_back_the_code_but_keeps_the_user() {
        let h = harness();
        h.mailer.fail.store(true, Ordering::SeqCst);

        let err = h.flow.register("a@x.com", PW, None).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));

        assert_eq!(h.codes.count(), 0, "undelivered code must be deleted");
        assert!(
            h.users.rows.lock().unwrap().iter().any(|u| u.email == "a@x.com"),
            "user row is not rolled back"
        );

        // The account can request a fresh code once delivery recovers.
        h.mailer.fail.store(false, Ordering::SeqCst);
        h.flow
            .send_code("a@x.com", CodePurpose::EmailVerification)
            .await
            .unwrap();
        assert_eq!(h.codes.count(), 1);
    }
}
