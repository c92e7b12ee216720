// ============================================================================
// PMS Core - Authentication Service
// File: crates/pms-core/src/services/auth_service.rs
// ============================================================================
//! Registration, login, email verification, password flows and tenant
//! onboarding

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use pms_security::{JwtService, OneTimeToken, PasswordService};
use pms_shared::constants::{
    DEFAULT_TENANT_CODE, DEFAULT_TENANT_NAME, RESET_TOKEN_EXPIRY, VERIFICATION_TOKEN_EXPIRY,
};
use pms_shared::utils::{mask_email, normalize_email};

use crate::domain::tenant::{OnboardTenantRequest, SubscriptionPlan, TenantContact};
use crate::domain::user::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};
use crate::domain::{Role, Tenant, User};
use crate::entity::Entity;
use crate::error::DomainError;
use crate::notification::{Notification, Recipient, Template};
use crate::query::Filter;
use crate::repositories::Repository;
use crate::validation::RequestSchema;

/// Settings the service needs from configuration
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub default_tenant_code: Option<String>,
    pub frontend_url: String,
}

/// A signed-in user plus the mail the flow wants sent
#[derive(Debug)]
pub struct AuthOutcome {
    pub user: User,
    pub token: String,
    pub notifications: Vec<Notification>,
}

#[derive(Debug)]
pub struct OnboardOutcome {
    pub tenant: Tenant,
    pub admin: User,
    pub token: String,
    pub notifications: Vec<Notification>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Repository<User>,
    tenants: Repository<Tenant>,
    jwt: Arc<JwtService>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        users: Repository<User>,
        tenants: Repository<Tenant>,
        jwt: Arc<JwtService>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            tenants,
            jwt,
            settings,
        }
    }

    fn issue_token(&self, user: &User) -> Result<String, DomainError> {
        self.jwt
            .generate_access_token(&user.id)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))
    }

    fn hash_password(password: &str) -> Result<String, DomainError> {
        PasswordService::hash(password).map_err(|e| DomainError::PasswordHashError(e.to_string()))
    }

    fn link(&self, path: &str, secret: &str) -> String {
        format!("{}/{}/{}", self.settings.frontend_url.trim_end_matches('/'), path, secret)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.users
            .find_one(Filter::eq("email", normalize_email(email)))
            .await
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), DomainError> {
        if self.find_by_email(email).await?.is_some() {
            warn!("Registration rejected: email already registered: {}", mask_email(email));
            return Err(DomainError::Duplicate {
                field: "email".to_string(),
                message: "Email sudah terdaftar".to_string(),
            });
        }
        Ok(())
    }

    /// Attach a fresh verification token and build the mail carrying it
    fn verification_mail(&self, user: &mut User) -> Notification {
        let token = OneTimeToken::generate(VERIFICATION_TOKEN_EXPIRY);
        user.set_verification_token(token.digest, token.expires_at);
        Notification::new(
            Recipient::account(user),
            Template::VerifyEmail,
            json!({
                "name": user.name,
                "link": self.link("verify-email", &token.secret),
                "expiresAt": token.expires_at,
            }),
        )
    }

    /// Tenant a self-registration lands in: the requested code, then the
    /// configured default, then the only active tenant. An install with no
    /// tenant at all gets the default tenant on its first registration.
    async fn registration_tenant(&self, req: &RegisterRequest) -> Result<Tenant, DomainError> {
        let requested = req
            .tenant_code
            .as_deref()
            .or(self.settings.default_tenant_code.as_deref())
            .map(Tenant::normalize_code);

        if let Some(code) = requested {
            return self
                .tenants
                .find_one(Filter::and(vec![
                    Filter::eq("code", code.as_str()),
                    Filter::eq("isActive", true),
                ]))
                .await?
                .ok_or_else(|| DomainError::field("tenantCode", "Tenant tidak ditemukan"));
        }

        let mut active = self.tenants.find_all(Filter::eq("isActive", true)).await?;
        match active.len() {
            0 => self.bootstrap_default_tenant(&req.email).await,
            1 => Ok(active.remove(0)),
            _ => Err(DomainError::field("tenantCode", "Kode tenant wajib diisi")),
        }
    }

    async fn bootstrap_default_tenant(&self, contact_email: &str) -> Result<Tenant, DomainError> {
        if self
            .tenants
            .find_one(Filter::eq("code", DEFAULT_TENANT_CODE))
            .await?
            .is_some()
        {
            return Err(DomainError::field("tenantCode", "Tenant tidak ditemukan"));
        }

        let tenant = Tenant::new(
            DEFAULT_TENANT_NAME.to_string(),
            DEFAULT_TENANT_CODE,
            None,
            TenantContact {
                email: contact_email.to_string(),
                phone: None,
                address: None,
            },
            SubscriptionPlan::default(),
        );
        self.tenants.insert(&tenant).await?;
        info!(tenant_id = %tenant.id, "Default tenant created: {}", tenant.code);
        Ok(tenant)
    }

    /// Self-registration. The caller always becomes a resident.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthOutcome, DomainError> {
        req.check()?;
        info!("Registration attempt for email: {}", mask_email(&req.email));

        self.ensure_email_free(&req.email).await?;
        let tenant = self.registration_tenant(&req).await?;

        let name = req
            .name
            .clone()
            .unwrap_or_else(|| User::default_name(&req.email));
        let mut user = User::new(
            tenant.id,
            name,
            &req.email,
            Self::hash_password(&req.password)?,
            Role::Resident,
        );
        let verify = self.verification_mail(&mut user);
        self.users.insert(&user).await?;

        let token = self.issue_token(&user)?;
        let mut notifications = vec![verify];
        if let Some(recipient) = Recipient::from_user(&user) {
            notifications.push(Notification::new(
                recipient,
                Template::Welcome,
                json!({ "name": user.name, "tenant": tenant.name }),
            ));
        }

        info!("Registration successful for: {}", mask_email(&user.email));
        Ok(AuthOutcome {
            user,
            token,
            notifications,
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthOutcome, DomainError> {
        req.check()?;
        info!("Login attempt for email: {}", mask_email(&req.email));

        let mut user = match self.find_by_email(&req.email).await? {
            Some(user) if user.is_active() => user,
            _ => {
                warn!("Login failed: unknown or inactive account: {}", mask_email(&req.email));
                return Err(DomainError::InvalidCredentials);
            }
        };

        let valid = PasswordService::verify(&req.password, &user.password_hash)
            .map_err(|_| DomainError::InvalidCredentials)?;
        if !valid {
            warn!("Login failed: invalid password for: {}", mask_email(&req.email));
            return Err(DomainError::InvalidCredentials);
        }

        match self.tenants.find(user.tenant_id).await? {
            Some(tenant) if tenant.is_active() => {}
            _ => {
                warn!("Login failed: tenant inactive for: {}", mask_email(&req.email));
                return Err(DomainError::InvalidCredentials);
            }
        }

        let token = self.issue_token(&user)?;

        user.record_login();
        if let Err(e) = self.users.save(&user).await {
            error!("Failed to update last login: {}", e);
        }

        info!("Login successful for: {}", mask_email(&user.email));
        Ok(AuthOutcome {
            user,
            token,
            notifications: Vec::new(),
        })
    }

    pub async fn verify_email(&self, secret: &str) -> Result<User, DomainError> {
        let digest = OneTimeToken::digest(secret);
        let mut user = self
            .users
            .find_one(Filter::eq("verificationToken", digest))
            .await?
            .ok_or(DomainError::InvalidToken)?;

        match user.verification_token_expires {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(DomainError::InvalidToken),
        }

        user.mark_email_verified();
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Unknown addresses succeed silently so the endpoint cannot be used to
    /// enumerate accounts.
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
    ) -> Result<Vec<Notification>, DomainError> {
        req.check()?;
        let Some(mut user) = self.find_by_email(&req.email).await? else {
            info!("Password reset requested for unknown email: {}", mask_email(&req.email));
            return Ok(Vec::new());
        };
        if !user.is_active() {
            return Ok(Vec::new());
        }

        let token = OneTimeToken::generate(RESET_TOKEN_EXPIRY);
        user.set_reset_token(token.digest, token.expires_at);
        self.users.save(&user).await?;

        Ok(vec![Notification::new(
            Recipient::account(&user),
            Template::PasswordReset,
            json!({
                "name": user.name,
                "link": self.link("reset-password", &token.secret),
                "expiresAt": token.expires_at,
            }),
        )])
    }

    pub async fn reset_password(
        &self,
        secret: &str,
        req: ResetPasswordRequest,
    ) -> Result<AuthOutcome, DomainError> {
        req.check()?;
        let digest = OneTimeToken::digest(secret);
        let mut user = self
            .users
            .find_one(Filter::eq("resetPasswordToken", digest))
            .await?
            .ok_or(DomainError::InvalidToken)?;

        match user.reset_password_expires {
            Some(expires) if expires > Utc::now() && user.is_active() => {}
            _ => return Err(DomainError::InvalidToken),
        }

        user.set_password(Self::hash_password(&req.password)?);
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Password reset completed");

        let token = self.issue_token(&user)?;
        let notifications = vec![Notification::new(
            Recipient::account(&user),
            Template::PasswordChanged,
            json!({ "name": user.name }),
        )];
        Ok(AuthOutcome {
            user,
            token,
            notifications,
        })
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<Vec<Notification>, DomainError> {
        req.check()?;
        let mut user = self.users.find_active(user_id).await?;

        let valid = PasswordService::verify(&req.current_password, &user.password_hash)
            .map_err(|e| DomainError::PasswordHashError(e.to_string()))?;
        if !valid {
            return Err(DomainError::field("currentPassword", "Password saat ini salah"));
        }

        user.set_password(Self::hash_password(&req.new_password)?);
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Password changed");

        Ok(vec![Notification::new(
            Recipient::account(&user),
            Template::PasswordChanged,
            json!({ "name": user.name }),
        )])
    }

    /// Create a tenant together with its first administrator
    pub async fn onboard(&self, req: OnboardTenantRequest) -> Result<OnboardOutcome, DomainError> {
        req.check()?;
        let code = Tenant::normalize_code(&req.code);
        info!("Tenant onboarding requested: {}", code);

        if self
            .tenants
            .find_one(Filter::eq("code", code.as_str()))
            .await?
            .is_some()
        {
            return Err(DomainError::Duplicate {
                field: "code".to_string(),
                message: "Kode tenant sudah digunakan".to_string(),
            });
        }
        self.ensure_email_free(&req.admin.email).await?;

        let tenant = Tenant::new(req.name, &code, req.description, req.contact, req.plan);
        let mut admin = User::new(
            tenant.id,
            req.admin.name,
            &req.admin.email,
            Self::hash_password(&req.admin.password)?,
            Role::Admin,
        );
        let verify = self.verification_mail(&mut admin);

        self.tenants.insert(&tenant).await?;
        self.users.insert(&admin).await?;

        let token = self.issue_token(&admin)?;
        let notifications = vec![
            verify,
            Notification::new(
                Recipient::account(&admin),
                Template::TenantOnboarded,
                json!({ "name": admin.name, "tenant": tenant.name, "code": tenant.code }),
            ),
        ];

        info!(tenant_id = %tenant.id, "Tenant onboarded: {}", tenant.code);
        Ok(OnboardOutcome {
            tenant,
            admin,
            token,
            notifications,
        })
    }
}
