//! Shared application state

use std::sync::Arc;

use pms_core::attachment::AttachmentStorage;
use pms_core::cache::{CacheAside, CacheStore, CacheTtl};
use pms_core::notification::{Mailer, NotificationDispatcher};
use pms_core::repositories::{DocumentStore, Repository};
use pms_core::services::{AuthService, AuthSettings};
use pms_core::Entity;
use pms_security::JwtService;
use pms_shared::config::AppConfig;

/// Everything a handler needs, built once in `main` from concrete clients
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub cache: CacheAside,
    pub dispatcher: NotificationDispatcher,
    pub storage: Arc<dyn AttachmentStorage>,
    pub jwt: Arc<JwtService>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheStore>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn AttachmentStorage>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry,
        ));
        let auth = AuthService::new(
            Repository::new(store.clone()),
            Repository::new(store.clone()),
            jwt.clone(),
            AuthSettings {
                default_tenant_code: config.auth.default_tenant_code.clone(),
                frontend_url: config.frontend.base_url.clone(),
            },
        );

        Self {
            cache: CacheAside::new(cache, CacheTtl::from(&config.cache)),
            dispatcher: NotificationDispatcher::new(mailer),
            config: Arc::new(config),
            store,
            storage,
            jwt,
            auth,
        }
    }

    pub fn repo<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.store.clone())
    }

    pub fn is_development(&self) -> bool {
        self.config.app.is_development()
    }
}
