//! Server runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: database connection,
//! migrations, the bootstrap admin, the REST API task and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::UserService;
use crate::config::AppConfig;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::repositories::SeaOrmUserRepository;
use crate::infrastructure::{init_database, BcryptPasswordEncoder};
use crate::interfaces::http::{create_api_router, ApiState};
use crate::shared::shutdown::ShutdownSignal;

/// Options for starting the service.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the configured admin account when missing (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

/// Handle to a running service.
pub struct ServerHandle {
    pub user_service: Arc<UserService>,
    pub config: AppConfig,
    /// Address the REST API is bound to. Differs from the configured one
    /// when port 0 was requested.
    pub api_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownSignal,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Connect, migrate, seed the admin account and start serving.
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        info!("Starting parking service...");

        let db = init_database(&app_cfg.database_config()).await.map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await.map_err(|e| {
                error!("Failed to run migrations: {}", e);
                e
            })?;
            info!("Migrations completed");
        }

        let repo = Arc::new(SeaOrmUserRepository::new(db.clone()));
        let encoder = Arc::new(BcryptPasswordEncoder::new(app_cfg.security.bcrypt_cost));
        let user_service = Arc::new(UserService::new(repo, encoder));

        if opts.create_default_admin {
            create_default_admin(&user_service, &app_cfg).await;
        }

        let router = create_api_router(ApiState::new(
            user_service.clone(),
            app_cfg.jwt_config(),
            Some(db.clone()),
        ));

        let listener = tokio::net::TcpListener::bind(app_cfg.api_address()).await?;
        let api_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let shutdown = ShutdownSignal::new();
        let api_shutdown = shutdown.clone();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("REST API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            user_service,
            config: app_cfg,
            api_addr,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Trigger shutdown on SIGINT or SIGTERM.
    pub fn install_signal_handler(&self) {
        self.shutdown.listen_for_os_signals();
    }

    /// Wait for the API task to stop, then close the database.
    pub async fn wait(self) {
        match self.api_task.await {
            Ok(()) => info!("REST API server stopped"),
            Err(e) => error!("REST API server task panicked: {}", e),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("Parking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down parking service...");
        self.shutdown.trigger();
        self.wait().await;
    }
}

async fn create_default_admin(service: &UserService, app_cfg: &AppConfig) {
    let admin = &app_cfg.admin;
    match service.ensure_admin(&admin.username, &admin.password).await {
        Ok(Some(user)) => {
            info!(user_id = user.id, "Default admin created: {}", user.username);
            warn!("Please change the admin password immediately!");
        }
        Ok(None) => {}
        Err(e) => error!("Failed to create admin user: {}", e),
    }
}

/// Initialize tracing from the application config. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::domain::UserRole;

    fn options() -> ServerOptions {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.database.url = "sqlite::memory:".into();
        config.security.bcrypt_cost = crate::infrastructure::crypto::password::BCRYPT_MIN_COST;
        ServerOptions {
            config,
            ..ServerOptions::default()
        }
    }

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn start_seeds_admin_serves_and_stops() {
        let handle = ServerHandle::start(options()).await.unwrap();

        let admin = handle
            .user_service
            .get_by_username("admin@parking.local")
            .await
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);

        let health = raw_get(handle.api_addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"), "{health}");

        let denied = raw_get(handle.api_addr, "/api/v1/users").await;
        assert!(denied.starts_with("HTTP/1.1 403"), "{denied}");
        assert!(denied.contains("\"path\":\"/api/v1/users\""), "{denied}");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn admin_seeding_can_be_disabled() {
        let handle = ServerHandle::start(ServerOptions {
            create_default_admin: false,
            ..options()
        })
        .await
        .unwrap();

        assert!(handle.user_service.get_all().await.unwrap().is_empty());
        handle.shutdown().await;
    }
}
