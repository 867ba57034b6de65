use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::{Notifier, TracingNotifier};
use persistence::repositories::UsersRepository;
use persistence::{DataStore, ObjectStorage};
use shared::jwt::AccessTokenVerifier;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::hooks::DashboardContext;
use crate::middleware::{metrics_handler, metrics_middleware, request_id, require_admin};
use crate::routes::{
    auth, bots, content, dashboard, health, kyc, playlists, settings, transactions, users,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: AccessTokenVerifier,
    pub ctx: DashboardContext,
    pub users: UsersRepository,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DataStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let ctx = DashboardContext::new(store.clone(), storage, notifier)
            .with_documents(
                config.storage.bucket.clone(),
                config.storage.signed_url_ttl(),
            )
            .with_list_defaults(config.ui.page_size, config.ui.debounce());
        let verifier =
            AccessTokenVerifier::with_leeway(&config.auth.jwt_secret, config.auth.leeway_secs);

        Self {
            users: UsersRepository::new(store),
            config,
            verifier,
            ctx,
        }
    }
}

pub fn create_app(
    config: Config,
    store: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStorage>,
) -> Router {
    let config = Arc::new(config);
    let state = AppState::new(config.clone(), store, storage);

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Admin routes (require an admin access token)
    let admin_routes = Router::new()
        .route("/api/v1/admin/session", get(auth::session))
        // Dashboard
        .route("/api/v1/admin/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/api/v1/admin/dashboard/user-growth", get(dashboard::user_growth))
        .route("/api/v1/admin/dashboard/revenue", get(dashboard::revenue))
        .route("/api/v1/admin/dashboard/activity", get(dashboard::recent_activity))
        // Users
        .route("/api/v1/admin/users", get(users::list_users))
        .route("/api/v1/admin/users/stats", get(users::user_stats))
        .route(
            "/api/v1/admin/users/:user_id",
            get(users::get_user).patch(users::update_user),
        )
        .route("/api/v1/admin/users/:user_id/active", put(users::set_user_active))
        .route("/api/v1/admin/users/:user_id/kyc", put(users::update_user_kyc))
        .route("/api/v1/admin/users/:user_id/documents", get(users::user_documents))
        .route(
            "/api/v1/admin/users/:user_id/transactions",
            get(users::user_transactions),
        )
        .route("/api/v1/admin/users/:user_id/rewards", get(users::user_rewards))
        .route("/api/v1/admin/users/:user_id/sessions", get(users::user_sessions))
        // KYC
        .route("/api/v1/admin/kyc", get(kyc::list_documents))
        .route("/api/v1/admin/kyc/stats", get(kyc::kyc_stats))
        .route("/api/v1/admin/kyc/:document_id", get(kyc::get_document))
        .route("/api/v1/admin/kyc/:document_id/status", put(kyc::update_status))
        // Transactions
        .route("/api/v1/admin/transactions", get(transactions::list_transactions))
        .route(
            "/api/v1/admin/transactions/stats",
            get(transactions::transaction_stats),
        )
        .route(
            "/api/v1/admin/transactions/:transaction_id/status",
            put(transactions::update_status),
        )
        // Bots
        .route("/api/v1/admin/bots", get(bots::list_bots).post(bots::create_bot))
        .route("/api/v1/admin/bots/stats", get(bots::bot_stats))
        .route(
            "/api/v1/admin/bots/:bot_id",
            get(bots::get_bot)
                .patch(bots::update_bot)
                .delete(bots::delete_bot),
        )
        .route("/api/v1/admin/bots/:bot_id/status", put(bots::set_bot_status))
        .route("/api/v1/admin/bots/:bot_id/test", post(bots::test_bot))
        .route("/api/v1/admin/bots/:bot_id/logs", get(bots::bot_logs))
        // Playlists
        .route(
            "/api/v1/admin/playlists",
            get(playlists::list_playlists).post(playlists::create_playlist),
        )
        .route(
            "/api/v1/admin/playlists/:playlist_id",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/api/v1/admin/playlists/:playlist_id/tracks",
            post(playlists::import_tracks),
        )
        .route(
            "/api/v1/admin/playlists/:playlist_id/tracks/:track_id",
            axum::routing::delete(playlists::remove_track),
        )
        // Settings and rewards
        .route("/api/v1/admin/settings", get(settings::list_settings))
        .route(
            "/api/v1/admin/settings/:key",
            get(settings::get_setting).put(settings::upsert_setting),
        )
        .route(
            "/api/v1/admin/rewards/config",
            get(settings::reward_config)
                .put(settings::save_reward_config)
                .patch(settings::update_reward_setting),
        )
        .route("/api/v1/admin/rewards/leaderboard", get(settings::leaderboard))
        .route("/api/v1/admin/rewards/stats", get(settings::reward_stats))
        .route(
            "/api/v1/admin/rewards/transactions",
            get(settings::reward_transactions),
        )
        // Content
        .route(
            "/api/v1/admin/content/pages/:page",
            get(content::get_page).put(content::update_page),
        )
        .route(
            "/api/v1/admin/content/faqs",
            get(content::get_faqs).put(content::update_faqs),
        )
        .route(
            "/api/v1/admin/content/legal/:kind",
            get(content::get_legal).put(content::update_legal),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/api/auth/spotify/authorize", get(auth::spotify_authorize))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}
