//! Common test utilities for E2E tests

#![allow(dead_code)]

use medialodge::data::{Media, NewMedia, User, UserRole};
use medialodge::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance bound to a random port.
    ///
    /// The client never follows redirects so tests can assert on them.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let media_root = temp_dir.path().join("media");

        let config = config::AppConfig {
            app_name: "MediaLodge Test".to_string(),
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "test.example.com".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            storage: config::StorageConfig {
                media_root,
                max_upload_bytes: 32 * 1024 * 1024,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604_800,
                allow_auto_signup: false,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_url: "http://test.example.com/auth/callback".to_string(),
                    // Unroutable endpoints: any real exchange attempt fails fast.
                    authorize_endpoint: "https://provider.test/authorize".to_string(),
                    token_endpoint: "http://127.0.0.1:1/token".to_string(),
                    userinfo_endpoint: "http://127.0.0.1:1/userinfo".to_string(),
                    scope: "openid email profile".to_string(),
                },
            },
            admin: config::AdminConfig {
                initial_admin_emails: "root@test.example.com".to_string(),
            },
            library: config::LibraryConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        medialodge::metrics::init_metrics();

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = medialodge::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create an active account with the given role
    pub async fn seed_user(&self, email: &str, role: UserRole) -> User {
        let (user, _) = self
            .state
            .db
            .add_or_activate_user(email, Some("Test User"), role)
            .await
            .unwrap();
        user
    }

    /// Mint a session cookie header value for a user
    pub fn session_cookie(&self, user: &User) -> String {
        use medialodge::auth::{Session, create_session_token};

        let session = Session::from_user(user, self.state.config.auth.session_max_age);
        let token = create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token");
        format!("session={token}")
    }

    /// Insert a media record directly (no backing file)
    pub async fn seed_media(
        &self,
        filename: &str,
        mime_type: &str,
        tags: &[&str],
        playlist_tags: &[&str],
        owner_id: Option<i64>,
    ) -> Media {
        use medialodge::data::MediaType;

        self.state
            .db
            .create_media(&NewMedia {
                filename: filename.to_string(),
                original_filename: Some(filename.to_string()),
                media_type: MediaType::from_mime(mime_type),
                mime_type: mime_type.to_string(),
                url: format!("/media/{filename}"),
                thumbnail_url: None,
                title: None,
                description: None,
                tags: tags.iter().map(ToString::to_string).collect(),
                playlist_tags: playlist_tags.iter().map(ToString::to_string).collect(),
                owner_id,
            })
            .await
            .unwrap()
    }

    /// Insert a media record with a real file and thumbnail in the vault
    pub async fn seed_media_with_file(
        &self,
        filename: &str,
        mime_type: &str,
        data: &[u8],
        owner_id: Option<i64>,
    ) -> Media {
        let stored = self.state.storage.store(filename, data).await.unwrap();
        self.state
            .storage
            .store_thumbnail(&stored.filename, b"thumb")
            .await
            .unwrap();
        self.seed_media(&stored.filename, mime_type, &[], &[], owner_id)
            .await
    }
}

/// Pull a named cookie's value out of a response's Set-Cookie headers
pub fn extract_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .and_then(|value| value.split(';').next())
        .map(|value| value[prefix.len()..].to_string())
}
