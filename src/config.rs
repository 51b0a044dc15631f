//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Display name for the instance
    pub app_name: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "media.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://media.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Sandboxed directory holding media files and thumbnails
    pub media_root: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

/// Authentication configuration (Google OIDC)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session lifetime in seconds
    pub session_max_age: i64,
    /// Provision a viewer account on first successful sign-in
    #[serde(default)]
    pub allow_auto_signup: bool,
    pub google: GoogleOAuthConfig,
}

/// Google OAuth client configuration
///
/// The endpoints default to Google's published OIDC endpoints and are
/// overridable so tests can point the resolver at a stub server.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URL registered with the provider (".../auth/callback")
    pub redirect_url: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scope: String,
}

/// Administrative provisioning configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Comma-separated emails promoted to active admins at startup
    #[serde(default)]
    pub initial_admin_emails: String,
}

impl AdminConfig {
    pub fn initial_admin_email_list(&self) -> Vec<String> {
        self.initial_admin_emails
            .split(',')
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Library view configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    /// Category landing pages, each pre-selecting a type filter plus
    /// an optional best-matching tag from its options list
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
        }
    }
}

/// One category landing page
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// URL slug under /library/
    pub slug: String,
    /// Page title
    pub title: String,
    /// MIME prefixes selecting the category's records
    pub media_types: Vec<String>,
    /// Candidate tag/playlist-tag names to narrow the page further
    pub options: Vec<String>,
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            slug: "music".to_string(),
            title: "Music".to_string(),
            media_types: vec!["audio/".to_string()],
            options: vec!["Music".to_string(), "Songs".to_string()],
        },
        CategoryConfig {
            slug: "movies".to_string(),
            title: "Movies".to_string(),
            media_types: vec!["video/".to_string()],
            options: vec!["Movies".to_string(), "Films".to_string()],
        },
        CategoryConfig {
            slug: "tv".to_string(),
            title: "TV".to_string(),
            media_types: vec!["video/".to_string()],
            options: vec!["TV".to_string(), "Shows".to_string(), "Series".to_string()],
        },
        CategoryConfig {
            slug: "photos".to_string(),
            title: "Photos".to_string(),
            media_types: vec!["image/".to_string()],
            options: vec!["Photos".to_string(), "Pictures".to_string()],
        },
    ]
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format ("pretty" or "json")
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MEDIALODGE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("app_name", "MediaLodge")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/medialodge.db")?
            .set_default("storage.media_root", "data/media")?
            .set_default("storage.max_upload_bytes", 268_435_456)?
            .set_default("auth.session_max_age", 604_800)?
            .set_default("auth.allow_auto_signup", false)?
            .set_default(
                "auth.google.authorize_endpoint",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("auth.google.token_endpoint", "https://oauth2.googleapis.com/token")?
            .set_default(
                "auth.google.userinfo_endpoint",
                "https://openidconnect.googleapis.com/v1/userinfo",
            )?
            .set_default("auth.google.scope", "openid email profile")?
            .set_default("admin.initial_admin_emails", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MEDIALODGE_*)
            .add_source(
                Environment::with_prefix("MEDIALODGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_admin_email_list_splits_and_trims() {
        let admin = AdminConfig {
            initial_admin_emails: " a@example.com, ,b@example.com ".to_string(),
        };
        assert_eq!(
            admin.initial_admin_email_list(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[test]
    fn default_categories_cover_the_four_landing_pages() {
        let library = LibraryConfig::default();
        let slugs: Vec<&str> = library.categories.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["music", "movies", "tv", "photos"]);
    }
}
