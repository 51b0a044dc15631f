//! Authentication and authorization
//!
//! Handles:
//! - Google OIDC sign-in flow
//! - Session snapshot management
//! - Role policies and ownership capability checks

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{
    ADMIN_ONLY, CurrentUser, MaybeUser, RolePolicy, UPLOADER_OR_ADMIN, can_mutate_media,
    can_mutate_playlist,
};
pub use oauth::{IdentityResolver, ResolvedIdentity, auth_router};
pub use session::{Session, create_session_token, verify_session_token};
