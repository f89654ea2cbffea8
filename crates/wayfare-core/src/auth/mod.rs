//! Session tokens and the signed-in user.

pub mod claims;
pub mod cookies;
pub mod session;

pub use claims::{TokenClaims, UserInfo, decode_claims, mask_token};
pub use cookies::{CookieStore, FileCookieJar, MemoryCookieJar, SameSite, StoredCookie, TokenStore};
pub use session::{AuthSession, AuthState};
