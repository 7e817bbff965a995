/*
[INPUT]:  Account API keys and the edge login endpoint
[OUTPUT]: Session credentials (cookie + account id) with single-flight refresh
[POS]:    Auth layer - handles GRVT session authentication
[UPDATE]: When login flow or session lifecycle changes
*/

pub mod login;
pub mod session;

pub use login::{ACCOUNT_ID_HEADER, ApiKeyLogin, SESSION_COOKIE};
pub use session::{Session, SessionConfig, SessionManager, SessionRefresher};
