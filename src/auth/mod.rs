/// Authentication module
///
/// Credential verification, JWT issuance/verification, refresh token
/// fingerprints, roles, and the session lifecycle that ties them together.

mod claims;
mod extractors;
mod jwt;
mod password;
mod refresh_token;
mod roles;
mod session;

pub use claims::{AccessClaims, RefreshClaims};
pub use extractors::{AuthenticatedUser, ExpenseAccess, ExpenseCaller};
pub use jwt::{TokenError, TokenIssuer};
pub use password::{hash_password, verify_credentials, verify_password};
pub use refresh_token::{fingerprint, fingerprint_matches};
pub use roles::{has_role, Role, UnknownRole};
pub use session::{LoginOutcome, RefreshOutcome, SessionService};
