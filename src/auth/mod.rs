pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::{CurrentUser, StaffUser};
pub use token::{PgTokenStore, TokenStore};
