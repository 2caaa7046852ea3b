//! Secret handling for rewriter credentials.

mod credentials;

pub use credentials::{AICredentials, SecretString};
