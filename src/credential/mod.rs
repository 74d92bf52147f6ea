pub mod env_file;
pub mod store;
pub mod token;

pub use store::{CredentialStore, EnvFileStore, MemoryStore, Store};
pub use token::Credential;
