//! Privileged execution: dangerous-command policy and the sudo
//! credential cache.

pub mod cache;
pub mod guard;

pub use cache::{CredentialValidator, PrivilegedOutput, SudoCache, SudoValidator};
pub use guard::DangerousCommandGuard;
