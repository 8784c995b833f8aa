//! Local control plane for an agent's user secrets.
//!
//! Secret values live in a [`store::SecretStore`] backend (OS keychain first,
//! encrypted file as fallback), addressed by refs from [`secret_ref`]. The
//! names and timestamps live in the [`journal`]. [`user_secrets`] keeps the two
//! in step, and [`gateway`] exposes it all as named methods.

pub mod config;
pub mod error;
pub mod gateway;
pub mod journal;
pub mod secret_ref;
pub mod store;
pub mod user_secrets;
