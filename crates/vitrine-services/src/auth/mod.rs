//! Authentication
//!
//! [`IdentityProvider`] is the seam to whichever identity backend is in use. Its
//! errors carry only a provider code; [`AuthService`] validates input before calling
//! it and translates codes into [`vitrine_core::AuthError`].

mod memory;
mod provider;
mod service;

pub use memory::MemoryIdentityProvider;
pub use provider::{IdentityProvider, ProviderError};
pub use service::AuthService;
