pub(crate) mod auth;
pub(crate) mod codespecs;
pub(crate) mod system;
