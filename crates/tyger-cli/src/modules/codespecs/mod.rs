mod actions;
pub(crate) mod args;
mod quantity;
mod types;

pub(crate) use actions::handle_create;
