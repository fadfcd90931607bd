pub mod database;
pub(crate) mod repositories;
