pub mod api;
pub mod config;
pub mod db;
pub mod form;
pub mod permissions;
pub mod schedule;
pub mod store;
