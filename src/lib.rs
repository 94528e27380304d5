pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ingredients;
pub mod memberships;
pub mod pagination;
pub mod recipes;
pub mod shopping;
pub mod state;
pub mod storage;
pub mod tags;
pub mod users;
