pub mod admin;
pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
