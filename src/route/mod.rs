pub mod about;
pub mod auth;
pub mod content;
pub mod docs;
pub mod model;
pub mod project;
pub mod service;
