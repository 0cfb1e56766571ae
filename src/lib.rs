//! Nutri Bot: conversational registration and meal plans over chat.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod plan;
pub mod registration;
pub mod store;
