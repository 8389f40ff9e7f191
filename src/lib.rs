//! parlor: accounts, a persistent message log, and a realtime channel where
//! each user is represented by at most one live connection.

pub mod config;
pub mod db;
pub mod error;
pub mod realtime;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod store;

pub mod models {
    pub mod message;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod message;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod chat;
}

pub mod handlers {
    pub mod auth;
    pub mod health;
    pub mod messages;
    pub mod ws;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
    pub mod message;
}
