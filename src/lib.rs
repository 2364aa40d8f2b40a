pub mod collab;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
