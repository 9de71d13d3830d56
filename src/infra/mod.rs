pub mod app;
pub mod config;
pub mod db;
pub mod hasher;
pub mod setup;
