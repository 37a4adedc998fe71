pub mod aggregate;
pub mod db;
pub mod demo;
pub mod models;
pub mod service;
