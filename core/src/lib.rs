pub mod catalog;
pub mod db;
pub mod legacy_import;
pub mod models;
pub mod planner;
pub mod recipes;
pub mod service;
pub mod shopping_csv;
