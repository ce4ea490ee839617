// bistro_server/src/lib.rs

//! HTTP service for the BistroBliss food ordering site.
//!
//! The order, payment and inventory workflows come from `bistro_core`; this crate provides
//! their Postgres store and MoMo gateway, plus accounts, catalog, carts, reviews, vouchers
//! and the admin back office.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;
