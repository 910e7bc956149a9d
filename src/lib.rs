//! futures-bot: order placement and client-side strategies for Binance
//! USDT-M futures
//!
//! This library provides:
//! - A signed REST client for order placement, status and cancellation
//! - An in-memory paper broker behind the same trait
//! - Input validation for symbols, sides, quantities and prices
//! - Market, limit and stop-limit runners
//! - Client-side OCO monitoring with timeout and cancellation
//! - TWAP slicing with partial-execution reporting
//! - Logging and metrics setup

pub mod broker;
pub mod cli;
pub mod config;
pub mod strategy;
pub mod telemetry;
pub mod validation;
