// 8.0: conversion engine. owns the persisted rows and coordinates curve, fee and
// reserve computation with ledger settlement. deterministic, no external I/O beyond
// the Ledger and Reserve collaborators.

mod admin;
mod convert;
mod core;
mod results;
mod settle;

pub use admin::DELETE_POLICY;
pub use convert::conversion_mode;
pub use core::Exchange;
pub use results::{ConversionPlan, ConversionReceipt, ExchangeError};
