#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod board;
pub mod color;
pub mod coord;
pub mod error;
pub mod event;
pub mod grid;
pub mod matchmaker;
pub mod participant;
pub mod piece;
pub mod registry;
pub mod server;
pub mod server_helpers;
pub mod session;
pub mod starter;
pub mod test_util;
