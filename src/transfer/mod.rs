//! Transfer module for FTP server
//!
//! Data channel negotiation and the STOR upload pipeline.

pub mod data_channel;
pub mod upload;

pub use data_channel::{
    DataChannel, format_passive_address, parse_eprt_argument, parse_port_argument,
};
pub use upload::{StoreCommand, StoreSettings};
