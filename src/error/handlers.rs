//! Error handlers
//!
//! Maps server errors to log output and FTP reply codes.

use crate::error::types::{FtpServerError, TransferError};
use log::error;

/// Handle an FTP server error
pub fn handle_error(err: &FtpServerError) {
    error!("FTP Server Error: {}", err);
}

/// Convert error to FTP response code
pub fn error_to_ftp_code(err: &FtpServerError) -> u16 {
    match err {
        FtpServerError::Auth(_) => 530,
        FtpServerError::Storage(_) => 550,
        FtpServerError::Transfer(e) => match e {
            TransferError::InvalidPortCommand(_)
            | TransferError::IpMismatch { .. }
            | TransferError::InvalidPortRange(_) => 501,
            TransferError::DataChannelNotInitialized => 503,
            _ => 425,
        },
        FtpServerError::Pipeline(_) => 451,
        FtpServerError::Server(_) => 421,
        FtpServerError::IoError(_) => 451,
    }
}
