//! Logging middleware
//!
//! Provides request logging functionality.

use log::info;

/// Log a client connection
pub fn log_connection(client_addr: &str) {
    info!("Client connected: {}", client_addr);
}

/// Log a client command. PASS arguments are never written out.
pub fn log_command(client_addr: &str, command: &str) {
    info!("Client {} executed: {}", client_addr, redact(command));
}

fn redact(command: &str) -> String {
    let command = command.trim_end_matches(['\r', '\n']);
    match command.split_once(char::is_whitespace) {
        Some((verb, _)) if verb.eq_ignore_ascii_case("PASS") => format!("{} ****", verb),
        _ => command.to_string(),
    }
}
