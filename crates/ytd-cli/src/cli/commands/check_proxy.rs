//! Check-proxy command: validate proxy syntax without connecting.

use ytd_core::proxy;

/// Prints the verdict; returns whether the proxy is usable.
pub fn run_check_proxy(value: &str) -> bool {
    match proxy::parse_proxy(Some(value)) {
        Ok(Some(p)) => {
            println!("valid proxy: {}", p);
            true
        }
        Ok(None) => {
            println!("empty proxy: requests go direct");
            true
        }
        Err(e) => {
            println!("{}", e);
            false
        }
    }
}
