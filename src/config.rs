use std::env;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

const BIND_ENV: &str = "CHESS_ROOMS_BIND";

/// Server settings, read from the environment. Logging is configured
/// separately through `RUST_LOG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> ServerConfig {
        ServerConfig {
            bind_addr: env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_defaults_and_honors_the_env() {
        env::remove_var(BIND_ENV);
        assert_eq!(ServerConfig::from_env().bind_addr, DEFAULT_BIND_ADDR);

        env::set_var(BIND_ENV, "0.0.0.0:9001");
        assert_eq!(ServerConfig::from_env().bind_addr, "0.0.0.0:9001");
        env::remove_var(BIND_ENV);
    }
}
