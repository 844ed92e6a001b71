use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const CONFIG_PATH: &str = "BILITRACK_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Config file location, `BILITRACK_CONFIG` or `config.json`
pub fn get_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

const LIST_PATH: &str = "BILITRACK_LIST";

const DEFAULT_LIST_PATH: &str = "monitor.list";

/// Monitor list location, `BILITRACK_LIST` or `monitor.list`
pub fn get_list_path() -> PathBuf {
    std::env::var(LIST_PATH).map_or_else(|_| PathBuf::from(DEFAULT_LIST_PATH), PathBuf::from)
}

const API_ADDR: &str = "BILITRACK_API_ADDR";

const DEFAULT_API_HOST: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

/// API bind address: `BILITRACK_API_ADDR` if it parses, else all interfaces on `port`
pub fn get_api_addr(port: u16) -> SocketAddr {
    let addr_from_env = std::env::var(API_ADDR);
    addr_from_env.map_or(SocketAddr::from((DEFAULT_API_HOST, port)), |res| {
        res.parse()
            .unwrap_or(SocketAddr::from((DEFAULT_API_HOST, port)))
    })
}
