use std::net::{IpAddr, Ipv4Addr};

const API_PORT: &str = "NETWATCH_API_PORT";

const DEFAULT_PORT: u16 = 3000;

pub fn get_api_port(configured: Option<u16>) -> u16 {
    let port_from_env = std::env::var(API_PORT);
    port_from_env.map_or(configured.unwrap_or(DEFAULT_PORT), |res| {
        res.parse().unwrap_or(configured.unwrap_or(DEFAULT_PORT))
    })
}

const API_ADDR: &str = "NETWATCH_API_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

pub fn get_api_addr(configured: Option<IpAddr>) -> IpAddr {
    let addr_from_env = std::env::var(API_ADDR);
    addr_from_env.map_or(configured.unwrap_or(DEFAULT_ADDR), |res| {
        res.parse().unwrap_or(configured.unwrap_or(DEFAULT_ADDR))
    })
}

const API_TOKEN: &str = "NETWATCH_API_TOKEN";

pub fn get_api_token(configured: Option<String>) -> Option<String> {
    std::env::var(API_TOKEN).ok().or(configured)
}

const BROADCAST_DELAY: &str = "NETWATCH_BROADCAST_DELAY_MS";

pub fn get_broadcast_delay_ms(configured: u64) -> u64 {
    let delay_from_env = std::env::var(BROADCAST_DELAY);
    delay_from_env.map_or(configured, |res| res.parse().unwrap_or(configured))
}

const LOG_LEVEL: &str = "NETWATCH_LOG";

pub fn get_log_level() -> tracing::level_filters::LevelFilter {
    std::env::var(LOG_LEVEL)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::level_filters::LevelFilter::DEBUG)
}
