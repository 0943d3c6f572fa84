use std::net::{IpAddr, Ipv4Addr};

use crate::net::protocol::MAX_SLOTS;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the UDP socket to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Simulation tick rate in Hz
    pub tick_rate: u32,
    /// Player slots per room (at most the wire-format maximum of 4)
    pub room_capacity: usize,
    /// Player count that starts a room simulating
    pub min_players: usize,
    /// Maximum number of concurrent rooms
    pub max_rooms: usize,
    /// Seconds of input silence before an endpoint is removed
    pub idle_timeout_secs: u64,
    /// Per-endpoint inbound packet cap per second
    pub packet_rate_cap: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5454,
            tick_rate: crate::game::constants::sim::TICK_RATE,
            room_capacity: MAX_SLOTS,
            min_players: 1,
            max_rooms: 64,
            idle_timeout_secs: 30,
            packet_rate_cap: 100,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                _ => tracing::warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Ok(rate) = std::env::var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (1..=240).contains(&parsed) => config.tick_rate = parsed,
                _ => tracing::warn!("TICK_RATE must be 1-240, using default"),
            }
        }

        if let Ok(capacity) = std::env::var("ROOM_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) if (1..=MAX_SLOTS).contains(&parsed) => config.room_capacity = parsed,
                _ => tracing::warn!("ROOM_CAPACITY must be 1-{}, using default", MAX_SLOTS),
            }
        }

        if let Ok(min) = std::env::var("MIN_PLAYERS") {
            match min.parse::<usize>() {
                Ok(parsed) if parsed >= 1 => config.min_players = parsed,
                _ => tracing::warn!("Invalid MIN_PLAYERS '{}', using default", min),
            }
        }

        if let Ok(rooms) = std::env::var("MAX_ROOMS") {
            match rooms.parse::<usize>() {
                Ok(parsed) if (1..=10_000).contains(&parsed) => config.max_rooms = parsed,
                _ => tracing::warn!("MAX_ROOMS must be 1-10000, using default"),
            }
        }

        if let Ok(timeout) = std::env::var("IDLE_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(parsed) if parsed >= 1 => config.idle_timeout_secs = parsed,
                _ => tracing::warn!("Invalid IDLE_TIMEOUT_SECS '{}', using default", timeout),
            }
        }

        if let Ok(cap) = std::env::var("PACKET_RATE_CAP") {
            match cap.parse::<u32>() {
                Ok(parsed) if parsed >= 1 => config.packet_rate_cap = parsed,
                _ => tracing::warn!("Invalid PACKET_RATE_CAP '{}', using default", cap),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.tick_rate == 0 || self.tick_rate > 240 {
            return Err("tick_rate must be 1-240".to_string());
        }
        if self.room_capacity == 0 || self.room_capacity > MAX_SLOTS {
            return Err(format!("room_capacity must be 1-{MAX_SLOTS}"));
        }
        if self.min_players == 0 || self.min_players > self.room_capacity {
            return Err("min_players must be 1..=room_capacity".to_string());
        }
        if self.max_rooms == 0 {
            return Err("max_rooms must be at least 1".to_string());
        }
        if self.packet_rate_cap == 0 {
            return Err("packet_rate_cap must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5454);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.room_capacity, 4);
        assert_eq!(config.min_players, 1);
        assert_eq!(config.idle_timeout_secs, 30);
        assert_eq!(config.packet_rate_cap, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_capacity() {
        let mut config = ServerConfig::default();
        config.room_capacity = MAX_SLOTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_min_players_bounded_by_capacity() {
        let mut config = ServerConfig::default();
        config.room_capacity = 2;
        config.min_players = 3;
        assert!(config.validate().is_err());

        config.min_players = 2;
        assert!(config.validate().is_ok());
    }
}
