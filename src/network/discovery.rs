use log::{debug, info, warn};
use std::collections::HashSet;
use std::net::{SocketAddr, ToSocketAddrs};

/// Port assumed for seeds given without one
pub const DEFAULT_PORT: u16 = 2001;

/// Best-effort peer discovery from configured seed hosts.
///
/// Seeds are `host` or `host:port` strings resolved with the system resolver.
/// A seed that fails to resolve is skipped; discovery itself never fails.
#[derive(Debug, Clone)]
pub struct PeerDiscovery {
    seeds: Vec<String>,
    default_port: u16,
}

impl PeerDiscovery {
    pub fn new(seeds: Vec<String>) -> Self {
        Self::with_port(seeds, DEFAULT_PORT)
    }

    pub fn with_port(seeds: Vec<String>, default_port: u16) -> Self {
        Self {
            seeds,
            default_port,
        }
    }

    /// Add a seed unless it is already configured
    pub fn add_seed(&mut self, seed: String) {
        if !self.seeds.contains(&seed) {
            self.seeds.push(seed);
        }
    }

    pub fn get_seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Resolve every seed, keeping the first occurrence of each address
    pub fn discover_peers(&self) -> Vec<SocketAddr> {
        let mut seen = HashSet::new();
        let mut peers = Vec::new();

        for seed in &self.seeds {
            match self.resolve_seed(seed) {
                Ok(addresses) => {
                    debug!("Seed '{seed}' resolved to {} addresses", addresses.len());
                    for addr in addresses {
                        if seen.insert(addr) {
                            peers.push(addr);
                        }
                    }
                }
                Err(e) => warn!("Failed to resolve seed '{seed}': {e}"),
            }
        }

        info!(
            "Peer discovery found {} peers from {} seeds",
            peers.len(),
            self.seeds.len()
        );
        peers
    }

    fn resolve_seed(&self, seed: &str) -> std::io::Result<Vec<SocketAddr>> {
        if let Ok(addr) = seed.parse::<SocketAddr>() {
            return Ok(vec![addr]);
        }
        let target = if Self::has_port(seed) {
            seed.to_string()
        } else {
            format!("{seed}:{}", self.default_port)
        };
        Ok(target.to_socket_addrs()?.collect())
    }

    // `host:port`, but not a bare IPv6 literal
    fn has_port(seed: &str) -> bool {
        match seed.rsplit_once(':') {
            Some((host, port)) => !host.contains(':') && port.parse::<u16>().is_ok(),
            None => false,
        }
    }
}
