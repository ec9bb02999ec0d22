use crate::config::NodeSettings;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::network::{Message, PeerDiscovery};
use log::{debug, info};
use serde_json::Deserializer;
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

const TCP_CONNECT_TIMEOUT: u64 = 5000;
const RETRY_DELAY: u64 = 500;

/// Light client: reaches the network through the first peer that answers,
/// sends one request and disconnects. Holds no ledger.
pub struct Client {
    discovery: PeerDiscovery,
    broadcast_timeout: Duration,
    balance_timeout: Duration,
}

impl Client {
    pub fn new(seeds: Vec<String>) -> Self {
        let defaults = NodeSettings::default();
        Self {
            discovery: PeerDiscovery::new(seeds),
            broadcast_timeout: defaults.broadcast_timeout(),
            balance_timeout: defaults.balance_timeout(),
        }
    }

    pub fn from_settings(settings: &NodeSettings) -> Self {
        Self {
            discovery: PeerDiscovery::new(settings.seeds.clone()),
            broadcast_timeout: settings.broadcast_timeout(),
            balance_timeout: settings.balance_timeout(),
        }
    }

    pub fn with_timeouts(mut self, broadcast: Duration, balance: Duration) -> Self {
        self.broadcast_timeout = broadcast;
        self.balance_timeout = balance;
        self
    }

    /// Hand a signed transaction to one peer. Returns the peer it went to.
    pub fn send_transaction(&self, tx: &Transaction) -> Result<SocketAddr> {
        let deadline = Instant::now() + self.broadcast_timeout;
        let (mut stream, peer_addr) = self.connect_first(deadline, "Transaction broadcast")?;

        let bytes = Message::Transaction(tx.clone()).to_bytes()?;
        stream.write_all(&bytes)?;
        stream.flush()?;

        // Half-close, then drain whatever the peer sent (its chain snapshot)
        // until it hangs up, so our unread data never turns into a reset.
        stream.shutdown(Shutdown::Write)?;
        if let Ok(remaining) = Self::remaining(deadline, "Transaction broadcast") {
            stream.set_read_timeout(Some(remaining))?;
            let _ = io::copy(&mut stream, &mut io::sink());
        }

        info!("Transaction sent to {peer_addr}");
        Ok(peer_addr)
    }

    /// Ask one peer for the balance of `address`. The peer's opening chain
    /// snapshot and any other traffic before the response are skipped.
    pub fn query_balance(&self, address: &str) -> Result<i64> {
        let deadline = Instant::now() + self.balance_timeout;
        let (mut stream, peer_addr) = self.connect_first(deadline, "Balance query")?;

        let query = Message::BalanceQuery {
            address: address.to_string(),
        };
        stream.write_all(&query.to_bytes()?)?;
        stream.flush()?;

        let remaining = Self::remaining(deadline, "Balance query")?;
        stream.set_read_timeout(Some(remaining))?;

        let reader = BufReader::new(&stream);
        for message in Deserializer::from_reader(reader).into_iter::<Message>() {
            match message {
                Ok(Message::BalanceResponse(balance)) => {
                    let _ = stream.shutdown(Shutdown::Both);
                    return Ok(balance);
                }
                Ok(other) => debug!("Skipping {} from {peer_addr}", other.kind()),
                Err(e) if e.is_io() && Instant::now() >= deadline => {
                    return Err(BlockchainError::Timeout(format!(
                        "Balance query timed out after {}s",
                        self.balance_timeout.as_secs()
                    )));
                }
                Err(e) => {
                    return Err(BlockchainError::Network(format!(
                        "Invalid balance response from {peer_addr}: {e}"
                    )));
                }
            }
        }

        Err(BlockchainError::Network(format!(
            "{peer_addr} closed the connection before responding"
        )))
    }

    // Keep re-resolving the seeds until one accepts a connection or the
    // deadline passes.
    fn connect_first(&self, deadline: Instant, what: &str) -> Result<(TcpStream, SocketAddr)> {
        loop {
            for peer_addr in self.discovery.discover_peers() {
                let remaining = Self::remaining(deadline, what)?;
                let attempt = remaining.min(Duration::from_millis(TCP_CONNECT_TIMEOUT));
                match TcpStream::connect_timeout(&peer_addr, attempt) {
                    Ok(stream) => return Ok((stream, peer_addr)),
                    Err(e) => debug!("Peer {peer_addr} unreachable: {e}"),
                }
            }

            let remaining = Self::remaining(deadline, what)?;
            thread::sleep(remaining.min(Duration::from_millis(RETRY_DELAY)));
        }
    }

    fn remaining(deadline: Instant, what: &str) -> Result<Duration> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(BlockchainError::Timeout(format!("{what} found no reachable peer")));
        }
        Ok(remaining)
    }
}
