use crate::error::{BlockchainError, Result};
use crate::network::Message;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::RwLock;
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Live peer connections, inbound and outbound alike.
///
/// Every write to a peer goes through here under the write lock so messages
/// from different threads never interleave on one socket. A peer whose write
/// fails is dropped.
pub struct Peers {
    connected: RwLock<HashMap<SocketAddr, TcpStream>>,
    max_connections: usize,
}

impl Peers {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connected: RwLock::new(HashMap::new()),
            max_connections,
        }
    }

    /// Register the writing half of a connection
    pub fn record_connection(&self, address: SocketAddr, stream: &TcpStream) -> Result<()> {
        let writer = stream.try_clone()?;
        writer.set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))?;

        let mut connected = self
            .connected
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        connected.insert(address, writer);
        info!("Connected to peer: {address}");
        Ok(())
    }

    pub fn record_disconnection(&self, address: SocketAddr) -> Result<()> {
        let mut connected = self
            .connected
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        if connected.remove(&address).is_some() {
            info!("Disconnected from peer: {address}");
        }
        Ok(())
    }

    pub fn get_connected_addresses(&self) -> Result<HashSet<SocketAddr>> {
        let connected = self
            .connected
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        Ok(connected.keys().copied().collect())
    }

    pub fn get_connected_count(&self) -> Result<usize> {
        let connected = self
            .connected
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        Ok(connected.len())
    }

    pub fn is_connected(&self, address: &SocketAddr) -> Result<bool> {
        Ok(self.get_connected_addresses()?.contains(address))
    }

    pub fn should_accept_connection(&self) -> Result<bool> {
        Ok(self.get_connected_count()? < self.max_connections)
    }

    /// Write one message to a single peer
    pub fn send_to(&self, address: SocketAddr, message: &Message) -> Result<()> {
        let bytes = message.to_bytes()?;
        let mut connected = self
            .connected
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;

        let stream = connected
            .get_mut(&address)
            .ok_or_else(|| BlockchainError::Network(format!("Peer {address} is not connected")))?;
        let written = stream.write_all(&bytes).and_then(|_| stream.flush());
        if let Err(e) = written {
            connected.remove(&address);
            return Err(BlockchainError::Network(format!(
                "Failed to send {} to {address}: {e}",
                message.kind()
            )));
        }
        debug!("Sent {} to {address}", message.kind());
        Ok(())
    }

    /// Fire-and-forget to every peer. Returns how many writes succeeded.
    pub fn broadcast(&self, message: &Message) -> Result<usize> {
        let bytes = message.to_bytes()?;
        let mut connected = self
            .connected
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire peer lock: {e}")))?;

        connected.retain(|address, stream| {
            match stream.write_all(&bytes).and_then(|_| stream.flush()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping peer {address}, {} write failed: {e}", message.kind());
                    false
                }
            }
        });
        debug!("Broadcast {} to {} peers", message.kind(), connected.len());
        Ok(connected.len())
    }
}
