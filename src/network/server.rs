use crate::config::NodeSettings;
use crate::core::{Block, Blockchain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Message, PeerDiscovery, Peers};
use log::{debug, error, info, warn};
use serde_json::Deserializer;
use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const TCP_CONNECT_TIMEOUT: u64 = 5000;

/// A full node: the shared ledger, its peer connections and the timers
/// that mine and report on it.
#[derive(Clone)]
pub struct Server {
    blockchain: Arc<Mutex<Blockchain>>,
    peers: Arc<Peers>,
    settings: NodeSettings,
    miner_address: String,
}

impl Server {
    pub fn new(blockchain: Blockchain, settings: NodeSettings, miner_address: String) -> Self {
        let peers = Arc::new(Peers::new(settings.max_connections));
        Self {
            blockchain: Arc::new(Mutex::new(blockchain)),
            peers,
            settings,
            miner_address,
        }
    }

    pub fn get_blockchain(&self) -> Arc<Mutex<Blockchain>> {
        Arc::clone(&self.blockchain)
    }

    pub fn get_peers(&self) -> Arc<Peers> {
        Arc::clone(&self.peers)
    }

    pub fn get_miner_address(&self) -> &str {
        self.miner_address.as_str()
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Blockchain>> {
        self.blockchain
            .lock()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire ledger lock: {e}")))
    }

    /// Bind, dial the seeds, start the timers and serve until the listener fails
    pub fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.connect_to_network();
        self.start_mining_timer();
        self.start_status_timer();
        self.serve(listener)
    }

    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.settings.listen_addr.as_str();
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        info!("Server listening on {addr}");
        Ok(listener)
    }

    /// Accept loop, one thread per peer
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    if !self.peers.should_accept_connection().unwrap_or(false) {
                        warn!("Rejecting connection from {peer_addr}: connection limit reached");
                        let _ = stream.shutdown(Shutdown::Both);
                        continue;
                    }

                    let server = self.clone();
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream, peer_addr, true) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    /// Open outbound connections to every discovered peer that is not us
    fn connect_to_network(&self) {
        let own_addr = self.settings.listen_addr.parse::<SocketAddr>().ok();
        let discovery = PeerDiscovery::new(self.settings.seeds.clone());

        for peer_addr in discovery.discover_peers() {
            if Some(peer_addr) == own_addr {
                continue;
            }
            if let Err(e) = self.connect_to_peer(peer_addr) {
                warn!("Failed to connect to peer {peer_addr}: {e}");
            }
        }
    }

    pub fn connect_to_peer(&self, peer_addr: SocketAddr) -> Result<()> {
        let stream =
            TcpStream::connect_timeout(&peer_addr, Duration::from_millis(TCP_CONNECT_TIMEOUT))
                .map_err(|e| {
                    BlockchainError::Network(format!("Failed to connect to {peer_addr}: {e}"))
                })?;

        let server = self.clone();
        thread::spawn(move || {
            if let Err(e) = server.handle_connection(stream, peer_addr, false) {
                error!("Error handling connection to {peer_addr}: {e}");
            }
        });
        Ok(())
    }

    // The accepting side opens with a snapshot of its chain. A message that
    // fails to parse ends this connection only.
    fn handle_connection(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        inbound: bool,
    ) -> Result<()> {
        self.peers.record_connection(peer_addr, &stream)?;

        if inbound {
            let snapshot = self.ledger()?.current_chain().to_vec();
            if let Err(e) = self.peers.send_to(peer_addr, &Message::ChainSnapshot(snapshot)) {
                warn!("{e}");
            }
        }

        let reader = BufReader::new(&stream);
        for message in Deserializer::from_reader(reader).into_iter::<Message>() {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    error!("Error parsing message from {peer_addr}: {e}");
                    break;
                }
            };
            info!("Received {} from {peer_addr}", message.kind());

            match self.handle_message(message) {
                Ok(Some(reply)) => self.peers.send_to(peer_addr, &reply)?,
                Ok(None) => {}
                Err(e) => error!("Error processing message from {peer_addr}: {e}"),
            }
        }

        self.peers.record_disconnection(peer_addr)?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }

    /// Apply one peer message to the ledger, returning the reply if it needs one
    pub fn handle_message(&self, message: Message) -> Result<Option<Message>> {
        let policy = self.settings.sync_policy();

        match message {
            Message::ChainSnapshot(blocks) => {
                self.ledger()?.replace_chain(blocks, policy)?;
                Ok(None)
            }
            Message::Transaction(tx) => {
                if self.settings.strict_sync && tx.is_coinbase() {
                    warn!("Dropping coinbase transaction relayed for {}", tx.get_to());
                    return Ok(None);
                }
                self.ledger()?.submit_transaction(tx);
                Ok(None)
            }
            Message::Block(block) => {
                self.ledger()?.accept_block(block, policy)?;
                Ok(None)
            }
            Message::BalanceQuery { address } => {
                let balance = self.ledger()?.balance_of(&address);
                info!("Balance of {address} is {balance}");
                Ok(Some(Message::BalanceResponse(balance)))
            }
            Message::BalanceResponse(_) => {
                debug!("Ignoring unsolicited balance response");
                Ok(None)
            }
        }
    }

    /// Mine everything pending without holding the ledger lock during the
    /// search. `None` when the tip moved and the block was discarded.
    pub fn mine_once(&self) -> Result<Option<Block>> {
        let (mut block, difficulty) = {
            let mut ledger = self.ledger()?;
            let block = ledger.assemble_block(&self.miner_address)?;
            (block, ledger.params().difficulty)
        };

        block.mine(difficulty)?;

        if !self.ledger()?.append_mined_block(block.clone())? {
            return Ok(None);
        }
        info!("New block {} is mined!", block.get_hash());
        self.broadcast_chain()?;
        Ok(Some(block))
    }

    pub fn broadcast_chain(&self) -> Result<usize> {
        let snapshot = self.ledger()?.current_chain().to_vec();
        self.peers.broadcast(&Message::ChainSnapshot(snapshot))
    }

    pub fn broadcast_transaction(&self, tx: &Transaction) -> Result<usize> {
        self.peers.broadcast(&Message::Transaction(tx.clone()))
    }

    pub fn broadcast_block(&self, block: &Block) -> Result<usize> {
        self.peers.broadcast(&Message::Block(block.clone()))
    }

    fn start_mining_timer(&self) {
        let server = self.clone();
        let interval = self.settings.mining_interval();

        thread::spawn(move || loop {
            thread::sleep(interval);
            if let Err(e) = server.mine_once() {
                error!("Mining failed: {e}");
            }
        });
    }

    fn start_status_timer(&self) {
        let server = self.clone();
        let interval = self.settings.status_interval();

        thread::spawn(move || loop {
            thread::sleep(interval);
            match server.ledger() {
                Ok(ledger) => {
                    if let Some(latest) = ledger.latest_block() {
                        info!(
                            "Latest block #{} {} ({} pending, supply {})",
                            latest.get_index(),
                            latest.get_hash(),
                            ledger.pending_transactions().len(),
                            ledger.current_supply()
                        );
                    }
                }
                Err(e) => error!("{e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{create_test_blockchain, fast_params, funded_wallet, signed_transfer};
    use crate::wallet::Wallet;

    const MINER: &str = "0x00000000000000000000000000000000000000aa";

    fn test_settings(strict_sync: bool) -> NodeSettings {
        NodeSettings {
            listen_addr: "127.0.0.1:0".to_string(),
            strict_sync,
            chain: fast_params(),
            ..NodeSettings::default()
        }
    }

    #[test]
    fn test_balance_query_is_answered() {
        let (mut ledger, _dir) = create_test_blockchain().unwrap();
        let wallet = funded_wallet(&mut ledger).unwrap();
        let server = Server::new(ledger, test_settings(true), MINER.to_string());

        let reply = server
            .handle_message(Message::BalanceQuery {
                address: wallet.get_address(),
            })
            .unwrap();
        assert_eq!(
            reply,
            Some(Message::BalanceResponse(fast_params().mining_reward as i64))
        );
    }

    #[test]
    fn test_transaction_is_pooled() {
        let (mut ledger, _dir) = create_test_blockchain().unwrap();
        let wallet = funded_wallet(&mut ledger).unwrap();
        let server = Server::new(ledger, test_settings(true), MINER.to_string());

        let tx = signed_transfer(&wallet, MINER, 10, 1).unwrap();
        assert_eq!(server.handle_message(Message::Transaction(tx)).unwrap(), None);
        let blockchain = server.get_blockchain();
        assert_eq!(blockchain.lock().unwrap().pending_transactions().len(), 1);
    }

    #[test]
    fn test_relayed_coinbase_dropped_when_strict() {
        let (ledger, _dir) = create_test_blockchain().unwrap();
        let server = Server::new(ledger, test_settings(true), MINER.to_string());
        let minted = Transaction::new_coinbase(MINER, 1_000_000, None).unwrap();

        server.handle_message(Message::Transaction(minted)).unwrap();
        let blockchain = server.get_blockchain();
        assert!(blockchain.lock().unwrap().pending_transactions().is_empty());
    }

    #[test]
    fn test_relayed_coinbase_pooled_when_trusting() {
        let (ledger, _dir) = create_test_blockchain().unwrap();
        let server = Server::new(ledger, test_settings(false), MINER.to_string());
        let minted = Transaction::new_coinbase(MINER, 1_000_000, None).unwrap();

        server.handle_message(Message::Transaction(minted)).unwrap();
        let blockchain = server.get_blockchain();
        assert_eq!(blockchain.lock().unwrap().pending_transactions().len(), 1);
    }

    #[test]
    fn test_mine_once_appends_block() {
        let (ledger, _dir) = create_test_blockchain().unwrap();
        let server = Server::new(ledger, test_settings(true), MINER.to_string());

        let block = server.mine_once().unwrap().unwrap();
        assert_eq!(block.get_index(), 1);

        let blockchain = server.get_blockchain();
        let ledger = blockchain.lock().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.balance_of(MINER), fast_params().mining_reward as i64);
    }

    #[test]
    fn test_snapshot_then_relayed_block() {
        let (source, _source_dir) = create_test_blockchain().unwrap();
        let source = Server::new(source, test_settings(true), MINER.to_string());
        let (target, _target_dir) = create_test_blockchain().unwrap();
        let target = Server::new(target, test_settings(true), MINER.to_string());

        source.mine_once().unwrap().unwrap();
        let snapshot = source.get_blockchain().lock().unwrap().current_chain().to_vec();
        target.handle_message(Message::ChainSnapshot(snapshot)).unwrap();

        let target_chain = target.get_blockchain();
        assert_eq!(target_chain.lock().unwrap().len(), 2);

        let next = source.mine_once().unwrap().unwrap();
        target.handle_message(Message::Block(next.clone())).unwrap();
        assert_eq!(target_chain.lock().unwrap().len(), 3);

        // The same block no longer extends the tip
        target.handle_message(Message::Block(next)).unwrap();
        assert_eq!(target_chain.lock().unwrap().len(), 3);
        assert!(target_chain.lock().unwrap().is_chain_valid());
    }

    #[test]
    fn test_unsolicited_balance_response_is_ignored() {
        let (ledger, _dir) = create_test_blockchain().unwrap();
        let miner = Wallet::generate().unwrap().get_address();
        let server = Server::new(ledger, test_settings(true), miner);
        assert_eq!(server.handle_message(Message::BalanceResponse(5)).unwrap(), None);
    }
}
