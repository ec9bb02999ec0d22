use crate::core::MIN_TRANSACTION_FEE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mewchain", about = "MewChain ledger node and light client")]
pub struct Opt {
    #[arg(
        long = "data-dir",
        global = true,
        help = "Directory holding the chain database and wallet files"
    )]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a node that mines and serves peers")]
    StartNode {
        #[arg(long, help = "Wallet that receives mining rewards")]
        wallet: Option<String>,
        #[arg(long, help = "Address to listen on, e.g. 127.0.0.1:2001")]
        listen: Option<String>,
        #[arg(long = "peer", help = "Seed peer (host or host:port), repeatable")]
        peers: Vec<String>,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet {
        #[arg(long, help = "Wallet name")]
        name: Option<String>,
    },
    #[command(name = "address", about = "Print the address of a local wallet")]
    Address {
        #[arg(long, help = "Wallet name")]
        name: Option<String>,
    },
    #[command(
        name = "exportwallet",
        about = "Print the hex PKCS#8 private key of a local wallet"
    )]
    Exportwallet {
        #[arg(long, help = "Wallet name")]
        name: Option<String>,
    },
    #[command(
        name = "getbalance",
        about = "Ask the network for the balance of an address"
    )]
    GetBalance {
        #[arg(help = "Account address (defaults to the local wallet's)")]
        address: Option<String>,
        #[arg(long, help = "Wallet name")]
        name: Option<String>,
    },
    #[command(name = "send", about = "Sign a transfer and hand it to the network")]
    Send {
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
        #[arg(long, default_value_t = MIN_TRANSACTION_FEE, help = "Fee paid to the miner")]
        fee: u64,
        #[arg(long, help = "Payload attached to the transaction")]
        message: Option<String>,
        #[arg(long, help = "Sending wallet name")]
        name: Option<String>,
    },
    #[command(name = "printchain", about = "Print all blocks in the local chain")]
    Printchain,
    #[command(name = "validatechain", about = "Check the local chain's integrity")]
    Validatechain,
}
