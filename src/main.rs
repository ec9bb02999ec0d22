// This is my main entry point for the MewChain CLI
// One binary runs a full node or acts as a light client against one
use clap::Parser;
use log::{error, info, LevelFilter};
use mewchain::core::{TOKEN_NAME, TOKEN_SYMBOL};
use mewchain::{
    check_address, Blockchain, Client, Command, Opt, Server, Transaction, Wallet, Wallets,
    GLOBAL_CONFIG,
};
use std::process;

fn main() {
    // Info by default, RUST_LOG still wins when it is set
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Some(dir) = opt.data_dir {
        GLOBAL_CONFIG.set_data_dir(dir);
    }

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn wallet_name(name: Option<String>) -> String {
    name.unwrap_or_else(|| GLOBAL_CONFIG.get_wallet_name())
}

fn load_wallet(wallets: &Wallets, name: &str) -> Result<Wallet, Box<dyn std::error::Error>> {
    wallets.load(name)?.ok_or_else(|| {
        format!(
            "No wallet named '{name}' in {}, run 'createwallet' first",
            wallets.wallet_path(name).display()
        )
        .into()
    })
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let wallets = Wallets::new(GLOBAL_CONFIG.get_data_dir());

    match command {
        // Starting a node: the wallet is created on first run so rewards always have a home
        Command::StartNode {
            wallet,
            listen,
            peers,
        } => {
            if let Some(addr) = listen {
                GLOBAL_CONFIG.set_node_addr(addr);
            }
            for peer in peers {
                GLOBAL_CONFIG.add_seed(peer);
            }
            if let Some(name) = wallet {
                GLOBAL_CONFIG.set_wallet_name(name);
            }

            let settings = GLOBAL_CONFIG.get_settings();
            let miner = wallets.load_or_create(&settings.wallet)?;
            let blockchain = Blockchain::create_with_params(&settings.data_dir, settings.chain)?;

            info!("Starting {TOKEN_NAME} ({TOKEN_SYMBOL}) node");
            println!("Mining rewards go to: {}", miner.get_address());

            let server = Server::new(blockchain, settings, miner.get_address());
            server.run().map_err(|e| format!("Server error: {e}"))?
        }
        Command::Createwallet { name } => {
            let name = wallet_name(name);
            if wallets.load(&name)?.is_some() {
                return Err(format!("Wallet '{name}' already exists").into());
            }
            let wallet = wallets.create(&name)?;
            println!("Your new address: {}", wallet.get_address())
        }
        Command::Address { name } => {
            let wallet = load_wallet(&wallets, &wallet_name(name))?;
            println!("{}", wallet.get_address())
        }
        Command::Exportwallet { name } => {
            let name = wallet_name(name);
            let wallet = load_wallet(&wallets, &name)?;
            println!("Address:     {}", wallet.get_address());
            println!("Public key:  {}", wallet.get_public_key_hex());
            println!(
                "Private key: {}",
                data_encoding::HEXLOWER.encode(wallet.get_pkcs8())
            );
        }
        // Balances come from the network, not the local store
        Command::GetBalance { address, name } => {
            let address = match address {
                Some(address) => address,
                None => load_wallet(&wallets, &wallet_name(name))?.get_address(),
            };
            check_address(&address)?;

            let client = Client::from_settings(&GLOBAL_CONFIG.get_settings());
            let balance = client.query_balance(&address)?;
            println!("Balance of {address}: {balance} {TOKEN_SYMBOL}");
        }
        Command::Send {
            to,
            amount,
            fee,
            message,
            name,
        } => {
            check_address(&to)?;

            let wallet = load_wallet(&wallets, &wallet_name(name))?;
            let mut tx = Transaction::new(&wallet.get_address(), &to, amount, fee, message)?;
            tx.sign(&wallet)?;

            let client = Client::from_settings(&GLOBAL_CONFIG.get_settings());
            let peer = client.send_transaction(&tx)?;
            println!("Transaction sent to {peer}");
        }
        // Offline inspection of whatever this data directory holds
        Command::Printchain => {
            let settings = GLOBAL_CONFIG.get_settings();
            let blockchain = Blockchain::create_with_params(&settings.data_dir, settings.chain)?;

            for block in blockchain.current_chain() {
                println!("Block #{}", block.get_index());
                println!("Prev. hash: {}", block.get_previous_hash());
                println!("Hash:       {}", block.get_hash());
                println!("Timestamp:  {}", block.get_timestamp());
                println!("Nonce:      {}", block.get_nonce());
                for tx in block.get_transactions() {
                    println!(
                        "- {} -> {}: {} (fee {}){}",
                        tx.get_from().unwrap_or("coinbase"),
                        tx.get_to(),
                        tx.get_amount(),
                        tx.get_fee(),
                        tx.get_data().map(|d| format!(" \"{d}\"")).unwrap_or_default()
                    );
                }
                println!()
            }
            println!(
                "Supply: {} {TOKEN_SYMBOL} minted, {} remaining",
                blockchain.current_supply(),
                blockchain.remaining_supply()
            );
        }
        Command::Validatechain => {
            let settings = GLOBAL_CONFIG.get_settings();
            let blockchain = Blockchain::create_with_params(&settings.data_dir, settings.chain)?;
            if blockchain.is_chain_valid() {
                println!("Chain of {} blocks is valid", blockchain.len());
            } else {
                return Err("Chain failed validation".into());
            }
        }
    }
    Ok(())
}
