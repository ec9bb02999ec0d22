//! Ledger integration tests
//!
//! Exercises the public ledger surface the way a node uses it: genesis,
//! transfers, mining, the monetary schedule, persistence and contracts.

use mewchain::core::{
    Block, Blockchain, ChainParams, Contract, KeyValueContract, ProofOfWork, Transaction,
    GENESIS_ADDRESS, GENESIS_REWARD,
};
use mewchain::error::BlockchainError;
use mewchain::wallet::Wallet;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

const OUTSIDER: &str = "0x00000000000000000000000000000000000000ee";

fn fast_params() -> ChainParams {
    ChainParams {
        difficulty: 1,
        ..ChainParams::default()
    }
}

fn new_ledger() -> (Blockchain, TempDir) {
    let dir = tempdir().unwrap();
    let ledger = Blockchain::create_with_params(dir.path(), fast_params()).unwrap();
    (ledger, dir)
}

fn transfer(from: &Wallet, to: &str, amount: u64, fee: u64) -> Transaction {
    let mut tx = Transaction::new(&from.get_address(), to, amount, fee, None).unwrap();
    tx.sign(from).unwrap();
    tx
}

#[test]
fn test_genesis_block_shape() {
    let (ledger, _dir) = new_ledger();
    let genesis = &ledger.current_chain()[0];

    assert_eq!(ledger.len(), 1);
    assert_eq!(genesis.get_index(), 0);
    assert_eq!(genesis.get_previous_hash(), "0");
    assert_eq!(genesis.get_nonce(), 0);
    assert_eq!(genesis.get_hash(), genesis.compute_hash().unwrap());

    let distribution = &genesis.get_transactions()[0];
    assert_eq!(distribution.get_from(), None);
    assert_eq!(distribution.get_to(), GENESIS_ADDRESS);
    assert_eq!(distribution.get_amount(), GENESIS_REWARD);
    assert_eq!(distribution.get_data(), Some("Genesis distribution"));
    assert!(ledger.is_chain_valid());
}

#[test]
fn test_receive_ten_send_four_leaves_six() {
    let (mut ledger, _dir) = new_ledger();
    let miner = Wallet::generate().unwrap();
    let alice = Wallet::generate().unwrap();
    let bob = Wallet::generate().unwrap();

    ledger.mine_pending_transactions(&miner.get_address()).unwrap();
    assert!(ledger.submit_transaction(transfer(&miner, &alice.get_address(), 10, 1)));
    ledger.mine_pending_transactions(OUTSIDER).unwrap();
    assert_eq!(ledger.balance_of(&alice.get_address()), 10);

    assert!(ledger.submit_transaction(transfer(&alice, &bob.get_address(), 4, 1)));
    ledger.mine_pending_transactions(OUTSIDER).unwrap();

    // Fees are not debited from the sender
    assert_eq!(ledger.balance_of(&alice.get_address()), 6);
    assert_eq!(ledger.balance_of(&bob.get_address()), 4);
    assert!(ledger.is_chain_valid());
}

#[test]
fn test_overspend_is_refused() {
    let (mut ledger, _dir) = new_ledger();
    let alice = Wallet::generate().unwrap();

    let tx = transfer(&alice, OUTSIDER, 1, 1);
    assert!(matches!(
        ledger.check_transaction(&tx),
        Err(BlockchainError::InsufficientFunds { .. })
    ));
    assert!(!ledger.submit_transaction(tx));
}

#[test]
fn test_reward_halves_every_interval() {
    let params = ChainParams {
        halving_interval: 10,
        ..fast_params()
    };

    assert_eq!(params.reward_for_height(0), 5_000);
    assert_eq!(params.reward_for_height(9), 5_000);
    assert_eq!(params.reward_for_height(10), 2_500);
    assert_eq!(params.reward_for_height(20), 1_250);
    assert_eq!(params.reward_for_height(10 * 40), 1);
}

#[test]
fn test_signatures_bind_sender_and_content() {
    let alice = Wallet::generate().unwrap();
    let mallory = Wallet::generate().unwrap();

    let mut forged = Transaction::new(&alice.get_address(), OUTSIDER, 5, 1, None).unwrap();
    assert!(matches!(
        forged.sign(&mallory),
        Err(BlockchainError::IdentityMismatch { .. })
    ));

    let tx = transfer(&alice, OUTSIDER, 5, 1);
    assert_eq!(tx.is_valid(), Ok(true));

    let mut json = serde_json::to_value(&tx).unwrap();
    json["amount"] = Value::from(500);
    let tampered: Transaction = serde_json::from_value(json).unwrap();
    assert_eq!(tampered.is_valid(), Ok(false));
}

#[test]
fn test_tampered_amount_invalidates_chain() {
    let (mut ledger, _dir) = new_ledger();
    ledger.mine_pending_transactions(OUTSIDER).unwrap();
    ledger.mine_pending_transactions(OUTSIDER).unwrap();
    assert!(Blockchain::validate_chain(ledger.current_chain()));

    let mut json = serde_json::to_value(ledger.current_chain()).unwrap();
    json[1]["transactions"][0]["amount"] = Value::from(1_000_000);
    let tampered: Vec<Block> = serde_json::from_value(json).unwrap();

    assert!(!Blockchain::validate_chain(&tampered));
}

#[test]
fn test_proof_of_work_targets() {
    let reward = Transaction::new_coinbase(OUTSIDER, 1, None).unwrap();
    let mut easy = Block::new(1, "prev".to_string(), 1, vec![reward.clone()]).unwrap();
    easy.mine(0).unwrap();
    assert_eq!(easy.get_nonce(), 0);

    let mut hard = Block::new(1, "prev".to_string(), 1, vec![reward]).unwrap();
    hard.mine(2).unwrap();
    assert!(hard.get_hash().starts_with("00"));
    assert!(ProofOfWork::new(2).validate(&hard));
}

#[test]
fn test_chain_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let wallet = Wallet::generate().unwrap();

    let (len, supply) = {
        let mut ledger = Blockchain::create_with_params(dir.path(), fast_params()).unwrap();
        ledger.mine_pending_transactions(&wallet.get_address()).unwrap();
        ledger.mine_pending_transactions(&wallet.get_address()).unwrap();
        (ledger.len(), ledger.current_supply())
    };

    let reopened = Blockchain::create_with_params(dir.path(), fast_params()).unwrap();
    assert_eq!(reopened.len(), len);
    assert_eq!(reopened.current_supply(), supply);
    assert_eq!(reopened.balance_of(&wallet.get_address()), 10_000);
    assert!(reopened.is_chain_valid());
}

#[test]
fn test_supply_accounting() {
    let (mut ledger, _dir) = new_ledger();
    let max_supply = ledger.params().max_supply;
    assert_eq!(ledger.remaining_supply(), max_supply - GENESIS_REWARD);

    ledger.mine_pending_transactions(OUTSIDER).unwrap();
    assert_eq!(ledger.current_supply(), GENESIS_REWARD + 5_000);
    assert_eq!(ledger.remaining_supply(), max_supply - GENESIS_REWARD - 5_000);
}

#[test]
fn test_key_value_contract_end_to_end() {
    let (mut ledger, _dir) = new_ledger();
    let user = Wallet::generate().unwrap();
    let contract_address = Wallet::generate().unwrap().get_address();
    ledger.register_contract(
        &contract_address,
        Box::new(KeyValueContract::new(&contract_address)),
    );

    let mut call = Transaction::new(
        &user.get_address(),
        &contract_address,
        0,
        1,
        Some("Hello, World!".to_string()),
    )
    .unwrap();
    call.sign(&user).unwrap();
    assert!(ledger.submit_transaction(call));
    ledger.mine_pending_transactions(OUTSIDER).unwrap();

    let contract = ledger.contract(&contract_address).unwrap();
    assert_eq!(contract.address(), contract_address);
    assert_eq!(contract.get_data(&user.get_address()), Some("Hello, World!"));
}
