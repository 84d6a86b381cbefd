//! End-to-end flows: keypair file -> app -> manager -> in-memory cluster.

use balance_app::{AppBuilder, BalanceManager, LocalCluster, ManagerError};
use balance_crypto::SigningKeypair;
use balance_program::{BalanceAccount, PROGRAM_ID};
use balance_rpc::{Cluster, ClusterError};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("balance-integration-{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn demo_from_keypair_file() {
    let dir = temp_dir("demo");
    let key_path = dir.join("id.json");
    let stored = SigningKeypair::generate();
    balance_keystore::save_keypair(&key_path, &stored).unwrap();

    let app = AppBuilder::new("balance-integration")
        .skip_logging()
        .skip_banner()
        .config_path(&dir.join("settings.json"))
        .keypair_path(&key_path)
        .build()
        .unwrap();
    assert_eq!(app.keypair.pubkey(), stored.pubkey());

    let program_id = app.config().program_id;
    let cluster = LocalCluster::new(program_id);
    cluster.fund(&app.keypair.pubkey(), 1_000_000_000);
    let manager = BalanceManager::new(cluster, program_id, app.keypair);

    let mut out = Vec::new();
    let account = manager.run_demo(&mut out).await.unwrap();
    assert_eq!(
        account,
        BalanceAccount {
            credited_amount: 100,
            debited_amount: 50,
            balance: 50,
        }
    );
    assert!(account.is_consistent());

    // The stored bytes are the 12-byte little-endian layout.
    let address = manager.balance_account_address().unwrap();
    let info = manager.cluster().get_account(&address).await.unwrap().unwrap();
    assert_eq!(info.data, vec![100, 0, 0, 0, 50, 0, 0, 0, 50, 0, 0, 0]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn demo_twice_accumulates() {
    let payer = SigningKeypair::generate();
    let cluster = LocalCluster::new(PROGRAM_ID);
    cluster.fund(&payer.pubkey(), 1_000_000_000);
    let manager = BalanceManager::new(cluster, PROGRAM_ID, payer);

    let mut sink = Vec::new();
    manager.run_demo(&mut sink).await.unwrap();
    let second = manager.run_demo(&mut sink).await.unwrap();
    assert_eq!(second.credited_amount, 200);
    assert_eq!(second.debited_amount, 100);
    assert_eq!(second.balance, 100);
}

#[tokio::test]
async fn users_get_separate_accounts() {
    let cluster = LocalCluster::new(PROGRAM_ID);
    let alice = SigningKeypair::generate();
    let bob = SigningKeypair::generate();
    let alice_key = alice.pubkey();
    let bob_key = bob.pubkey();
    cluster.fund(&alice_key, 1_000_000_000);

    let manager = BalanceManager::new(cluster, PROGRAM_ID, alice);
    manager.ensure_account().await.unwrap();
    manager.credit_account(7).await.unwrap();

    assert!(manager.get_user_balance_account(&bob_key).await.unwrap().is_none());
    let report = manager.get_user_balance_account(&alice_key).await.unwrap().unwrap();
    assert_eq!(report.account.balance, 7);
}

#[tokio::test]
async fn unfunded_signer_cannot_create() {
    let payer = SigningKeypair::generate();
    let manager = BalanceManager::new(LocalCluster::new(PROGRAM_ID), PROGRAM_ID, payer);
    let err = manager.ensure_account().await.unwrap_err();
    assert!(matches!(err, ManagerError::Cluster(ClusterError::Rejected(_))));
}

#[tokio::test]
async fn wrong_program_id_is_rejected() {
    let payer = SigningKeypair::generate();
    let cluster = LocalCluster::new(PROGRAM_ID);
    cluster.fund(&payer.pubkey(), 1_000_000_000);
    let other = balance_core::Pubkey::new_from_array([5u8; 32]);
    let manager = BalanceManager::new(cluster, other, payer);

    let err = manager.create_balance_account().await.unwrap_err();
    assert!(matches!(err, ManagerError::Cluster(ClusterError::Rejected(_))));
}
