mod common;

use common::{cleanup_test_db, create_test_db_pool, run_test_migrations};
use diesel::prelude::*;
use pixtrade::error::ApiError;
use pixtrade::ledger;
use pixtrade::schema::{users, wallets};
use uuid::Uuid;

// These tests need a live Postgres at TEST_DATABASE_URL.

fn seed_wallet(conn: &mut PgConnection, balance: i64) -> Uuid {
    let user_id = Uuid::new_v4();
    let wallet_id = Uuid::new_v4();
    let email = format!("ledger_{}@example.com", user_id);

    diesel::insert_into(users::table)
        .values((
            users::id.eq(user_id),
            users::email.eq(email),
            users::password_hash.eq("hash"),
            users::name.eq("Ledger Test"),
            users::account_type.eq("banking"),
        ))
        .execute(conn)
        .unwrap();

    diesel::insert_into(wallets::table)
        .values((
            wallets::id.eq(wallet_id),
            wallets::user_id.eq(user_id),
            wallets::balance.eq(balance),
            wallets::currency.eq("USD"),
        ))
        .execute(conn)
        .unwrap();

    wallet_id
}

fn wallet_balance(conn: &mut PgConnection, wallet_id: Uuid) -> i64 {
    wallets::table
        .find(wallet_id)
        .select(wallets::balance)
        .first(conn)
        .unwrap()
}

#[test]
#[ignore]
fn test_debit_respects_balance_guard() {
    let pool = create_test_db_pool();
    let conn = &mut pool.get().unwrap();
    run_test_migrations(conn);

    let wallet_id = seed_wallet(conn, 1000);

    // Exact balance drains to zero
    ledger::debit_wallet(conn, wallet_id, 1000).unwrap();
    assert_eq!(wallet_balance(conn, wallet_id), 0);

    // Any further debit fails and changes nothing
    let err = ledger::debit_wallet(conn, wallet_id, 1).unwrap_err();
    assert!(matches!(err, ApiError::InsufficientBalance));
    assert_eq!(wallet_balance(conn, wallet_id), 0);

    cleanup_test_db(conn);
}

#[test]
#[ignore]
fn test_credit_then_debit_nets_out() {
    let pool = create_test_db_pool();
    let conn = &mut pool.get().unwrap();
    run_test_migrations(conn);

    let wallet_id = seed_wallet(conn, 500);

    ledger::credit_wallet(conn, wallet_id, 2500).unwrap();
    assert_eq!(wallet_balance(conn, wallet_id), 3000);

    ledger::debit_wallet(conn, wallet_id, 1200).unwrap();
    assert_eq!(wallet_balance(conn, wallet_id), 1800);

    cleanup_test_db(conn);
}

#[test]
#[ignore]
fn test_debit_unknown_wallet_is_insufficient() {
    let pool = create_test_db_pool();
    let conn = &mut pool.get().unwrap();
    run_test_migrations(conn);

    let err = ledger::debit_wallet(conn, Uuid::new_v4(), 100).unwrap_err();
    assert!(matches!(err, ApiError::InsufficientBalance));
}

#[test]
#[ignore]
fn test_credit_unknown_wallet_is_not_found() {
    let pool = create_test_db_pool();
    let conn = &mut pool.get().unwrap();
    run_test_migrations(conn);

    let err = ledger::credit_wallet(conn, Uuid::new_v4(), 100).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

/// N threads race to debit the same wallet; total debited can never
/// exceed the starting balance.
#[test]
#[ignore]
fn test_concurrent_debits_never_overdraw() {
    let pool = create_test_db_pool();
    {
        let conn = &mut pool.get().unwrap();
        run_test_migrations(conn);
    }

    let wallet_id = {
        let conn = &mut pool.get().unwrap();
        seed_wallet(conn, 1000)
    };

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                let conn = &mut pool.get().unwrap();
                // Each tries to take 250; only 4 can succeed
                ledger::debit_wallet(conn, wallet_id, 250).is_ok()
            })
        })
        .collect();

    let successes = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 4);

    let conn = &mut pool.get().unwrap();
    assert_eq!(wallet_balance(conn, wallet_id), 0);
    cleanup_test_db(conn);
}
