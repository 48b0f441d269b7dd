mod common;

use axum::extract::{Extension, Path, State};
use axum::Json;
use common::{cleanup_test_db, create_test_app_state, run_test_migrations};
use diesel::prelude::*;
use pixtrade::config::security_config::Claims;
use pixtrade::handlers::withdrawals::{
    create_withdrawal, update_withdrawal_status, UpdateStatusRequest, WithdrawalRequest,
};
use pixtrade::schema::{transactions, users, wallets, withdrawals};
use pixtrade::utility::hash_pin;
use uuid::Uuid;

// These tests need a live Postgres at TEST_DATABASE_URL.

fn claims_for(user_id: Uuid) -> Claims {
    let now = chrono::Utc::now().timestamp() as usize;
    Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
    }
}

fn seed_user(conn: &mut PgConnection, is_admin: bool, balance: i64) -> (Uuid, Uuid) {
    let user_id = Uuid::new_v4();
    let wallet_id = Uuid::new_v4();
    let email = format!("lifecycle_{}@example.com", user_id);

    diesel::insert_into(users::table)
        .values((
            users::id.eq(user_id),
            users::email.eq(email),
            users::password_hash.eq("hash"),
            users::name.eq("Lifecycle Test"),
            users::account_type.eq("banking"),
            users::is_admin.eq(is_admin),
            users::transaction_pin_hash.eq(hash_pin("1234").unwrap()),
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

    (user_id, wallet_id)
}

fn balance(conn: &mut PgConnection, wallet_id: Uuid) -> i64 {
    wallets::table
        .find(wallet_id)
        .select(wallets::balance)
        .first(conn)
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_funds_leave_on_approval_not_request() {
    let state = create_test_app_state();
    {
        let conn = &mut state.db.get().unwrap();
        run_test_migrations(conn);
    }

    let (user_id, wallet_id) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, false, 10_000)
    };
    let (admin_id, _) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, true, 0)
    };

    // Request the withdrawal: row created, balance untouched
    let (_, Json(withdrawal)) = create_withdrawal(
        State(state.clone()),
        Extension(claims_for(user_id)),
        Json(WithdrawalRequest {
            wallet_id,
            amount: 40.0,
            destination: "GB29NWBK60161331926819".to_string(),
            transaction_pin: "1234".to_string(),
        }),
    )
    .await
    .expect("withdrawal request failed");

    {
        let conn = &mut state.db.get().unwrap();
        assert_eq!(withdrawal.status, "pending");
        assert_eq!(balance(conn, wallet_id), 10_000);
    }

    // Approve: debit happens now, with an audit row
    let Json(approved) = update_withdrawal_status(
        State(state.clone()),
        Extension(claims_for(admin_id)),
        Path(withdrawal.id),
        Json(UpdateStatusRequest {
            status: "approved".to_string(),
            reason: None,
        }),
    )
    .await
    .expect("approval failed");
    assert_eq!(approved.status, "approved");

    {
        let conn = &mut state.db.get().unwrap();
        assert_eq!(balance(conn, wallet_id), 6_000);

        let audit_count: i64 = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::transaction_type.eq("withdrawal"))
            .count()
            .get_result(conn)
            .unwrap();
        assert_eq!(audit_count, 1);
    }

    // Payout fails downstream: funds come back
    let Json(failed) = update_withdrawal_status(
        State(state.clone()),
        Extension(claims_for(admin_id)),
        Path(withdrawal.id),
        Json(UpdateStatusRequest {
            status: "failed".to_string(),
            reason: Some("Destination account closed".to_string()),
        }),
    )
    .await
    .expect("failure transition failed");
    assert_eq!(failed.status, "failed");

    {
        let conn = &mut state.db.get().unwrap();
        assert_eq!(balance(conn, wallet_id), 10_000);
        cleanup_test_db(conn);
    }
}

#[tokio::test]
#[ignore]
async fn test_rejection_never_touches_balance() {
    let state = create_test_app_state();
    {
        let conn = &mut state.db.get().unwrap();
        run_test_migrations(conn);
    }

    let (user_id, wallet_id) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, false, 5_000)
    };
    let (admin_id, _) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, true, 0)
    };

    let (_, Json(withdrawal)) = create_withdrawal(
        State(state.clone()),
        Extension(claims_for(user_id)),
        Json(WithdrawalRequest {
            wallet_id,
            amount: 10.0,
            destination: "GB29NWBK60161331926819".to_string(),
            transaction_pin: "1234".to_string(),
        }),
    )
    .await
    .expect("withdrawal request failed");

    let Json(rejected) = update_withdrawal_status(
        State(state.clone()),
        Extension(claims_for(admin_id)),
        Path(withdrawal.id),
        Json(UpdateStatusRequest {
            status: "rejected".to_string(),
            reason: Some("KYC incomplete".to_string()),
        }),
    )
    .await
    .expect("rejection failed");
    assert_eq!(rejected.status, "rejected");

    let conn = &mut state.db.get().unwrap();
    assert_eq!(balance(conn, wallet_id), 5_000);

    // Terminal: any further transition is refused
    let result = update_withdrawal_status(
        State(state.clone()),
        Extension(claims_for(admin_id)),
        Path(withdrawal.id),
        Json(UpdateStatusRequest {
            status: "approved".to_string(),
            reason: None,
        }),
    )
    .await;
    assert!(result.is_err());

    cleanup_test_db(conn);
}

#[tokio::test]
#[ignore]
async fn test_wrong_pin_blocks_request() {
    let state = create_test_app_state();
    {
        let conn = &mut state.db.get().unwrap();
        run_test_migrations(conn);
    }

    let (user_id, wallet_id) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, false, 5_000)
    };

    let result = create_withdrawal(
        State(state.clone()),
        Extension(claims_for(user_id)),
        Json(WithdrawalRequest {
            wallet_id,
            amount: 10.0,
            destination: "GB29NWBK60161331926819".to_string(),
            transaction_pin: "9999".to_string(),
        }),
    )
    .await;
    assert!(result.is_err());

    let conn = &mut state.db.get().unwrap();
    let count: i64 = withdrawals::table
        .filter(withdrawals::user_id.eq(user_id))
        .count()
        .get_result(conn)
        .unwrap();
    assert_eq!(count, 0);

    cleanup_test_db(conn);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_approvals_debit_once() {
    let state = create_test_app_state();
    {
        let conn = &mut state.db.get().unwrap();
        run_test_migrations(conn);
    }

    let (user_id, wallet_id) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, false, 10_000)
    };
    let (admin_id, _) = {
        let conn = &mut state.db.get().unwrap();
        seed_user(conn, true, 0)
    };

    let (_, Json(withdrawal)) = create_withdrawal(
        State(state.clone()),
        Extension(claims_for(user_id)),
        Json(WithdrawalRequest {
            wallet_id,
            amount: 40.0,
            destination: "GB29NWBK60161331926819".to_string(),
            transaction_pin: "1234".to_string(),
        }),
    )
    .await
    .expect("withdrawal request failed");

    // Hold a row lock on the withdrawal so both approvals read `pending`
    // and pass the state check before either can write.
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let holder_state = state.clone();
    let withdrawal_id = withdrawal.id;
    let holder = std::thread::spawn(move || {
        let conn = &mut holder_state.db.get().unwrap();
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            withdrawals::table
                .find(withdrawal_id)
                .for_update()
                .select(withdrawals::id)
                .first::<Uuid>(conn)?;
            ready_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            Ok(())
        })
        .unwrap();
    });
    ready_rx.recv().unwrap();

    let mut approvals = Vec::new();
    for _ in 0..2 {
        let state = state.clone();
        approvals.push(tokio::spawn(async move {
            update_withdrawal_status(
                State(state),
                Extension(claims_for(admin_id)),
                Path(withdrawal_id),
                Json(UpdateStatusRequest {
                    status: "approved".to_string(),
                    reason: None,
                }),
            )
            .await
        }));
    }

    // Give both approvals time to read the row, then let them race.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    release_tx.send(()).unwrap();
    holder.join().unwrap();

    let mut successes = 0;
    for handle in approvals {
        let result = handle.await.unwrap();
        match result {
            Ok(_) => successes += 1,
            Err((status, _)) => {
                assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY)
            }
        }
    }
    assert_eq!(successes, 1);

    let conn = &mut state.db.get().unwrap();
    assert_eq!(balance(conn, wallet_id), 6_000);

    let status: String = withdrawals::table
        .find(withdrawal_id)
        .select(withdrawals::status)
        .first(conn)
        .unwrap();
    assert_eq!(status, "approved");

    let audit_rows: i64 = transactions::table
        .filter(transactions::wallet_id.eq(wallet_id))
        .filter(transactions::transaction_type.eq("withdrawal"))
        .count()
        .get_result(conn)
        .unwrap();
    assert_eq!(audit_rows, 1);

    cleanup_test_db(conn);
}
