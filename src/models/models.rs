use crate::schema::*;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2;
use diesel::r2d2::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub is_admin: bool,
    pub kyc_verified: bool,
    #[serde(skip_serializing)]
    pub transaction_pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub transaction_pin_hash: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = wallets)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64, // BIGINT minor units (100 = $1.00)
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = wallets)]
pub struct NewWallet {
    pub user_id: Uuid,
    pub balance: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = bank_accounts)]
pub struct BankAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_name: String,
    pub account_type: String,
    pub balance: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = bank_accounts)]
pub struct NewBankAccount {
    pub user_id: Uuid,
    pub account_name: String,
    pub account_type: String,
    pub balance: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = broker_users)]
pub struct BrokerUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub country: Option<String>,
    pub balance: i64,
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub status: String,
    pub kyc_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = broker_transactions)]
pub struct BrokerTransaction {
    pub id: Uuid,
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub transaction_type: String,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = broker_transactions)]
pub struct NewBrokerTransaction {
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub transaction_type: String,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub amount: i64, // signed minor units, negative for debits
    pub transaction_type: String,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub amount: i64,
    pub transaction_type: String,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = withdrawals)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub destination: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = withdrawals)]
pub struct NewWithdrawal {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub destination: String,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = broker_withdrawals)]
pub struct BrokerWithdrawal {
    pub id: Uuid,
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub withdrawal_method: String,
    pub destination: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = broker_withdrawals)]
pub struct NewBrokerWithdrawal {
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub withdrawal_method: String,
    pub destination: String,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = broker_transfers)]
pub struct BrokerTransfer {
    pub id: Uuid,
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub routing_number: Option<String>,
    pub bank_address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = broker_transfers)]
pub struct NewBrokerTransfer {
    pub broker_user_id: Uuid,
    pub amount: i64,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub routing_number: Option<String>,
    pub bank_address: Option<String>,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = kyc_submissions)]
pub struct KycSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub document_number: String,
    pub country: String,
    pub date_of_birth: NaiveDate,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = kyc_submissions)]
pub struct NewKycSubmission {
    pub user_id: Uuid,
    pub document_type: String,
    pub document_number: String,
    pub country: String,
    pub date_of_birth: NaiveDate,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = cards)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bank_account_id: Uuid,
    pub card_type: String,
    pub card_number: String,
    pub cardholder_name: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub status: String,
    pub daily_limit: i64,
    pub monthly_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = cards)]
pub struct NewCard {
    pub user_id: Uuid,
    pub bank_account_id: Uuid,
    pub card_type: String,
    pub card_number: String,
    pub cardholder_name: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub status: String,
    pub daily_limit: i64,
    pub monthly_limit: i64,
}

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub jwt_secret: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StatusFilter {
    pub status: Option<String>,
}
