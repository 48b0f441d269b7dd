pub mod admin;
pub mod bank_accounts;
pub mod broker_transfers;
pub mod broker_users;
pub mod broker_withdrawals;
pub mod cards;
pub mod current_user;
pub mod deposits;
pub mod health;
pub mod kyc;
pub mod login;
pub mod logout;
pub mod register;
pub mod transactions;
pub mod wallets;
pub mod withdrawals;
