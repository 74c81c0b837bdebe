// Services module - Business logic

pub mod earnings;
pub mod event_planner;
pub mod mailer;
pub mod media_market;
pub mod otp;
pub mod password;
pub mod pricing;
pub mod storage;
pub mod token;
pub mod withdrawals;
