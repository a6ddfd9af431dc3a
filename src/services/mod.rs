pub mod alert_service;
pub mod dashboard;
pub mod fallback_chain;
pub mod history_kline;
pub mod history_log;
pub mod quote_provider;
pub mod quote_validator;
pub mod scheduler;
pub mod technical_indicators;
