pub mod alert;
pub mod settings;
pub mod stock;
