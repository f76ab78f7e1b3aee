//! HTTP request handlers.

pub mod health;
pub mod menu;
pub mod orders;

pub use health::{health_check, version};
pub use menu::{create_menu_item, list_menu, update_menu_item};
pub use orders::{list_unpaid_orders, pay_table, submit_order};
