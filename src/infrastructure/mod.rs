pub mod cart_repo;
pub mod catalog_repo;
pub mod inventory;
pub mod models;
pub mod order_repo;
pub mod razorpay;

#[cfg(test)]
mod test_db;
