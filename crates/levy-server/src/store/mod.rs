pub mod db;
pub mod model;

pub use db::{Page, PageQuery, Record, SoftDelete, Store};
pub use model::{
    PaymentNotification, StickerRequest, StickerRequestStatus, Transaction, TransactionStatus,
    User, UserStatus, Vehicle, VehicleSetting, VehicleStatus, WhitelistedIp,
};

/// Random 16-hex-character record id.
pub fn generate_id() -> String {
    use rand::Rng;
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex::encode(bytes)
}
