mod backoff_retry;
mod load_dotenv;
mod time;

pub use backoff_retry::backoff_retry;
pub use load_dotenv::load_dotenv;
pub use time::{age_secs, clock_millis};

pub mod base_path;

pub fn rand_hex(bytes: usize) -> String {
    let rand: Vec<u8> = (0..bytes).map(|_| rand::random::<u8>()).collect();
    hex::encode(rand)
}
