/// Crypto module - AES-based hash and MAC constructions
pub mod cipher;
pub mod padding;
pub mod dm_hash;
pub mod abreast_dm;
pub mod omac;

pub use cipher::{Aes, BlockCipher};
pub use dm_hash::{dm_hash, dm_hash_bytes, DM_HASH_SIZE};
pub use abreast_dm::{abreast_dm_hash, abreast_dm_hash_bytes, ABREAST_DM_HASH_SIZE};
pub use omac::{omac, omac_bytes, Omac, OMAC_SIZE};
