pub mod key_set_cache;
pub mod token;
pub mod token_cache;
