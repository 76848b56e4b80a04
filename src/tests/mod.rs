pub mod common;
mod key_set_cache;
mod validation_chain;
