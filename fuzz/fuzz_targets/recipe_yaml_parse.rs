//! Fuzz target for split recipe parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run recipe_yaml_parse

#![no_main]

use cococurate::config::parse_recipe;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_recipe(text);
    }
});
