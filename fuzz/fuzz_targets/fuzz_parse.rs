#![no_main]

use libfuzzer_sys::fuzz_target;

// The recovery cascade must be total: any input either parses (possibly
// after a rewrite) or fails with a terminal error, never a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = cf_parser::parse(text);
    }
});
