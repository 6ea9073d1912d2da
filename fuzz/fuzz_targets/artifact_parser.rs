#![no_main]

use libfuzzer_sys::fuzz_target;
use umbral::artifact::{decode_document, DocumentFormat};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Rejecting input is fine; panicking is not.
        for format in [DocumentFormat::Json, DocumentFormat::Yaml] {
            if let Ok(decoded) = decode_document(input, format, "fuzz") {
                let _ = format.render(&decoded.root);
            }
        }
    }
});
