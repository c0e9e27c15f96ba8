#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Errors are fine, panics are bugs. A payload that decodes must
        // render back to something that decodes to the same payload.
        if let Ok(payload) = gendoc::epc::decode(s) {
            let again = gendoc::epc::decode(&payload.text()).expect("re-decode");
            assert_eq!(again, payload);
        }
    }
});
