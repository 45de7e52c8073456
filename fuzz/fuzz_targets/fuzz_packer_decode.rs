#![no_main]
use libfuzzer_sys::fuzz_target;

use originchain::core::packer::Packer;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic; errors are expected.
    let packer = Packer::with_defaults().unwrap();
    let _ = packer.deserialize(data);
});
