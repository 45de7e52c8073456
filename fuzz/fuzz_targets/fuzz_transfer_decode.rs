#![no_main]
use libfuzzer_sys::fuzz_target;

use originchain::core::packer::codecs::ids;
use originchain::core::packer::{Framing, Packer};

fuzz_target!(|data: &[u8]| {
    // The driver decodes untyped transfer frames straight off the wire.
    let packer = Packer::with_defaults().unwrap();
    let (major, minor) = ids::TRANSFER;
    let _ = packer.deserialize_known(major, minor, data, Framing::Untyped);
});
