#![no_main]

use cilb64::{deobfuscation::decode_module, Module, WriterOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut module) = Module::from_mem(data.to_vec()) {
        let _ = decode_module(&mut module);
        let _ = module.to_bytes(&WriterOptions::default());
    }
});
