#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, Vec<u32>)| {
    let (id, args) = input;
    // Flags normalize to 0/1, so compare after one re-encode.
    if let Ok(cmd) = probe_core::Command::decode(id, &args) {
        assert_eq!(cmd.id(), id);
        assert_eq!(probe_core::Command::decode(id, &cmd.args()), Ok(cmd));
    }
    if let Ok(rec) = probe_core::Record::decode(id, &args) {
        assert_eq!(probe_core::Record::decode(id, &rec.args()), Ok(rec));
    }
});
