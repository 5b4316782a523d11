#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = probe_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A valid config must always produce a decodable configure frame.
            let cmd = probe_core::Command::from(&probe_core::ProbeCfg::from(&cfg.probe));
            let back = probe_core::Command::decode(cmd.id(), &cmd.args());
            assert_eq!(back.as_ref(), Ok(&cmd));
        }
    }
});
