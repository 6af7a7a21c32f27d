#![no_main]

use kvwire::client::Endpoint;
use kvwire::ConnectionInfo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(url) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(info) = ConnectionInfo::parse(url) else {
        return;
    };

    // Unix sockets never carry TLS
    if let Endpoint::Unix(path) = &info.endpoint {
        assert!(path.is_absolute());
        assert!(!info.use_ssl && !info.start_tls);
    }
    let _ = info.to_configuration_builder().build();
});
