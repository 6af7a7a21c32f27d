#![no_main]

use bytes::BytesMut;
use kvwire::protocol::decode_value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);

    // Several replies may arrive in a single TCP segment
    loop {
        let before = buf.len();
        match decode_value(&mut buf) {
            Ok(Some(_)) => assert!(buf.len() < before, "a decoded reply must consume input"),
            Ok(None) => {
                assert_eq!(buf.len(), before, "an incomplete reply must not consume input");
                break;
            }
            Err(_) => break,
        }
        if buf.is_empty() {
            break;
        }
    }
});
