#![no_main]

use bytes::BytesMut;
use kvwire::protocol::{decode_value, Value};
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct StreamingInput {
    data: Vec<u8>,
    split_points: Vec<u8>,
}

impl<'a> Arbitrary<'a> for StreamingInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> libfuzzer_sys::arbitrary::Result<Self> {
        let data: Vec<u8> = u.arbitrary()?;
        let split_points: Vec<u8> = u.arbitrary()?;
        Ok(Self { data, split_points })
    }
}

/// Decode everything currently complete in `buf`; `None` on a framing error
fn drain(buf: &mut BytesMut, out: &mut Vec<Value>) -> Option<()> {
    loop {
        match decode_value(buf) {
            Ok(Some(value)) => out.push(value),
            Ok(None) => return Some(()),
            Err(_) => return None,
        }
    }
}

fuzz_target!(|input: StreamingInput| {
    if input.data.is_empty() {
        return;
    }

    // Reference: the whole input at once
    let mut whole = BytesMut::from(&input.data[..]);
    let mut expected = Vec::new();
    let whole_ok = drain(&mut whole, &mut expected).is_some();

    let mut splits: Vec<usize> = input
        .split_points
        .iter()
        .map(|&b| (b as usize) % (input.data.len() + 1))
        .collect();
    splits.push(0);
    splits.push(input.data.len());
    splits.sort_unstable();
    splits.dedup();

    // Same input in chunks: a reply split across reads decodes the same way
    let mut buf = BytesMut::new();
    let mut actual = Vec::new();
    let mut chunked_ok = true;
    for window in splits.windows(2) {
        buf.extend_from_slice(&input.data[window[0]..window[1]]);
        if drain(&mut buf, &mut actual).is_none() {
            chunked_ok = false;
            break;
        }
    }

    if whole_ok && chunked_ok {
        assert_eq!(expected, actual);
    }
});
