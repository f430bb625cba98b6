//! Base85 text encoding (RFC 1924 alphabet).
//!
//! Bytes are taken four at a time as a big-endian `u32` and written as five
//! base-85 digits. A short final group is zero-padded before encoding and
//! the padding digits are dropped from the output, so the encoded length is
//! `ceil(n * 5 / 4)`. Decoding pads with the highest digit and drops the
//! same number of bytes again.
//!
//! The alphabet and padding match Python's `base64.b85encode`.

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

const INVALID: u8 = 0xff;

const fn build_decode_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static DECODE: [u8; 256] = build_decode_table();

/// Errors while decoding base85 text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Base85Error {
    #[error("invalid base85 character {0:?} at position {1}")]
    InvalidChar(char, usize),

    #[error("base85 group starting at position {0} overflows 32 bits")]
    Overflow(usize),

    #[error("dangling base85 digit at the end of input")]
    Truncated,
}

/// Encode bytes as base85 text.
pub fn encode(input: &[u8]) -> String {
    let mut out = Vec::with_capacity(input.len().div_ceil(4) * 5);

    for chunk in input.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut acc = u32::from_be_bytes(group);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(acc % 85) as usize];
            acc /= 85;
        }
        // A chunk of n bytes needs n + 1 digits.
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }

    // The alphabet is ASCII, so this never allocates a replacement.
    String::from_utf8_lossy(&out).into_owned()
}

/// Decode base85 text back to bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, Base85Error> {
    let bytes = input.as_bytes();
    if bytes.len() % 5 == 1 {
        return Err(Base85Error::Truncated);
    }

    let mut out = Vec::with_capacity(bytes.len() / 5 * 4 + 4);
    for (group_index, chunk) in bytes.chunks(5).enumerate() {
        let start = group_index * 5;
        let mut acc: u64 = 0;
        for i in 0..5 {
            let value = match chunk.get(i) {
                Some(&b) => match DECODE[b as usize] {
                    INVALID => {
                        let c = input
                            .get(start + i..)
                            .and_then(|rest| rest.chars().next())
                            .unwrap_or(char::REPLACEMENT_CHARACTER);
                        return Err(Base85Error::InvalidChar(c, start + i));
                    }
                    v => v,
                },
                None => 84,
            };
            acc = acc * 85 + u64::from(value);
        }
        let acc = u32::try_from(acc).map_err(|_| Base85Error::Overflow(start))?;
        let group = acc.to_be_bytes();
        out.extend_from_slice(&group[..chunk.len() - 1]);
    }

    Ok(out)
}
