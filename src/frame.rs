//! Decoder for the textual sample frames the acquisition device sends.
//!
//! Each datagram is an ASCII list of floating-point values, structurally
//! `[v1,v2,...,vN]`. Depending on the firmware, individual values may be
//! wrapped in double quotes, so `"` counts as a separator just like `,` and
//! whitespace. The decoder is permissive about punctuation noise around the
//! numbers but strict about the numbers themselves.

use log::warn;
use nom::combinator::all_consuming;
use nom::number::complete::double;
use std::fmt;

/// Raised when a datagram has no usable frame structure. The feed loop
/// treats this as a per-packet failure, never a reason to stop acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The payload is not valid UTF-8 text.
    NotText,
    /// No opening `[`, no closing `]`, or the closing bracket comes first.
    MissingBrackets,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            FrameError::NotText => "payload is not ASCII/UTF-8 text",
            FrameError::MissingBrackets => "payload has no [ ... ] frame",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for FrameError {}

fn is_separator(c: char) -> bool {
    c == ',' || c == '"' || c.is_ascii_whitespace()
}

fn parse_token(token: &str) -> Option<f64> {
    all_consuming(double::<_, nom::error::Error<&str>>)(token)
        .ok()
        .map(|(_, value)| value)
}

/// Decodes one datagram into a vector of exactly `n_channels` values.
///
/// The frame is whatever sits between the first `[` and the last `]`;
/// anything outside the brackets is ignored. Tokens fill the output left to
/// right: missing tokens leave 0.0 behind, extra tokens are dropped, and a
/// token that does not parse as a float contributes 0.0 for its slot.
pub fn decode_frame(payload: &[u8], n_channels: usize) -> Result<Vec<f64>, FrameError> {
    let text = std::str::from_utf8(payload).map_err(|_| FrameError::NotText)?;

    let open = text.find('[').ok_or(FrameError::MissingBrackets)?;
    let close = text.rfind(']').ok_or(FrameError::MissingBrackets)?;
    if close < open {
        return Err(FrameError::MissingBrackets);
    }

    let inner = &text[open + 1..close];
    let tokens = inner.split(is_separator).filter(|t| !t.is_empty());

    let mut values = vec![0.0; n_channels];
    for (slot, token) in values.iter_mut().zip(tokens) {
        match parse_token(token) {
            Some(value) => *slot = value,
            None => warn!("unparsable value {:?} in frame, substituting 0.0", token),
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_round_trip() {
        let values = decode_frame(b"[0.1,0.2,0.3,0.4]", 4).unwrap();
        assert_eq!(values, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn quoted_values() {
        let values = decode_frame(b"[2.0,\"4.0\"]", 2).unwrap();
        assert_eq!(values, vec![2.0, 4.0]);
    }

    #[test]
    fn whitespace_and_mixed_separators() {
        let values = decode_frame(b"[ 1.0 ,\t\"2.5\" 3e-1 ]", 3).unwrap();
        assert_eq!(values, vec![1.0, 2.5, 0.3]);
    }

    #[test]
    fn garbage_outside_brackets_is_ignored() {
        let values = decode_frame(b"noise[1.0,2.0]trailer", 2).unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn missing_opening_bracket() {
        assert_eq!(
            decode_frame(b"2.0,4.0]", 2),
            Err(FrameError::MissingBrackets)
        );
    }

    #[test]
    fn missing_closing_bracket() {
        assert_eq!(
            decode_frame(b"[2.0,4.0", 2),
            Err(FrameError::MissingBrackets)
        );
    }

    #[test]
    fn inverted_brackets() {
        assert_eq!(decode_frame(b"]2.0[", 1), Err(FrameError::MissingBrackets));
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let values = decode_frame(b"[1.5]", 4).unwrap();
        assert_eq!(values, vec![1.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn extra_tokens_are_dropped() {
        let values = decode_frame(b"[1.0,2.0,3.0,4.0]", 2).unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn bad_token_contributes_zero() {
        let values = decode_frame(b"[1.0,bogus,3.0]", 3).unwrap();
        assert_eq!(values, vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn binary_payload_is_rejected() {
        assert_eq!(
            decode_frame(&[0x5b, 0xff, 0xfe, 0x5d], 1),
            Err(FrameError::NotText)
        );
    }

    #[test]
    fn empty_frame() {
        let values = decode_frame(b"[]", 3).unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }
}
