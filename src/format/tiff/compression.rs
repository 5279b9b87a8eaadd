//! Decompression of strip and tile chunks.
//!
//! Supports the schemes scientific TIFF writers commonly use: none,
//! PackBits, LZW and Deflate (both tag values). JPEG-family schemes are left
//! to the primary decoder.

use std::io::Read;

use flate2::read::ZlibDecoder;
use weezl::{decode::Decoder as LzwDecoder, BitOrder, LzwStatus};

use crate::error::TiffError;

use super::tags::Compression;

/// Decompress one chunk.
///
/// `expected_len` is the size of the decoded chunk implied by the page
/// layout. No scheme produces more than that many bytes.
pub fn decompress(
    compression: Compression,
    data: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, TiffError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::PackBits => Ok(unpack_bits(data, expected_len)),
        Compression::Lzw => decode_lzw(data, expected_len),
        Compression::Deflate | Compression::AdobeDeflate => {
            let mut out = Vec::with_capacity(expected_len);
            ZlibDecoder::new(data)
                .take(expected_len as u64)
                .read_to_end(&mut out)
                .map_err(|e| TiffError::Decompression(format!("deflate: {}", e)))?;
            Ok(out)
        }
        other => Err(TiffError::UnsupportedCompression(other.name().to_string())),
    }
}

/// Decode a TIFF LZW stream (MSB bit order, early code size switch).
///
/// Streams missing the end-of-information code are accepted: decoding
/// stops once `expected_len` bytes have been produced.
fn decode_lzw(data: &[u8], expected_len: usize) -> Result<Vec<u8>, TiffError> {
    let mut decoder = LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8);
    let mut out = vec![0u8; expected_len];
    let mut produced = 0;
    let mut input = data;

    while produced < out.len() {
        let result = decoder.decode_bytes(input, &mut out[produced..]);
        produced += result.consumed_out;
        input = &input[result.consumed_in..];

        match result.status {
            Ok(LzwStatus::Ok) => {}
            Ok(LzwStatus::Done) | Ok(LzwStatus::NoProgress) => break,
            Err(e) => return Err(TiffError::Decompression(format!("lzw: {}", e))),
        }
    }

    out.truncate(produced);
    Ok(out)
}

/// Expand PackBits run-length data.
///
/// A header byte `n` in 0..=127 copies the next `n + 1` bytes, -127..=-1
/// repeats the next byte `1 - n` times and -128 is a no-op. Truncated input
/// yields whatever was decoded so far.
pub fn unpack_bits(data: &[u8], expected_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0;

    while i < data.len() && out.len() < expected_len {
        let n = data[i] as i8;
        i += 1;
        if n >= 0 {
            let end = (i + n as usize + 1).min(data.len());
            out.extend_from_slice(&data[i..end]);
            i = end;
        } else if n != -128 {
            if let Some(&byte) = data.get(i) {
                let run = (1 - n as isize) as usize;
                out.extend(std::iter::repeat(byte).take(run));
                i += 1;
            }
        }
    }

    out.truncate(expected_len);
    out
}
