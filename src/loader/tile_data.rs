// src/loader/tile_data.rs
//! `<data encoding="base64" compression="gzip">` decoding.

use crate::document::TileFlip;
use crate::error::MapError;
use base64::prelude::*;
use flate2::read::GzDecoder;
use std::io::Read;

/// Decode a layer's `<data>` payload into `(tile ids, flip flags)`.
///
/// Only base64, raw or gzip-compressed, is accepted. Anything else is an
/// error rather than a silent fallback.
pub(crate) fn decode_layer_data(
    layer: &str,
    encoding: Option<&str>,
    compression: Option<&str>,
    text: &str,
    expected_cells: usize,
) -> Result<(Vec<u32>, Vec<TileFlip>), MapError> {
    let unsupported = || MapError::UnsupportedEncoding {
        layer: layer.to_owned(),
        encoding: encoding.map(str::to_owned),
        compression: compression.map(str::to_owned),
    };

    if encoding != Some("base64") {
        return Err(unsupported());
    }

    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let packed = BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| MapError::MalformedXml {
            context: format!("layer '{layer}': bad base64 tile data: {e}"),
        })?;

    let bytes = match compression {
        None | Some("") => packed,
        Some("gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(packed.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| MapError::MalformedXml {
                    context: format!("layer '{layer}': bad gzip tile data: {e}"),
                })?;
            out
        }
        Some(_) => return Err(unsupported()),
    };

    if bytes.len() % 4 != 0 || bytes.len() / 4 != expected_cells {
        return Err(MapError::LayerSize {
            layer: layer.to_owned(),
            expected: expected_cells,
            actual: bytes.len() / 4,
        });
    }

    let (flags, ids) = bytes
        .chunks_exact(4)
        .map(|cell| TileFlip::split(u32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]])))
        .unzip();
    Ok((ids, flags))
}
