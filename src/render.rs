//! Render a payment payload as a scannable QR code.

use base64::engine::general_purpose;
use qr_code::QrCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("qr encode failed: {0}")]
    Encode(String),
    #[error("bitmap write failed: {0}")]
    Bitmap(String),
}

fn qr(payload: &str) -> Result<QrCode, RenderError> {
    QrCode::new(payload.as_bytes()).map_err(|e| RenderError::Encode(format!("{e:?}")))
}

/// Block-character rendering for a terminal, with a 3-module quiet zone.
pub fn to_terminal(payload: &str) -> Result<String, RenderError> {
    Ok(qr(payload)?.to_string(true, 3))
}

/// Monochrome BMP wrapped in a data URI, e.g. for an `<img src>`.
///
/// With `pixels_per_module` the image gets a one-module white border and is
/// scaled up; without it the bitmap is one pixel per module, no border.
pub fn to_bmp_data_uri(payload: &str, pixels_per_module: Option<u8>) -> Result<String, RenderError> {
    let mut bmp = qr(payload)?.to_bmp();
    if let Some(ppm) = pixels_per_module {
        bmp = bmp
            .add_white_border(1)
            .and_then(|b| b.mul(ppm))
            .map_err(|e| RenderError::Bitmap(format!("{e:?}")))?;
    }
    let mut enc = base64::write::EncoderWriter::new(Vec::new(), &general_purpose::STANDARD);
    bmp.write(&mut enc)
        .map_err(|e| RenderError::Bitmap(format!("{e:?}")))?;
    let encoded = enc
        .finish()
        .map_err(|e| RenderError::Bitmap(e.to_string()))?;
    let encoded = String::from_utf8(encoded).map_err(|e| RenderError::Bitmap(e.to_string()))?;
    Ok(format!("data:image/bmp;base64,{encoded}"))
}
