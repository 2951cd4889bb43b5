use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader};

use crate::core::{RgbaImage, RgbaImageView, WarpError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced while loading, decoding, encoding or writing images.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Warp(#[from] WarpError),
}

/// Borrow an `image::RgbaImage` as the lightweight core view type.
pub fn rgba_view(img: &::image::RgbaImage) -> RgbaImageView<'_> {
    RgbaImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Take ownership of an `image::RgbaImage` buffer without copying.
pub fn from_image(img: ::image::RgbaImage) -> Result<RgbaImage, IoError> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    Ok(RgbaImage::from_raw(w, h, img.into_raw())?)
}

/// Dimensions as the `u32` pair codecs expect, after checking the buffer.
fn codec_dims(img: &RgbaImage) -> Result<(u32, u32), IoError> {
    img.view().check()?;
    match (u32::try_from(img.width), u32::try_from(img.height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(IoError::Warp(WarpError::OutputTooLarge {
            width: img.width,
            height: img.height,
            limit: u32::MAX as usize,
        })),
    }
}

/// Convert back into an `image::RgbaImage`.
pub fn to_image(img: &RgbaImage) -> Result<::image::RgbaImage, IoError> {
    let (w, h) = codec_dims(img)?;
    ::image::RgbaImage::from_raw(w, h, img.data.clone()).ok_or(IoError::Warp(
        WarpError::BufferSize {
            expected: w as usize * h as usize * 4,
            got: img.data.len(),
        },
    ))
}

/// Decode any format supported by `image` into RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, IoError> {
    let img = ::image::load_from_memory(bytes).map_err(IoError::Decode)?;
    from_image(img.to_rgba8())
}

/// Open and decode an image file into RGBA8; the format is guessed from content.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(path = %path.as_ref().display())))]
pub fn load_rgba(path: impl AsRef<Path>) -> Result<RgbaImage, IoError> {
    let path = path.as_ref();
    let read_err = |source| IoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)
        .map_err(read_err)?
        .with_guessed_format()
        .map_err(read_err)?
        .decode()
        .map_err(IoError::Decode)?;
    log::debug!(
        "decoded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    from_image(img.to_rgba8())
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, IoError> {
    let (w, h) = codec_dims(img)?;
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&img.data, w, h, ExtendedColorType::Rgba8)
        .map_err(IoError::Encode)?;
    Ok(out)
}

/// Encode as PNG and write to `path`.
pub fn save_png(path: impl AsRef<Path>, img: &RgbaImage) -> Result<(), IoError> {
    let path = path.as_ref();
    let bytes = encode_png(img)?;
    fs::write(path, &bytes).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "wrote {}x{} PNG to {} ({} bytes)",
        img.width,
        img.height,
        path.display(),
        bytes.len()
    );
    Ok(())
}
