use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::frame::{CameraFrame, ImagePlane, PixelFormat};

/// Repack a YUV_420_888 frame into NV21 (full Y plane, then interleaved V/U).
///
/// Row and pixel strides are honoured, so both planar (pixel stride 1) and
/// semi-planar (pixel stride 2) device layouts are accepted.
pub(crate) fn yuv420_to_nv21(frame: &CameraFrame) -> Result<Vec<u8>> {
    if frame.format != PixelFormat::Yuv420_888 {
        return Err(anyhow!("expected YUV_420_888 frame, got {:?}", frame.format));
    }
    let planes = frame.planes();
    if planes.len() != 3 {
        return Err(anyhow!(
            "YUV_420_888 frame must have 3 planes, got {}",
            planes.len()
        ));
    }
    let w = frame.width as usize;
    let h = frame.height as usize;
    if w == 0 || h == 0 {
        return Err(anyhow!("frame has zero dimension {}x{}", w, h));
    }
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let y_size = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("YUV frame dimensions overflow"))?;
    let vu_size = cw
        .checked_mul(ch)
        .and_then(|v| v.checked_mul(2))
        .ok_or_else(|| anyhow!("YUV frame dimensions overflow"))?;

    check_plane("Y", &planes[0], w, h)?;
    check_plane("U", &planes[1], cw, ch)?;
    check_plane("V", &planes[2], cw, ch)?;

    let mut nv21 = Vec::with_capacity(y_size + vu_size);

    let y_plane = &planes[0];
    for row in 0..h {
        let start = row * y_plane.row_stride();
        if y_plane.pixel_stride() == 1 {
            nv21.extend_from_slice(&y_plane.bytes()[start..start + w]);
        } else {
            nv21.extend((0..w).map(|col| y_plane.bytes()[start + col * y_plane.pixel_stride()]));
        }
    }

    let (u_plane, v_plane) = (&planes[1], &planes[2]);
    for row in 0..ch {
        for col in 0..cw {
            let v_idx = row * v_plane.row_stride() + col * v_plane.pixel_stride();
            let u_idx = row * u_plane.row_stride() + col * u_plane.pixel_stride();
            nv21.push(v_plane.bytes()[v_idx]);
            nv21.push(u_plane.bytes()[u_idx]);
        }
    }

    Ok(nv21)
}

fn check_plane(name: &str, plane: &ImagePlane, cols: usize, rows: usize) -> Result<()> {
    if plane.pixel_stride() == 0 {
        return Err(anyhow!("{} plane has zero pixel stride", name));
    }
    let last_row = (rows - 1)
        .checked_mul(plane.row_stride())
        .ok_or_else(|| anyhow!("{} plane stride overflow", name))?;
    let last_col = (cols - 1)
        .checked_mul(plane.pixel_stride())
        .ok_or_else(|| anyhow!("{} plane stride overflow", name))?;
    let needed = last_row + last_col + 1;
    if plane.len() < needed {
        return Err(anyhow!(
            "{} plane too short: need {} bytes, got {}",
            name,
            needed,
            plane.len()
        ));
    }
    Ok(())
}

/// Convert NV21 (Y plane, interleaved VU) to packed RGB24.
pub(crate) fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let cw = w.div_ceil(2);
    let y_plane = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("NV21 frame dimensions overflow"))?;
    let expected = cw
        .checked_mul(h.div_ceil(2))
        .and_then(|v| v.checked_mul(2))
        .and_then(|v| v.checked_add(y_plane))
        .ok_or_else(|| anyhow!("NV21 frame dimensions overflow"))?;
    if nv21.len() != expected {
        return Err(anyhow!(
            "NV21 frame length mismatch: expected {}, got {}",
            expected,
            nv21.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let y = nv21[j * w + i] as f32;
            let vu_index = y_plane + ((j / 2) * cw + i / 2) * 2;
            let v = nv21[vu_index] as f32 - 128.0;
            let u = nv21[vu_index + 1] as f32 - 128.0;

            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;

            let offset = (j * w + i) * 3;
            rgb[offset] = clamp_to_u8(r);
            rgb[offset + 1] = clamp_to_u8(g);
            rgb[offset + 2] = clamp_to_u8(b);
        }
    }

    Ok(rgb)
}

/// Compress packed RGB24 into a JPEG still at the given quality (1..=100).
pub(crate) fn encode_jpeg(rgb: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .context("encode jpeg still")?;
    Ok(out)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_produces_gray() -> Result<()> {
        let frame = CameraFrame::from_i420(2, 2, vec![128; 4], vec![128], vec![128], 0);
        let nv21 = yuv420_to_nv21(&frame)?;
        assert_eq!(nv21, vec![128u8; 6]);

        let rgb = nv21_to_rgb(&nv21, 2, 2)?;
        assert_eq!(rgb, vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn semi_planar_layout_is_deinterleaved() -> Result<()> {
        // 2x2 frame, chroma planes share one buffer: U at even offsets, V at odd.
        let frame = CameraFrame::new(
            vec![
                ImagePlane::new(vec![10, 20, 30, 40], 2, 1),
                ImagePlane::new(vec![100, 200], 2, 2),
                ImagePlane::new(vec![200], 2, 2),
            ],
            2,
            2,
            PixelFormat::Yuv420_888,
            0,
        );
        let nv21 = yuv420_to_nv21(&frame)?;
        assert_eq!(nv21, vec![10, 20, 30, 40, 200, 100]);
        Ok(())
    }

    #[test]
    fn short_plane_is_rejected() {
        let frame = CameraFrame::from_i420(4, 4, vec![0; 15], vec![0; 4], vec![0; 4], 0);
        assert!(yuv420_to_nv21(&frame).is_err());
    }

    #[test]
    fn nv21_length_is_validated() {
        assert!(nv21_to_rgb(&[0u8; 5], 2, 2).is_err());
    }

    #[test]
    fn jpeg_encoding_produces_soi_marker() -> Result<()> {
        let jpeg = encode_jpeg(&[128u8; 8 * 8 * 3], 8, 8, 50)?;
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        Ok(())
    }
}
