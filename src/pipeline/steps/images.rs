// src/pipeline/steps/images.rs

use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageFormat, ImageReader};
use tracing::debug;

use crate::pipeline::step::{PipelineStep, StepContext, StepError};

/// `svg-optimize`: parse with usvg and write the normalised tree back
/// without indentation.
///
/// Comments, metadata and editor-specific elements do not survive the round
/// trip.
pub struct SvgOptimizeStep;

impl PipelineStep for SvgOptimizeStep {
    fn name(&self) -> &'static str {
        "svg-optimize"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let tree = usvg::Tree::from_data(&content, &usvg::Options::default())
            .map_err(|e| StepError::new(format!("parsing SVG: {e}")))?;
        let write_options = usvg::WriteOptions {
            indent: usvg::Indent::None,
            ..Default::default()
        };
        Ok(tree.to_string(&write_options).into_bytes())
    }
}

/// `png-recompress`: re-encode PNG files with maximum compression.
///
/// The re-encoded image is kept only when it is smaller. Files that are not
/// PNG pass through unchanged, so the step is safe on a mixed image route.
pub struct PngRecompressStep;

impl PipelineStep for PngRecompressStep {
    fn name(&self) -> &'static str {
        "png-recompress"
    }

    fn apply(&self, content: Vec<u8>, file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        if image::guess_format(&content).ok() != Some(ImageFormat::Png) {
            return Ok(content);
        }

        let img = ImageReader::with_format(std::io::Cursor::new(&content), ImageFormat::Png)
            .decode()
            .map_err(|e| StepError::new(format!("decoding PNG: {e}")))?;

        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| StepError::new(format!("encoding PNG: {e}")))?;

        if out.len() < content.len() {
            debug!(
                file = %file.display(),
                before = content.len(),
                after = out.len(),
                "recompressed PNG"
            );
            Ok(out)
        } else {
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    fn run(step: &dyn PipelineStep, input: Vec<u8>) -> Result<Vec<u8>, StepError> {
        step.apply(input, &PathBuf::from("x"), &StepContext::default())
    }

    #[test]
    fn svg_drops_comments_metadata_and_indentation() {
        let svg = "<?xml version=\"1.0\"?>\n<!-- made by hand -->\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"10\">\n  <metadata><rdf>x</rdf></metadata>\n  <rect width=\"4\" height=\"4\" fill=\"red\"/>\n</svg>\n";
        let out = String::from_utf8(run(&SvgOptimizeStep, svg.as_bytes().to_vec()).unwrap()).unwrap();
        assert!(out.starts_with("<svg"), "{out}");
        assert!(!out.contains("made by hand"), "{out}");
        assert!(!out.contains("metadata"), "{out}");
        assert!(!out.contains("\n  "), "{out}");

        let reparsed = usvg::Tree::from_data(out.as_bytes(), &usvg::Options::default()).unwrap();
        assert_eq!(reparsed.size().width(), 10.0);
    }

    #[test]
    fn malformed_svg_is_rejected() {
        let err = run(&SvgOptimizeStep, b"<svg><rect></svg".to_vec()).unwrap_err();
        assert!(err.0.starts_with("parsing SVG"), "{err}");
    }

    #[test]
    fn png_never_grows_and_stays_decodable() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([10, 20, 30, 255]));
        let mut fast = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut fast, CompressionType::Fast, FilterType::NoFilter);
        image::DynamicImage::ImageRgba8(img)
            .write_with_encoder(encoder)
            .unwrap();

        let out = run(&PngRecompressStep, fast.clone()).unwrap();
        assert!(out.len() <= fast.len());
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn non_png_passes_through() {
        let bytes = b"GIF89a not really".to_vec();
        assert_eq!(run(&PngRecompressStep, bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn corrupt_png_is_rejected() {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(b"garbage");
        assert!(run(&PngRecompressStep, bytes).is_err());
    }
}
