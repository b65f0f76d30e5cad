use crate::error::{Error, Result};
use crate::ocr::{Fragment, Recognizer};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use log::info;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tesseract::Tesseract;

/// Tesseract struggles to recognize text below this size, so smaller frames
/// are upscaled, and every frame gets a border this wide for good measure.
const MIN_OCR_IMAGE_SIZE: u32 = 32;

/// OCR engine wrapper around an initialized Tesseract instance.
///
/// Initialization loads the language model from disk (downloading it first if
/// necessary), which is slow -- construct one of these at startup and reuse it
/// for every region of every cycle.
pub struct TextRecognizer {
    // The tesseract crate's builder-style calls consume the instance, so it
    // lives in a RefCell<Option<...>> and is taken out and put back per call.
    tess: RefCell<Option<Tesseract>>,
}

impl TextRecognizer {
    /// Initializes Tesseract, downloading traineddata for `language` next to
    /// the executable if no datapath is given and the file is missing.
    pub fn new(datapath: Option<&Path>, language: &str) -> Result<Self> {
        let datapath = match datapath {
            Some(path) => path.to_path_buf(),
            None => default_datapath()?,
        };
        info!("using tesseract datapath {}", datapath.display());
        info!("using tesseract language {}", language);

        let traineddata = datapath.join(format!("{}.traineddata", language));
        if !traineddata.exists() {
            info!(
                "traineddata not found at {}, downloading...",
                traineddata.display()
            );
            download_traineddata(&traineddata)?;
            info!("traineddata downloaded");
        }

        let datapath_str = datapath
            .to_str()
            .ok_or_else(|| Error::recognition("tesseract datapath is not valid UTF-8"))?;
        let tess = Tesseract::new(Some(datapath_str), Some(language))
            .map_err(Error::recognition_from)?;

        Ok(TextRecognizer {
            tess: RefCell::new(Some(tess)),
        })
    }
}

impl Recognizer for TextRecognizer {
    fn recognize(&self, frame: &RgbaImage) -> Result<Vec<Fragment>> {
        // A region clamped to nothing captures a zero-area frame; the engine
        // has nothing to look at, which is "no legible text", not a failure.
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let prepared = prepare_for_ocr(frame);
        let (width, height) = (prepared.width() as i32, prepared.height() as i32);

        let model = self
            .tess
            .replace(None)
            .ok_or_else(|| Error::recognition("engine instance lost by an earlier failed call"))?;

        // One byte per pixel: the grayscale conversion above is mandatory, it
        // keeps color variance out of the engine's input.
        let mut model = model
            .set_frame(prepared.as_raw(), width, height, 1, width)
            .map_err(Error::recognition_from)?
            .set_source_resolution(96);

        let tsv = model.get_tsv_text(0).map_err(Error::recognition_from);
        self.tess.replace(Some(model));

        Ok(parse_tsv(&tsv?))
    }
}

/// Grayscale, upscale to the engine's minimum size, and pad with a white
/// border. Returns a single-channel buffer ready for `set_frame`.
pub fn prepare_for_ocr(frame: &RgbaImage) -> GrayImage {
    let gray = imageops::grayscale(frame);

    let mut width = gray.width();
    let mut height = gray.height();
    if width < MIN_OCR_IMAGE_SIZE {
        let scale = MIN_OCR_IMAGE_SIZE as f32 / width as f32;
        width = (width as f32 * scale) as u32;
        height = (height as f32 * scale) as u32;
    }
    if height < MIN_OCR_IMAGE_SIZE {
        let scale = MIN_OCR_IMAGE_SIZE as f32 / height as f32;
        width = (width as f32 * scale) as u32;
        height = (height as f32 * scale) as u32;
    }
    let gray = if (width, height) != gray.dimensions() {
        imageops::resize(&gray, width, height, FilterType::Lanczos3)
    } else {
        gray
    };

    let mut padded = GrayImage::from_pixel(
        width + 2 * MIN_OCR_IMAGE_SIZE,
        height + 2 * MIN_OCR_IMAGE_SIZE,
        Luma([255]),
    );
    imageops::replace(
        &mut padded,
        &gray,
        MIN_OCR_IMAGE_SIZE as i64,
        MIN_OCR_IMAGE_SIZE as i64,
    );
    padded
}

/// Extracts word-level fragments from Tesseract's TSV output.
///
/// TSV rows are `level page block par line word left top width height conf
/// text`; words are level 5. Fragment positions are relative to the
/// preprocessed (upscaled, padded) frame. Rows the engine mangles are
/// dropped rather than failing the whole frame.
pub fn parse_tsv(tsv: &str) -> Vec<Fragment> {
    tsv.lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() != 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                return None;
            }
            Some(Fragment {
                left: cols[6].parse().ok()?,
                top: cols[7].parse().ok()?,
                width: cols[8].parse().ok()?,
                height: cols[9].parse().ok()?,
                confidence: cols[10].parse().ok()?,
                text: text.to_string(),
            })
        })
        .collect()
}

fn default_datapath() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(Error::recognition_from)?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::recognition("executable has no parent directory"))?;
    Ok(dir.to_path_buf())
}

/// Fetches the traineddata file from the tesseract-ocr tessdata repository.
fn download_traineddata(path: &Path) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::recognition("invalid traineddata filename"))?;
    let url = format!(
        "https://github.com/tesseract-ocr/tessdata/raw/4.00/{}",
        filename
    );

    let body = reqwest::blocking::get(url)
        .map_err(Error::recognition_from)?
        .bytes()
        .map_err(Error::recognition_from)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::recognition_from)?;
    }
    fs::write(path, &body).map_err(Error::recognition_from)?;
    Ok(())
}
