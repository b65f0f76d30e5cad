use crate::error::{Error, Result};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A rectangular screen area, the unit of capture.
/// - Units are pixels
/// - Origin is the top-left corner of the display (0, 0)
///
/// Regions form an ordered sequence: their order in the config file decides
/// the column order of the readings log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.left, self.top
        )
    }
}

impl FromStr for Region {
    type Err = Error;

    /// Parses one config line of the form `top,left,width,height`.
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim().split(',').collect();
        if fields.len() != 4 {
            return Err(Error::config(format!(
                "expected 4 comma-separated fields (top,left,width,height), got {}: {:?}",
                fields.len(),
                s.trim()
            )));
        }
        let mut values = [0u32; 4];
        for (i, field) in fields.iter().enumerate() {
            values[i] = field.trim().parse::<u32>().map_err(|_| {
                Error::config(format!("non-integer field {:?} in line {:?}", field, s.trim()))
            })?;
        }
        Ok(Region {
            top: values[0],
            left: values[1],
            width: values[2],
            height: values[3],
        })
    }
}

/// Loads the ordered region list from a line-oriented config file.
///
/// The file is written by the external region editor; one region per line,
/// `top,left,width,height`. A missing file or any malformed line is a hard
/// error -- no defaults are substituted silently.
pub fn load_regions(path: &Path) -> Result<Vec<Region>> {
    let contents = fs::read_to_string(path).map_err(|e| {
        Error::with_source(
            crate::error::ErrorKind::Config,
            format!("failed to read region file {}", path.display()),
            e,
        )
    })?;

    let mut regions = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let region: Region = line.parse().map_err(|e: Error| {
            Error::config(format!("{}:{}: {}", path.display(), line_num + 1, e.message))
        })?;
        regions.push(region);
    }
    Ok(regions)
}
