//! Periodically OCR configured screen regions and append the readings to a
//! CSV log.
//!
//! The heart of the crate is [`pipeline::CaptureLoop`]: every cycle it
//! captures each configured region of the display, runs the frame through a
//! shared Tesseract instance, and appends one timestamped row to an
//! append-only CSV file, until a stop flag file or Ctrl-C asks it to quit.
//! Region rectangles are produced by an external editor tool and read from a
//! plain-text config file at startup.

pub mod capture;
pub mod csv_writer;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod region;
pub mod stop_flag;
pub mod tesseract;

pub use error::{Error, ErrorKind, Result};
pub use pipeline::{CaptureLoop, StopReason};
