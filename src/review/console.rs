//! Console-driven reviewer for the `review` subcommand

use super::{Decision, ReviewItem, Reviewer};
use crate::error::{Result, TracksetError};
use std::io::{BufRead, Write};

/// Reviewer that shows each image as a preview file and reads a/r from stdin
///
/// Terminals cannot render the image inline, so each item is written to a
/// temporary `preview.jpg` (overwritten per item) for the operator to open
/// in an external viewer.
pub struct ConsoleReviewer {
    preview_dir: tempfile::TempDir,
}

impl ConsoleReviewer {
    /// Create a reviewer backed by a fresh temporary preview directory
    pub fn new() -> Result<Self> {
        let preview_dir = tempfile::tempdir()
            .map_err(|e| TracksetError::file_io_error("create preview directory", "preview", e))?;
        Ok(Self { preview_dir })
    }

    fn write_preview(&self, item: &ReviewItem<'_>) -> Result<std::path::PathBuf> {
        let path = self.preview_dir.path().join("preview.jpg");
        // JPEG has no alpha channel; flatten before encoding.
        item.image
            .to_rgb8()
            .save_with_format(&path, image::ImageFormat::Jpeg)?;
        Ok(path)
    }
}

impl Reviewer for ConsoleReviewer {
    fn review(&mut self, item: &ReviewItem<'_>) -> Result<Decision> {
        let preview = self.write_preview(item)?;

        println!();
        println!(
            "[{}/{}] {} ({}x{}){}",
            item.index + 1,
            item.total,
            if item.label.is_empty() { "(no label)" } else { item.label },
            item.image.width(),
            item.image.height(),
            item.id.map(|id| format!(" id={}", id)).unwrap_or_default()
        );
        println!("Preview: {}", preview.display());

        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            print!("Accept or reject [a/r]? ");
            std::io::stdout()
                .flush()
                .map_err(|e| TracksetError::file_io_error("flush stdout", "stdout", e))?;

            line.clear();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .map_err(|e| TracksetError::file_io_error("read stdin", "stdin", e))?;
            if read == 0 {
                return Err(TracksetError::file_io_error(
                    "read stdin",
                    "stdin",
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input stream closed"),
                ));
            }

            match line.trim().to_lowercase().as_str() {
                "a" | "accept" => return Ok(Decision::Accept),
                "r" | "reject" => return Ok(Decision::Reject),
                other => println!("Unrecognized input '{}'; enter 'a' or 'r'", other),
            }
        }
    }
}
