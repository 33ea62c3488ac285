//! Progress bars.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for operations with known length.
pub fn bar(length: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(length);
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(message.to_string());
    pb
}
