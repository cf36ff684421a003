//! Progress reporting: a count bar of comments collected toward the minimum target.

use indicatif::{ProgressBar, ProgressStyle};

/// A small wrapper around an `indicatif` count bar.
/// `set(pos)` moves the bar and `finish(msg)` finalizes it.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
             it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        pb.set_style(style);
        let label = label.into();
        if !label.is_empty() {
            pb.set_message(label);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    /// Position is clamped to the bar length; collection can overshoot the target.
    #[inline]
    pub fn set(&self, pos: u64) {
        let len = self.pb.length().unwrap_or(pos);
        self.pb.set_position(pos.min(len));
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        self.pb.finish_with_message(msg.into());
    }
}
