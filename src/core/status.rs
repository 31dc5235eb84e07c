use std::{collections::VecDeque, sync::Arc, time::Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Weighted events inside a sliding one-second window.
struct RateWindow {
    samples: VecDeque<(f32, Instant)>,
}

impl RateWindow {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
        }
    }

    fn push(&mut self, count: f32) {
        self.samples.push_back((count, Instant::now()));
        while let Some((_, time)) = self.samples.front() {
            if time.elapsed().as_secs_f32() > 1. {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn rate(&self) -> f32 {
        let elapsed = self
            .samples
            .front()
            .map(|(_, time)| time.elapsed().as_secs_f32())
            .unwrap_or(0f32);
        if elapsed <= f32::EPSILON {
            return 0.;
        }
        self.samples.iter().map(|(count, _)| count).sum::<f32>() / elapsed
    }
}

pub struct StatusBar {
    messages: Vec<Arc<str>>,
    spinner: ProgressBar,
    frames: RateWindow,
    datagrams: RateWindow,
    start: Instant,
}

impl StatusBar {
    pub fn new(multi: &MultiProgress) -> Self {
        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(
            ProgressStyle::default_spinner().tick_chars("⠁⠂⠄⡀⡈⡐⡠⣀⣁⣂⣄⣌⣔⣤⣥⣦⣮⣶⣷⣿⡿⠿⢟⠟⡛⠛⠫⢋⠋⠍⡉⠉⠑⠡⢁"),
        );

        Self {
            messages: Vec::new(),
            spinner,
            frames: RateWindow::new(),
            datagrams: RateWindow::new(),
            start: Instant::now(),
        }
    }

    pub fn frame_tick(&mut self) {
        self.frames.push(1.);
        self.add_item(format!("FPS:{:.0}", self.frames.rate()).into());
    }

    pub fn sent(&mut self, datagrams: usize) {
        self.datagrams.push(datagrams as f32);
        self.add_item(format!("SEND:{:.1}/s", self.datagrams.rate()).into());
    }

    pub fn add_item(&mut self, item: Arc<str>) {
        self.messages.push(item);
    }

    pub fn display(&mut self) {
        if self.start.elapsed().as_secs() >= 1 {
            let line = self.messages.join("  ");
            self.spinner.set_message(line);
        } else {
            self.spinner.set_message("Initializing...");
        }
        self.spinner.tick();
        self.messages.clear();
    }
}
