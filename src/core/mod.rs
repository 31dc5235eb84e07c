use std::time::Duration;

use indicatif::MultiProgress;
use log::info;

use self::body::EncodedImage;
use self::config::Config;
use self::display::{face_overlays, DisplaySink, KeyEvent};
use self::ext_expression::ExtExpression;
use self::provider::{FrameProvider, Grab};
use self::status::StatusBar;
use self::transport::TextSink;
use self::vision::ExpressionService;

pub mod body;
pub mod config;
pub mod display;
pub mod ext_expression;
pub mod interaction;
pub mod posture;
pub mod provider;
pub mod status;
pub mod transport;
pub mod vision;

pub struct BodyCast {
    provider: Box<dyn FrameProvider>,
    display: Box<dyn DisplaySink>,
    sink: TextSink,
    expression: ExtExpression,
    status: StatusBar,
    show_labels: bool,
    send_body_summaries: bool,
    send_classifiers: bool,
    paused: bool,
    last_image: EncodedImage,
}

impl BodyCast {
    pub fn new(
        config: &Config,
        provider: Box<dyn FrameProvider>,
        display: Box<dyn DisplaySink>,
        service: Box<dyn ExpressionService>,
        multi: &MultiProgress,
    ) -> anyhow::Result<BodyCast> {
        let sink = TextSink::new(&config.dest_host, config.ports.clone())?;
        let expression = ExtExpression::new(
            service,
            Duration::from_secs_f32(config.dispatch_interval_secs),
        );

        Ok(BodyCast {
            provider,
            display,
            sink,
            expression,
            status: StatusBar::new(multi),
            show_labels: config.show_labels,
            send_body_summaries: config.send_body_summaries,
            send_classifiers: config.send_classifiers,
            paused: false,
            last_image: EncodedImage::default(),
        })
    }

    /// Capture/render loop. Runs until the input ends or the display
    /// reports a quit key.
    pub fn handle_frames(&mut self) {
        info!("Forwarding tracking data to {}", self.sink.host());

        loop {
            if !self.paused {
                match self.provider.grab() {
                    Grab::Frame(frame) => {
                        self.process(&frame);
                        self.last_image = frame.image;
                    }
                    Grab::NotReady => {}
                    Grab::Ended => {
                        info!("Input stream ended");
                        break;
                    }
                }
            }

            let overlays = face_overlays(&self.expression.summary().faces, self.show_labels);
            match self.display.present(&self.last_image, &overlays) {
                KeyEvent::Quit => {
                    info!("Exiting...");
                    break;
                }
                KeyEvent::TogglePause => {
                    self.paused = !self.paused;
                    info!("{}", if self.paused { "Pause" } else { "Restart" });
                }
                KeyEvent::None => {}
            }

            self.status.display();
        }
    }

    fn process(&mut self, frame: &body::CapturedFrame) {
        self.status.frame_tick();

        let flat = body::flatten_frame(frame);
        log::trace!(
            "frame {} is_new:{} is_tracked:{} camera at {:?} {:?}",
            flat.timestamp_ns,
            flat.is_new,
            flat.is_tracked,
            frame.camera_pose.translation,
            frame.camera_pose.orientation,
        );

        let mut sent = 0usize;
        let keypoints = transport::keypoint_text(&flat.body_list);
        sent += self.sink.send(self.sink.ports.keypoints, &keypoints) as usize;

        if self.send_body_summaries {
            let summaries = transport::body_summary_text(&flat.body_list);
            sent += self.sink.send(self.sink.ports.body_summaries, &summaries) as usize;
        }

        if self.send_classifiers && !frame.bodies.is_empty() {
            sent += self.classify(frame);
        }

        self.expression.step(&frame.image.data, &mut self.status);
        for (port, payload) in
            transport::expression_payloads(&self.sink.ports, self.expression.summary())
        {
            sent += self.sink.send(port, &payload) as usize;
        }

        self.status.sent(sent);
    }

    /// Interaction/posture/person-count sends, gated behind config.
    fn classify(&self, frame: &body::CapturedFrame) -> usize {
        let ports = &self.sink.ports;
        let mut sent = 0usize;

        let body_level = interaction::check_interaction(&frame.bodies);
        sent += self
            .sink
            .send(ports.interaction, &body_level.as_int().to_string()) as usize;

        let head_level = interaction::check_interaction_using_head(&frame.bodies);
        sent += self
            .sink
            .send(ports.head_interaction, &head_level.as_int().to_string()) as usize;

        sent += self
            .sink
            .send(ports.person_count, &frame.bodies.len().to_string()) as usize;

        if let Some(person) = frame.bodies.first() {
            let payload = match posture::classify_posture(&person.keypoint) {
                Some(posture) => posture.as_int().to_string(),
                None => "None".to_string(),
            };
            sent += self.sink.send(ports.posture, &payload) as usize;
        }

        sent
    }
}
