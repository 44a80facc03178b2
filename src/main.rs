use arcam::camera::Webcam;
use arcam::detection::stub::{StubFaceDetector, StubHandDetector};
use arcam::fanout::Broadcaster;
use arcam::overlay::Overlay;
use arcam::pipeline::{FramePipeline, PipelineOptions};
use arcam::resolution::Resolution;
use arcam::serve::Server;

fn main() -> anyhow::Result<()> {
    arcam::init_logger!();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8000".into());

    let server = Server::bind(&*addr)?;
    let overlay = Overlay::new("AR camera app").addr(server.local_addr()?.to_string());

    let broadcaster = Broadcaster::new(move || {
        Box::new(FramePipeline::new(
            || Webcam::open(Resolution::RES_480P),
            StubHandDetector::new(),
            StubFaceDetector::new(),
            overlay.clone(),
            PipelineOptions::default(),
        ))
    });

    server.run(broadcaster)
}
