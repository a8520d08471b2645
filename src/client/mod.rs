//! Capture-side client: microphone in, two relay paths out, unified events
//! folded into side-by-side transcripts.

mod session;

pub use session::CaptureSession;

use anyhow::Result;

use crate::config::Config;

/// Run a capture session until interrupted.
pub async fn run(config: Config, context: String) -> Result<()> {
    CaptureSession::new(config, context).run().await
}
