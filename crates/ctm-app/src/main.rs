//! CTM Demo - headless compositor driving the color transform protocol
//!
//! Usage: `ctm-demo [saturation] [config.json]`
//!
//! Brings up two software outputs, lets a client take control of both and
//! push a saturation matrix to each, then walks the first output through a
//! disable/enable cycle to show the matrix being re-applied.

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use ctm_core::Matrix;
use ctm_server::{
    ClientId, ControlId, CtmManager, FailureReason, ManagerConfig, Output, OutputId, Requester,
    SoftwareOutput,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SATURATION: f64 = 2.0;
const SAMPLE: [f64; 3] = [0.8, 0.4, 0.1];

/// Client that only reports what the compositor tells it.
struct LoggingClient {
    id: ClientId,
}

impl Requester for LoggingClient {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn failed(&self, control: ControlId, reason: FailureReason) {
        warn!(client = %self.id, %control, %reason, "control failed");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let saturation = match args.next() {
        Some(arg) => arg
            .parse::<f64>()
            .with_context(|| format!("invalid saturation {arg:?}"))?,
        None => DEFAULT_SATURATION,
    };
    let config = match args.next().map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => ManagerConfig::default(),
    };

    info!(saturation, "ctm demo starting");

    let manager = CtmManager::new(config);
    let _on_destroy = manager.on_destroy(|event| {
        info!(live_controls = event.live_controls, "manager going away");
    });

    let primary = SoftwareOutput::new(true);
    let secondary = SoftwareOutput::new(true);
    let dp = Output::new(OutputId(1), "DP-1", primary.clone());
    let hdmi = Output::new(OutputId(2), "HDMI-A-1", secondary.clone());

    let client = manager.bind(Rc::new(LoggingClient { id: ClientId(1) }));
    let wire = Matrix::saturation(saturation)
        .try_encode()
        .with_context(|| format!("saturation {saturation} is not representable"))?;

    let mut controls = Vec::new();
    for output in [&dp, &hdmi] {
        let control = client.get_control(Some(output));
        let mut shm = tempfile::tempfile().context("creating payload file")?;
        shm.write_all(wire.as_bytes())?;
        shm.seek(SeekFrom::Start(0))?;
        control
            .set_ctm(shm)
            .map_err(|e| anyhow::anyhow!("set_ctm rejected: {e} (code {})", e.code()))?;
        controls.push(control);
    }

    dp.commit();
    hdmi.commit();
    report(&dp, &primary);
    report(&hdmi, &secondary);

    // Modeset: the transform must come back after the output is re-enabled.
    dp.set_enabled(false);
    dp.commit();
    report(&dp, &primary);
    dp.set_enabled(true);
    dp.commit();
    dp.commit();
    report(&dp, &primary);

    client.destroy();
    controls[0].destroy();
    dp.commit();
    report(&dp, &primary);

    info!(
        frames = primary.frames_scheduled(),
        commits = primary.commits(),
        "ctm demo done"
    );
    manager.shutdown();
    Ok(())
}

fn load_config(path: &Path) -> Result<ManagerConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn report(output: &Output, backend: &SoftwareOutput) {
    let [r, g, b] = backend.render_rgb(SAMPLE);
    info!(
        output = output.name(),
        enabled = output.is_enabled(),
        ctm = backend.active_ctm().is_some(),
        "sample ({:.3}, {:.3}, {:.3}) renders as ({r:.3}, {g:.3}, {b:.3})",
        SAMPLE[0],
        SAMPLE[1],
        SAMPLE[2],
    );
}
