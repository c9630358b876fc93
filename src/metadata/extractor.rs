// Duration probe using lofty (reads container headers, never decodes)
use lofty::prelude::AudioFile;
use lofty::probe::Probe;
use std::path::Path;

/// Duration of the media at `path` in seconds, if the container declares one.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let probe = match Probe::open(path).and_then(|p| p.guess_file_type().map_err(Into::into)) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("[Metadata] Could not open {:?}: {}", path, e);
            return None;
        }
    };

    let tagged_file = match probe.read() {
        Ok(f) => f,
        Err(e) => {
            log::debug!("[Metadata] No readable properties in {:?}: {}", path, e);
            return None;
        }
    };

    let seconds = tagged_file.properties().duration().as_secs_f64();
    (seconds > 0.0).then_some(seconds)
}
