use previewconfig::PreviewConfig;
use renderer::{LoopOptions, Precision, TranspileOptions};

pub fn map_precision(precision: previewconfig::Precision) -> Precision {
    match precision {
        previewconfig::Precision::Lowp => Precision::Low,
        previewconfig::Precision::Mediump => Precision::Medium,
        previewconfig::Precision::Highp => Precision::High,
    }
}

pub fn transpile_options(config: &PreviewConfig) -> TranspileOptions {
    TranspileOptions {
        version_directive: config.transpile.version_directive.trim().to_string(),
        default_precision: map_precision(config.transpile.default_precision),
        output_identifier: config.transpile.output_identifier.trim().to_string(),
    }
}

pub fn loop_options(config: &PreviewConfig) -> LoopOptions {
    LoopOptions {
        transpile: transpile_options(config),
        fps_window: config.playback.fps_window,
        autoplay: config.playback.autoplay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_matches_default_loop_options() {
        assert_eq!(loop_options(&PreviewConfig::default()), LoopOptions::default());
    }

    #[test]
    fn config_overrides_flow_through() {
        let config = PreviewConfig::from_toml_str(
            r##"
[transpile]
version_directive = "#version 300 es"
default_precision = "mediump"

[playback]
fps_window = "250ms"
autoplay = false
"##,
        )
        .unwrap();
        let options = loop_options(&config);
        assert_eq!(options.transpile.version_directive, "#version 300 es");
        assert_eq!(options.transpile.default_precision, Precision::Medium);
        assert_eq!(options.fps_window, Duration::from_millis(250));
        assert!(!options.autoplay);
    }
}
