use ownership_handles::demo;
use ownership_handles::{DemoConfig, StdoutSink};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = DemoConfig::load_or_default(config_path.as_deref())?;
    log::debug!("using {:?}", config);

    let sink = Arc::new(StdoutSink::new(config.color));
    demo::run_weak(sink, &config.resource_name)?;
    Ok(())
}
