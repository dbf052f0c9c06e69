use log::error;

use sungrow_bridge::prelude::*;
use sungrow_bridge::Exit;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let options = Options::new();

    let config = match Config::new(options.config_file.clone()) {
        Ok(config) => config,
        Err(err) => {
            sungrow_bridge::init_logging("info");
            error!("Failed to load config {}: {:?}", options.config_file, err);
            std::process::exit(255);
        }
    };

    sungrow_bridge::init_logging(&config.loglevel);
    config.log_summary();

    match sungrow_bridge::app(ConfigWrapper::from_config(config)).await {
        Ok(Exit::Shutdown) => {}
        Ok(Exit::Restart) => sungrow_bridge::restart(),
        Err(e) => {
            error!("Application error: {:?}", e);
            sungrow_bridge::restart();
        }
    }
}
